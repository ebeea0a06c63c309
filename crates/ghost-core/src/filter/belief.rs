//! Per-target probability mass over grid cells.

use crate::error::{DegenerateReason, FilterError};
use crate::model::{Grid, Position};

/// Tolerance on total mass after a completed cycle.
pub const MASS_TOLERANCE: f64 = 1e-6;

/// Dense `width × height` mass matrix aligned with a [`Grid`].
///
/// Wall cells always hold exactly zero. After a completed filter cycle the
/// traversable cells sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct Belief {
    width: usize,
    height: usize,
    mass: Vec<f64>,
}

impl Belief {
    /// Equal mass on every traversable cell.
    pub fn uniform(grid: &Grid) -> Self {
        let share = 1.0 / grid.traversable_count() as f64;
        let mut belief = Self::zeros(grid);
        for cell in grid.traversable_cells() {
            belief.set(cell, share);
        }
        belief
    }

    /// Builds a seed prior from a `[x][y]` matrix. The matrix need not be
    /// normalized but must be finite, non-negative, zero on walls and carry
    /// some mass.
    pub fn from_matrix(grid: &Grid, matrix: Vec<Vec<f64>>) -> Result<Self, FilterError> {
        if matrix.len() != grid.width() || matrix.iter().any(|col| col.len() != grid.height()) {
            return Err(FilterError::config(format!(
                "prior must be {}x{} to match the grid",
                grid.width(),
                grid.height()
            )));
        }
        let belief = Self {
            width: grid.width(),
            height: grid.height(),
            mass: matrix.into_iter().flatten().collect(),
        };
        belief.validate_seed(grid)?;
        Ok(belief)
    }

    /// Mass concentrated on one traversable cell.
    pub fn point(grid: &Grid, cell: Position) -> Result<Self, FilterError> {
        grid.check_bounds(cell)?;
        if grid.is_wall(cell) {
            return Err(FilterError::config(format!("prior cell {cell} is a wall")));
        }
        let mut belief = Self::zeros(grid);
        belief.set(cell, 1.0);
        Ok(belief)
    }

    pub(crate) fn zeros(grid: &Grid) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            mass: vec![0.0; grid.cell_count()],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Mass at `pos`; zero outside the matrix.
    pub fn get(&self, pos: Position) -> f64 {
        if pos.x < self.width && pos.y < self.height {
            self.mass[self.index(pos)]
        } else {
            0.0
        }
    }

    pub(crate) fn set(&mut self, pos: Position, value: f64) {
        let index = self.index(pos);
        self.mass[index] = value;
    }

    pub(crate) fn add(&mut self, pos: Position, value: f64) {
        let index = self.index(pos);
        self.mass[index] += value;
    }

    pub(crate) fn scale(&mut self, pos: Position, factor: f64) {
        let index = self.index(pos);
        self.mass[index] *= factor;
    }

    pub fn total(&self) -> f64 {
        self.mass.iter().sum()
    }

    /// Cells with their mass in storage order (`x` major).
    pub fn iter(&self) -> impl Iterator<Item = (Position, f64)> + '_ {
        let height = self.height;
        self.mass
            .iter()
            .enumerate()
            .map(move |(index, mass)| (Position::new(index / height, index % height), *mass))
    }

    /// `[x][y]` matrix copy, the shape handed to renderers.
    pub fn to_matrix(&self) -> Vec<Vec<f64>> {
        self.mass
            .chunks(self.height)
            .map(|column| column.to_vec())
            .collect()
    }

    /// Most probable cell; ties resolve to the first cell in storage order.
    pub fn argmax(&self) -> Position {
        let mut best = (Position::new(0, 0), f64::NEG_INFINITY);
        for (pos, mass) in self.iter() {
            if mass > best.1 {
                best = (pos, mass);
            }
        }
        best.0
    }

    pub fn peak(&self) -> f64 {
        self.mass.iter().copied().fold(0.0, f64::max)
    }

    /// Shannon entropy in nats.
    pub fn entropy(&self) -> f64 {
        self.mass
            .iter()
            .filter(|mass| **mass > 0.0)
            .map(|mass| -mass * mass.ln())
            .sum()
    }

    /// Mass-weighted mean cell coordinates.
    pub fn expected_position(&self) -> (f64, f64) {
        let total = self.total();
        if total <= 0.0 {
            return (0.0, 0.0);
        }
        let (sx, sy) = self.iter().fold((0.0, 0.0), |(sx, sy), (pos, mass)| {
            (sx + pos.x as f64 * mass, sy + pos.y as f64 * mass)
        });
        (sx / total, sy / total)
    }

    /// Mass within Manhattan `radius` of `center`.
    pub fn mass_within(&self, center: Position, radius: usize) -> f64 {
        self.iter()
            .filter(|(pos, _)| pos.manhattan(center) <= radius)
            .map(|(_, mass)| mass)
            .sum()
    }

    /// Copy scaled to unit total mass.
    pub fn normalized(&self) -> Result<Belief, DegenerateReason> {
        let total = self.total();
        if !total.is_finite() {
            return Err(DegenerateReason::NonFinite);
        }
        if total <= 0.0 {
            return Err(DegenerateReason::ZeroMass);
        }
        Ok(Belief {
            width: self.width,
            height: self.height,
            mass: self.mass.iter().map(|mass| mass / total).collect(),
        })
    }

    pub fn is_normalized(&self) -> bool {
        (self.total() - 1.0).abs() <= MASS_TOLERANCE
    }

    pub fn matches(&self, grid: &Grid) -> bool {
        self.width == grid.width() && self.height == grid.height()
    }

    /// Panics when the belief breaks a structural invariant. These states can
    /// only come from a bug in the motion or sensor model.
    pub fn assert_invariants(&self, grid: &Grid) {
        assert!(self.matches(grid), "belief shape does not match grid");
        for (pos, mass) in self.iter() {
            assert!(mass >= 0.0, "negative mass {mass} at {pos}");
            if grid.is_wall(pos) {
                assert!(mass == 0.0, "wall cell {pos} holds mass {mass}");
            }
        }
        let total = self.total();
        assert!(
            (total - 1.0).abs() <= MASS_TOLERANCE,
            "belief mass sums to {total}"
        );
    }

    fn validate_seed(&self, grid: &Grid) -> Result<(), FilterError> {
        for (pos, mass) in self.iter() {
            if !mass.is_finite() || mass < 0.0 {
                return Err(FilterError::config(format!(
                    "prior mass at {pos} must be finite and non-negative, got {mass}"
                )));
            }
            if mass != 0.0 && grid.is_wall(pos) {
                return Err(FilterError::config(format!(
                    "prior assigns mass to wall cell {pos}"
                )));
            }
        }
        if self.total() <= 0.0 {
            return Err(FilterError::config("prior carries no mass"));
        }
        Ok(())
    }

    pub(crate) fn check_seed(&self, grid: &Grid) -> Result<(), FilterError> {
        if !self.matches(grid) {
            return Err(FilterError::config(format!(
                "prior is {}x{} but the grid is {}x{}",
                self.width,
                self.height,
                grid.width(),
                grid.height()
            )));
        }
        self.validate_seed(grid)
    }

    fn index(&self, pos: Position) -> usize {
        pos.x * self.height + pos.y
    }
}
