use serde::{Deserialize, Serialize};

use super::position::{Direction, Position};
use crate::error::FilterError;

/// Smallest accepted side length; every interior cell then has four potential neighbors.
pub const MIN_SIDE: usize = 3;

/// Immutable wall map. Cells are addressed `walls[x][y]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridRepr", into = "GridRepr")]
pub struct Grid {
    width: usize,
    height: usize,
    walls: Vec<bool>,
    open_cells: usize,
}

impl Grid {
    /// Builds a grid from a column-major wall matrix (`walls[x][y]`, `true` = impassable).
    pub fn new(width: usize, height: usize, walls: Vec<Vec<bool>>) -> Result<Self, FilterError> {
        if width < MIN_SIDE || height < MIN_SIDE {
            return Err(FilterError::config(format!(
                "grid must be at least {MIN_SIDE}x{MIN_SIDE}, got {width}x{height}"
            )));
        }
        if walls.len() != width {
            return Err(FilterError::config(format!(
                "wall matrix has {} columns, expected {width}",
                walls.len()
            )));
        }

        let mut flat = Vec::with_capacity(width * height);
        for (x, column) in walls.into_iter().enumerate() {
            if column.len() != height {
                return Err(FilterError::config(format!(
                    "wall column {x} has {} cells, expected {height}",
                    column.len()
                )));
            }
            flat.extend(column);
        }

        let open_cells = flat.iter().filter(|wall| !**wall).count();
        if open_cells == 0 {
            return Err(FilterError::config("grid has no traversable cells"));
        }

        Ok(Self {
            width,
            height,
            walls: flat,
            open_cells,
        })
    }

    /// Grid without any walls.
    pub fn open(width: usize, height: usize) -> Result<Self, FilterError> {
        Self::new(width, height, vec![vec![false; height]; width])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Largest possible Manhattan distance scale used by the sensor likelihood.
    pub fn span(&self) -> usize {
        self.width + self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Cells outside the grid are reported as walls.
    pub fn is_wall(&self, pos: Position) -> bool {
        !self.contains(pos) || self.walls[self.index(pos)]
    }

    pub fn is_traversable(&self, pos: Position) -> bool {
        !self.is_wall(pos)
    }

    pub fn check_bounds(&self, pos: Position) -> Result<(), FilterError> {
        if self.contains(pos) {
            Ok(())
        } else {
            Err(FilterError::OutOfBounds {
                position: pos,
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn traversable_count(&self) -> usize {
        self.open_cells
    }

    /// All cells in storage order (`x` major, `y` minor).
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.width).flat_map(move |x| (0..self.height).map(move |y| Position::new(x, y)))
    }

    pub fn traversable_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells().filter(move |pos| self.is_traversable(*pos))
    }

    /// Traversable cells one step away from `pos`, in [`Direction::ALL`] order.
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = (Direction, Position)> + '_ {
        Direction::ALL.into_iter().filter_map(move |direction| {
            pos.neighbor(direction)
                .filter(|next| self.is_traversable(*next))
                .map(|next| (direction, next))
        })
    }

    pub fn wall_matrix(&self) -> Vec<Vec<bool>> {
        self.walls
            .chunks(self.height)
            .map(|column| column.to_vec())
            .collect()
    }

    pub(crate) fn index(&self, pos: Position) -> usize {
        pos.x * self.height + pos.y
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GridRepr {
    width: usize,
    height: usize,
    walls: Vec<Vec<bool>>,
}

impl TryFrom<GridRepr> for Grid {
    type Error = FilterError;

    fn try_from(repr: GridRepr) -> Result<Self, Self::Error> {
        Grid::new(repr.width, repr.height, repr.walls)
    }
}

impl From<Grid> for GridRepr {
    fn from(grid: Grid) -> Self {
        GridRepr {
            width: grid.width,
            height: grid.height,
            walls: grid.wall_matrix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(width: usize, height: usize) -> Grid {
        let walls = (0..width)
            .map(|x| {
                (0..height)
                    .map(|y| x == 0 || y == 0 || x == width - 1 || y == height - 1)
                    .collect()
            })
            .collect();
        Grid::new(width, height, walls).expect("valid grid")
    }

    #[test]
    fn rejects_small_or_malformed_grids() {
        assert!(matches!(Grid::open(2, 5), Err(FilterError::Configuration(_))));
        assert!(matches!(
            Grid::new(3, 3, vec![vec![false; 3]; 2]),
            Err(FilterError::Configuration(_))
        ));
        assert!(matches!(
            Grid::new(3, 3, vec![vec![false; 3], vec![false; 2], vec![false; 3]]),
            Err(FilterError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_grid_without_open_cells() {
        let err = Grid::new(3, 3, vec![vec![true; 3]; 3]).unwrap_err();
        assert_eq!(
            err,
            FilterError::Configuration("grid has no traversable cells".into())
        );
    }

    #[test]
    fn out_of_range_cells_count_as_walls() {
        let grid = Grid::open(4, 3).unwrap();
        assert!(grid.is_traversable(Position::new(3, 2)));
        assert!(grid.is_wall(Position::new(4, 0)));
        assert!(grid.is_wall(Position::new(0, 3)));
        assert!(matches!(
            grid.check_bounds(Position::new(4, 0)),
            Err(FilterError::OutOfBounds { width: 4, height: 3, .. })
        ));
    }

    #[test]
    fn neighbors_skip_walls_and_edges() {
        let grid = boxed(5, 5);
        let corner: Vec<_> = grid.neighbors(Position::new(1, 1)).collect();
        assert_eq!(
            corner,
            vec![
                (Direction::North, Position::new(1, 2)),
                (Direction::East, Position::new(2, 1)),
            ]
        );
        assert_eq!(grid.neighbors(Position::new(2, 2)).count(), 4);

        let open = Grid::open(3, 3).unwrap();
        assert_eq!(open.neighbors(Position::new(0, 0)).count(), 2);
    }

    #[test]
    fn counts_traversable_cells() {
        let grid = boxed(5, 4);
        assert_eq!(grid.traversable_count(), 6);
        assert_eq!(grid.traversable_cells().count(), 6);
        assert_eq!(grid.cells().count(), 20);
        assert_eq!(grid.span(), 9);
    }

    #[test]
    fn serde_roundtrip_validates() {
        let grid = boxed(4, 3);
        let json = serde_json::to_string(&grid).unwrap();
        let back: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);

        let broken = r#"{"width":3,"height":3,"walls":[[true,true,true],[true,true,true],[true,true,true]]}"#;
        assert!(serde_json::from_str::<Grid>(broken).is_err());
    }
}
