//! Direction-biased random walk over traversable neighbors.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::{BehaviorMode, Direction, Grid, Position};

/// What happens to the mass of a traversable cell with no traversable neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnclosedCellPolicy {
    /// The mass stays on the enclosed cell.
    #[default]
    Retain,
    /// The mass is discarded; normalization redistributes the remainder.
    Drop,
}

/// Outgoing move distribution of one source cell. Probabilities sum to one
/// unless the set is empty.
#[derive(Debug, Clone, Copy)]
pub struct Transitions {
    moves: [(Position, f64); 4],
    len: usize,
}

impl Transitions {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, f64)> + '_ {
        self.moves[..self.len].iter().copied()
    }

    pub fn probability_to(&self, dest: Position) -> f64 {
        self.iter()
            .find(|(pos, _)| *pos == dest)
            .map(|(_, prob)| prob)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionModel {
    behavior: BehaviorMode,
    enclosed: EnclosedCellPolicy,
}

impl MotionModel {
    pub fn new(behavior: BehaviorMode, enclosed: EnclosedCellPolicy) -> Self {
        Self { behavior, enclosed }
    }

    pub fn behavior(&self) -> BehaviorMode {
        self.behavior
    }

    pub fn enclosed_policy(&self) -> EnclosedCellPolicy {
        self.enclosed
    }

    /// Unnormalized weight of stepping `direction` from `source`.
    pub fn weight(&self, direction: Direction, source: Position, pursuer: Position) -> f64 {
        if direction.flees(source, pursuer) {
            self.behavior.intensity()
        } else {
            1.0
        }
    }

    pub fn transitions(&self, grid: &Grid, source: Position, pursuer: Position) -> Transitions {
        let mut moves = [(source, 0.0); 4];
        let mut len = 0;
        let mut norm = 0.0;
        for (direction, next) in grid.neighbors(source) {
            let weight = self.weight(direction, source, pursuer);
            moves[len] = (next, weight);
            len += 1;
            norm += weight;
        }
        for entry in &mut moves[..len] {
            entry.1 /= norm;
        }
        Transitions { moves, len }
    }

    /// Draws the next cell of a ghost behaving exactly as this model predicts.
    /// Enclosed cells and walls keep the ghost where it is.
    pub fn sample_move<R: Rng + ?Sized>(
        &self,
        grid: &Grid,
        source: Position,
        pursuer: Position,
        rng: &mut R,
    ) -> Position {
        if grid.is_wall(source) {
            return source;
        }
        let transitions = self.transitions(grid, source, pursuer);
        let mut draw = rng.gen_range(0.0..1.0);
        let mut last = source;
        for (dest, prob) in transitions.iter() {
            if draw < prob {
                return dest;
            }
            draw -= prob;
            last = dest;
        }
        last
    }
}
