use core::fmt;
use serde::{Deserialize, Serialize};

/// Cell coordinates with `(0, 0)` in the bottom-left corner of the maze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub const fn manhattan(self, other: Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Cell one step away in `direction`, or `None` when that would leave the
    /// non-negative quadrant. Upper bounds are the grid's concern.
    pub fn neighbor(self, direction: Direction) -> Option<Position> {
        match direction {
            Direction::North => Some(Position::new(self.x, self.y + 1)),
            Direction::South => self.y.checked_sub(1).map(|y| Position::new(self.x, y)),
            Direction::East => Some(Position::new(self.x + 1, self.y)),
            Direction::West => self.x.checked_sub(1).map(|x| Position::new(x, self.y)),
        }
    }
}

impl From<(usize, usize)> for Position {
    fn from((x, y): (usize, usize)) -> Self {
        Position::new(x, y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    North = 0,
    South = 1,
    East = 2,
    West = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Whether stepping this way from `from` keeps or widens the gap to
    /// `pursuer` on the axis of motion. Ties count as fleeing in both
    /// directions of the tied axis.
    pub const fn flees(self, from: Position, pursuer: Position) -> bool {
        match self {
            Direction::North => pursuer.y <= from.y,
            Direction::South => pursuer.y >= from.y,
            Direction::East => pursuer.x <= from.x,
            Direction::West => pursuer.x >= from.x,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::North => "North",
            Direction::South => "South",
            Direction::East => "East",
            Direction::West => "West",
        };
        f.write_str(label)
    }
}
