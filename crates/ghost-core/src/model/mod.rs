//! Static description of the maze the filter runs over.
//!
//! - `position`: integer cell coordinates and the four compass moves.
//! - `grid`: immutable wall map shared read-only by every model.
//! - `behavior`: closed set of ghost behavior modes and their intensities.
//! - `layout`: Pacman-style text layouts parsed into a [`Grid`].

mod behavior;
mod grid;
mod layout;
mod position;

pub use behavior::{BehaviorMode, UnknownBehavior};
pub use grid::Grid;
pub use position::{Direction, Position};
