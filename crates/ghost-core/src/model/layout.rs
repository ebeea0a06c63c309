//! Pacman-style text layouts: `%` marks a wall, every other character is open
//! floor. The first line of text is the top row of the maze.

use super::grid::Grid;
use super::position::Position;
use crate::error::FilterError;

const WALL: char = '%';
const FLOOR: char = '.';

impl Grid {
    /// Parses a layout. Zero-length lines are skipped; a row of spaces is open
    /// floor. Rows must share one width.
    pub fn from_layout(text: &str) -> Result<Grid, FilterError> {
        let rows: Vec<Vec<char>> = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().collect())
            .collect();

        let Some(first) = rows.first() else {
            return Err(FilterError::config("layout is empty"));
        };
        let width = first.len();
        if let Some((row, line)) = rows
            .iter()
            .enumerate()
            .find(|(_, line)| line.len() != width)
        {
            return Err(FilterError::config(format!(
                "layout row {row} has {} cells, expected {width}",
                line.len()
            )));
        }

        let height = rows.len();
        let walls = (0..width)
            .map(|x| {
                (0..height)
                    .map(|y| rows[height - 1 - y][x] == WALL)
                    .collect()
            })
            .collect();
        Grid::new(width, height, walls)
    }

    /// Renders the wall map back into layout text (top row first).
    pub fn to_layout(&self) -> String {
        let mut out = String::with_capacity((self.width() + 1) * self.height());
        for y in (0..self.height()).rev() {
            for x in 0..self.width() {
                let cell = if self.is_wall(Position::new(x, y)) {
                    WALL
                } else {
                    FLOOR
                };
                out.push(cell);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORRIDOR: &str = "\
%%%%%%%
%  G  %
%%%%%%%
";

    #[test]
    fn parses_corridor_with_bottom_left_origin() {
        let grid = Grid::from_layout(CORRIDOR).expect("valid layout");
        assert_eq!(grid.width(), 7);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.traversable_count(), 5);
        assert!(grid.is_wall(Position::new(0, 1)));
        assert!(grid.is_traversable(Position::new(3, 1)));
        assert!(grid.is_wall(Position::new(3, 0)));
    }

    #[test]
    fn first_line_is_top_row() {
        let layout = "%%%%\n%  %\n%%%%\n%%%%\n";
        let grid = Grid::from_layout(layout).unwrap();
        assert_eq!(grid.height(), 4);
        assert!(grid.is_traversable(Position::new(1, 2)));
        assert!(grid.is_wall(Position::new(1, 1)));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Grid::from_layout("%%%%\n%  \n%%%%\n").unwrap_err();
        assert!(matches!(err, FilterError::Configuration(msg) if msg.contains("row 1")));
    }

    #[test]
    fn rejects_empty_layout() {
        assert!(matches!(
            Grid::from_layout("\n\r\n"),
            Err(FilterError::Configuration(_))
        ));
    }

    #[test]
    fn space_rows_are_open_floor() {
        let grid = Grid::from_layout("%%%%%\n%...%\n     \n%...%\n%%%%%\n").expect("valid layout");
        assert_eq!(grid.height(), 5);
        assert_eq!(grid.width(), 5);
        for x in 0..5 {
            assert!(grid.is_traversable(Position::new(x, 2)));
        }
        assert!(grid.is_traversable(Position::new(1, 3)));
        assert!(grid.is_wall(Position::new(0, 1)));

        let corridor = Grid::from_layout("%%%%%\n     \n%%%%%\n").expect("valid layout");
        assert_eq!((corridor.width(), corridor.height()), (5, 3));
        assert_eq!(corridor.traversable_count(), 5);
    }

    #[test]
    fn layout_roundtrip_preserves_walls() {
        let grid = Grid::from_layout(CORRIDOR).unwrap();
        let again = Grid::from_layout(&grid.to_layout()).unwrap();
        assert_eq!(again, grid);
    }
}
