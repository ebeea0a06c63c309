use ghost_core::{Belief, Position};

/// Read-only view over a [`Belief`] with a confidence threshold.
#[derive(Debug, Clone, Copy)]
pub struct BeliefView<'a> {
    belief: &'a Belief,
    confidence: f64,
}

impl<'a> BeliefView<'a> {
    pub fn new(belief: &'a Belief, confidence: f64) -> Self {
        Self { belief, confidence }
    }

    pub fn belief(&self) -> &'a Belief {
        self.belief
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn most_likely(&self) -> Position {
        self.belief.argmax()
    }

    /// The argmax cell, but only when its mass reaches the threshold.
    pub fn confident_position(&self) -> Option<Position> {
        (self.belief.peak() >= self.confidence).then(|| self.belief.argmax())
    }

    pub fn mass_near(&self, center: Position, radius: usize) -> f64 {
        self.belief.mass_within(center, radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghost_core::Grid;

    #[test]
    fn confidence_gates_position() {
        let grid = Grid::open(3, 3).unwrap();
        let point = Belief::point(&grid, Position::new(2, 1)).unwrap();
        let uniform = Belief::uniform(&grid);

        let sharp = BeliefView::new(&point, 0.5);
        assert_eq!(sharp.most_likely(), Position::new(2, 1));
        assert_eq!(sharp.confident_position(), Some(Position::new(2, 1)));

        let flat = BeliefView::new(&uniform, 0.5);
        assert_eq!(flat.confident_position(), None);
        assert!((flat.mass_near(Position::new(1, 1), 1) - 5.0 / 9.0).abs() < 1e-12);
    }
}
