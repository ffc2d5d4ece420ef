use analysis_core::{Direction, Ordered, RubricBand, RubricTable};

/// A points table for one indicator, kept in scan order.
#[derive(Debug, Clone, PartialEq)]
pub struct Rubric {
    direction: Direction,
    bands: Ordered<RubricBand>,
}

impl Rubric {
    /// Higher-is-better tables are scanned from the largest threshold down,
    /// lower-is-better tables from the smallest up.
    pub fn from_table(table: &RubricTable) -> Self {
        let descending = table.direction == Direction::HigherIsBetter;
        Self {
            direction: table.direction,
            bands: Ordered::sorted_by_key(table.bands.clone(), descending, |b| b.threshold),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Points of the first band whose threshold the value strictly passes.
    /// A value that passes none scores 0.
    pub fn score(&self, value: f64) -> f64 {
        let hit = match self.direction {
            Direction::HigherIsBetter => self.bands.first_match(|b| value > b.threshold),
            Direction::LowerIsBetter => self.bands.first_match(|b| value < b.threshold),
        };
        hit.map(|b| b.points).unwrap_or(0.0)
    }
}
