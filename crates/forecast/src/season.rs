//! Seasonal calendar and demand multipliers.

use serde::{Deserialize, Serialize};

/// Climate season used as a demand signal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    /// December to February.
    Winter,
    /// March to May.
    Summer,
    /// June to September.
    Monsoon,
    /// October and November (dengue/malaria aftermath).
    PostMonsoon,
}

/// Demand multiplier per season.
pub const SEASONAL_MULTIPLIERS: [(Season, f64); 4] = [
    (Season::Winter, 1.0),
    (Season::Summer, 0.9),
    (Season::Monsoon, 1.3),
    (Season::PostMonsoon, 1.8),
];

impl Season {
    /// Season for a calendar month (1-12). Out-of-range months fall back to Winter.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Summer,
            6..=9 => Season::Monsoon,
            10 | 11 => Season::PostMonsoon,
            _ => Season::Winter,
        }
    }

    pub fn multiplier(&self) -> f64 {
        SEASONAL_MULTIPLIERS
            .iter()
            .find(|(s, _)| s == self)
            .map(|(_, m)| *m)
            .unwrap_or(1.0)
    }

    /// Monsoon and its aftermath carry elevated vector-borne disease load.
    pub fn is_wet(&self) -> bool {
        matches!(self, Season::Monsoon | Season::PostMonsoon)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Summer => "Summer",
            Season::Monsoon => "Monsoon",
            Season::PostMonsoon => "Post-Monsoon",
        }
    }
}

impl core::fmt::Display for Season {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn months_map_to_seasons() {
        let expected = [
            (1, Season::Winter),
            (2, Season::Winter),
            (3, Season::Summer),
            (5, Season::Summer),
            (6, Season::Monsoon),
            (9, Season::Monsoon),
            (10, Season::PostMonsoon),
            (11, Season::PostMonsoon),
            (12, Season::Winter),
        ];
        for (month, season) in expected {
            assert_eq!(Season::from_month(month), season, "month {month}");
        }
    }

    #[test]
    fn multipliers_match_table() {
        assert_eq!(Season::Winter.multiplier(), 1.0);
        assert_eq!(Season::Summer.multiplier(), 0.9);
        assert_eq!(Season::Monsoon.multiplier(), 1.3);
        assert_eq!(Season::PostMonsoon.multiplier(), 1.8);
    }
}
