//! Threshold tables mapping a score to a category label

/// Ordered `(minimum, label)` tiers with a fallback label
///
/// Tiers are checked top-down and the first one with `score >= minimum` wins,
/// so the table must be sorted by descending minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierTable {
    tiers: &'static [(f64, &'static str)],
    default: &'static str,
}

impl TierTable {
    pub const fn new(tiers: &'static [(f64, &'static str)], default: &'static str) -> Self {
        Self { tiers, default }
    }

    pub fn classify(&self, score: f64) -> &'static str {
        self.tiers
            .iter()
            .find(|(minimum, _)| score >= *minimum)
            .map(|(_, label)| *label)
            .unwrap_or(self.default)
    }

    /// Highest-ranked label
    pub fn top(&self) -> &'static str {
        self.tiers.first().map(|(_, label)| *label).unwrap_or(self.default)
    }

    /// Lowest-ranked label (the fallback)
    pub fn bottom(&self) -> &'static str {
        self.default
    }
}

/// ULCI contributor level, shared by the facilitator, ULCI card and ULP pages
pub const ULCI_LEVELS: TierTable = TierTable::new(
    &[
        (90.0, "A+ Regenerative Leader"),
        (80.0, "A - Ethical Contributor"),
        (70.0, "B - Active Citizen"),
        (50.0, "C - Developing Contributor"),
    ],
    "D - Needs Support",
);

pub const MENTOR_CATEGORIES: TierTable = TierTable::new(
    &[
        (85.0, "Elite Regenerative Contributor"),
        (70.0, "High Regenerative Contributor"),
        (55.0, "Competent Contributor"),
        (40.0, "Developing Contributor"),
    ],
    "Emerging Contributor",
);

/// Mentor performance on the 1-5 overall average
pub const MENTOR_PERFORMANCE: TierTable = TierTable::new(
    &[
        (4.5, "Exemplary"),
        (4.0, "Proficient"),
        (3.5, "Competent"),
        (3.0, "Satisfactory"),
    ],
    "Developing",
);

pub const MENTOR_RANKING: TierTable = TierTable::new(
    &[
        (90.0, "Top 1%"),
        (80.0, "Top 5%"),
        (70.0, "Top 10%"),
        (60.0, "Top 25%"),
        (50.0, "Top 50%"),
    ],
    "Average",
);

pub const INSTITUTIONAL_LEVELS: TierTable = TierTable::new(
    &[(80.0, "Transformative"), (60.0, "Progressive")],
    "Emerging",
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_bound_is_inclusive() {
        assert_eq!(ULCI_LEVELS.classify(70.0), "B - Active Citizen");
        assert_eq!(ULCI_LEVELS.classify(69.9), "C - Developing Contributor");
        assert_eq!(ULCI_LEVELS.classify(90.0), "A+ Regenerative Leader");
    }

    #[test]
    fn test_default_below_every_tier() {
        assert_eq!(ULCI_LEVELS.classify(49.9), "D - Needs Support");
        assert_eq!(ULCI_LEVELS.classify(0.0), ULCI_LEVELS.bottom());
        assert_eq!(MENTOR_RANKING.classify(12.0), "Average");
    }

    #[test]
    fn test_performance_levels() {
        assert_eq!(MENTOR_PERFORMANCE.classify(4.5), "Exemplary");
        assert_eq!(MENTOR_PERFORMANCE.classify(3.2), "Satisfactory");
        assert_eq!(MENTOR_PERFORMANCE.classify(2.9), "Developing");
    }

    #[test]
    fn test_top_label() {
        assert_eq!(MENTOR_CATEGORIES.top(), "Elite Regenerative Contributor");
        assert_eq!(INSTITUTIONAL_LEVELS.classify(80.0), INSTITUTIONAL_LEVELS.top());
    }
}
