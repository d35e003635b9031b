//! Linear calculators: plain sums and weighted composites

use super::{clamp_percent, round_to, ScoreCalculator, ScoreResult, ScoredField, TierTable, LABEL_CATEGORY};
use crate::form::FormModel;

/// Rounding applied to the final percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// One decimal place (`72.5`)
    OneDecimal,
    /// Whole number (`79`)
    Whole,
}

impl Rounding {
    fn apply(self, value: f64) -> f64 {
        match self {
            Rounding::OneDecimal => round_to(value, 1),
            Rounding::Whole => value.round(),
        }
    }
}

/// Sum of rated fields against a fixed maximum
///
/// `total` is the raw sum, `percentage` is `total * 100 / max` to one decimal.
#[derive(Debug, Clone)]
pub struct LinearSum {
    pub fields: &'static [ScoredField],
    pub max: f64,
    pub category: Option<TierTable>,
}

impl ScoreCalculator for LinearSum {
    fn compute(&self, form: &FormModel) -> ScoreResult {
        let mut result = ScoreResult {
            max: self.max,
            ..ScoreResult::default()
        };

        for field in self.fields {
            let value = field.read(form);
            result.total += value;
            result.components.insert(field.label.to_string(), value);
        }

        result.percentage = if self.max > 0.0 {
            clamp_percent(round_to(result.total * 100.0 / self.max, 1))
        } else {
            0.0
        };

        if let Some(table) = &self.category {
            result
                .labels
                .insert(LABEL_CATEGORY.to_string(), table.classify(result.percentage).to_string());
        }
        result
    }
}

/// Weighted mean of fields normalized to 0-100
///
/// Each field is scaled as `value / field.max * 100`, multiplied by its
/// weight (weights sum to 1.0), and summed. `total` and `percentage` are the
/// same 0-100 value.
#[derive(Debug, Clone)]
pub struct WeightedComposite {
    pub fields: &'static [ScoredField],
    pub weights: &'static [f64],
    pub rounding: Rounding,
    pub category: Option<TierTable>,
}

impl ScoreCalculator for WeightedComposite {
    fn compute(&self, form: &FormModel) -> ScoreResult {
        let mut result = ScoreResult {
            max: 100.0,
            ..ScoreResult::default()
        };

        let mut score = 0.0;
        for (field, weight) in self.fields.iter().zip(self.weights) {
            let normalized = if field.max > 0.0 {
                field.read(form) / field.max * 100.0
            } else {
                0.0
            };
            score += normalized * weight;
            result
                .components
                .insert(field.label.to_string(), round_to(normalized, 1));
        }

        let score = clamp_percent(self.rounding.apply(score));
        result.total = score;
        result.percentage = score;

        if let Some(table) = &self.category {
            result
                .labels
                .insert(LABEL_CATEGORY.to_string(), table.classify(score).to_string());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::tiers::{INSTITUTIONAL_LEVELS, ULCI_LEVELS};

    const SLIDERS: &[ScoredField] = &[
        ScoredField::new("slider1", "engagement", 1.0, 5.0),
        ScoredField::new("slider2", "udl", 1.0, 5.0),
        ScoredField::new("slider3", "pedagogy", 1.0, 5.0),
    ];

    const SECTORS: &[ScoredField] = &[
        ScoredField::new("a", "a", 0.0, 100.0),
        ScoredField::new("b", "b", 0.0, 100.0),
    ];

    fn sum() -> LinearSum {
        LinearSum {
            fields: SLIDERS,
            max: 15.0,
            category: Some(ULCI_LEVELS),
        }
    }

    #[test]
    fn test_linear_sum_percentage() {
        let form = FormModel::new()
            .with("slider1", 5)
            .with("slider2", 4)
            .with("slider3", "3");
        let result = sum().compute(&form);
        assert_eq!(result.total, 12.0);
        assert_eq!(result.max, 15.0);
        assert_eq!(result.percentage, 80.0);
        assert_eq!(result.component("udl"), Some(4.0));
        assert_eq!(result.category(), Some("A - Ethical Contributor"));
    }

    #[test]
    fn test_linear_sum_missing_fields_count_zero() {
        let result = sum().compute(&FormModel::new().with("slider1", 5));
        assert_eq!(result.total, 5.0);
        assert_eq!(result.percentage, 33.3);
    }

    #[test]
    fn test_linear_sum_clamps_out_of_range() {
        let form = FormModel::new()
            .with("slider1", 50)
            .with("slider2", 50)
            .with("slider3", 50);
        let result = sum().compute(&form);
        assert_eq!(result.total, 15.0);
        assert_eq!(result.percentage, 100.0);
    }

    #[test]
    fn test_weighted_composite() {
        let calc = WeightedComposite {
            fields: SECTORS,
            weights: &[0.75, 0.25],
            rounding: Rounding::OneDecimal,
            category: Some(ULCI_LEVELS),
        };
        let result = calc.compute(&FormModel::new().with("a", 80).with("b", 41));
        assert_eq!(result.total, 70.3);
        assert_eq!(result.percentage, 70.3);
        assert_eq!(result.category(), Some("B - Active Citizen"));
    }

    #[test]
    fn test_weighted_composite_normalizes_small_scales() {
        const RATINGS: &[ScoredField] = &[
            ScoredField::new("r0", "r0", 1.0, 5.0),
            ScoredField::new("r1", "r1", 1.0, 5.0),
        ];
        let calc = WeightedComposite {
            fields: RATINGS,
            weights: &[0.5, 0.5],
            rounding: Rounding::OneDecimal,
            category: Some(INSTITUTIONAL_LEVELS),
        };
        let result = calc.compute(&FormModel::new().with("r0", 5).with("r1", 3));
        assert_eq!(result.component("r0"), Some(100.0));
        assert_eq!(result.component("r1"), Some(60.0));
        assert_eq!(result.percentage, 80.0);
        assert_eq!(result.category(), Some("Transformative"));
    }

    #[test]
    fn test_whole_rounding() {
        let calc = WeightedComposite {
            fields: SECTORS,
            weights: &[0.5, 0.5],
            rounding: Rounding::Whole,
            category: None,
        };
        let result = calc.compute(&FormModel::new().with("a", 80).with("b", 77));
        assert_eq!(result.percentage, 79.0);
        assert!(result.labels.is_empty());
    }
}
