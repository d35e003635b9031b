//! Score calculators
//!
//! Every page turns a handful of rated fields into one composite score using
//! fixed weights. Calculators are pure: the same `FormModel` always yields the
//! same `ScoreResult`, out-of-range input is clamped rather than rejected, and
//! missing or non-numeric fields count as zero.

mod composite;
mod mentor;
pub mod tiers;

pub use composite::{LinearSum, Rounding, WeightedComposite};
pub use mentor::{MentorCalculator, MENTOR_FIELDS};
pub use tiers::TierTable;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::form::FormModel;

/// Label key for the main classification of a score
pub const LABEL_CATEGORY: &str = "category";
/// Label key for the mentor performance level
pub const LABEL_PERFORMANCE: &str = "performance";
/// Label key for the mentor global ranking
pub const LABEL_RANKING: &str = "ranking";

/// Output of a calculator
///
/// `percentage` is always within `[0, 100]`. `components` holds the named
/// intermediate values a preview shows next to the total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub components: BTreeMap<String, f64>,
    pub total: f64,
    pub max: f64,
    pub percentage: f64,
    pub labels: BTreeMap<String, String>,
}

impl ScoreResult {
    pub fn component(&self, name: &str) -> Option<f64> {
        self.components.get(name).copied()
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    /// Shorthand for the [`LABEL_CATEGORY`] label
    pub fn category(&self) -> Option<&str> {
        self.label(LABEL_CATEGORY)
    }
}

/// Pure `FormModel -> ScoreResult` function
pub trait ScoreCalculator: Send + Sync {
    fn compute(&self, form: &FormModel) -> ScoreResult;
}

/// One rated input of a calculator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredField {
    /// Form field id
    pub key: &'static str,
    /// Component name in the `ScoreResult`
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
}

impl ScoredField {
    pub const fn new(key: &'static str, label: &'static str, min: f64, max: f64) -> Self {
        Self { key, label, min, max }
    }

    /// Field value clamped to `[min, max]`; missing or non-numeric reads as 0
    pub fn read(&self, form: &FormModel) -> f64 {
        form.number(self.key)
            .map(|v| v.clamp(self.min, self.max))
            .unwrap_or(0.0)
    }
}

/// Round to `places` decimals
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub(crate) fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scored_field_clamps_and_defaults() {
        let field = ScoredField::new("slider1", "engagement", 1.0, 5.0);
        let form = FormModel::new().with("slider1", 9);
        assert_eq!(field.read(&form), 5.0);

        let form = FormModel::new().with("slider1", -3);
        assert_eq!(field.read(&form), 1.0);

        let form = FormModel::new().with("slider1", "abc");
        assert_eq!(field.read(&form), 0.0);
        assert_eq!(field.read(&FormModel::new()), 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(100.6, 0), 101.0);
        assert_eq!(round_to(0.456, 2), 0.46);
        assert_eq!(round_to(72.04, 1), 72.0);
    }
}
