//! Mentor 360 calculator
//!
//! Nine 1-5 sliders are folded into the five ULCI sectors, each normalized to
//! 0-100, then weighted 25/20/15/20/20. The plain slider average drives the
//! performance level and the impact factor.

use super::tiers::{MENTOR_CATEGORIES, MENTOR_PERFORMANCE, MENTOR_RANKING};
use super::{
    clamp_percent, round_to, ScoreCalculator, ScoreResult, ScoredField, LABEL_CATEGORY,
    LABEL_PERFORMANCE, LABEL_RANKING,
};
use crate::form::FormModel;

pub const MENTOR_FIELDS: &[ScoredField] = &[
    ScoredField::new("facilitation", "facilitation", 1.0, 5.0),
    ScoredField::new("guidance", "guidance", 1.0, 5.0),
    ScoredField::new("innovation", "innovation", 1.0, 5.0),
    ScoredField::new("ethics", "ethics", 1.0, 5.0),
    ScoredField::new("community", "community", 1.0, 5.0),
    ScoredField::new("teachingMethods", "teachingMethods", 1.0, 5.0),
    ScoredField::new("strategy", "strategy", 1.0, 5.0),
    ScoredField::new("lessonPlan", "lessonPlan", 1.0, 5.0),
    ScoredField::new("ict", "ict", 1.0, 5.0),
];

const SECTOR_WEIGHTS: [(&str, f64); 5] = [("E", 0.25), ("S", 0.20), ("C", 0.15), ("H", 0.20), ("I", 0.20)];

#[derive(Debug, Clone, Copy, Default)]
pub struct MentorCalculator;

impl MentorCalculator {
    fn slider(form: &FormModel, key: &str) -> f64 {
        MENTOR_FIELDS
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.read(form))
            .unwrap_or(0.0)
    }
}

fn normalize(mean: f64) -> f64 {
    mean / 5.0 * 100.0
}

impl ScoreCalculator for MentorCalculator {
    fn compute(&self, form: &FormModel) -> ScoreResult {
        let v = |key: &str| Self::slider(form, key);

        let sectors = [
            normalize((v("community") + v("ict")) / 2.0),
            normalize((v("community") + v("guidance")) / 2.0),
            normalize((v("teachingMethods") + v("strategy") + v("lessonPlan") + v("facilitation")) / 4.0),
            normalize((v("guidance") + v("ethics")) / 2.0),
            normalize((v("innovation") + v("ethics")) / 2.0),
        ];

        let mut result = ScoreResult {
            max: 100.0,
            ..ScoreResult::default()
        };

        let mut ulci = 0.0;
        for ((name, weight), sector) in SECTOR_WEIGHTS.iter().zip(sectors) {
            ulci += sector * weight;
            result.components.insert(name.to_string(), round_to(sector, 1));
            result
                .components
                .insert(format!("{}_weighted", name), round_to(sector * weight, 1));
        }
        let ulci = clamp_percent(round_to(ulci, 1));

        let sum: f64 = MENTOR_FIELDS.iter().map(|f| f.read(form)).sum();
        let overall = round_to(sum / MENTOR_FIELDS.len() as f64, 1);
        let impact = round_to(overall * ulci / 100.0, 2);

        result.components.insert("overall".to_string(), overall);
        result.components.insert("impactFactor".to_string(), impact);
        result.total = ulci;
        result.percentage = ulci;

        result
            .labels
            .insert(LABEL_CATEGORY.to_string(), MENTOR_CATEGORIES.classify(ulci).to_string());
        result
            .labels
            .insert(LABEL_PERFORMANCE.to_string(), MENTOR_PERFORMANCE.classify(overall).to_string());
        result
            .labels
            .insert(LABEL_RANKING.to_string(), MENTOR_RANKING.classify(ulci).to_string());
        result
    }
}
