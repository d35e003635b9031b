//! UEITI institutional assessment: eight weighted 1-5 dimensions

use chrono::{DateTime, Utc};
use serde_json::json;

use super::ulci_card::ULCI_WEIGHTS;
use super::{text_or, ExportSpec, PageDefinition, PageKind, QrSpec};
use crate::export::{FileStamp, PageFormat};
use crate::form::{format_number, FormModel};
use crate::preview::{Binding, PreviewTemplate, Source, PLACEHOLDER_DASH};
use crate::qr::{QrPayload, QrStyle, QR_SIZE_PX};
use crate::score::tiers::{INSTITUTIONAL_LEVELS, ULCI_LEVELS};
use crate::score::{
    Rounding, ScoreCalculator, ScoreResult, ScoredField, WeightedComposite, LABEL_CATEGORY,
};
use crate::storage::{keys, StorageKeys};
use crate::validation::RequiredField;

const FIELDS: &[ScoredField] = &[
    ScoredField::new("governance", "governance", 1.0, 5.0),
    ScoredField::new("learningDesign", "learningDesign", 1.0, 5.0),
    ScoredField::new("facilitatorDevelopment", "facilitatorDevelopment", 1.0, 5.0),
    ScoredField::new("learnerEcosystem", "learnerEcosystem", 1.0, 5.0),
    ScoredField::new("techInfrastructure", "techInfrastructure", 1.0, 5.0),
    ScoredField::new("sustainability", "sustainability", 1.0, 5.0),
    ScoredField::new("innovation", "innovation", 1.0, 5.0),
    ScoredField::new("learningEnvironment", "learningEnvironment", 1.0, 5.0),
];

const WEIGHTS: &[f64] = &[0.15, 0.15, 0.15, 0.10, 0.15, 0.15, 0.10, 0.05];

static CALCULATOR: WeightedComposite = WeightedComposite {
    fields: FIELDS,
    weights: WEIGHTS,
    rounding: Rounding::OneDecimal,
    category: Some(INSTITUTIONAL_LEVELS),
};

/// The institution's own ULCI sector inputs, shown beside the main score
const ULCI_FIELDS: &[ScoredField] = &[
    ScoredField::new("ulciE", "E", 0.0, 100.0),
    ScoredField::new("ulciS", "S", 0.0, 100.0),
    ScoredField::new("ulciC", "C", 0.0, 100.0),
    ScoredField::new("ulciH", "H", 0.0, 100.0),
    ScoredField::new("ulciI", "I", 0.0, 100.0),
];

static ULCI: WeightedComposite = WeightedComposite {
    fields: ULCI_FIELDS,
    weights: ULCI_WEIGHTS,
    rounding: Rounding::OneDecimal,
    category: Some(ULCI_LEVELS),
};

const REQUIRED: &[RequiredField] = &[
    RequiredField::new("instituteName", "Institute name"),
    RequiredField::new("tokenId", "Token ID"),
    RequiredField::new("ulciId", "ULCI ID"),
    RequiredField::new("instituteEmail", "Email"),
    RequiredField::new("phoneNumber", "Phone number"),
    RequiredField::new("totalStaff", "Total staff"),
];

fn institutional_score(_: &FormModel, score: &ScoreResult) -> String {
    format!("{:.1}", score.total)
}

fn ulci_total(form: &FormModel, _: &ScoreResult) -> String {
    format!("{:.1}", ULCI.compute(form).total)
}

fn ulci_level(form: &FormModel, _: &ScoreResult) -> String {
    ULCI.compute(form)
        .category()
        .unwrap_or(ULCI_LEVELS.bottom())
        .to_string()
}

const BINDINGS: &[Binding] = &[
    Binding::new("pv-instituteName", Source::Text { key: "instituteName", fallback: "Institution Name" }),
    Binding::new("pv-tokenId", Source::Text { key: "tokenId", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-ulciId", Source::Text { key: "ulciId", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-email", Source::Text { key: "instituteEmail", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-phone", Source::Text { key: "phoneNumber", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-website", Source::Text { key: "website", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-address", Source::Text { key: "address", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-staff", Source::Text { key: "totalStaff", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-region", Source::Text { key: "region", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-cycle", Source::Text { key: "assessmentCycle", fallback: PLACEHOLDER_DASH }),
    Binding::new("dim-governance", Source::Rating { key: "governance", suffix: "/5" }),
    Binding::new("dim-learningDesign", Source::Rating { key: "learningDesign", suffix: "/5" }),
    Binding::new("dim-facilitatorDevelopment", Source::Rating { key: "facilitatorDevelopment", suffix: "/5" }),
    Binding::new("dim-learnerEcosystem", Source::Rating { key: "learnerEcosystem", suffix: "/5" }),
    Binding::new("dim-techInfrastructure", Source::Rating { key: "techInfrastructure", suffix: "/5" }),
    Binding::new("dim-sustainability", Source::Rating { key: "sustainability", suffix: "/5" }),
    Binding::new("dim-innovation", Source::Rating { key: "innovation", suffix: "/5" }),
    Binding::new("dim-learningEnvironment", Source::Rating { key: "learningEnvironment", suffix: "/5" }),
    Binding::new("institutionalScore", Source::Computed(institutional_score)),
    Binding::new("institutionalLevel", Source::Label { name: LABEL_CATEGORY }),
    Binding::new("institutionalGauge", Source::Progress),
    Binding::new("ulciTotal", Source::Computed(ulci_total)),
    Binding::new("ulciLevel", Source::Computed(ulci_level)),
    Binding::new("pv-strengths", Source::Text { key: "strengths", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-improvements", Source::Text { key: "improvements", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-innovations", Source::Text { key: "innovations", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-contribution", Source::Text { key: "contribution", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-validator", Source::Text { key: "validatorName", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-verification", Source::Text { key: "verificationStatus", fallback: "Pending" }),
];

fn qr_payload(form: &FormModel, score: &ScoreResult, at: DateTime<Utc>) -> QrPayload {
    QrPayload::Json(json!({
        "institute": text_or(form, "instituteName", "Institution"),
        "tokenId": text_or(form, "tokenId", "N/A"),
        "ulciId": text_or(form, "ulciId", "N/A"),
        "score": format_number(score.total),
        "level": score.category().unwrap_or(INSTITUTIONAL_LEVELS.bottom()),
        "timestamp": at.to_rfc3339(),
    }))
}

pub(super) static PAGE: PageDefinition = PageDefinition {
    kind: PageKind::Ueiti,
    title: "UEITI Institutional Assessment",
    keys: StorageKeys {
        current: keys::UEITI,
        history: None,
    },
    required: REQUIRED,
    identifiers: &[],
    generated: &[],
    fields: FIELDS,
    calculator: &CALCULATOR,
    preview: PreviewTemplate::new(BINDINGS),
    qr: QrSpec {
        target: "pv-qr",
        style: QrStyle {
            size_px: QR_SIZE_PX,
            dark: "#000000",
            light: "#ffffff",
        },
        payload: qr_payload,
    },
    export: ExportSpec {
        target: "previewFrame",
        artifact: "UEITI_Report",
        subject_field: "instituteName",
        fallback_subject: "Institute",
        format: PageFormat::A4,
        stamp: FileStamp::Date,
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    fn all(rating: i32) -> FormModel {
        FIELDS.iter().fold(FormModel::new(), |f, s| f.with(s.key, rating))
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum: f64 = WEIGHTS.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(WEIGHTS.len(), FIELDS.len());
    }

    #[test]
    fn test_uniform_ratings() {
        assert_eq!(PAGE.score(&all(5)).percentage, 100.0);
        assert_eq!(PAGE.score(&all(5)).category(), Some("Transformative"));
        assert_eq!(PAGE.score(&all(3)).percentage, 60.0);
        assert_eq!(PAGE.score(&all(3)).category(), Some("Progressive"));
        assert_eq!(PAGE.score(&all(1)).category(), Some("Emerging"));
    }

    #[test]
    fn test_mixed_ratings() {
        // 5s on the 15% dimensions, 1s on the rest:
        // 5 * 15 + (20 * 10 + 20 * 10 + 20 * 5) / 100 = 75 + 5
        let form = all(1)
            .with("governance", 5)
            .with("learningDesign", 5)
            .with("facilitatorDevelopment", 5)
            .with("techInfrastructure", 5)
            .with("sustainability", 5);
        assert_eq!(PAGE.score(&form).percentage, 80.0);
    }

    #[test]
    fn test_ulci_side_panel() {
        let form = all(4)
            .with("ulciE", 100)
            .with("ulciS", 100)
            .with("ulciC", 100)
            .with("ulciH", 100)
            .with("ulciI", 100);
        let preview = PAGE.preview.render(&form, &PAGE.score(&form));
        assert_eq!(preview.text("ulciTotal"), Some("100.0"));
        assert_eq!(preview.text("ulciLevel"), Some("A+ Regenerative Leader"));
        assert_eq!(preview.text("institutionalScore"), Some("80.0"));
        assert_eq!(preview.text("dim-innovation"), Some("4/5"));
    }
}
