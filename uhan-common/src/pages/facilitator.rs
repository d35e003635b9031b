//! Facilitator assessment: five 1-5 ratings summed out of 25

use chrono::{DateTime, Utc};
use serde_json::json;

use super::{text_or, ExportSpec, PageDefinition, PageKind, QrSpec};
use crate::export::{FileStamp, PageFormat};
use crate::form::{format_number, FormModel};
use crate::preview::{Binding, PreviewTemplate, Source};
use crate::qr::{QrPayload, QrStyle, QR_SIZE_PX};
use crate::score::tiers::ULCI_LEVELS;
use crate::score::{LinearSum, ScoreResult, ScoredField, LABEL_CATEGORY};
use crate::storage::{keys, StorageKeys};
use crate::time::date_stamp;
use crate::validation::{IdentifierRule, RequiredField};

const FIELDS: &[ScoredField] = &[
    ScoredField::new("slider1", "engagement", 1.0, 5.0),
    ScoredField::new("slider2", "udl", 1.0, 5.0),
    ScoredField::new("slider3", "pedagogy", 1.0, 5.0),
    ScoredField::new("slider4", "feedback", 1.0, 5.0),
    ScoredField::new("slider5", "ethics", 1.0, 5.0),
];

static CALCULATOR: LinearSum = LinearSum {
    fields: FIELDS,
    max: 25.0,
    category: Some(ULCI_LEVELS),
};

const REQUIRED: &[RequiredField] = &[
    RequiredField::new("name", "Name"),
    RequiredField::new("uhanId", "UHAN ID"),
    RequiredField::new("email", "Email"),
];

fn total_score(_: &FormModel, score: &ScoreResult) -> String {
    format!("{}/{}", format_number(score.total), format_number(score.max))
}

fn report_total(_: &FormModel, score: &ScoreResult) -> String {
    format!(
        "{}/{} ({:.1}%)",
        format_number(score.total),
        format_number(score.max),
        score.percentage
    )
}

fn formula_detail(_: &FormModel, score: &ScoreResult) -> String {
    let part = |letter: &str, title: &str, name: &str| {
        format!(
            "{} = {} ({})",
            letter,
            title,
            format_number(score.component(name).unwrap_or(0.0))
        )
    };
    [
        part("E", "Engagement", "engagement"),
        part("S", "UDL", "udl"),
        part("C", "Pedagogy", "pedagogy"),
        part("H", "Feedback", "feedback"),
        part("I", "Ethics", "ethics"),
    ]
    .join(" | ")
}

fn formula_result(_: &FormModel, score: &ScoreResult) -> String {
    format!(
        "Total Score: {}/{} = {:.1}%",
        format_number(score.total),
        format_number(score.max),
        score.percentage
    )
}

const BINDINGS: &[Binding] = &[
    Binding::new("reportName", Source::Text { key: "name", fallback: "Facilitator Name" }),
    Binding::new("reportInst", Source::Text { key: "institution", fallback: "Institution" }),
    Binding::new("reportUhan", Source::Text { key: "uhanId", fallback: "N/A" }),
    Binding::new("reportUlp", Source::Text { key: "ulpId", fallback: "N/A" }),
    Binding::new("reportUlci", Source::Text { key: "ulciId", fallback: "N/A" }),
    Binding::new("reportEmail", Source::Text { key: "email", fallback: "N/A" }),
    Binding::new("reportContact", Source::Text { key: "contact", fallback: "N/A" }),
    Binding::new("reportComments", Source::Text { key: "comments", fallback: "No comments provided." }),
    Binding::new("reportPhoto", Source::Photo { glyph: "📷" }),
    Binding::new("reportSignature", Source::Signature { glyph: "-" }),
    Binding::new("r1", Source::Rating { key: "slider1", suffix: "/5" }),
    Binding::new("r2", Source::Rating { key: "slider2", suffix: "/5" }),
    Binding::new("r3", Source::Rating { key: "slider3", suffix: "/5" }),
    Binding::new("r4", Source::Rating { key: "slider4", suffix: "/5" }),
    Binding::new("r5", Source::Rating { key: "slider5", suffix: "/5" }),
    Binding::new("totalScore", Source::Computed(total_score)),
    Binding::new("percentage", Source::Percentage { decimals: 1, suffix: "%" }),
    Binding::new("reportTotal", Source::Computed(report_total)),
    Binding::new("formulaDetail", Source::Computed(formula_detail)),
    Binding::new("formulaResult", Source::Computed(formula_result)),
    Binding::new("gaugeValue", Source::Percentage { decimals: 1, suffix: "%" }),
    Binding::new("gauge", Source::Progress),
    Binding::new("ulciLevel", Source::Label { name: LABEL_CATEGORY }),
];

fn qr_payload(form: &FormModel, score: &ScoreResult, at: DateTime<Utc>) -> QrPayload {
    QrPayload::Json(json!({
        "name": text_or(form, "name", "Facilitator"),
        "uhanId": text_or(form, "uhanId", "UHAN-ID"),
        "ulciScore": score.total,
        "percentage": format!("{:.1}", score.percentage),
        "date": date_stamp(at),
        "timestamp": at.to_rfc3339(),
    }))
}

pub(super) static PAGE: PageDefinition = PageDefinition {
    kind: PageKind::Facilitator,
    title: "Facilitator Assessment",
    keys: StorageKeys {
        current: keys::FACILITATOR,
        history: None,
    },
    required: REQUIRED,
    identifiers: &[IdentifierRule::ulp("ulpId", "ULP ID")],
    generated: &[],
    fields: FIELDS,
    calculator: &CALCULATOR,
    preview: PreviewTemplate::new(BINDINGS),
    qr: QrSpec {
        target: "qrcode",
        style: QrStyle {
            size_px: QR_SIZE_PX,
            dark: "#667eea",
            light: "#ffffff",
        },
        payload: qr_payload,
    },
    export: ExportSpec {
        target: "reportCard",
        artifact: "UHAN_Facilitator_Report",
        subject_field: "name",
        fallback_subject: "Facilitator",
        format: PageFormat::A4,
        stamp: FileStamp::Date,
    },
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> FormModel {
        FormModel::new()
            .with("name", "Asha Rao")
            .with("uhanId", "UHAN-2024-001")
            .with("email", "asha@example.org")
            .with("slider1", 4)
            .with("slider2", 3)
            .with("slider3", 5)
            .with("slider4", 2)
            .with("slider5", 4)
    }

    #[test]
    fn test_sample_scores_72_percent() {
        let score = PAGE.score(&sample());
        assert_eq!(score.total, 18.0);
        assert_eq!(score.percentage, 72.0);
        assert_eq!(score.category(), Some("B - Active Citizen"));
    }

    #[test]
    fn test_preview_lines() {
        let form = sample();
        let preview = PAGE.preview.render(&form, &PAGE.score(&form));
        assert_eq!(preview.text("totalScore"), Some("18/25"));
        assert_eq!(preview.text("percentage"), Some("72.0%"));
        assert_eq!(preview.text("reportTotal"), Some("18/25 (72.0%)"));
        assert_eq!(
            preview.text("formulaDetail"),
            Some("E = Engagement (4) | S = UDL (3) | C = Pedagogy (5) | H = Feedback (2) | I = Ethics (4)")
        );
        assert_eq!(preview.text("reportInst"), Some("Institution"));
    }

    #[test]
    fn test_qr_payload_fields() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap();
        let form = sample();
        let QrPayload::Json(value) = qr_payload(&form, &PAGE.score(&form), at) else {
            panic!("expected JSON payload");
        };
        assert_eq!(value["name"], "Asha Rao");
        assert_eq!(value["ulciScore"], 18.0);
        assert_eq!(value["percentage"], "72.0");
        assert_eq!(value["date"], "2026-10-16");
    }

    #[test]
    fn test_extremes() {
        let low = FIELDS.iter().fold(FormModel::new(), |f, s| f.with(s.key, 1));
        let high = FIELDS.iter().fold(FormModel::new(), |f, s| f.with(s.key, 5));
        assert_eq!(PAGE.score(&low).category(), Some(ULCI_LEVELS.bottom()));
        assert_eq!(PAGE.score(&high).category(), Some(ULCI_LEVELS.top()));
    }
}
