//! Mentor 360 assessment

use chrono::{DateTime, Utc};
use serde_json::json;

use super::{text_or, ExportSpec, PageDefinition, PageKind, QrSpec};
use crate::export::{FileStamp, PageFormat};
use crate::form::FormModel;
use crate::preview::{Binding, PreviewTemplate, Source};
use crate::qr::{QrPayload, QrStyle, QR_SIZE_PX};
use crate::score::{
    MentorCalculator, ScoreResult, LABEL_CATEGORY, LABEL_PERFORMANCE, LABEL_RANKING, MENTOR_FIELDS,
};
use crate::storage::{keys, StorageKeys};
use crate::validation::RequiredField;

static CALCULATOR: MentorCalculator = MentorCalculator;

const REQUIRED: &[RequiredField] = &[RequiredField::new("mentorName", "Mentor name")];

fn overall(_: &FormModel, score: &ScoreResult) -> String {
    format!("{:.1}/5", score.component("overall").unwrap_or(0.0))
}

fn ulci_rounded(_: &FormModel, score: &ScoreResult) -> String {
    format!("{}", score.total.round())
}

fn ulci_out_of_100(_: &FormModel, score: &ScoreResult) -> String {
    format!("{}/100", score.total.round())
}

fn progress_pct(_: &FormModel, score: &ScoreResult) -> String {
    format!("{}%", score.percentage.round())
}

const BINDINGS: &[Binding] = &[
    Binding::new("displayName", Source::Text { key: "mentorName", fallback: "Mentor Name" }),
    Binding::new("displayInstitution", Source::Text { key: "institution", fallback: "Institution" }),
    Binding::new("displayUlcId", Source::Text { key: "ulcId", fallback: "-" }),
    Binding::new("displayUlpToken", Source::Text { key: "ulpToken", fallback: "-" }),
    Binding::new("profilePhotoDisplay", Source::Photo { glyph: "👤" }),
    Binding::new("signatureDisplay", Source::Signature { glyph: "Signature" }),
    Binding::new("overallScore", Source::Computed(overall)),
    Binding::new("ulciScore", Source::Computed(ulci_rounded)),
    Binding::new("ulciTotalScore", Source::Computed(ulci_out_of_100)),
    Binding::new("ulciEnvironment", Source::Component { name: "E_weighted", decimals: 1, suffix: "" }),
    Binding::new("ulciSocial", Source::Component { name: "S_weighted", decimals: 1, suffix: "" }),
    Binding::new("ulciCultural", Source::Component { name: "C_weighted", decimals: 1, suffix: "" }),
    Binding::new("ulciHealth", Source::Component { name: "H_weighted", decimals: 1, suffix: "" }),
    Binding::new("ulciInnovation", Source::Component { name: "I_weighted", decimals: 1, suffix: "" }),
    Binding::new("ulciCategory", Source::Label { name: LABEL_CATEGORY }),
    Binding::new("impactFactor", Source::Component { name: "impactFactor", decimals: 2, suffix: "" }),
    Binding::new("perfLevel", Source::Label { name: LABEL_PERFORMANCE }),
    Binding::new("globalRank", Source::Label { name: LABEL_RANKING }),
    Binding::new("progressPct", Source::Computed(progress_pct)),
    Binding::new("progressBar", Source::Progress),
    Binding::new("dim-facilitation", Source::Rating { key: "facilitation", suffix: "/5" }),
    Binding::new("dim-guidance", Source::Rating { key: "guidance", suffix: "/5" }),
    Binding::new("dim-innovation", Source::Rating { key: "innovation", suffix: "/5" }),
    Binding::new("dim-ethics", Source::Rating { key: "ethics", suffix: "/5" }),
    Binding::new("dim-community", Source::Rating { key: "community", suffix: "/5" }),
    Binding::new("dim-teachingMethods", Source::Rating { key: "teachingMethods", suffix: "/5" }),
    Binding::new("dim-strategy", Source::Rating { key: "strategy", suffix: "/5" }),
    Binding::new("dim-lessonPlan", Source::Rating { key: "lessonPlan", suffix: "/5" }),
    Binding::new("dim-ict", Source::Rating { key: "ict", suffix: "/5" }),
];

fn qr_payload(form: &FormModel, score: &ScoreResult, at: DateTime<Utc>) -> QrPayload {
    let sector = |name: &str| format!("{:.1}", score.component(name).unwrap_or(0.0));
    QrPayload::Json(json!({
        "mentorName": text_or(form, "mentorName", "Unknown"),
        "ulcId": text_or(form, "ulcId", "N/A"),
        "ulpToken": text_or(form, "ulpToken", "N/A"),
        "ulciScore": format!("{:.1}", score.total),
        "ulciBreakdown": {
            "environmental": sector("E"),
            "social": sector("S"),
            "cultural": sector("C"),
            "health": sector("H"),
            "innovation": sector("I"),
        },
        "institution": text_or(form, "institution", "N/A"),
        "issueDate": at.to_rfc3339(),
        "certificateType": "Education 5.0 Mentor Assessment",
    }))
}

pub(super) static PAGE: PageDefinition = PageDefinition {
    kind: PageKind::Mentor,
    title: "Mentor 360 Assessment",
    keys: StorageKeys {
        current: keys::MENTOR,
        history: None,
    },
    required: REQUIRED,
    identifiers: &[],
    generated: &[],
    fields: MENTOR_FIELDS,
    calculator: &CALCULATOR,
    preview: PreviewTemplate::new(BINDINGS),
    qr: QrSpec {
        target: "qrCodeContainer",
        style: QrStyle {
            size_px: QR_SIZE_PX,
            dark: "#000000",
            light: "#ffffff",
        },
        payload: qr_payload,
    },
    export: ExportSpec {
        target: "reportCard",
        artifact: "UHAN_360_Report",
        subject_field: "mentorName",
        fallback_subject: "Mentor",
        format: PageFormat::A4,
        stamp: FileStamp::Date,
    },
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn threes() -> FormModel {
        MENTOR_FIELDS
            .iter()
            .fold(FormModel::new().with("mentorName", "Kiran Das"), |f, s| f.with(s.key, 3))
    }

    #[test]
    fn test_preview_for_all_threes() {
        let form = threes();
        let preview = PAGE.preview.render(&form, &PAGE.score(&form));
        assert_eq!(preview.text("overallScore"), Some("3.0/5"));
        assert_eq!(preview.text("ulciScore"), Some("60"));
        assert_eq!(preview.text("ulciTotalScore"), Some("60/100"));
        assert_eq!(preview.text("ulciEnvironment"), Some("15.0"));
        assert_eq!(preview.text("impactFactor"), Some("1.80"));
        assert_eq!(preview.text("perfLevel"), Some("Satisfactory"));
        assert_eq!(preview.text("dim-ict"), Some("3/5"));
    }

    #[test]
    fn test_export_file_name() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        assert_eq!(
            PAGE.export.file_name(&threes(), at),
            "UHAN_360_Report_Kiran_Das_2026-10-16.pdf"
        );
        assert_eq!(
            PAGE.export.file_name(&FormModel::new(), at),
            "UHAN_360_Report_Mentor_2026-10-16.pdf"
        );
    }

    #[test]
    fn test_qr_breakdown() {
        let form = threes();
        let QrPayload::Json(value) = qr_payload(&form, &PAGE.score(&form), Utc::now()) else {
            panic!("expected JSON payload");
        };
        assert_eq!(value["ulciScore"], "60.0");
        assert_eq!(value["ulciBreakdown"]["health"], "60.0");
        assert_eq!(value["ulpToken"], "N/A");
    }
}
