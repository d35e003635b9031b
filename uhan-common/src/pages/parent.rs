//! Parent / family engagement (FEI)

use chrono::{DateTime, Utc};
use serde_json::json;

use super::{text_or, ExportSpec, PageDefinition, PageKind, QrSpec};
use crate::export::{FileStamp, PageFormat};
use crate::form::{format_number, FormModel};
use crate::preview::{Binding, PreviewTemplate, Source, PLACEHOLDER_DASH};
use crate::qr::{QrPayload, QrStyle, QR_SIZE_PX};
use crate::score::{LinearSum, ScoreResult, ScoredField};
use crate::storage::{keys, StorageKeys};
use crate::time::date_stamp;
use crate::validation::{IdentifierRule, RequiredField};

const FIELDS: &[ScoredField] = &[
    ScoredField::new("emotionalSupport", "emotionalSupport", 0.0, 4.0),
    ScoredField::new("communication", "communication", 0.0, 4.0),
    ScoredField::new("environment", "environment", 0.0, 4.0),
    ScoredField::new("ethics", "ethics", 0.0, 4.0),
];

static CALCULATOR: LinearSum = LinearSum {
    fields: FIELDS,
    max: 16.0,
    category: None,
};

const REQUIRED: &[RequiredField] = &[RequiredField::new("ulpID", "Family / ULP ID")];

fn fei(_: &FormModel, score: &ScoreResult) -> String {
    format_number(score.percentage)
}

const BINDINGS: &[Binding] = &[
    Binding::new("pv-parent", Source::Text { key: "parentName", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-ulp", Source::Text { key: "ulpID", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-learners", Source::Text { key: "linkedLearners", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-hub", Source::Text { key: "communityHub", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-emotional", Source::Rating { key: "emotionalSupport", suffix: "" }),
    Binding::new("pv-communication", Source::Rating { key: "communication", suffix: "" }),
    Binding::new("pv-environment", Source::Rating { key: "environment", suffix: "" }),
    Binding::new("pv-ethics", Source::Rating { key: "ethics", suffix: "" }),
    Binding::new("pv-fei", Source::Computed(fei)),
    Binding::new("feiScore", Source::Computed(fei)),
    Binding::new("pv-parentRef", Source::Text { key: "parentReflection", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-mentorRef", Source::Text { key: "mentorFeedback", fallback: PLACEHOLDER_DASH }),
    Binding::new("pv-learnerRef", Source::Text { key: "learnerFeedback", fallback: PLACEHOLDER_DASH }),
];

fn qr_payload(form: &FormModel, score: &ScoreResult, at: DateTime<Utc>) -> QrPayload {
    QrPayload::Json(json!({
        "ulpID": text_or(form, "ulpID", "N/A"),
        "parentName": text_or(form, "parentName", "Parent"),
        "fei": score.percentage,
        "date": date_stamp(at),
    }))
}

pub(super) static PAGE: PageDefinition = PageDefinition {
    kind: PageKind::Parent,
    title: "Parent Assessment (FEI)",
    keys: StorageKeys {
        current: keys::PARENT,
        history: None,
    },
    required: REQUIRED,
    identifiers: &[IdentifierRule::ulp("ulpID", "Family / ULP ID")],
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
        target: "preview",
        artifact: "UHA_Parents",
        subject_field: "parentName",
        fallback_subject: "Parent",
        format: PageFormat::FitToImage,
        stamp: FileStamp::Date,
    },
};
