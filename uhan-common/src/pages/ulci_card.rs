//! ULCI report card: five 0-100 sector scores, weighted
//!
//! Keeps a save history. A new card gets ULCI and ULP ids derived from the
//! clock when it opens.

use chrono::{DateTime, Utc};

use super::{text_or, ExportSpec, GeneratedField, PageDefinition, PageKind, QrSpec};
use crate::export::{FileStamp, PageFormat};
use crate::form::{format_number, FormModel};
use crate::ids::clock_digits;
use crate::preview::{Binding, PreviewTemplate, Source, PLACEHOLDER_DASH};
use crate::qr::{QrPayload, QrStyle, QR_SIZE_PX};
use crate::score::tiers::ULCI_LEVELS;
use crate::score::{Rounding, ScoreResult, ScoredField, WeightedComposite, LABEL_CATEGORY};
use crate::storage::{keys, StorageKeys};
use crate::time::date_stamp;
use crate::validation::{IdentifierRule, RequiredField};

/// Environmental, social, cultural, health, innovation
pub(super) const ULCI_WEIGHTS: &[f64] = &[0.25, 0.20, 0.15, 0.20, 0.20];

const FIELDS: &[ScoredField] = &[
    ScoredField::new("scoreE", "E", 0.0, 100.0),
    ScoredField::new("scoreS", "S", 0.0, 100.0),
    ScoredField::new("scoreC", "C", 0.0, 100.0),
    ScoredField::new("scoreH", "H", 0.0, 100.0),
    ScoredField::new("scoreI", "I", 0.0, 100.0),
];

static CALCULATOR: WeightedComposite = WeightedComposite {
    fields: FIELDS,
    weights: ULCI_WEIGHTS,
    rounding: Rounding::OneDecimal,
    category: Some(ULCI_LEVELS),
};

const REQUIRED: &[RequiredField] = &[RequiredField::new("name", "Name")];

fn ids(form: &FormModel, _: &ScoreResult) -> String {
    ["ulciId", "ulpId", "tokenId"]
        .iter()
        .map(|key| text_or(form, key, PLACEHOLDER_DASH))
        .collect::<Vec<_>>()
        .join(" • ")
}

fn contact(form: &FormModel, _: &ScoreResult) -> String {
    format!(
        "{} • {}",
        text_or(form, "email", PLACEHOLDER_DASH),
        text_or(form, "mobile", PLACEHOLDER_DASH)
    )
}

fn detail(score: &ScoreResult, sector: &str, description: &str) -> String {
    format!(
        "Score: {}/100 - {}",
        format_number(score.component(sector).unwrap_or(0.0)),
        description
    )
}

fn detail_e(_: &FormModel, score: &ScoreResult) -> String {
    detail(score, "E", "Environmental contributions and sustainability activities")
}

fn detail_s(_: &FormModel, score: &ScoreResult) -> String {
    detail(score, "S", "Social engagement, community service, and civic participation")
}

fn detail_c(_: &FormModel, score: &ScoreResult) -> String {
    detail(score, "C", "Cultural preservation, artistic work, and heritage documentation")
}

fn detail_h(_: &FormModel, score: &ScoreResult) -> String {
    detail(score, "H", "Health initiatives, wellness programs, and medical contributions")
}

fn detail_i(_: &FormModel, score: &ScoreResult) -> String {
    detail(score, "I", "Innovation, ethics, technology advancement, and scientific work")
}

fn ulci_value(_: &FormModel, score: &ScoreResult) -> String {
    format_number(score.total)
}

const BINDINGS: &[Binding] = &[
    Binding::new("rcName", Source::Text { key: "name", fallback: "Full Name" }),
    Binding::new("rcIds", Source::Computed(ids)),
    Binding::new("rcContact", Source::Computed(contact)),
    Binding::new("rcAddress", Source::Text { key: "address", fallback: PLACEHOLDER_DASH }),
    Binding::new("rcPhoto", Source::Photo { glyph: "📷" }),
    Binding::new("rcSignature", Source::Signature { glyph: "-" }),
    Binding::new("valE", Source::Rating { key: "scoreE", suffix: "" }),
    Binding::new("valS", Source::Rating { key: "scoreS", suffix: "" }),
    Binding::new("valC", Source::Rating { key: "scoreC", suffix: "" }),
    Binding::new("valH", Source::Rating { key: "scoreH", suffix: "" }),
    Binding::new("valI", Source::Rating { key: "scoreI", suffix: "" }),
    Binding::new("valULCI", Source::Computed(ulci_value)),
    Binding::new("rcLevel", Source::Label { name: LABEL_CATEGORY }),
    Binding::new("detailE", Source::Computed(detail_e)),
    Binding::new("detailS", Source::Computed(detail_s)),
    Binding::new("detailC", Source::Computed(detail_c)),
    Binding::new("detailH", Source::Computed(detail_h)),
    Binding::new("detailI", Source::Computed(detail_i)),
    Binding::new("rcNotes", Source::Text { key: "sectorNotes", fallback: "No additional notes provided" }),
];

fn qr_payload(form: &FormModel, score: &ScoreResult, at: DateTime<Utc>) -> QrPayload {
    QrPayload::Text(format!(
        "ULCI:{}|ULP:{}|NAME:{}|SCORE:{}|DATE:{}",
        text_or(form, "ulciId", "N/A"),
        text_or(form, "ulpId", "N/A"),
        text_or(form, "name", ""),
        format_number(score.total),
        date_stamp(at)
    ))
}

fn ulci_id(at: DateTime<Utc>) -> String {
    format!("ULCI-{}", clock_digits(at, 6))
}

fn ulp_id(at: DateTime<Utc>) -> String {
    format!("ULP-{}", clock_digits(at, 8))
}

const GENERATED: &[GeneratedField] = &[
    GeneratedField {
        key: "ulciId",
        generate: ulci_id,
    },
    GeneratedField {
        key: "ulpId",
        generate: ulp_id,
    },
];

pub(super) static PAGE: PageDefinition = PageDefinition {
    kind: PageKind::UlciCard,
    title: "ULCI Report Card",
    keys: StorageKeys {
        current: keys::ULCI_CURRENT,
        history: Some(keys::ULCI_HISTORY),
    },
    required: REQUIRED,
    identifiers: &[IdentifierRule::ulp("ulpId", "ULP ID")],
    generated: GENERATED,
    fields: FIELDS,
    calculator: &CALCULATOR,
    preview: PreviewTemplate::new(BINDINGS),
    qr: QrSpec {
        target: "rcQr",
        style: QrStyle {
            size_px: QR_SIZE_PX,
            dark: "#00FFFF",
            light: "#021b1a",
        },
        payload: qr_payload,
    },
    export: ExportSpec {
        target: "reportCard",
        artifact: "ULCI_Report",
        subject_field: "name",
        fallback_subject: "Member",
        format: PageFormat::FitToImage,
        stamp: FileStamp::EpochMillis,
    },
};
