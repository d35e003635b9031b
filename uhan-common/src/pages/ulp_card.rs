//! ULP citizen card and its LCI (mean of six sector scores)

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use super::{text_or, ExportSpec, GeneratedField, PageDefinition, PageKind, QrSpec};
use crate::export::{FileStamp, PageFormat};
use crate::form::FormModel;
use crate::ids::random_digits;
use crate::preview::{Binding, PreviewTemplate, Source};
use crate::qr::{QrPayload, QrStyle, QR_SIZE_PX};
use crate::score::tiers::ULCI_LEVELS;
use crate::score::{Rounding, ScoreResult, ScoredField, WeightedComposite, LABEL_CATEGORY};
use crate::storage::{keys, StorageKeys};
use crate::time::card_date;
use crate::validation::{IdentifierRule, RequiredField};

const FIELDS: &[ScoredField] = &[
    ScoredField::new("education", "education", 0.0, 100.0),
    ScoredField::new("health", "health", 0.0, 100.0),
    ScoredField::new("environment", "ecology", 0.0, 100.0),
    ScoredField::new("technology", "technology", 0.0, 100.0),
    ScoredField::new("governance", "governance", 0.0, 100.0),
    ScoredField::new("economy", "economy", 0.0, 100.0),
];

const SIXTH: f64 = 1.0 / 6.0;

static CALCULATOR: WeightedComposite = WeightedComposite {
    fields: FIELDS,
    weights: &[SIXTH; 6],
    rounding: Rounding::Whole,
    category: Some(ULCI_LEVELS),
};

const REQUIRED: &[RequiredField] = &[
    RequiredField::new("fullName", "Full name"),
    RequiredField::new("dob", "Date of birth"),
    RequiredField::new("mobile", "Mobile"),
];

/// `dob` as `DD/MM/YYYY`, `-` when missing or unparsable
fn dob(form: &FormModel) -> String {
    form.text("dob")
        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
        .map(card_date)
        .unwrap_or_else(|| "-".to_string())
}

fn card_dob(form: &FormModel, _: &ScoreResult) -> String {
    dob(form)
}

fn citizen_id_line(form: &FormModel, _: &ScoreResult) -> String {
    format!("Global Citizen ID: {}", text_or(form, "citizenId", "-"))
}

fn archetype(form: &FormModel, _: &ScoreResult) -> String {
    form.text("archetype")
        .map(|a| format!("🌱 {}", a))
        .unwrap_or_else(|| "Select Archetype".to_string())
}

fn contributions(_: &FormModel, score: &ScoreResult) -> String {
    format!("{}", (score.total * 4.5).round())
}

fn impact(_: &FormModel, score: &ScoreResult) -> String {
    format!("{:.1}", score.total / 10.0)
}

fn validations(_: &FormModel, score: &ScoreResult) -> String {
    format!("{}", (score.total * 2.0).round())
}

fn sector_count(_: &FormModel, _: &ScoreResult) -> String {
    FIELDS.len().to_string()
}

const BINDINGS: &[Binding] = &[
    Binding::new("card-ulp-id", Source::Text { key: "citizenId", fallback: "-" }),
    Binding::new("card-name", Source::Text { key: "fullName", fallback: "-" }),
    Binding::new("card-father-name", Source::Text { key: "fatherName", fallback: "-" }),
    Binding::new("card-mother-name", Source::Text { key: "motherName", fallback: "-" }),
    Binding::new("card-dob", Source::Computed(card_dob)),
    Binding::new("card-mobile", Source::Text { key: "mobile", fallback: "-" }),
    Binding::new("card-email", Source::Text { key: "email", fallback: "-" }),
    Binding::new("card-address", Source::Text { key: "address", fallback: "-" }),
    Binding::new("card-archetype", Source::Text { key: "archetype", fallback: "-" }),
    Binding::new("card-education", Source::Rating { key: "education", suffix: "" }),
    Binding::new("card-health", Source::Rating { key: "health", suffix: "" }),
    Binding::new("card-environment", Source::Rating { key: "environment", suffix: "" }),
    Binding::new("card-technology", Source::Rating { key: "technology", suffix: "" }),
    Binding::new("card-governance", Source::Rating { key: "governance", suffix: "" }),
    Binding::new("card-economy", Source::Rating { key: "economy", suffix: "" }),
    Binding::new("card-photo", Source::Photo { glyph: "Photo" }),
    Binding::new("card-signature", Source::Text { key: "signatureName", fallback: "Signature" }),
    Binding::new("dashboard-name", Source::Text { key: "fullName", fallback: "Your Name" }),
    Binding::new("dashboard-citizen-id", Source::Computed(citizen_id_line)),
    Binding::new("dashboard-archetype", Source::Computed(archetype)),
    Binding::new("dashboard-address", Source::Text { key: "address", fallback: "Address not provided" }),
    Binding::new("dashboard-avatar", Source::Photo { glyph: "👤" }),
    Binding::new("lci-education", Source::Component { name: "education", decimals: 0, suffix: "" }),
    Binding::new("lci-health", Source::Component { name: "health", decimals: 0, suffix: "" }),
    Binding::new("lci-ecology", Source::Component { name: "ecology", decimals: 0, suffix: "" }),
    Binding::new("lci-technology", Source::Component { name: "technology", decimals: 0, suffix: "" }),
    Binding::new("lci-governance", Source::Component { name: "governance", decimals: 0, suffix: "" }),
    Binding::new("lci-economy", Source::Component { name: "economy", decimals: 0, suffix: "" }),
    Binding::new("overall-lci", Source::Total { decimals: 0, suffix: "" }),
    Binding::new("lci-level", Source::Label { name: LABEL_CATEGORY }),
    Binding::new("dashboard-contributions", Source::Computed(contributions)),
    Binding::new("dashboard-sectors", Source::Computed(sector_count)),
    Binding::new("dashboard-impact", Source::Computed(impact)),
    Binding::new("dashboard-validations", Source::Computed(validations)),
];

fn qr_payload(form: &FormModel, _: &ScoreResult, _: DateTime<Utc>) -> QrPayload {
    QrPayload::Text(format!(
        "ULP ID: {}\nName: {}\nDOB: {}\nMobile: {}",
        text_or(form, "citizenId", "-"),
        text_or(form, "fullName", "-"),
        dob(form),
        text_or(form, "mobile", "-")
    ))
}

/// `ULP-IND-ASS-<year>-<serial>`
fn citizen_id(at: DateTime<Utc>) -> String {
    format!("ULP-IND-ASS-{}-{}", at.year(), random_digits(4))
}

const GENERATED: &[GeneratedField] = &[GeneratedField {
    key: "citizenId",
    generate: citizen_id,
}];

pub(super) static PAGE: PageDefinition = PageDefinition {
    kind: PageKind::UlpCard,
    title: "ULP Citizen Card",
    keys: StorageKeys {
        current: keys::ULP_CARD,
        history: None,
    },
    required: REQUIRED,
    identifiers: &[IdentifierRule::ulp("citizenId", "Global Citizen ID")],
    generated: GENERATED,
    fields: FIELDS,
    calculator: &CALCULATOR,
    preview: PreviewTemplate::new(BINDINGS),
    qr: QrSpec {
        target: "qr-code",
        style: QrStyle {
            size_px: QR_SIZE_PX,
            dark: "#000000",
            light: "#ffffff",
        },
        payload: qr_payload,
    },
    export: ExportSpec {
        target: "ulp-card",
        artifact: "ULP_Card",
        subject_field: "fullName",
        fallback_subject: "Citizen",
        format: PageFormat::A4,
        stamp: FileStamp::Date,
    },
};
