//! Metamorphic badge: a credential with a chip id and a ledger hash
//!
//! Badges carry no score. Saved badges form the history list that
//! [`find_badge`] searches when a badge id is presented for verification.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::json;

use super::{text_or, ExportSpec, GeneratedField, PageDefinition, PageKind, QrSpec};
use crate::export::{FileStamp, PageFormat};
use crate::form::FormModel;
use crate::ids::{random_digits, random_hex};
use crate::preview::{Binding, PreviewTemplate, Source, PLACEHOLDER_DASH};
use crate::qr::{QrPayload, QrStyle, QR_SIZE_PX};
use crate::score::{LinearSum, ScoreResult};
use crate::storage::{keys, PersistedRecord, RecordStore, StorageKeys};
use crate::time::{date_stamp, epoch_millis, long_date};
use crate::validation::{IdentifierRule, RequiredField};
use crate::Result;

pub const BADGE_ID_FIELD: &str = "badgeId";

const VERIFY_BASE_URL: &str = "https://badges.uienc.org/verify/";
const DESCRIPTION_PREVIEW_CHARS: usize = 50;
const DEFAULT_LEVEL: &str = "Expert";
const DEFAULT_TEMPLATE: &str = "knowledge";

static CALCULATOR: LinearSum = LinearSum {
    fields: &[],
    max: 0.0,
    category: None,
};

const REQUIRED: &[RequiredField] = &[
    RequiredField::new("learnerName", "Learner Name"),
    RequiredField::new("badgeTitle", "Badge Title"),
    RequiredField::new("ulpId", "ULP ID"),
];

fn badge_id(at: DateTime<Utc>) -> String {
    format!("MB-{}-{}", epoch_millis(at), random_digits(4))
}

fn chip_id(at: DateTime<Utc>) -> String {
    format!("QC-{}-{}", at.year(), random_hex(6))
}

fn ledger_hash(_: DateTime<Utc>) -> String {
    format!("0x{}", random_hex(64).to_lowercase())
}

const GENERATED: &[GeneratedField] = &[
    GeneratedField {
        key: BADGE_ID_FIELD,
        generate: badge_id,
    },
    GeneratedField {
        key: "chipId",
        generate: chip_id,
    },
    GeneratedField {
        key: "blockchainHash",
        generate: ledger_hash,
    },
];

/// Public page a verifier opens for `badge_id`
pub fn verification_url(badge_id: &str) -> String {
    format!("{}{}", VERIFY_BASE_URL, badge_id)
}

fn level(form: &FormModel) -> String {
    text_or(form, "level", DEFAULT_LEVEL)
}

fn level_line(form: &FormModel, _: &ScoreResult) -> String {
    format!("{} Level", level(form))
}

fn issue_date(form: &FormModel, _: &ScoreResult) -> String {
    form.text("issueDate")
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        .map(long_date)
        .unwrap_or_else(|| PLACEHOLDER_DASH.to_string())
}

fn short_description(form: &FormModel, _: &ScoreResult) -> String {
    let text = text_or(form, "description", "Achievement description");
    if text.chars().count() > DESCRIPTION_PREVIEW_CHARS {
        let cut: String = text.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

fn verify_link(form: &FormModel, _: &ScoreResult) -> String {
    form.text(BADGE_ID_FIELD)
        .map(|id| verification_url(&id))
        .unwrap_or_else(|| PLACEHOLDER_DASH.to_string())
}

const BINDINGS: &[Binding] = &[
    Binding::new("badgeIcon", Source::Text { key: "icon", fallback: "🧠" }),
    Binding::new("previewLearnerName", Source::Text { key: "learnerName", fallback: "Learner Name" }),
    Binding::new("previewTitle", Source::Text { key: "badgeTitle", fallback: "Badge Title" }),
    Binding::new("previewLevel", Source::Computed(level_line)),
    Binding::new("previewUlpId", Source::Text { key: "ulpId", fallback: "ULP-XXXX-XXXXX" }),
    Binding::new("previewDate", Source::Computed(issue_date)),
    Binding::new("previewDescription", Source::Computed(short_description)),
    Binding::new("previewSkills", Source::Text { key: "skills", fallback: PLACEHOLDER_DASH }),
    Binding::new("previewPhoto", Source::Photo { glyph: "👤" }),
    Binding::new("previewBadgeId", Source::Text { key: BADGE_ID_FIELD, fallback: PLACEHOLDER_DASH }),
    Binding::new("chipId", Source::Text { key: "chipId", fallback: PLACEHOLDER_DASH }),
    Binding::new("blockchainHash", Source::Text { key: "blockchainHash", fallback: PLACEHOLDER_DASH }),
    Binding::new("verifyUrl", Source::Computed(verify_link)),
];

fn qr_payload(form: &FormModel, _: &ScoreResult, at: DateTime<Utc>) -> QrPayload {
    let hash: String = text_or(form, "blockchainHash", "0x...").chars().take(20).collect();
    QrPayload::Json(json!({
        "id": text_or(form, BADGE_ID_FIELD, "N/A"),
        "name": text_or(form, "learnerName", "Unknown"),
        "badge": text_or(form, "badgeTitle", "Badge"),
        "ulp": text_or(form, "ulpId", "ULP-XXXX"),
        "level": level(form),
        "date": form.text("issueDate").unwrap_or_else(|| date_stamp(at)),
        "chip": text_or(form, "chipId", "N/A"),
        "hash": hash,
        "template": text_or(form, "template", DEFAULT_TEMPLATE),
        "verified": true,
        "timestamp": at.to_rfc3339(),
    }))
}

/// Saved badge whose id is `badge_id`, newest save first
pub async fn find_badge(store: &RecordStore, badge_id: &str) -> Result<Option<PersistedRecord>> {
    let wanted = badge_id.trim();
    if wanted.is_empty() {
        return Ok(None);
    }
    let history = store.history(keys::BADGE_HISTORY).await?;
    Ok(history
        .into_iter()
        .find(|record| record.fields.text(BADGE_ID_FIELD).as_deref() == Some(wanted)))
}

pub(super) static PAGE: PageDefinition = PageDefinition {
    kind: PageKind::Badge,
    title: "Metamorphic Badge",
    keys: StorageKeys {
        current: keys::BADGE_CURRENT,
        history: Some(keys::BADGE_HISTORY),
    },
    required: REQUIRED,
    identifiers: &[IdentifierRule::ulp("ulpId", "ULP ID")],
    generated: GENERATED,
    fields: &[],
    calculator: &CALCULATOR,
    preview: PreviewTemplate::new(BINDINGS),
    qr: QrSpec {
        target: "qrCode",
        style: QrStyle {
            size_px: QR_SIZE_PX,
            dark: "#000000",
            light: "#ffffff",
        },
        payload: qr_payload,
    },
    export: ExportSpec {
        target: "badgePreview",
        artifact: "Metamorphic_Badge",
        subject_field: "learnerName",
        fallback_subject: "Learner",
        format: PageFormat::FitToImage,
        stamp: FileStamp::EpochMillis,
    },
};
