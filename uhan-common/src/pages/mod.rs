//! Page catalog
//!
//! Each form page is a static [`PageDefinition`]: its storage keys, required
//! fields, rated inputs, calculator, preview bindings, QR payload and export
//! settings. The pipeline code is shared; only these tables differ.
//!
//! Identifiers a page issues itself (card ids, badge serials) are generated
//! once when a session opens, never during a render.

mod badge;
mod facilitator;
mod growth_report;
mod mentor;
mod parent;
mod ueiti;
mod ulci_card;
mod ulp_card;

pub use badge::{find_badge, verification_url, BADGE_ID_FIELD};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::export::{export_file_name, FileStamp, PageFormat};
use crate::form::FormModel;
use crate::preview::{Preview, PreviewTemplate};
use crate::qr::{encode_or_placeholder, QrPayload, QrRenderer, QrSlot, QrStyle};
use crate::score::{ScoreCalculator, ScoreResult, ScoredField};
use crate::storage::StorageKeys;
use crate::validation::{
    check_identifiers, check_ranges, validate_form, IdentifierRule, RequiredField, ValidationReport,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageKind {
    Facilitator,
    Mentor,
    Parent,
    UlciCard,
    Ueiti,
    UlpCard,
    Badge,
    GrowthReport,
}

impl PageKind {
    pub const ALL: [PageKind; 8] = [
        PageKind::Facilitator,
        PageKind::Mentor,
        PageKind::Parent,
        PageKind::UlciCard,
        PageKind::Ueiti,
        PageKind::UlpCard,
        PageKind::Badge,
        PageKind::GrowthReport,
    ];

    /// URL segment of the page
    pub fn slug(self) -> &'static str {
        match self {
            PageKind::Facilitator => "facilitator",
            PageKind::Mentor => "mentor",
            PageKind::Parent => "parent",
            PageKind::UlciCard => "ulci-card",
            PageKind::Ueiti => "ueiti",
            PageKind::UlpCard => "ulp-card",
            PageKind::Badge => "badge",
            PageKind::GrowthReport => "growth-report",
        }
    }

    pub fn definition(self) -> &'static PageDefinition {
        match self {
            PageKind::Facilitator => &facilitator::PAGE,
            PageKind::Mentor => &mentor::PAGE,
            PageKind::Parent => &parent::PAGE,
            PageKind::UlciCard => &ulci_card::PAGE,
            PageKind::Ueiti => &ueiti::PAGE,
            PageKind::UlpCard => &ulp_card::PAGE,
            PageKind::Badge => &badge::PAGE,
            PageKind::GrowthReport => &growth_report::PAGE,
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for PageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PageKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| Error::NotFound(format!("Unknown page: {}", s)))
    }
}

/// Builds the QR payload from the form, its score and the render time
pub type QrPayloadFn = fn(&FormModel, &ScoreResult, DateTime<Utc>) -> QrPayload;

pub struct QrSpec {
    /// Display target holding the code
    pub target: &'static str,
    pub style: QrStyle,
    pub payload: QrPayloadFn,
}

#[derive(Debug, Clone, Copy)]
pub struct ExportSpec {
    /// Preview node that gets rasterized
    pub target: &'static str,
    pub artifact: &'static str,
    pub subject_field: &'static str,
    pub fallback_subject: &'static str,
    pub format: PageFormat,
    pub stamp: FileStamp,
}

impl ExportSpec {
    pub fn file_name(&self, form: &FormModel, at: DateTime<Utc>) -> String {
        let subject = form.text(self.subject_field).unwrap_or_default();
        export_file_name(self.artifact, &subject, self.fallback_subject, self.stamp, at)
    }
}

/// Identifier issued when a session opens and the field is still blank
#[derive(Debug, Clone, Copy)]
pub struct GeneratedField {
    pub key: &'static str,
    pub generate: fn(DateTime<Utc>) -> String,
}

/// Everything that makes one page different from another
pub struct PageDefinition {
    pub kind: PageKind,
    pub title: &'static str,
    pub keys: StorageKeys,
    pub required: &'static [RequiredField],
    pub identifiers: &'static [IdentifierRule],
    pub generated: &'static [GeneratedField],
    /// Numeric inputs with their allowed range
    pub fields: &'static [ScoredField],
    pub calculator: &'static dyn ScoreCalculator,
    pub preview: PreviewTemplate,
    pub qr: QrSpec,
    pub export: ExportSpec,
}

/// Score, preview and QR computed together for one form state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedForm {
    pub page: PageKind,
    /// Recompute ticket that produced this render; 0 outside a session
    pub sequence: u64,
    pub score: ScoreResult,
    pub preview: Preview,
    pub qr: QrSlot,
    pub rendered_at: DateTime<Utc>,
}

/// Public description of a page for the UI
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub slug: &'static str,
    pub title: &'static str,
    pub storage_key: &'static str,
    pub history_key: Option<&'static str>,
    pub required: Vec<&'static str>,
    pub generated: Vec<&'static str>,
    pub fields: Vec<FieldInfo>,
    pub preview_targets: Vec<&'static str>,
    pub qr_target: &'static str,
    pub export_target: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldInfo {
    pub key: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
}

impl PageDefinition {
    pub fn score(&self, form: &FormModel) -> ScoreResult {
        self.calculator.compute(form)
    }

    /// Required fields, attachments, numeric ranges and identifier shapes
    pub fn validate(&self, form: &FormModel) -> ValidationReport {
        let mut report = validate_form(form, self.required);
        check_ranges(form, self.fields, &mut report);
        check_identifiers(form, self.identifiers, &mut report);
        report
    }

    /// Fill every blank generated identifier; returns the keys that were set
    pub fn seed_identifiers(&self, form: &mut FormModel, at: DateTime<Utc>) -> Vec<&'static str> {
        let mut seeded = Vec::new();
        for field in self.generated {
            if form.text(field.key).is_none() {
                form.set(field.key, (field.generate)(at));
                seeded.push(field.key);
            }
        }
        seeded
    }

    /// Run the calculator, preview and QR encoder over `form`
    ///
    /// QR failures become a placeholder slot and never fail the render.
    pub fn render(&self, form: &FormModel, qr: &dyn QrRenderer, at: DateTime<Utc>) -> RenderedForm {
        let score = self.score(form);
        let preview = self.preview.render(form, &score);
        let payload = (self.qr.payload)(form, &score, at);
        let qr = encode_or_placeholder(qr, &payload, &self.qr.style);
        RenderedForm {
            page: self.kind,
            sequence: 0,
            score,
            preview,
            qr,
            rendered_at: at,
        }
    }

    pub fn summary(&self) -> PageSummary {
        PageSummary {
            slug: self.kind.slug(),
            title: self.title,
            storage_key: self.keys.current,
            history_key: self.keys.history,
            required: self.required.iter().map(|r| r.key).collect(),
            generated: self.generated.iter().map(|g| g.key).collect(),
            fields: self
                .fields
                .iter()
                .map(|f| FieldInfo {
                    key: f.key,
                    label: f.label,
                    min: f.min,
                    max: f.max,
                })
                .collect(),
            preview_targets: self.preview.targets().collect(),
            qr_target: self.qr.target,
            export_target: self.export.target,
        }
    }
}

/// Text of `key` or `fallback`, used by QR payload builders
pub(crate) fn text_or(form: &FormModel, key: &str, fallback: &str) -> String {
    form.text(key).unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldValue;
    use crate::qr::SvgQrRenderer;

    #[test]
    fn test_slug_round_trip() {
        for kind in PageKind::ALL {
            assert_eq!(kind.slug().parse::<PageKind>().unwrap(), kind);
            assert_eq!(kind.definition().kind, kind);
        }
        assert!("treasury".parse::<PageKind>().is_err());
    }

    #[test]
    fn test_serde_uses_slug() {
        assert_eq!(serde_json::to_value(PageKind::UlciCard).unwrap(), "ulci-card");
    }

    #[test]
    fn test_storage_keys_are_unique() {
        let all: Vec<&str> = PageKind::ALL
            .iter()
            .flat_map(|k| {
                let keys = k.definition().keys;
                std::iter::once(keys.current).chain(keys.history)
            })
            .collect();
        let mut keys = all.clone();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), all.len());
    }

    /// Forms at the bottom, top and outside of every field's range
    fn boundary_forms(fields: &[ScoredField]) -> Vec<FormModel> {
        let fill = |value: &dyn Fn(&ScoredField) -> FieldValue| {
            fields
                .iter()
                .fold(FormModel::new(), |form, f| form.with(f.key, value(f)))
        };
        vec![
            FormModel::new(),
            fill(&|f| FieldValue::Number(f.min)),
            fill(&|f| FieldValue::Number(f.max)),
            fill(&|f| FieldValue::Number(f.min - 1000.0)),
            fill(&|f| FieldValue::Number(f.max + 1000.0)),
            fill(&|_| FieldValue::Text("not a number".to_string())),
        ]
    }

    #[test]
    fn test_every_calculator_is_bounded_and_deterministic() {
        for kind in PageKind::ALL {
            let def = kind.definition();
            for form in boundary_forms(def.fields) {
                let first = def.score(&form);
                assert_eq!(first, def.score(&form), "{}", kind);
                assert!(first.total.is_finite(), "{}", kind);
                assert!((0.0..=100.0).contains(&first.percentage), "{} {:?}", kind, first);
            }
        }
    }

    #[test]
    fn test_out_of_range_score_matches_clamped() {
        for kind in PageKind::ALL {
            let def = kind.definition();
            let forms = boundary_forms(def.fields);
            assert_eq!(def.score(&forms[3]), def.score(&forms[1]), "{} below min", kind);
            assert_eq!(def.score(&forms[4]), def.score(&forms[2]), "{} above max", kind);
        }
    }

    #[test]
    fn test_out_of_range_fields_fail_validation() {
        let form = FormModel::new()
            .with("ulpID", "garbage")
            .with("emotionalSupport", 250)
            .with("communication", 2);
        let report = PageKind::Parent.definition().validate(&form);
        assert!(report.has_error("ulpID"));
        assert!(report.has_error("emotionalSupport"));
        assert!(!report.has_error("communication"));

        let form = FormModel::new()
            .with("name", "Asha")
            .with("uhanId", "UHAN-001")
            .with("email", "asha@example.org")
            .with("slider1", 99)
            .with("slider2", -4);
        let report = PageKind::Facilitator.definition().validate(&form);
        assert!(report.has_error("slider1"));
        assert!(report.has_error("slider2"));
    }

    #[test]
    fn test_seed_identifiers_fills_only_blank_fields() {
        let def = PageKind::UlciCard.definition();
        let mut form = FormModel::new().with("ulpId", "ULP-IND-KA-00017");
        let seeded = def.seed_identifiers(&mut form, Utc::now());
        assert_eq!(seeded, vec!["ulciId"]);
        assert_eq!(form.text("ulpId").as_deref(), Some("ULP-IND-KA-00017"));
        assert!(form.text("ulciId").is_some_and(|id| id.starts_with("ULCI-")));

        assert!(def.seed_identifiers(&mut form, Utc::now()).is_empty());
    }

    #[test]
    fn test_generated_identifiers_pass_validation() {
        for kind in PageKind::ALL {
            let def = kind.definition();
            let mut form = FormModel::new();
            def.seed_identifiers(&mut form, Utc::now());
            let report = def.validate(&form);
            for field in def.generated {
                assert!(!report.has_error(field.key), "{} {}", kind, field.key);
            }
        }
    }

    #[test]
    fn test_every_page_renders_empty_form() {
        let at = Utc::now();
        for kind in PageKind::ALL {
            let def = kind.definition();
            let rendered = def.render(&FormModel::new(), &SvgQrRenderer, at);
            assert!((0.0..=100.0).contains(&rendered.score.percentage), "{}", kind);
            assert_eq!(rendered.preview.len(), def.preview.bindings.len(), "{}", kind);
            assert!(!rendered.qr.is_placeholder(), "{}", kind);
        }
    }

    #[test]
    fn test_every_page_requires_something() {
        for kind in PageKind::ALL {
            let report = kind.definition().validate(&FormModel::new());
            assert!(!report.is_valid(), "{}", kind);
        }
    }

    #[test]
    fn test_summary_lists_fields() {
        let summary = PageKind::Parent.definition().summary();
        assert_eq!(summary.slug, "parent");
        assert_eq!(summary.fields.len(), 4);
        assert_eq!(summary.storage_key, "parentAssessment");
    }
}
