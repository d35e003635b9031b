//! Growth report card: eight rated growth dimensions, up to four projects,
//! reflections and the Life Contribution Index (five contribution scores out
//! of 100)
//!
//! Only the contribution scores feed the calculator. Dimension ratings and
//! progress are shown on the card but not summed.

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
use crate::validation::RequiredField;

/// Projects shown on one card
pub const MAX_PROJECTS: usize = 4;

const STAGES: [&str; 5] = ["Beginning", "Developing", "Emerging", "Maturing", "Contributing"];

/// Display name, rating field, progress field, details field
const DIMENSIONS: [(&str, &str, &str, &str); 8] = [
    ("🧠 Critical Thinking & Problem-Solving", "dim1Rating", "dim1Progress", "dim1Details"),
    ("💡 Creativity & Innovation", "dim2Rating", "dim2Progress", "dim2Details"),
    ("💻 Digital & AI Literacy", "dim3Rating", "dim3Progress", "dim3Details"),
    ("❤️ Emotional Intelligence", "dim4Rating", "dim4Progress", "dim4Details"),
    ("👥 Collaboration & Leadership", "dim5Rating", "dim5Progress", "dim5Details"),
    ("⚖️ Ethical Reasoning", "dim6Rating", "dim6Progress", "dim6Details"),
    ("🌍 Environmental Consciousness", "dim7Rating", "dim7Progress", "dim7Details"),
    ("🎯 Self-Directed Learning", "dim8Rating", "dim8Progress", "dim8Details"),
];

const COMMUNITY: ScoredField = ScoredField::new("communityService", "communityService", 0.0, 25.0);
const ENVIRONMENT: ScoredField =
    ScoredField::new("environmentalAction", "environmentalAction", 0.0, 25.0);
const KNOWLEDGE: ScoredField = ScoredField::new("knowledgeSharing", "knowledgeSharing", 0.0, 25.0);
const CULTURE: ScoredField =
    ScoredField::new("culturalPreservation", "culturalPreservation", 0.0, 15.0);
const INNOVATION: ScoredField = ScoredField::new("innovation", "innovation", 0.0, 10.0);

const CONTRIBUTION: &[ScoredField] = &[COMMUNITY, ENVIRONMENT, KNOWLEDGE, CULTURE, INNOVATION];

const fn rating(key: &'static str) -> ScoredField {
    ScoredField::new(key, key, 1.0, 5.0)
}

const fn progress(key: &'static str) -> ScoredField {
    ScoredField::new(key, key, 0.0, 100.0)
}

const FIELDS: &[ScoredField] = &[
    rating("dim1Rating"),
    progress("dim1Progress"),
    rating("dim2Rating"),
    progress("dim2Progress"),
    rating("dim3Rating"),
    progress("dim3Progress"),
    rating("dim4Rating"),
    progress("dim4Progress"),
    rating("dim5Rating"),
    progress("dim5Progress"),
    rating("dim6Rating"),
    progress("dim6Progress"),
    rating("dim7Rating"),
    progress("dim7Progress"),
    rating("dim8Rating"),
    progress("dim8Progress"),
    COMMUNITY,
    ENVIRONMENT,
    KNOWLEDGE,
    CULTURE,
    INNOVATION,
];

static CALCULATOR: LinearSum = LinearSum {
    fields: CONTRIBUTION,
    max: 100.0,
    category: None,
};

const REQUIRED: &[RequiredField] = &[
    RequiredField::new("name", "Learner Name"),
    RequiredField::new("period", "Assessment Period"),
    RequiredField::new("passportId", "Life Passport ID"),
];

/// `★★★★☆ Maturing`; unrated dimensions show empty stars
fn stars(rating: Option<f64>) -> String {
    let Some(rating) = rating.map(|r| r.clamp(1.0, 5.0).round() as usize) else {
        return format!("{} Not rated", "☆".repeat(5));
    };
    format!("{}{} {}", "★".repeat(rating), "☆".repeat(5 - rating), STAGES[rating - 1])
}

fn dimensions(form: &FormModel, _: &ScoreResult) -> String {
    DIMENSIONS
        .iter()
        .map(|(name, rating_key, progress_key, details_key)| {
            let mut line = format!("{}: {}", name, stars(form.number(rating_key)));
            if let Some(p) = form.number(progress_key) {
                line.push_str(&format!(" ({}%)", format_number(p.clamp(0.0, 100.0))));
            }
            if let Some(details) = form.text(details_key) {
                line.push_str(&format!(" - {}", details));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Projects with a title, `title (duration) [tags]: impact`
fn projects(form: &FormModel, _: &ScoreResult) -> String {
    let lines: Vec<String> = (1..=MAX_PROJECTS)
        .filter_map(|n| {
            let title = form.text(&format!("project{}Title", n))?;
            let mut line = title;
            if let Some(duration) = form.text(&format!("project{}Duration", n)) {
                line.push_str(&format!(" ({})", duration));
            }
            if let Some(tags) = form.text(&format!("project{}Tags", n)) {
                line.push_str(&format!(" [{}]", tags));
            }
            if let Some(impact) = form.text(&format!("project{}Impact", n)) {
                line.push_str(&format!(": {}", impact));
            }
            Some(line)
        })
        .collect();
    if lines.is_empty() {
        PLACEHOLDER_DASH.to_string()
    } else {
        lines.join("\n")
    }
}

fn subtitle(form: &FormModel, _: &ScoreResult) -> String {
    format!(
        "UIENC 2.0 Interactive Markless Assessment | {}",
        text_or(form, "period", PLACEHOLDER_DASH)
    )
}

fn age(form: &FormModel, _: &ScoreResult) -> String {
    form.text("age")
        .map(|a| format!("{} years", a))
        .unwrap_or_else(|| PLACEHOLDER_DASH.to_string())
}

fn lci(_: &FormModel, score: &ScoreResult) -> String {
    format!("{}/100", format_number(score.total))
}

fn document_line(form: &FormModel, _: &ScoreResult) -> String {
    format!(
        "Document ID: {} | Blockchain Authenticated",
        text_or(form, "passportId", PLACEHOLDER_DASH)
    )
}

const BINDINGS: &[Binding] = &[
    Binding::new("rcSubtitle", Source::Computed(subtitle)),
    Binding::new("rcPhoto", Source::Photo { glyph: "🌱" }),
    Binding::new("rcName", Source::Text { key: "name", fallback: "Learner" }),
    Binding::new("rcAge", Source::Computed(age)),
    Binding::new("rcPod", Source::Text { key: "learningPod", fallback: PLACEHOLDER_DASH }),
    Binding::new("rcLocation", Source::Text { key: "location", fallback: PLACEHOLDER_DASH }),
    Binding::new("rcMentor", Source::Text { key: "mentor", fallback: PLACEHOLDER_DASH }),
    Binding::new("rcPeriod", Source::Text { key: "period", fallback: PLACEHOLDER_DASH }),
    Binding::new("rcPassport", Source::Text { key: "passportId", fallback: PLACEHOLDER_DASH }),
    Binding::new("rcDimensions", Source::Computed(dimensions)),
    Binding::new("rcProjects", Source::Computed(projects)),
    Binding::new("rcLearnerVoice", Source::Text { key: "learnerVoice", fallback: PLACEHOLDER_DASH }),
    Binding::new("rcMentorVoice", Source::Text { key: "mentorVoice", fallback: PLACEHOLDER_DASH }),
    Binding::new("rcPeerVoice", Source::Text { key: "peerVoice", fallback: PLACEHOLDER_DASH }),
    Binding::new("rcParentVoice", Source::Text { key: "parentVoice", fallback: PLACEHOLDER_DASH }),
    Binding::new("rcLci", Source::Computed(lci)),
    Binding::new("rcLciBar", Source::Progress),
    Binding::new("rcCommunity", Source::Rating { key: "communityService", suffix: "/25" }),
    Binding::new("rcEnvironment", Source::Rating { key: "environmentalAction", suffix: "/25" }),
    Binding::new("rcKnowledge", Source::Rating { key: "knowledgeSharing", suffix: "/25" }),
    Binding::new("rcCulture", Source::Rating { key: "culturalPreservation", suffix: "/15" }),
    Binding::new("rcInnovation", Source::Rating { key: "innovation", suffix: "/10" }),
    Binding::new("rcDocument", Source::Computed(document_line)),
];

fn qr_payload(form: &FormModel, score: &ScoreResult, at: DateTime<Utc>) -> QrPayload {
    QrPayload::Json(json!({
        "passportId": text_or(form, "passportId", "N/A"),
        "name": text_or(form, "name", "Learner"),
        "period": text_or(form, "period", "N/A"),
        "lci": score.total,
        "date": date_stamp(at),
    }))
}

pub(super) static PAGE: PageDefinition = PageDefinition {
    kind: PageKind::GrowthReport,
    title: "Growth Report Card",
    keys: StorageKeys {
        current: keys::GROWTH_REPORT_CURRENT,
        history: Some(keys::GROWTH_REPORT_HISTORY),
    },
    required: REQUIRED,
    identifiers: &[],
    generated: &[],
    fields: FIELDS,
    calculator: &CALCULATOR,
    preview: PreviewTemplate::new(BINDINGS),
    qr: QrSpec {
        target: "rcQr",
        style: QrStyle {
            size_px: QR_SIZE_PX,
            dark: "#1b5e20",
            light: "#ffffff",
        },
        payload: qr_payload,
    },
    export: ExportSpec {
        target: "reportCardSection",
        artifact: "Growth_Report",
        subject_field: "name",
        fallback_subject: "Learner",
        format: PageFormat::A4,
        stamp: FileStamp::Date,
    },
};
