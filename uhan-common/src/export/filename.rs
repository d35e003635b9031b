//! Export file names: `<Type>_<Subject>_<stamp>.pdf`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{date_stamp, epoch_millis};

/// Suffix style of an export file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStamp {
    /// `YYYY-MM-DD`
    Date,
    /// Milliseconds since the epoch
    EpochMillis,
}

impl FileStamp {
    pub fn format(self, at: DateTime<Utc>) -> String {
        match self {
            FileStamp::Date => date_stamp(at),
            FileStamp::EpochMillis => epoch_millis(at).to_string(),
        }
    }
}

/// Collapse whitespace runs to `_` and drop anything outside `[A-Za-z0-9_-]`
///
/// Returns `fallback` when nothing is left.
pub fn sanitize_subject(subject: &str, fallback: &str) -> String {
    let joined = subject.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

pub fn export_file_name(
    artifact: &str,
    subject: &str,
    fallback_subject: &str,
    stamp: FileStamp,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{}_{}_{}.pdf",
        artifact,
        sanitize_subject(subject, fallback_subject),
        stamp.format(at)
    )
}
