//! Persistence adapter
//!
//! Records are JSON documents stored under fixed keys in a key/value backend.
//! Some pages also keep a newest-first history list under a second key,
//! capped at [`DEFAULT_HISTORY_CAP`] entries.
//!
//! A save writes the history list before the current record and puts the old
//! list back if the second write fails, so the two keys never disagree.
//!
//! `load` separates three cases callers must handle differently: the key was
//! never written, the stored text is not a valid record, and the backend
//! itself failed (an `Err`).

mod fallback;
mod memory;
#[cfg(feature = "sqlx")]
mod sqlite;

pub use fallback::FallbackStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "sqlx")]
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::form::{FormModel, PHOTO_FIELD, SIGNATURE_FIELD};
use crate::Result;

/// Fixed storage keys
pub mod keys {
    pub const DAO_MEMBERS: &str = "daoMembers";
    pub const FACILITATOR: &str = "uhanAssessment";
    pub const MENTOR: &str = "mentorAssessment";
    pub const PARENT: &str = "parentAssessment";
    pub const ULCI_CURRENT: &str = "ulci_current";
    pub const ULCI_HISTORY: &str = "ulci_history";
    pub const UEITI: &str = "ueiti_assessment";
    pub const ULP_CARD: &str = "ulp_card";
    pub const BADGE_CURRENT: &str = "metamorphicBadge";
    pub const BADGE_HISTORY: &str = "metamorphicBadges";
    pub const GROWTH_REPORT_CURRENT: &str = "uienc_report";
    pub const GROWTH_REPORT_HISTORY: &str = "uienc_reports";
}

/// Record key holding the save time; a form field of this name is dropped
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Default number of records kept in a history list
pub const DEFAULT_HISTORY_CAP: usize = 50;

/// Raw key/value backend
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Backend name for log messages
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// Current key plus optional history key of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageKeys {
    pub current: &'static str,
    pub history: Option<&'static str>,
}

/// Saved snapshot of a form
///
/// Serializes as `{ <field>: <string|number>, photo?, signature?, timestamp }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    #[serde(flatten)]
    pub fields: FormModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PersistedRecord {
    /// Snapshot `form`, moving attachments into their own slots
    pub fn from_form(form: &FormModel, timestamp: DateTime<Utc>) -> Self {
        let mut fields = form.clone();
        if fields.remove(TIMESTAMP_FIELD).is_some() {
            debug!("Dropping reserved form field '{}'", TIMESTAMP_FIELD);
        }
        let photo = fields.remove(PHOTO_FIELD).map(|v| v.as_text());
        let signature = fields.remove(SIGNATURE_FIELD).map(|v| v.as_text());
        Self {
            fields,
            photo: photo.filter(|s| !s.is_empty()),
            signature: signature.filter(|s| !s.is_empty()),
            timestamp,
        }
    }

    /// Rebuild the form model, attachments included
    pub fn to_form(&self) -> FormModel {
        let mut form = self.fields.clone();
        if let Some(photo) = &self.photo {
            form.set(PHOTO_FIELD, photo.clone());
        }
        if let Some(signature) = &self.signature {
            form.set(SIGNATURE_FIELD, signature.clone());
        }
        form
    }
}

/// Result of reading a key
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T = PersistedRecord> {
    Found(T),
    NotFound,
    Corrupt { reason: String },
}

impl<T> LoadOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            LoadOutcome::Found(v) => Some(v),
            _ => None,
        }
    }
}

/// Typed access to a [`StorageBackend`]
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn StorageBackend>,
    history_cap: usize,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn StorageBackend>, history_cap: usize) -> Self {
        Self {
            backend,
            history_cap: history_cap.max(1),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    /// Serialize `value` under `key`, replacing any previous value
    pub async fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.backend.set(key, &text).await
    }

    /// Read and parse `key`
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<LoadOutcome<T>> {
        let Some(text) = self.backend.get(key).await? else {
            return Ok(LoadOutcome::NotFound);
        };
        match serde_json::from_str(&text) {
            Ok(value) => Ok(LoadOutcome::Found(value)),
            Err(e) => {
                warn!("Stored value under '{}' is not valid: {}", key, e);
                Ok(LoadOutcome::Corrupt {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Write the current record and, when the page keeps one, prepend it to
    /// the history list (newest first, truncated to the cap)
    ///
    /// Either both keys change or neither does.
    pub async fn save(&self, keys: &StorageKeys, record: &PersistedRecord) -> Result<()> {
        let Some(history_key) = keys.history else {
            return self.put_json(keys.current, record).await;
        };

        let previous = self.backend.get(history_key).await?;
        let mut history = parse_history(history_key, previous.as_deref());
        history.insert(0, record.clone());
        history.truncate(self.history_cap);
        self.put_json(history_key, &history).await?;

        if let Err(e) = self.put_json(keys.current, record).await {
            self.restore(history_key, previous.as_deref()).await;
            return Err(e);
        }
        debug!("History '{}' now holds {} records", history_key, history.len());
        Ok(())
    }

    async fn restore(&self, key: &str, previous: Option<&str>) {
        let result = match previous {
            Some(text) => self.backend.set(key, text).await,
            None => self.backend.remove(key).await,
        };
        if let Err(e) = result {
            error!("Failed to restore '{}' after an aborted save: {}", key, e);
        }
    }

    pub async fn load(&self, key: &str) -> Result<LoadOutcome> {
        self.get_json(key).await
    }

    /// History list under `key`; a corrupt list reads as empty
    pub async fn history(&self, key: &str) -> Result<Vec<PersistedRecord>> {
        let text = self.backend.get(key).await?;
        Ok(parse_history(key, text.as_deref()))
    }

    /// Entry `index` (0 = newest) of the history list under `key`
    pub async fn history_entry(&self, key: &str, index: usize) -> Result<LoadOutcome> {
        let mut history = self.history(key).await?;
        if index >= history.len() {
            return Ok(LoadOutcome::NotFound);
        }
        Ok(LoadOutcome::Found(history.swap_remove(index)))
    }

    pub async fn clear(&self, key: &str) -> Result<()> {
        self.backend.remove(key).await
    }
}

fn parse_history(key: &str, text: Option<&str>) -> Vec<PersistedRecord> {
    let Some(text) = text else {
        return Vec::new();
    };
    match serde_json::from_str(text) {
        Ok(list) => list,
        Err(e) => {
            warn!("Discarding corrupt history '{}': {}", key, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::TimeZone;

    const KEYS: StorageKeys = StorageKeys {
        current: keys::ULCI_CURRENT,
        history: Some(keys::ULCI_HISTORY),
    };

    fn store(cap: usize) -> RecordStore {
        RecordStore::new(Arc::new(MemoryStorage::new()), cap)
    }

    fn record(n: i64) -> PersistedRecord {
        let form = FormModel::new().with("name", format!("Member {}", n)).with("scoreE", n);
        PersistedRecord::from_form(&form, Utc.timestamp_opt(1_700_000_000 + n, 0).unwrap())
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let store = store(DEFAULT_HISTORY_CAP);
        let rec = record(1);
        store.save(&KEYS, &rec).await.unwrap();
        assert_eq!(store.load(keys::ULCI_CURRENT).await.unwrap(), LoadOutcome::Found(rec));
    }

    #[tokio::test]
    async fn test_never_saved_is_not_found() {
        let store = store(DEFAULT_HISTORY_CAP);
        assert_eq!(store.load(keys::MENTOR).await.unwrap(), LoadOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_malformed_is_corrupt() {
        let backend = Arc::new(MemoryStorage::new());
        backend.set(keys::PARENT, "{not json").await.unwrap();
        let store = RecordStore::new(backend, 50);
        assert!(matches!(
            store.load(keys::PARENT).await.unwrap(),
            LoadOutcome::Corrupt { .. }
        ));
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_capped() {
        let store = store(3);
        for n in 1..=5 {
            store.save(&KEYS, &record(n)).await.unwrap();
        }
        let history = store.history(keys::ULCI_HISTORY).await.unwrap();
        let names: Vec<_> = history.iter().filter_map(|r| r.fields.text("name")).collect();
        assert_eq!(names, vec!["Member 5", "Member 4", "Member 3"]);
    }

    #[tokio::test]
    async fn test_default_cap_drops_oldest_of_fifty_one() {
        let store = store(DEFAULT_HISTORY_CAP);
        for n in 1..=51 {
            store.save(&KEYS, &record(n)).await.unwrap();
        }
        let history = store.history(keys::ULCI_HISTORY).await.unwrap();
        assert_eq!(history.len(), 50);
        assert_eq!(history[0], record(51));
        assert_eq!(history[49], record(2));
        assert!(!history.contains(&record(1)));
    }

    #[tokio::test]
    async fn test_history_entry_by_index() {
        let store = store(DEFAULT_HISTORY_CAP);
        for n in 1..=3 {
            store.save(&KEYS, &record(n)).await.unwrap();
        }
        assert_eq!(
            store.history_entry(keys::ULCI_HISTORY, 2).await.unwrap(),
            LoadOutcome::Found(record(1))
        );
        assert_eq!(
            store.history_entry(keys::ULCI_HISTORY, 3).await.unwrap(),
            LoadOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_quota_failure_leaves_both_keys_unchanged() {
        let store = RecordStore::new(Arc::new(MemoryStorage::with_quota(600)), DEFAULT_HISTORY_CAP);
        store.save(&KEYS, &record(1)).await.unwrap();

        let big_form = FormModel::new().with("name", "x".repeat(500));
        let big = PersistedRecord::from_form(&big_form, Utc::now());
        let err = store.save(&KEYS, &big).await.unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { .. }));

        assert_eq!(store.load(keys::ULCI_CURRENT).await.unwrap(), LoadOutcome::Found(record(1)));
        assert_eq!(store.history(keys::ULCI_HISTORY).await.unwrap(), vec![record(1)]);
    }

    /// Memory backend whose writes to one key always fail
    struct RefusingKey {
        inner: MemoryStorage,
        key: &'static str,
    }

    #[async_trait]
    impl StorageBackend for RefusingKey {
        fn name(&self) -> &str {
            "refusing"
        }

        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            if key == self.key {
                return Err(Error::Internal(format!("write to '{}' refused", key)));
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_current_write_restores_history() {
        let inner = MemoryStorage::new();
        let earlier = serde_json::to_string(&vec![record(1)]).unwrap();
        inner.set(keys::ULCI_HISTORY, &earlier).await.unwrap();
        let backend = Arc::new(RefusingKey {
            inner,
            key: keys::ULCI_CURRENT,
        });
        let store = RecordStore::new(backend.clone(), DEFAULT_HISTORY_CAP);

        assert!(store.save(&KEYS, &record(2)).await.is_err());
        assert_eq!(backend.get(keys::ULCI_HISTORY).await.unwrap(), Some(earlier));
        assert_eq!(store.load(keys::ULCI_CURRENT).await.unwrap(), LoadOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_failed_first_save_leaves_no_history() {
        let backend = Arc::new(RefusingKey {
            inner: MemoryStorage::new(),
            key: keys::ULCI_CURRENT,
        });
        let store = RecordStore::new(backend.clone(), DEFAULT_HISTORY_CAP);

        assert!(store.save(&KEYS, &record(1)).await.is_err());
        assert_eq!(backend.get(keys::ULCI_HISTORY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_timestamp_form_field_does_not_corrupt_record() {
        let store = store(DEFAULT_HISTORY_CAP);
        let form = FormModel::new()
            .with("name", "Asha")
            .with(TIMESTAMP_FIELD, "yesterday");
        let rec = PersistedRecord::from_form(&form, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        assert!(rec.fields.get(TIMESTAMP_FIELD).is_none());

        store.save(&KEYS, &rec).await.unwrap();
        assert_eq!(store.load(keys::ULCI_CURRENT).await.unwrap(), LoadOutcome::Found(rec.clone()));
        assert_eq!(store.history(keys::ULCI_HISTORY).await.unwrap(), vec![rec]);
    }

    #[tokio::test]
    async fn test_corrupt_history_reads_empty() {
        let backend = Arc::new(MemoryStorage::new());
        backend.set(keys::ULCI_HISTORY, "[{]").await.unwrap();
        let store = RecordStore::new(backend, 50);
        assert!(store.history(keys::ULCI_HISTORY).await.unwrap().is_empty());

        store.save(&KEYS, &record(1)).await.unwrap();
        assert_eq!(store.history(keys::ULCI_HISTORY).await.unwrap().len(), 1);
    }

    #[test]
    fn test_record_moves_attachments_out_of_fields() {
        let form = FormModel::new()
            .with("name", "Asha")
            .with(PHOTO_FIELD, "data:image/png;base64,AAAA")
            .with(SIGNATURE_FIELD, "");
        let rec = PersistedRecord::from_form(&form, Utc::now());
        assert!(rec.fields.get(PHOTO_FIELD).is_none());
        assert_eq!(rec.photo.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(rec.signature, None);
        assert_eq!(rec.to_form().text(PHOTO_FIELD).as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_record_json_shape() {
        let rec = record(7);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["name"], "Member 7");
        assert_eq!(json["scoreE"], 7.0);
        assert!(json.get("photo").is_none());
        assert!(json["timestamp"].as_str().unwrap().starts_with("2023-11-14T"));
    }
}
