//! Form session: the single owner of one page's form state
//!
//! Field edits go through [`FormSession::update`], which merges the values and
//! schedules a debounced recompute. Every recompute takes a sequence ticket
//! and publishes its [`RenderedForm`] on a watch channel only if no newer
//! ticket was issued meanwhile, so subscribers never see a preview older than
//! the one already shown.
//!
//! A session remembers when it was last used so an owner can expire sessions
//! nobody is driving any more.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::debounce::Debouncer;
use crate::events::{EventBus, FormEvent};
use crate::export::{export_preview, DocumentPacker, ExportError, ExportedDocument, Rasterizer};
use crate::form::FormModel;
use crate::pages::{PageDefinition, PageKind, RenderedForm};
use crate::qr::QrRenderer;
use crate::sequence::RecomputeSequencer;
use crate::storage::{LoadOutcome, PersistedRecord, RecordStore};
use crate::time;
use crate::validation::ValidationReport;
use crate::Result;

/// Default quiet period before a recompute
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Result of [`FormSession::save`]
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(PersistedRecord),
    /// Nothing was written
    Rejected(ValidationReport),
}

struct Shared {
    id: Uuid,
    page: &'static PageDefinition,
    form: Mutex<FormModel>,
    sequencer: RecomputeSequencer,
    tx: watch::Sender<RenderedForm>,
    qr: Arc<dyn QrRenderer>,
    events: Option<EventBus>,
}

impl Shared {
    fn emit(&self, event: FormEvent) {
        if let Some(bus) = &self.events {
            bus.emit_lossy(event);
        }
    }

    /// Render the current form and publish it unless a newer ticket exists
    async fn recompute(&self) -> Option<RenderedForm> {
        let ticket = self.sequencer.issue();
        let form = self.form.lock().await.clone();
        let page = self.page;
        let qr = Arc::clone(&self.qr);
        let at = time::now();

        let mut rendered =
            match tokio::task::spawn_blocking(move || page.render(&form, qr.as_ref(), at)).await {
                Ok(rendered) => rendered,
                Err(e) => {
                    error!("Recompute #{} for {} failed: {}", ticket.value(), page.kind, e);
                    return None;
                }
            };
        rendered.sequence = ticket.value();

        let published = self.tx.send_if_modified(|current| {
            if self.sequencer.is_latest(ticket) && current.sequence < rendered.sequence {
                *current = rendered.clone();
                true
            } else {
                false
            }
        });

        if !published {
            debug!(
                "Dropping stale recompute #{} for session {} (latest #{})",
                ticket.value(),
                self.id,
                self.sequencer.latest()
            );
            return None;
        }

        debug!(
            "Session {} published #{}: {:.1}%",
            self.id, rendered.sequence, rendered.score.percentage
        );
        self.emit(FormEvent::PreviewUpdated {
            session_id: self.id,
            page: page.kind,
            sequence: rendered.sequence,
            total: rendered.score.total,
            percentage: rendered.score.percentage,
            category: rendered.score.category().map(str::to_string),
            timestamp: rendered.rendered_at,
        });
        Some(rendered)
    }
}

/// Clears the in-flight flag when an export finishes, however it ends
struct ExportGuard<'a>(&'a AtomicBool);

impl<'a> ExportGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExportGuard(flag))
    }
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One open form
///
/// Must be created inside a tokio runtime; the debounce timer runs as a task
/// that stops when the session is dropped.
pub struct FormSession {
    shared: Arc<Shared>,
    store: RecordStore,
    debouncer: Debouncer<()>,
    exporting: AtomicBool,
    opened: Instant,
    /// Milliseconds after `opened` of the last [`FormSession::touch`]
    last_active_ms: AtomicU64,
}

impl FormSession {
    pub fn new(
        kind: PageKind,
        store: RecordStore,
        qr: Arc<dyn QrRenderer>,
        debounce: Duration,
        events: Option<EventBus>,
    ) -> Self {
        let page = kind.definition();
        let opened_at = time::now();
        let mut form = FormModel::new();
        page.seed_identifiers(&mut form, opened_at);
        let initial = page.render(&form, qr.as_ref(), opened_at);
        let (tx, _) = watch::channel(initial);

        let shared = Arc::new(Shared {
            id: Uuid::new_v4(),
            page,
            form: Mutex::new(form),
            sequencer: RecomputeSequencer::new(),
            tx,
            qr,
            events,
        });

        let handler_shared = Arc::clone(&shared);
        let debouncer = Debouncer::new(debounce, move |()| {
            let shared = Arc::clone(&handler_shared);
            async move {
                shared.recompute().await;
            }
        });

        shared.emit(FormEvent::SessionOpened {
            session_id: shared.id,
            page: kind,
            timestamp: time::now(),
        });
        info!("Opened {} session {}", kind, shared.id);

        Self {
            shared,
            store,
            debouncer,
            exporting: AtomicBool::new(false),
            opened: Instant::now(),
            last_active_ms: AtomicU64::new(0),
        }
    }

    /// Mark the session as used now
    pub fn touch(&self) {
        let elapsed = self.opened.elapsed().as_millis();
        self.last_active_ms
            .store(u64::try_from(elapsed).unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    /// Time since the last [`touch`](Self::touch), or since opening
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_active_ms.load(Ordering::Relaxed));
        self.opened.elapsed().saturating_sub(last)
    }

    /// Someone is still streaming this session's previews
    pub fn has_subscribers(&self) -> bool {
        self.shared.tx.receiver_count() > 0
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn kind(&self) -> PageKind {
        self.shared.page.kind
    }

    pub fn page(&self) -> &'static PageDefinition {
        self.shared.page
    }

    /// Snapshot of the current form
    pub async fn form(&self) -> FormModel {
        self.shared.form.lock().await.clone()
    }

    /// Merge `fields` into the form and schedule a debounced recompute
    pub async fn update(&self, fields: FormModel) {
        self.shared.form.lock().await.merge(fields);
        self.debouncer.trigger(());
    }

    /// Recompute immediately, bypassing the debounce
    ///
    /// Returns the latest published render, which is this call's own unless
    /// a newer recompute overtook it.
    pub async fn recompute_now(&self) -> RenderedForm {
        match self.shared.recompute().await {
            Some(rendered) => rendered,
            None => self.latest(),
        }
    }

    /// Most recently published render
    pub fn latest(&self) -> RenderedForm {
        self.shared.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderedForm> {
        self.shared.tx.subscribe()
    }

    pub async fn validate(&self) -> ValidationReport {
        self.shared.page.validate(&*self.shared.form.lock().await)
    }

    /// Validate and persist the current form
    ///
    /// Works on the raw form only, so QR or preview failures never block it.
    pub async fn save(&self) -> Result<SaveOutcome> {
        let page = self.shared.page;
        let form = self.form().await;

        let report = page.validate(&form);
        if !report.is_valid() {
            warn!("Not saving {} session {}: {}", page.kind, self.id(), report.summary());
            self.shared.emit(FormEvent::SaveRejected {
                session_id: self.id(),
                page: page.kind,
                fields: report.errors.iter().map(|e| e.field.clone()).collect(),
                timestamp: time::now(),
            });
            return Ok(SaveOutcome::Rejected(report));
        }

        let record = PersistedRecord::from_form(&form, time::now());
        if let Err(e) = self.store.save(&page.keys, &record).await {
            error!("Saving {} to {} failed: {}", page.kind, self.store.backend_name(), e);
            return Err(e);
        }

        info!("Saved {} under '{}'", page.kind, page.keys.current);
        self.shared.emit(FormEvent::RecordSaved {
            session_id: self.id(),
            page: page.kind,
            key: page.keys.current.to_string(),
            timestamp: record.timestamp,
        });
        Ok(SaveOutcome::Saved(record))
    }

    /// Replace the form with the saved record, if there is a usable one
    pub async fn load(&self) -> Result<LoadOutcome> {
        let outcome = self.store.load(self.shared.page.keys.current).await?;
        self.apply_loaded(&outcome).await;
        Ok(outcome)
    }

    /// Replace the form with history entry `index` (0 = newest)
    ///
    /// Pages without a history always report `NotFound`.
    pub async fn load_history(&self, index: usize) -> Result<LoadOutcome> {
        let outcome = match self.shared.page.keys.history {
            Some(key) => self.store.history_entry(key, index).await?,
            None => LoadOutcome::NotFound,
        };
        self.apply_loaded(&outcome).await;
        Ok(outcome)
    }

    async fn apply_loaded(&self, outcome: &LoadOutcome) {
        let page = self.shared.page;
        match outcome {
            LoadOutcome::Found(record) => {
                *self.shared.form.lock().await = record.to_form();
                self.recompute_now().await;
                self.shared.emit(FormEvent::RecordLoaded {
                    session_id: self.id(),
                    page: page.kind,
                    timestamp: time::now(),
                });
            }
            LoadOutcome::NotFound => debug!("No saved {} record", page.kind),
            LoadOutcome::Corrupt { reason } => {
                warn!("Saved {} record is unreadable: {}", page.kind, reason)
            }
        }
    }

    /// Saved history, newest first; empty for pages without one
    pub async fn history(&self) -> Result<Vec<PersistedRecord>> {
        match self.shared.page.keys.history {
            Some(key) => self.store.history(key).await,
            None => Ok(Vec::new()),
        }
    }

    /// Clear every field, issue fresh identifiers and publish the preview
    pub async fn reset(&self) -> RenderedForm {
        let mut form = FormModel::new();
        self.shared.page.seed_identifiers(&mut form, time::now());
        *self.shared.form.lock().await = form;
        self.recompute_now().await
    }

    /// Rasterize the page's export target and pack it into a PDF
    ///
    /// Only one export per session may run at a time; a second request while
    /// one is in flight fails with [`ExportError::InProgress`].
    pub async fn export(
        &self,
        rasterizer: &dyn Rasterizer,
        packer: &dyn DocumentPacker,
    ) -> std::result::Result<ExportedDocument, ExportError> {
        let _guard = ExportGuard::acquire(&self.exporting).ok_or(ExportError::InProgress)?;

        let page = self.shared.page;
        let spec = &page.export;
        let file_name = spec.file_name(&self.form().await, time::now());

        let result = export_preview(rasterizer, packer, spec.target, spec.format, file_name).await;
        match &result {
            Ok(doc) => self.shared.emit(FormEvent::ExportCompleted {
                session_id: self.id(),
                page: page.kind,
                file_name: doc.file_name.clone(),
                page_count: doc.page_count,
                timestamp: time::now(),
            }),
            Err(e) => {
                error!("Export of {} session {} failed: {}", page.kind, self.id(), e);
                self.shared.emit(FormEvent::ExportFailed {
                    session_id: self.id(),
                    page: page.kind,
                    message: e.to_string(),
                    timestamp: time::now(),
                });
            }
        }
        result
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::Acquire)
    }
}

impl Drop for FormSession {
    fn drop(&mut self) {
        self.shared.emit(FormEvent::SessionClosed {
            session_id: self.shared.id,
            timestamp: time::now(),
        });
    }
}
