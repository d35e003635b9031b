//! uhan-forms library - HTTP service for the UHAN assessment forms
//!
//! Serves the form pages, their live preview sessions, PDF export and the
//! DAO member registry over one axum router.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use uhan_common::config::FormsConfig;
use uhan_common::events::EventBus;
use uhan_common::members::MemberRegistry;
use uhan_common::qr::{QrRenderer, SvgQrRenderer};
use uhan_common::storage::{FallbackStorage, RecordStore, StorageBackend};
use uhan_common::FormSession;

pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Broadcast buffer for service-wide events
pub const EVENT_CAPACITY: usize = 256;

/// Request body cap; client captures of a full A4 preview run to several MB
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Longest pause between two idle-session sweeps
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Open form sessions by id
pub type SessionMap = Arc<RwLock<HashMap<Uuid, Arc<FormSession>>>>;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub events: EventBus,
    pub sessions: SessionMap,
    pub members: Arc<MemberRegistry>,
    pub qr: Arc<dyn QrRenderer>,
    pub forms: FormsConfig,
}

impl AppState {
    /// Create application state over `backend`, loading the member list
    pub async fn new(backend: Arc<dyn StorageBackend>, forms: FormsConfig) -> uhan_common::Result<Self> {
        let store = RecordStore::new(backend, forms.history_cap);
        let events = EventBus::new(EVENT_CAPACITY);
        let members = MemberRegistry::load(store.clone(), Some(events.clone())).await?;

        Ok(Self {
            store,
            events,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            members: Arc::new(members),
            qr: Arc::new(SvgQrRenderer),
            forms,
        })
    }

    /// Look up an open session and mark it as used
    pub async fn session(&self, id: Uuid) -> ApiResult<Arc<FormSession>> {
        let session = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ApiError::SessionNotFound(id))?;
        session.touch();
        Ok(session)
    }

    /// Close sessions unused for at least `idle` that nobody is streaming;
    /// returns how many were closed
    pub async fn expire_idle_sessions(&self, idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let idle_for = session.idle_for();
            let keep = session.has_subscribers() || idle_for < idle;
            if !keep {
                info!("Closing idle {} session {} ({}s unused)", session.kind(), id, idle_for.as_secs());
            }
            keep
        });
        before - sessions.len()
    }
}

/// Periodically close sessions idle for longer than `forms.session_idle`
pub fn spawn_session_reaper(state: AppState) -> JoinHandle<()> {
    let idle = state.forms.session_idle();
    let period = (idle / 4).clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    info!("Closing sessions idle for {:?} (checked every {:?})", idle, period);

    tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            let closed = state.expire_idle_sessions(idle).await;
            if closed > 0 {
                debug!("Idle sweep closed {} session(s)", closed);
            }
        }
    })
}

/// Storage for the service: `local` alone, or `remote` first with `local` as
/// the fallback when one is configured
pub fn storage_backend(
    local: Arc<dyn StorageBackend>,
    remote: Option<Arc<dyn StorageBackend>>,
    forms: &FormsConfig,
) -> Arc<dyn StorageBackend> {
    match remote {
        Some(remote) => {
            info!(
                "Using {} storage with {} fallback ({:?} timeout)",
                remote.name(),
                local.name(),
                forms.remote_timeout()
            );
            Arc::new(FallbackStorage::new(remote, local, forms.remote_timeout()))
        }
        None => {
            info!("Using {} storage", local.name());
            local
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, patch, post};

    let pages = Router::new()
        .route("/api/pages", get(api::list_pages))
        .route("/api/pages/:page/score", post(api::score_page))
        .route(
            "/api/pages/:page/history",
            get(api::get_history).delete(api::clear_history),
        )
        .route("/api/pages/:page/saved", delete(api::clear_saved))
        .route("/api/pages/:page/sessions", post(api::open_session));

    let sessions = Router::new()
        .route(
            "/api/sessions/:id",
            get(api::get_session).delete(api::close_session),
        )
        .route("/api/sessions/:id/fields", patch(api::update_fields))
        .route("/api/sessions/:id/recompute", post(api::recompute))
        .route("/api/sessions/:id/events", get(api::session_events))
        .route("/api/sessions/:id/save", post(api::save_session))
        .route("/api/sessions/:id/load", post(api::load_session))
        .route(
            "/api/sessions/:id/history/:index/load",
            post(api::load_history_entry),
        )
        .route("/api/sessions/:id/export", post(api::export_session));

    let members = Router::new()
        .route("/api/members", get(api::list_members).post(api::create_member))
        .route("/api/members/stats", get(api::member_stats))
        .route(
            "/api/members/:id",
            get(api::get_member)
                .put(api::update_member)
                .delete(api::delete_member),
        )
        .route("/api/members/:id/qr", get(api::member_qr));

    let badges = Router::new().route("/api/badges/:id/verify", get(api::verify_badge));

    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/events", get(api::event_stream))
        .merge(api::health_routes());

    Router::new()
        .merge(pages)
        .merge(sessions)
        .merge(members)
        .merge(badges)
        .merge(public)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
