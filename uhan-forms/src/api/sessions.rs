//! Form sessions: live previews, save/load and PDF export

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use uhan_common::export::{ClientBitmapRasterizer, ClientCapture, LopdfPacker};
use uhan_common::session::SaveOutcome;
use uhan_common::storage::{LoadOutcome, PersistedRecord};
use uhan_common::{FormModel, FormSession, PageKind, RenderedForm};

use super::pages::parse_page;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub page: PageKind,
    pub form: FormModel,
    pub rendered: RenderedForm,
    pub exporting: bool,
}

impl SessionResponse {
    async fn of(session: &FormSession) -> Self {
        Self {
            session_id: session.id(),
            page: session.kind(),
            form: session.form().await,
            rendered: session.latest(),
            exporting: session.is_exporting(),
        }
    }
}

/// POST /api/pages/:page/sessions
///
/// An optional body pre-fills the form and is rendered before returning.
pub async fn open_session(
    State(state): State<AppState>,
    Path(page): Path<String>,
    body: Option<Json<FormModel>>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let kind = parse_page(&page)?;
    let session = Arc::new(FormSession::new(
        kind,
        state.store.clone(),
        Arc::clone(&state.qr),
        state.forms.debounce(),
        Some(state.events.clone()),
    ));

    if let Some(Json(fields)) = body {
        if !fields.is_empty() {
            session.update(fields).await;
            session.recompute_now().await;
        }
    }

    state
        .sessions
        .write()
        .await
        .insert(session.id(), Arc::clone(&session));

    Ok((StatusCode::CREATED, Json(SessionResponse::of(&session).await)))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.session(id).await?;
    Ok(Json(SessionResponse::of(&session).await))
}

/// DELETE /api/sessions/:id
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or(ApiError::SessionNotFound(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/sessions/:id/fields
///
/// Merges the fields and schedules a debounced recompute; the new preview
/// arrives on the session event stream.
pub async fn update_fields(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(fields): Json<FormModel>,
) -> ApiResult<StatusCode> {
    let session = state.session(id).await?;
    session.update(fields).await;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/sessions/:id/recompute
pub async fn recompute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RenderedForm>> {
    let session = state.session(id).await?;
    Ok(Json(session.recompute_now().await))
}

fn preview_event(rendered: &RenderedForm) -> Option<Event> {
    match Event::default().event("preview").json_data(rendered) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("SSE: failed to serialize preview {}: {}", rendered.sequence, e);
            None
        }
    }
}

/// GET /api/sessions/:id/events
///
/// Sends the current preview, then every newer one. Ends when the session
/// is closed.
pub async fn session_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let session = state.session(id).await?;
    let mut rx = session.subscribe();
    drop(session);
    debug!("SSE client subscribed to session {}", id);

    let stream = async_stream::stream! {
        let current = rx.borrow_and_update().clone();
        if let Some(event) = preview_event(&current) {
            yield Ok(event);
        }
        while rx.changed().await.is_ok() {
            let rendered = rx.borrow_and_update().clone();
            if let Some(event) = preview_event(&rendered) {
                yield Ok(event);
            }
        }
        debug!("SSE: session {} stream ended", id);
    };

    Ok(Sse::new(stream).keep_alive(uhan_common::sse::keep_alive()))
}

/// POST /api/sessions/:id/save
///
/// 422 with per-field errors when required fields are missing.
pub async fn save_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PersistedRecord>> {
    let session = state.session(id).await?;
    match session.save().await? {
        SaveOutcome::Saved(record) => Ok(Json(record)),
        SaveOutcome::Rejected(report) => Err(ApiError::Validation(report)),
    }
}

/// An unreadable saved record is reported like a missing one
async fn loaded_response(session: &FormSession, outcome: LoadOutcome) -> ApiResult<Json<SessionResponse>> {
    match outcome {
        LoadOutcome::Found(_) => Ok(Json(SessionResponse::of(session).await)),
        LoadOutcome::NotFound => Err(ApiError::NotFound(format!(
            "No saved {} record",
            session.kind()
        ))),
        LoadOutcome::Corrupt { reason } => Err(ApiError::NotFound(format!(
            "Saved {} record is unreadable: {}",
            session.kind(),
            reason
        ))),
    }
}

/// POST /api/sessions/:id/load
pub async fn load_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.session(id).await?;
    let outcome = session.load().await?;
    loaded_response(&session, outcome).await
}

/// POST /api/sessions/:id/history/:index/load
///
/// Index 0 is the newest saved record.
pub async fn load_history_entry(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.session(id).await?;
    let outcome = session.load_history(index).await?;
    loaded_response(&session, outcome).await
}

/// POST /api/sessions/:id/export
///
/// Body is the client's capture of the page's export target. Answers with
/// the PDF as an attachment.
pub async fn export_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(capture): Json<ClientCapture>,
) -> ApiResult<Response> {
    let session = state.session(id).await?;
    let rasterizer = ClientBitmapRasterizer::new(Some(capture));
    let doc = session.export(&rasterizer, &LopdfPacker).await?;

    info!("Sending {} ({} bytes)", doc.file_name, doc.bytes.len());
    let disposition = format!("attachment; filename=\"{}\"", doc.file_name);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        doc.bytes,
    )
        .into_response())
}
