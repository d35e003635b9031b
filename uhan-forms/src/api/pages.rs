//! Page catalog, stateless scoring and saved history

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;

use uhan_common::events::FormEvent;
use uhan_common::pages::PageSummary;
use uhan_common::storage::PersistedRecord;
use uhan_common::{time, FormModel, PageKind, RenderedForm};

use crate::{ApiError, ApiResult, AppState};

pub(crate) fn parse_page(slug: &str) -> ApiResult<PageKind> {
    Ok(slug.parse::<PageKind>()?)
}

/// GET /api/pages
pub async fn list_pages() -> Json<Vec<PageSummary>> {
    Json(
        PageKind::ALL
            .iter()
            .map(|kind| kind.definition().summary())
            .collect(),
    )
}

/// POST /api/pages/:page/score
///
/// Score, preview and QR for the posted fields without opening a session.
pub async fn score_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
    Json(form): Json<FormModel>,
) -> ApiResult<Json<RenderedForm>> {
    let kind = parse_page(&page)?;
    let rendered = kind.definition().render(&form, state.qr.as_ref(), time::now());
    Ok(Json(rendered))
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub page: PageKind,
    pub key: Option<&'static str>,
    pub records: Vec<PersistedRecord>,
}

/// GET /api/pages/:page/history
///
/// Newest first. Pages that keep no history answer with an empty list.
pub async fn get_history(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> ApiResult<Json<HistoryResponse>> {
    let kind = parse_page(&page)?;
    let key = kind.definition().keys.history;
    let records = match key {
        Some(key) => state.store.history(key).await?,
        None => Vec::new(),
    };
    Ok(Json(HistoryResponse {
        page: kind,
        key,
        records,
    }))
}

/// DELETE /api/pages/:page/history
pub async fn clear_history(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> ApiResult<StatusCode> {
    let kind = parse_page(&page)?;
    let key = kind
        .definition()
        .keys
        .history
        .ok_or_else(|| ApiError::BadRequest(format!("Page {} keeps no history", kind)))?;

    state.store.clear(key).await?;
    info!("Cleared {} history", kind);
    state.events.emit_lossy(FormEvent::HistoryCleared {
        page: kind,
        timestamp: time::now(),
    });
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/pages/:page/saved
///
/// Drops the page's current saved record. History is left alone.
pub async fn clear_saved(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> ApiResult<StatusCode> {
    let kind = parse_page(&page)?;
    state.store.clear(kind.definition().keys.current).await?;
    info!("Cleared saved {} record", kind);
    Ok(StatusCode::NO_CONTENT)
}
