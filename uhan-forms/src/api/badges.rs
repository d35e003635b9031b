//! Badge verification

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use uhan_common::pages::{find_badge, verification_url};
use uhan_common::storage::PersistedRecord;

use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeVerification {
    pub badge_id: String,
    pub verified: bool,
    pub verification_url: String,
    pub record: PersistedRecord,
}

/// GET /api/badges/:id/verify
///
/// 404 unless a saved badge carries this id.
pub async fn verify_badge(
    State(state): State<AppState>,
    Path(badge_id): Path<String>,
) -> ApiResult<Json<BadgeVerification>> {
    let record = find_badge(&state.store, &badge_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No saved badge with id {}", badge_id)))?;

    info!("Verified badge {}", badge_id);
    Ok(Json(BadgeVerification {
        verification_url: verification_url(&badge_id),
        badge_id,
        verified: true,
        record,
    }))
}
