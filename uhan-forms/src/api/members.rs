//! DAO member registry endpoints
//!
//! The member table pages by 10 rows and sorts on any column, ascending or
//! descending. `q` filters by name, ULP id, email or village.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use uhan_common::members::{
    verification_url, ListQuery, Member, MemberInput, MemberPage, MemberStats,
};
use uhan_common::qr::QrSlot;

use crate::{ApiError, ApiResult, AppState};

/// GET /api/members
pub async fn list_members(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<MemberPage> {
    Json(state.members.list(&query).await)
}

/// POST /api/members
pub async fn create_member(
    State(state): State<AppState>,
    Json(input): Json<MemberInput>,
) -> ApiResult<(StatusCode, Json<Member>)> {
    let member = state.members.add(input).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// GET /api/members/:id
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Member>> {
    state
        .members
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Member not found: {}", id)))
}

/// PUT /api/members/:id
///
/// Fields left out of the body keep their current values.
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<MemberInput>,
) -> ApiResult<Json<Member>> {
    Ok(Json(state.members.update(&id, input).await?))
}

/// DELETE /api/members/:id
pub async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.members.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/members/stats
pub async fn member_stats(State(state): State<AppState>) -> Json<MemberStats> {
    Json(state.members.stats().await)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberQrResponse {
    pub member_id: String,
    pub verification_url: String,
    pub qr: QrSlot,
}

/// GET /api/members/:id/qr
pub async fn member_qr(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MemberQrResponse>> {
    let qr = state.members.qr(&id, state.qr.as_ref()).await?;
    let member = state
        .members
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Member not found: {}", id)))?;

    Ok(Json(MemberQrResponse {
        member_id: member.id,
        verification_url: verification_url(&member.ulp_id),
        qr,
    }))
}
