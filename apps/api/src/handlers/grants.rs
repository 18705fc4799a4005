use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use gatelease_application::GrantRequest;
use gatelease_core::GrantId;

use crate::dto::{CreateGrantRequest, GrantResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_grant_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateGrantRequest>,
) -> ApiResult<(StatusCode, Json<GrantResponse>)> {
    let grant = state
        .lifecycle_service
        .grant(GrantRequest {
            requester: payload.requester,
            source_address: payload.source_address,
            port: payload.port,
            reason: payload.reason,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(GrantResponse::from(grant))))
}

pub async fn list_grants_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<GrantResponse>>> {
    let grants = state
        .lifecycle_service
        .list()
        .await?
        .into_iter()
        .map(GrantResponse::from)
        .collect();

    Ok(Json(grants))
}

pub async fn get_grant_handler(
    State(state): State<AppState>,
    Path(grant_id): Path<String>,
) -> ApiResult<Json<GrantResponse>> {
    let grant_id = GrantId::from_str(grant_id.as_str())?;
    let grant = state.lifecycle_service.get(grant_id).await?;

    Ok(Json(GrantResponse::from(grant)))
}

pub async fn revoke_grant_handler(
    State(state): State<AppState>,
    Path(grant_id): Path<String>,
) -> ApiResult<StatusCode> {
    let grant_id = GrantId::from_str(grant_id.as_str())?;
    state.lifecycle_service.revoke(grant_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
