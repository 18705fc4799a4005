use axum::Json;
use axum::extract::State;

use crate::dto::SweepResponse;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn sweep_handler(State(state): State<AppState>) -> ApiResult<Json<SweepResponse>> {
    let report = state.sweeper.sweep_once().await?;

    Ok(Json(SweepResponse::from(report)))
}
