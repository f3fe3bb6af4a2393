//! HTTP handlers for the écart report endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use shared::types::ApiResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::reconciliation::{RapportEcarts, ReconciliationFilters, ReconciliationService};
use crate::AppState;

/// Dispatch vs entry vs exit report, per warehouse/product/day
pub async fn get_rapport_ecarts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filters): Query<ReconciliationFilters>,
) -> AppResult<Json<ApiResponse<RapportEcarts>>> {
    let service = ReconciliationService::new(state.db);
    let rapport = service.rapport_ecarts(&filters).await?;
    Ok(Json(ApiResponse::ok(rapport)))
}
