//! HTTP handlers for declared-delivery endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use shared::types::ApiResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::livraison::{
    DeclareLivraisonInput, LivraisonDetail, LivraisonFilters, LivraisonService,
};
use crate::services::reconciliation::{
    ComparaisonResultat, ReconciliationFilters, ReconciliationService,
};
use crate::AppState;

/// Declare a delivery (no stock effect)
pub async fn declare_livraison(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<DeclareLivraisonInput>,
) -> AppResult<Json<ApiResponse<LivraisonDetail>>> {
    let service = LivraisonService::new(state.db);
    let livraison = service.declarer(current_user.0.user_id, input).await?;
    Ok(Json(ApiResponse::ok_with_message(
        livraison,
        "Livraison déclarée avec succès",
    )))
}

/// List declared deliveries with filters
pub async fn list_livraisons(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filters): Query<LivraisonFilters>,
) -> AppResult<Json<ApiResponse<Vec<LivraisonDetail>>>> {
    let service = LivraisonService::new(state.db);
    let livraisons = service
        .lister(current_user.0.magasin_scope(), &filters)
        .await?;
    Ok(Json(ApiResponse::ok(livraisons)))
}

/// Compare declared deliveries against warehouse entry records
pub async fn get_comparaison_livraisons(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filters): Query<ReconciliationFilters>,
) -> AppResult<Json<ApiResponse<ComparaisonResultat>>> {
    let service = ReconciliationService::new(state.db);
    let comparaison = service
        .comparaison_livraisons(current_user.0.magasin_scope(), &filters)
        .await?;
    Ok(Json(ApiResponse::ok(comparaison)))
}
