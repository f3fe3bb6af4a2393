//! HTTP handlers for warehouse movement endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use shared::types::ApiResponse;

use crate::error::AppResult;
use crate::middleware::{exiger_role, CurrentUser, UserRole};
use crate::services::mouvement::{
    CreateMouvementInput, MouvementDetail, MouvementFilters, MouvementService,
};
use crate::AppState;

/// Record a warehouse entry or exit (operators only)
pub async fn record_mouvement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMouvementInput>,
) -> AppResult<Json<ApiResponse<MouvementDetail>>> {
    exiger_role(&current_user.0, &[UserRole::Admin, UserRole::Operator])?;

    let service = MouvementService::new(state.db);
    let mouvement = service.enregistrer(current_user.0.user_id, input).await?;
    Ok(Json(ApiResponse::ok_with_message(
        mouvement,
        "Mouvement enregistré avec succès",
    )))
}

/// List movements with filters
pub async fn list_mouvements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filters): Query<MouvementFilters>,
) -> AppResult<Json<ApiResponse<Vec<MouvementDetail>>>> {
    let service = MouvementService::new(state.db);
    let mouvements = service
        .lister(current_user.0.magasin_scope(), &filters)
        .await?;
    Ok(Json(ApiResponse::ok(mouvements)))
}
