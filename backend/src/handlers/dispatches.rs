//! HTTP handlers for dispatch endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::types::ApiResponse;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{exiger_role, AuthUser, CurrentUser, UserRole};
use crate::services::dispatch::{
    CreateDispatchInput, DispatchAvecRotations, DispatchDetail, DispatchFilters,
    DispatchProgression, DispatchScope, DispatchService,
};
use crate::AppState;

/// Visibility scope for the caller: managers see their own dispatches,
/// operators the ones destined to their warehouse.
fn scope_for(user: &AuthUser) -> DispatchScope {
    DispatchScope {
        manager_id: (user.role == UserRole::Manager).then_some(user.user_id),
        magasin_destination_id: user.magasin_scope(),
    }
}

/// Create a dispatch, reserving stock on the source warehouse
pub async fn create_dispatch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateDispatchInput>,
) -> AppResult<Json<ApiResponse<DispatchDetail>>> {
    exiger_role(&current_user.0, &[UserRole::Admin, UserRole::Manager])?;

    let service = DispatchService::new(state.db);
    let dispatch = service.creer_dispatch(current_user.0.user_id, input).await?;
    Ok(Json(ApiResponse::ok_with_message(
        dispatch,
        "Dispatch créé avec succès",
    )))
}

/// List dispatches with filters
pub async fn list_dispatches(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filters): Query<DispatchFilters>,
) -> AppResult<Json<ApiResponse<Vec<DispatchDetail>>>> {
    let service = DispatchService::new(state.db);
    let dispatches = service
        .lister_dispatches(scope_for(&current_user.0), &filters)
        .await?;
    Ok(Json(ApiResponse::ok(dispatches)))
}

/// Get a dispatch with its rotations
pub async fn get_dispatch(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(dispatch_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DispatchAvecRotations>>> {
    let service = DispatchService::new(state.db);
    let dispatch = service.get_dispatch(dispatch_id).await?;
    Ok(Json(ApiResponse::ok(dispatch)))
}

/// Cancel a pending dispatch and release its reservation
pub async fn cancel_dispatch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(dispatch_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DispatchDetail>>> {
    exiger_role(&current_user.0, &[UserRole::Admin, UserRole::Manager])?;

    let service = DispatchService::new(state.db);
    let dispatch = service.annuler_dispatch(dispatch_id).await?;
    Ok(Json(ApiResponse::ok_with_message(
        dispatch,
        "Dispatch annulé avec succès",
    )))
}

/// Allocation progress of the dispatches still being fulfilled
pub async fn get_dispatches_progress(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<DispatchProgression>>>> {
    let service = DispatchService::new(state.db);
    let progression = service
        .progression_dispatches(scope_for(&current_user.0))
        .await?;
    Ok(Json(ApiResponse::ok(progression)))
}
