//! HTTP handlers for rotation endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::types::ApiResponse;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{exiger_role, CurrentUser, UserRole};
use crate::services::allocation::{
    AjoutRotationInput, AllocationService, CalculRotationsInput, CreationMultipleInput,
    PlanRotations,
};
use crate::services::rotation::{
    EcartsRotations, PerteInput, ReceptionInput, ReceptionRotation, RotationDetail,
    RotationFilters, RotationService,
};
use crate::AppState;

/// Compute a rotation plan for the unallocated remainder of a dispatch.
/// The proposal is not persisted.
pub async fn calculate_rotations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(dispatch_id): Path<Uuid>,
    Json(input): Json<CalculRotationsInput>,
) -> AppResult<Json<ApiResponse<PlanRotations>>> {
    let service = AllocationService::new(state.db);
    let plan = service.calculer(dispatch_id, &input).await?;
    let message = format!(
        "{} rotation(s) nécessaire(s) pour transporter {} tonnes",
        plan.nombre_rotations, plan.quantite_a_planifier
    );
    Ok(Json(ApiResponse::ok_with_message(plan, message)))
}

/// Add a single rotation to a dispatch
pub async fn add_rotation(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(dispatch_id): Path<Uuid>,
    Json(input): Json<AjoutRotationInput>,
) -> AppResult<Json<ApiResponse<RotationDetail>>> {
    let service = AllocationService::new(state.db);
    let rotation = service.ajouter(dispatch_id, &input).await?;
    Ok(Json(ApiResponse::ok_with_message(
        rotation,
        "Rotation ajoutée avec succès",
    )))
}

/// Persist a batch of rotations atomically
pub async fn create_multiple_rotations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(dispatch_id): Path<Uuid>,
    Json(input): Json<CreationMultipleInput>,
) -> AppResult<Json<ApiResponse<Vec<RotationDetail>>>> {
    let service = AllocationService::new(state.db);
    let rotations = service.creer_multiples(dispatch_id, &input).await?;
    let message = format!("{} rotation(s) créée(s) avec succès", rotations.len());
    Ok(Json(ApiResponse::ok_with_message(rotations, message)))
}

/// Rotations of one dispatch, in allocation order
pub async fn get_dispatch_rotations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(dispatch_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<RotationDetail>>>> {
    let service = RotationService::new(state.db);
    let rotations = service.par_dispatch(dispatch_id).await?;
    Ok(Json(ApiResponse::ok(rotations)))
}

/// List rotations with filters
pub async fn list_rotations(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filters): Query<RotationFilters>,
) -> AppResult<Json<ApiResponse<Vec<RotationDetail>>>> {
    let service = RotationService::new(state.db);
    let rotations = service
        .lister(current_user.0.magasin_scope(), &filters)
        .await?;
    Ok(Json(ApiResponse::ok(rotations)))
}

#[derive(Debug, Default, Deserialize)]
pub struct EnTransitQuery {
    pub magasin_id: Option<Uuid>,
}

/// Rotations on the road or about to leave, for the receiving board
pub async fn get_rotations_en_transit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<EnTransitQuery>,
) -> AppResult<Json<ApiResponse<Vec<RotationDetail>>>> {
    let service = RotationService::new(state.db);
    let rotations = service
        .en_transit(current_user.0.magasin_scope(), query.magasin_id)
        .await?;
    Ok(Json(ApiResponse::ok(rotations)))
}

/// Rotation history with driver and period filters
pub async fn get_rotations_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filters): Query<RotationFilters>,
) -> AppResult<Json<ApiResponse<Vec<RotationDetail>>>> {
    let service = RotationService::new(state.db);
    let rotations = service
        .lister(current_user.0.magasin_scope(), &filters)
        .await?;
    Ok(Json(ApiResponse::ok(rotations)))
}

/// Rotations with a positive écart, plus per-driver statistics
pub async fn get_ecarts_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filters): Query<RotationFilters>,
) -> AppResult<Json<ApiResponse<EcartsRotations>>> {
    let service = RotationService::new(state.db);
    let rapport = service.rapport_ecarts(&filters).await?;
    Ok(Json(ApiResponse::ok(rapport)))
}

/// Start a rotation: the truck leaves the source warehouse
pub async fn start_rotation(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(rotation_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RotationDetail>>> {
    let service = RotationService::new(state.db);
    let rotation = service.demarrer(rotation_id).await?;
    Ok(Json(ApiResponse::ok_with_message(
        rotation,
        "Rotation démarrée avec succès",
    )))
}

/// Receive a rotation at the destination warehouse (operators only)
pub async fn receive_rotation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(rotation_id): Path<Uuid>,
    Json(input): Json<ReceptionInput>,
) -> AppResult<Json<ApiResponse<ReceptionRotation>>> {
    exiger_role(&current_user.0, &[UserRole::Admin, UserRole::Operator])?;

    let service = RotationService::new(state.db);
    let reception = service
        .receptionner(rotation_id, current_user.0.user_id, input)
        .await?;

    let message = match reception.rotation.ecart {
        Some(ecart) if ecart > Decimal::ZERO => {
            format!("Rotation réceptionnée avec un écart de {} tonnes", ecart)
        }
        _ => "Rotation réceptionnée avec succès".to_string(),
    };
    Ok(Json(ApiResponse::ok_with_message(reception, message)))
}

/// Mark an in-transit rotation entirely lost or rejected (operators only)
pub async fn mark_rotation_missing(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(rotation_id): Path<Uuid>,
    Json(input): Json<PerteInput>,
) -> AppResult<Json<ApiResponse<ReceptionRotation>>> {
    exiger_role(&current_user.0, &[UserRole::Admin, UserRole::Operator])?;

    let service = RotationService::new(state.db);
    let reception = service
        .marquer_manquante(rotation_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(ApiResponse::ok_with_message(
        reception,
        "Rotation marquée manquante",
    )))
}

/// Cancel a rotation that has not departed yet
pub async fn cancel_rotation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(rotation_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RotationDetail>>> {
    exiger_role(&current_user.0, &[UserRole::Admin, UserRole::Manager])?;

    let service = RotationService::new(state.db);
    let rotation = service.annuler(rotation_id).await?;
    Ok(Json(ApiResponse::ok_with_message(
        rotation,
        "Rotation annulée avec succès",
    )))
}
