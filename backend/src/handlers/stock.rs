//! HTTP handlers for stock endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::types::ApiResponse;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::stock::{StockDisponible, StockMagasin, StockService};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub magasin_id: Option<Uuid>,
}

/// Stock lines of a warehouse. Operators default to their own warehouse,
/// other callers must name one.
pub async fn list_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<ApiResponse<Vec<StockMagasin>>>> {
    let magasin_id = current_user
        .0
        .magasin_scope()
        .or(query.magasin_id)
        .ok_or_else(|| AppError::Validation {
            field: "magasin_id".to_string(),
            message: "A warehouse must be specified".to_string(),
            message_fr: "Un magasin doit être précisé".to_string(),
        })?;

    let service = StockService::new(state.db);
    let stock = service.lister_stock(magasin_id).await?;
    Ok(Json(ApiResponse::ok(stock)))
}

/// Available quantity for a (produit, magasin) pair
pub async fn check_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path((produit_id, magasin_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<StockDisponible>>> {
    let service = StockService::new(state.db);
    let stock = service.stock_disponible(produit_id, magasin_id).await?;
    Ok(Json(ApiResponse::ok(stock)))
}
