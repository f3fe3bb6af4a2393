//! Route definitions for the Port Stock Management Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

pub async fn mw_probe2(mut request: axum::extract::Request, next: axum::middleware::Next) -> axum::response::Response {
    let header_str = |name: &str| {
        request.headers().get(name).and_then(|h| h.to_str().ok()).map(str::to_owned)
    };
    if header_str("x-foo").is_none() {
        return (axum::http::StatusCode::UNAUTHORIZED, "no").into_response();
    }
    next.run(request).await
}

#[allow(dead_code)]
fn probe_routes2() -> Router<AppState> {
    Router::<AppState>::new().route_layer(axum::middleware::from_fn(mw_probe2))
}

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - dispatch planning
        .nest("/dispatches", dispatch_routes())
        // Protected routes - rotation lifecycle
        .nest("/rotations", rotation_routes())
        // Protected routes - stock ledger (read side)
        .nest("/stock", stock_routes())
        // Protected routes - warehouse movements
        .nest("/mouvements", mouvement_routes())
        // Protected routes - declared deliveries and their reconciliation
        .nest("/livraisons", livraison_routes())
        // Protected routes - dispatch/entry/exit report
        .nest("/rapport-ecarts", rapport_routes())
}

/// Dispatch planning routes (protected)
fn dispatch_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_dispatches).post(handlers::create_dispatch),
        )
        .route("/progress", get(handlers::get_dispatches_progress))
        .route("/:dispatch_id", get(handlers::get_dispatch))
        .route("/:dispatch_id/cancel", post(handlers::cancel_dispatch))
        .route(
            "/:dispatch_id/rotations",
            get(handlers::get_dispatch_rotations).post(handlers::add_rotation),
        )
        .route(
            "/:dispatch_id/rotations/calculate",
            post(handlers::calculate_rotations),
        )
        .route(
            "/:dispatch_id/rotations/multiple",
            post(handlers::create_multiple_rotations),
        )
}

/// Rotation lifecycle routes (protected)
fn rotation_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_rotations))
        .route("/en-transit", get(handlers::get_rotations_en_transit))
        .route("/history", get(handlers::get_rotations_history))
        .route("/ecarts", get(handlers::get_ecarts_report))
        .route("/:rotation_id/start", post(handlers::start_rotation))
        .route("/:rotation_id/receive", post(handlers::receive_rotation))
        .route("/:rotation_id/missing", post(handlers::mark_rotation_missing))
        .route("/:rotation_id/cancel", post(handlers::cancel_rotation))
}

/// Stock ledger read routes (protected)
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock))
        .route("/:produit_id/:magasin_id", get(handlers::check_stock))
}

/// Warehouse movement routes (protected)
fn mouvement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_mouvements).post(handlers::record_mouvement),
        )
}

/// Declared-delivery routes (protected)
fn livraison_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_livraisons).post(handlers::declare_livraison),
        )
        .route("/comparaison", get(handlers::get_comparaison_livraisons))
}

/// Écart report routes (protected)
fn rapport_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_rapport_ecarts))
}
