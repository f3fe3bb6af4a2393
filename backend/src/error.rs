//! Error handling for the Port Stock Management Platform
//!
//! Provides consistent error responses in English and French

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Identity errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String, message_fr: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String, message_fr: String },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_fr: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock: {disponible} available for {demande} requested")]
    InsufficientStock { disponible: Decimal, demande: Decimal },

    #[error("Capacity exceeded: {capacite_totale} available for {demande} requested")]
    CapacityExceeded {
        capacite_totale: Decimal,
        demande: Decimal,
    },

    #[error("Quota exceeded: {quota_restant} remaining for {demande} requested")]
    QuotaExceeded {
        quota_restant: Decimal,
        demande: Decimal,
    },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

impl ErrorResponse {
    pub fn new(detail: ErrorDetail) -> Self {
        Self {
            success: false,
            error: detail,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub message_fr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Quantity currently available, for stock/capacity conflicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disponible: Option<Decimal>,
    /// Quantity that was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demande: Option<Decimal>,
}

impl ErrorDetail {
    fn simple(code: &str, message: String, message_fr: String) -> Self {
        Self {
            code: code.to_string(),
            message,
            message_fr,
            field: None,
            disponible: None,
            demande: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Unauthorized { message, message_fr } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::simple("UNAUTHORIZED", message.clone(), message_fr.clone()),
            ),
            AppError::Forbidden { message, message_fr } => (
                StatusCode::FORBIDDEN,
                ErrorDetail::simple("FORBIDDEN", message.clone(), message_fr.clone()),
            ),
            AppError::Validation {
                field,
                message,
                message_fr,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    message_fr: message_fr.clone(),
                    field: Some(field.clone()),
                    disponible: None,
                    demande: None,
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::simple(
                    "VALIDATION_ERROR",
                    msg.clone(),
                    format!("Données invalides : {}", msg),
                ),
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message: format!("A record with this {} already exists", field),
                    message_fr: format!("Un enregistrement avec ce {} existe déjà", field),
                    field: Some(field.clone()),
                    disponible: None,
                    demande: None,
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::simple(
                    "NOT_FOUND",
                    format!("{} not found", resource),
                    format!("{} introuvable", resource),
                ),
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail::simple(
                    "INVALID_STATE_TRANSITION",
                    msg.clone(),
                    format!("Changement de statut impossible : {}", msg),
                ),
            ),
            AppError::InsufficientStock { disponible, demande } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message: format!(
                        "Insufficient stock: {} available for {} requested",
                        disponible, demande
                    ),
                    message_fr: format!(
                        "Stock insuffisant : {} disponible pour {} demandé",
                        disponible, demande
                    ),
                    field: None,
                    disponible: Some(*disponible),
                    demande: Some(*demande),
                },
            ),
            AppError::CapacityExceeded {
                capacite_totale,
                demande,
            } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CAPACITY_EXCEEDED".to_string(),
                    message: format!(
                        "Requested quantity exceeds total truck capacity: {} available for {} requested",
                        capacite_totale, demande
                    ),
                    message_fr: format!(
                        "La quantité demandée dépasse la capacité des camions : {} disponible pour {} demandé",
                        capacite_totale, demande
                    ),
                    field: None,
                    disponible: Some(*capacite_totale),
                    demande: Some(*demande),
                },
            ),
            AppError::QuotaExceeded {
                quota_restant,
                demande,
            } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "QUOTA_EXCEEDED".to_string(),
                    message: format!(
                        "Rotation total would exceed the dispatch quantity: {} remaining for {} requested",
                        quota_restant, demande
                    ),
                    message_fr: format!(
                        "Le total des rotations dépasserait la quantité du dispatch : {} restant pour {} demandé",
                        quota_restant, demande
                    ),
                    field: None,
                    disponible: Some(*quota_restant),
                    demande: Some(*demande),
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::simple(
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    "Une erreur de base de données est survenue".to_string(),
                ),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::simple(
                    "INTERNAL_ERROR",
                    msg.clone(),
                    "Erreur interne du serveur".to_string(),
                ),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::simple(
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    "Erreur interne du serveur".to_string(),
                ),
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse::new(error_detail))).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
