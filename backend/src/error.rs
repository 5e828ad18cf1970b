//! Error handling for the Woodflow production engine
//!
//! Provides consistent error responses in English and Indonesian

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use shared::EngineError;
use thiserror::Error;
use uuid::Uuid;

/// SQLSTATE codes that mean another writer won the race
const SQLSTATE_DEADLOCK: &str = "40P01";
const SQLSTATE_LOCK_NOT_AVAILABLE: &str = "55P03";
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        message_idn: String,
    },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_idn: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock for {item_name}: required {required}, available {available}")]
    InsufficientStock {
        item_id: Uuid,
        item_name: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("No material recipe for component {component_name}")]
    RecipeMissing {
        component_item_id: Uuid,
        component_name: String,
    },

    #[error("Warehouse not configured: {0}")]
    ConfigurationMissing(String),

    #[error("Concurrent update: {0}")]
    ConcurrencyConflict(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: &str, message: impl Into<String>, message_idn: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
            message_idn: message_idn.into(),
        }
    }

    /// Whether the client may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ConcurrencyConflict(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if code == SQLSTATE_DEADLOCK
                    || code == SQLSTATE_LOCK_NOT_AVAILABLE
                    || code == SQLSTATE_SERIALIZATION_FAILURE
                {
                    return AppError::ConcurrencyConflict(db_err.message().to_string());
                }
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InsufficientStock {
                item_id,
                item_name,
                required,
                available,
            } => AppError::InsufficientStock {
                item_id,
                item_name,
                required,
                available,
            },
            EngineError::RecipeMissing {
                component_item_id,
                component_name,
            } => AppError::RecipeMissing {
                component_item_id,
                component_name,
            },
            EngineError::OverProduction {
                planned,
                produced,
                attempted,
            } => AppError::Validation {
                field: "quantity".to_string(),
                message: format!(
                    "Producing {} more would exceed the planned {} (already produced {})",
                    attempted, planned, produced
                ),
                message_idn: format!(
                    "Menambah {} melebihi rencana {} (sudah diproduksi {})",
                    attempted, planned, produced
                ),
            },
            EngineError::InvalidQuantity { field, reason } => AppError::Validation {
                message: format!("Invalid {}: {}", field, reason),
                message_idn: format!("Jumlah {} tidak valid", field),
                field,
            },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_default();
        AppError::Validation {
            message: errors.to_string(),
            message_idn: format!("Data tidak valid: {}", field),
            field,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_idn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl ErrorDetail {
    pub fn new(code: &str, message_en: impl Into<String>, message_idn: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message_en: message_en.into(),
            message_idn: message_idn.into(),
            field: None,
            details: None,
            retryable: false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, mut error_detail) = match &self {
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token", "Token tidak valid"),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                    "Anda tidak memiliki izin untuk melakukan tindakan ini",
                ),
            ),
            AppError::Unauthorized { message, message_idn } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone(), message_idn.clone()),
            ),
            AppError::Validation {
                field,
                message,
                message_idn,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new("VALIDATION_ERROR", message.clone(), message_idn.clone())
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(
                    "NOT_FOUND",
                    format!("{} not found", resource),
                    format!("{} tidak ditemukan", resource),
                ),
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "INVALID_STATE_TRANSITION",
                    msg.clone(),
                    format!("Perubahan status tidak diizinkan: {}", msg),
                ),
            ),
            AppError::InsufficientStock {
                item_id,
                item_name,
                required,
                available,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    details: Some(json!({
                        "item_id": item_id,
                        "item_name": item_name,
                        "required": required,
                        "available": available,
                        "shortfall": (*required - *available).max(Decimal::ZERO),
                    })),
                    ..ErrorDetail::new(
                        "INSUFFICIENT_STOCK",
                        format!(
                            "Insufficient stock for {}: required {}, available {}",
                            item_name, required, available
                        ),
                        format!(
                            "Stok {} tidak mencukupi: dibutuhkan {}, tersedia {}",
                            item_name, required, available
                        ),
                    )
                },
            ),
            AppError::RecipeMissing {
                component_item_id,
                component_name,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    details: Some(json!({
                        "component_item_id": component_item_id,
                        "component_name": component_name,
                    })),
                    ..ErrorDetail::new(
                        "RECIPE_MISSING",
                        format!("No material recipe configured for {}", component_name),
                        format!("Resep bahan untuk {} belum diatur", component_name),
                    )
                },
            ),
            AppError::ConfigurationMissing(code) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "CONFIGURATION_MISSING",
                    format!("Warehouse {} is not configured", code),
                    format!("Gudang {} belum dikonfigurasi", code),
                ),
            ),
            AppError::ConcurrencyConflict(_) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "CONCURRENCY_CONFLICT",
                    "Another transaction is updating the same stock, please retry",
                    "Transaksi lain sedang mengubah stok yang sama, silakan coba lagi",
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "DATABASE_ERROR",
                    "A database error occurred",
                    "Terjadi kesalahan pada basis data",
                ),
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    "An internal server error occurred",
                    "Terjadi kesalahan internal server",
                ),
            ),
        };
        error_detail.retryable = self.is_retryable();

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
