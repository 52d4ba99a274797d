//! Error handling for the warehouse analytics server
//!
//! Provides consistent error responses in Spanish and English

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::FieldError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    // Backing store errors
    #[error("Store request failed: {0}")]
    Store(String),

    #[error("Store returned {status} for {source_name}: {body}")]
    StoreStatus {
        source_name: String,
        status: u16,
        body: String,
    },

    #[error("Malformed row from {source_name}: {message}")]
    MalformedRow {
        source_name: String,
        message: String,
    },

    // Query lifecycle errors
    #[error("Query timed out after {0} seconds")]
    QueryTimeout(u64),

    #[error("Query superseded by a newer query")]
    Superseded,

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Stable code used in the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Store(_) | AppError::StoreStatus { .. } => "STORE_ERROR",
            AppError::MalformedRow { .. } => "MALFORMED_ROW",
            AppError::QueryTimeout(_) => "QUERY_TIMEOUT",
            AppError::Superseded => "QUERY_SUPERSEDED",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::StoreStatus { .. } | AppError::MalformedRow { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AppError::QueryTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Superseded => StatusCode::CONFLICT,
            AppError::Configuration(_) | AppError::Internal(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        AppError::Validation {
            field: err.field.to_string(),
            message: err.message_en,
            message_es: err.message_es,
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
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message_en: String, message_es: String) -> Self {
        Self {
            code: code.to_string(),
            message_en,
            message_es,
            field: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let error_detail = match &self {
            AppError::Validation {
                field,
                message,
                message_es,
            } => ErrorDetail {
                field: Some(field.clone()),
                ..ErrorDetail::new(code, message.clone(), message_es.clone())
            },
            AppError::Store(_) | AppError::StoreStatus { .. } => ErrorDetail::new(
                code,
                "The data store could not be reached. Please retry.".to_string(),
                "No se pudo consultar la base de datos. Intente de nuevo.".to_string(),
            ),
            AppError::MalformedRow { source_name, .. } => ErrorDetail::new(
                code,
                format!("Unexpected data received from {}", source_name),
                format!("Se recibieron datos inesperados de {}", source_name),
            ),
            AppError::QueryTimeout(secs) => ErrorDetail::new(
                code,
                format!("The query did not finish within {} seconds", secs),
                format!("La consulta no terminó en {} segundos", secs),
            ),
            AppError::Superseded => ErrorDetail::new(
                code,
                "A newer query replaced this one".to_string(),
                "Una consulta más reciente reemplazó a esta".to_string(),
            ),
            AppError::Configuration(msg) => ErrorDetail::new(
                code,
                format!("Configuration error: {}", msg),
                format!("Error de configuración: {}", msg),
            ),
            AppError::Internal(msg) => ErrorDetail::new(
                code,
                msg.clone(),
                "Error interno del servidor".to_string(),
            ),
            AppError::InternalError(_) => ErrorDetail::new(
                code,
                "An internal server error occurred".to_string(),
                "Error interno del servidor".to_string(),
            ),
        };

        match &self {
            AppError::Validation { .. } | AppError::Superseded => {
                tracing::debug!("Rejected: {}", self)
            }
            _ => tracing::error!("Error: {:?}", self),
        }

        (self.status(), Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
