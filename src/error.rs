use crate::validation::Violation;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Coarse error classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    NotInitialized,
    ExternalService,
    Internal,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Carries every violated rule, never only the first.
    #[error("Invalid input: {}", summarize(.0))]
    Validation(Vec<Violation>),

    #[error("{kind} '{id}' already exists")]
    Conflict { kind: &'static str, id: String },

    #[error("{kind} '{id}' not found")]
    NotFound {
        kind: &'static str,
        id: String,
        available: Vec<String>,
    },

    /// An ancestor of `id` was deleted, leaving a dangling `derived_from`.
    #[error("Lineage of '{id}' is broken: ancestor '{missing}' no longer exists")]
    LineageLinkMissing { id: String, missing: String },

    #[error("{resource} is not initialized")]
    NotInitialized { resource: &'static str },

    #[error("{service} failed: {message}")]
    ExternalService {
        service: &'static str,
        message: String,
        retryable: bool,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Conflict { .. } => ErrorKind::Conflict,
            AppError::NotFound { .. } | AppError::LineageLinkMissing { .. } => ErrorKind::NotFound,
            AppError::NotInitialized { .. } => ErrorKind::NotInitialized,
            AppError::ExternalService { .. } => ErrorKind::ExternalService,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Single-violation rejection for checks that run outside a pipeline.
    pub fn invalid(rule: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![Violation::new(rule, message)])
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            AppError::Validation(violations) => violations,
            _ => &[],
        }
    }
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: ErrorKind,
    code: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<Violation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    available: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(violations) => {
                tracing::warn!(violations = violations.len(), error = %self, "Validation error");
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict { id, .. } => {
                tracing::warn!(id = %id, "Identifier conflict");
                StatusCode::CONFLICT
            }
            AppError::NotFound { id, .. } => {
                tracing::debug!(id = %id, "Lookup miss");
                StatusCode::NOT_FOUND
            }
            AppError::LineageLinkMissing { id, missing } => {
                tracing::warn!(id = %id, missing = %missing, "Dangling lineage link");
                StatusCode::NOT_FOUND
            }
            AppError::NotInitialized { resource } => {
                tracing::error!(resource, "Accessor used before registry initialization");
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::ExternalService { service, message, .. } => {
                tracing::error!(service, error = %message, "External service error");
                StatusCode::BAD_GATEWAY
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let kind = self.kind();
        let error = self.to_string();
        let (violations, available, retryable) = match self {
            AppError::Validation(violations) => (violations, Vec::new(), None),
            AppError::NotFound { available, .. } => (Vec::new(), available, None),
            AppError::ExternalService { retryable, .. } => (Vec::new(), Vec::new(), Some(retryable)),
            _ => (Vec::new(), Vec::new(), None),
        };

        let body = Json(ErrorResponse {
            error,
            kind,
            code: status.as_u16(),
            violations,
            available,
            retryable,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
