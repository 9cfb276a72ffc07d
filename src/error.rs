use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by request handlers and domain services.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("no recognizable food found, please enter it manually")]
    EmptyPrediction,
    #[error("{service} unavailable: {message}")]
    ExternalService {
        service: &'static str,
        message: String,
    },
    #[error("could not save data: {0}")]
    Persistence(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn external(service: &'static str, message: impl ToString) -> Self {
        Self::ExternalService {
            service,
            message: message.to_string(),
        }
    }

    pub fn session_ended() -> Self {
        Self::Authentication("session ended, please log in again".into())
    }

    pub fn persistence(e: impl std::fmt::Display) -> Self {
        Self::Persistence(e.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Authentication(_) => "authentication",
            Self::EmptyPrediction => "empty_prediction",
            Self::ExternalService { .. } => "external_service",
            Self::Persistence(_) => "persistence",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }

    /// The single action offered to the user after this error.
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::Authentication(_) => Recovery::Login,
            Self::Validation { .. } | Self::EmptyPrediction | Self::Conflict(_) => Recovery::Retry,
            Self::ExternalService { .. } | Self::Persistence(_) | Self::Internal(_) => {
                Recovery::Home
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::EmptyPrediction => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ExternalService { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Recovery {
    Login,
    Home,
    Retry,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    pub recovery: Recovery,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, kind = self.kind(), "request failed");
        }
        let field = match &self {
            Self::Validation { field, .. } => Some(*field),
            _ => None,
        };
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            field,
            recovery: self.recovery(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_errors_route_back_to_login() {
        let err = AppError::Authentication("bad credentials".into());
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.recovery(), Recovery::Login);
    }

    #[test]
    fn unhandled_errors_offer_home() {
        let err = AppError::Internal(anyhow::anyhow!("boom"));
        assert_eq!(err.recovery(), Recovery::Home);
        assert_eq!(AppError::persistence("disk full").recovery(), Recovery::Home);
    }

    #[test]
    fn validation_message_names_field() {
        let err = AppError::validation("water_ml", "must be between 0 and 5000");
        assert_eq!(err.to_string(), "invalid water_ml: must be between 0 and 5000");
        assert_eq!(err.kind(), "validation");
    }
}
