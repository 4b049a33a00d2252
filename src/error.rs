//! Error types and error handling for the application
//!
//! Custom error types convertible to HTTP responses. All errors implement
//! `IntoResponse` with a terse JSON `{error, status}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::agent::AgentError;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Agent with the given ID was not found
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// Agent configuration is invalid
    #[error("Invalid agent configuration: {0}")]
    InvalidAgentConfig(String),

    /// Exec request named a command this surface does not know
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// The agent has no live page for this operation
    #[error("Agent has no live session: {0}")]
    NoActiveSession(String),

    /// Error from the agent's browser lifecycle or automation
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Error during registry snapshot save/load
    #[error("Persistence error: {0}")]
    Persistence(#[from] crate::state::PersistenceError),

    /// Upstream conferencing API was unreachable or misbehaved
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::AgentNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidAgentConfig(_) | AppError::UnknownCommand(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NoActiveSession(_) => StatusCode::CONFLICT,
            AppError::Agent(AgentError::IllegalTransition(_)) => StatusCode::CONFLICT,
            AppError::Agent(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::status::IllegalTransition;
    use crate::state::AgentStatus;

    #[test]
    fn test_status_mapping() {
        let not_found = AppError::AgentNotFound("x".to_string()).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let bad = AppError::UnknownCommand("dance".to_string()).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let conflict = AppError::Agent(AgentError::IllegalTransition(IllegalTransition {
            from: AgentStatus::Running,
            to: AgentStatus::Starting,
        }))
        .into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let upstream = AppError::Upstream("down".to_string()).into_response();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    }
}
