//! Terminal pipeline outcomes and their HTTP mapping.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionKind {
    NotFound,
    MethodNotAllowed,
    BadRequest,
    Unauthorized,
    InternalConfigurationError,
}

impl RejectionKind {
    pub fn status(self) -> StatusCode {
        match self {
            RejectionKind::NotFound => StatusCode::NOT_FOUND,
            RejectionKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RejectionKind::BadRequest => StatusCode::BAD_REQUEST,
            RejectionKind::Unauthorized => StatusCode::UNAUTHORIZED,
            RejectionKind::InternalConfigurationError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metric / log label.
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionKind::NotFound => "not_found",
            RejectionKind::MethodNotAllowed => "method_not_allowed",
            RejectionKind::BadRequest => "bad_request",
            RejectionKind::Unauthorized => "unauthorized",
            RejectionKind::InternalConfigurationError => "internal_configuration_error",
        }
    }
}

/// A rejection with its client-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
    /// The pattern the request resolved to, once known. Never sent to the client.
    pub pattern: Option<String>,
}

impl Rejection {
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            pattern: None,
        }
    }

    /// Record the pattern the request resolved to.
    pub fn at(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn not_found() -> Self {
        Self::new(RejectionKind::NotFound, "No such path configured")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(RejectionKind::MethodNotAllowed, "Method not allowed")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::BadRequest, message)
    }

    /// Deliberately says nothing about the reason.
    pub fn unauthorized() -> Self {
        Self::new(RejectionKind::Unauthorized, "Authentication failed")
    }

    pub fn misconfigured() -> Self {
        Self::new(
            RejectionKind::InternalConfigurationError,
            "Gatekeeper failed to configure",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status().as_u16(), self.message)
    }
}

impl std::error::Error for Rejection {}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody { error: &self.message })).into_response()
    }
}
