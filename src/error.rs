//! Errors that can end a dispatch early.

use axum::http::StatusCode;
use thiserror::Error;

use crate::controller::HandlerError;
use crate::hooks::HookError;
use crate::http::ResponseError;
use crate::security::SecurityError;
use crate::view::ViewError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("request rejected: {0}")]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("handler failed: {0}")]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error("handler panicked: {0}")]
    Panic(String),
}

impl DispatchError {
    /// Status of the error page for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Security(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Security(_) => "security",
            DispatchError::Hook(_) => "hook",
            DispatchError::Handler(_) => "handler",
            DispatchError::View(_) => "view",
            DispatchError::Response(_) => "response",
            DispatchError::Panic(_) => "panic",
        }
    }
}
