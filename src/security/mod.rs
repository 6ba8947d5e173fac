//! Security pre-pass.
//!
//! # Data Flow
//! ```text
//! Request built, response created:
//!     → https.rs (redirect plain HTTP when secure requests are forced)
//!     → csrf.rs (verify token on unsafe methods, HTTP only)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Runs before routing: a rejected request never reaches a controller
//! - Fail closed: a missing cookie or token is a rejection
//! - Rejections carry a fixed user-facing message; detail goes to the log

pub mod csrf;
pub mod https;

use axum::http::StatusCode;
use thiserror::Error;

pub use csrf::{generate_token, CsrfGuard};
pub use https::force_https;

/// Message shown to clients on any rejection.
pub const NOT_ALLOWED: &str = "The action you requested is not allowed.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecurityError {
    #[error("CSRF cookie '{0}' missing")]
    MissingCookie(String),

    #[error("CSRF token missing from field '{field}' and header '{header}'")]
    MissingToken { field: String, header: String },

    #[error("CSRF token does not match cookie")]
    TokenMismatch,
}

impl SecurityError {
    pub fn status(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }
}
