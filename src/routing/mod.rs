//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, context, path)
//!     → router.rs (ordered route lookup)
//!     → matcher.rs (segment-by-segment pattern match)
//!     → Return: Matched handler + params, Redirect, or NotFound
//!
//! Route Compilation (at startup):
//!     add / get / post / ... / add_redirect
//!     → Parse pattern against known placeholder classes
//!     → Append to table (registration order is match order)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at registration, immutable once the kernel is built
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)

pub mod matcher;
pub mod router;

use thiserror::Error;

pub use matcher::{Captures, Constraint, Pattern, Placeholders};
pub use router::{Handler, Route, RouteMatch, RouteOutcome, RouteTable, Target, Verb, DEFAULT_METHOD};

/// Errors raised while registering routes.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("unknown placeholder class '{0}'")]
    UnknownPlaceholder(String),

    #[error("placeholder class '{0}' is reserved")]
    ReservedPlaceholder(String),

    #[error("invalid expression '{expr}': {reason}")]
    InvalidExpression { expr: String, reason: String },

    #[error("'(:any)' must be the last segment in '{0}'")]
    AnyNotLast(String),

    #[error("invalid segment '{segment}' in pattern '{pattern}'")]
    InvalidSegment { pattern: String, segment: String },

    #[error("status {0} is not a redirect")]
    NotARedirect(u16),
}
