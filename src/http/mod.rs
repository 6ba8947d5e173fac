//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection                      process arguments
//!     → server.rs (Axum, request id)      │
//!     → request.rs (Request::from_http)   → request.rs (Request::from_cli)
//!                  └──────────┬──────────┘
//!                             → dispatch kernel
//!     → response.rs (status, headers, body, send once)
//!     → Send to client / print to stdout
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ExecutionContext, Filter, Request, RequestBuilder, RequestError, X_REQUEST_ID};
pub use response::{RedirectMethod, Response, ResponseError};
pub use server::HttpServer;
