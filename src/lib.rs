//! Kindling: a front-controller web framework core.
//!
//! Requests from an HTTP listener or from the command line go through one
//! dispatch kernel: hooks, a security pre-pass, ordered pattern routing,
//! controller resolution with a 404 fallback, buffered output, and a
//! response that is sent exactly once.

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod hooks;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod view;

pub use config::AppConfig;
pub use controller::{Context, ControllerDef, HandlerError, HandlerResult};
pub use dispatch::{DispatchOutcome, Exit, Kernel, KernelBuilder};
pub use error::DispatchError;
pub use hooks::{HookPoint, Hooks};
pub use http::{HttpServer, Request, Response};
pub use lifecycle::Shutdown;
pub use routing::{Handler, RouteTable};
