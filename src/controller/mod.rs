//! Controllers and their resolution.
//!
//! # Data Flow
//! ```text
//! RouteMatch (handler + params) or no match
//!     → resolver.rs (closure / registered class / 404 override)
//!     → registry.rs (capability checks, one instance per request)
//!     → Handler invoked with a Context
//! ```
//!
//! # Design Decisions
//! - Classes are registered by name with typed factories; no reflection
//! - Handlers write output through `Context`, never to a global buffer
//! - Handler failures are values (`HandlerError`), panics are caught by the kernel

pub mod registry;
pub mod resolver;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::dispatch::Output;
use crate::http::{Request, Response, ResponseError};
use crate::view::{ViewError, ViewRenderer};

pub use registry::{Action, ControllerClass, ControllerDef, ControllerInstance, ControllerRegistry, Remap};
pub use resolver::{NotFoundReason, Resolution, Resolver};

pub type HandlerResult = Result<(), HandlerError>;

/// Closure route target. Receives the matched parameters in order.
pub type ClosureHandler = Arc<dyn Fn(&mut Context<'_>, &[String]) -> HandlerResult + Send + Sync>;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Message(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }

    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HandlerError::Other(Box::new(err))
    }
}

/// Everything a handler can touch while it runs.
pub struct Context<'a> {
    pub request: &'a Request,
    pub response: &'a mut Response,
    pub output: &'a mut Output,
    views: &'a dyn ViewRenderer,
    named: BTreeMap<String, String>,
}

impl<'a> Context<'a> {
    pub fn new(
        request: &'a Request,
        response: &'a mut Response,
        output: &'a mut Output,
        views: &'a dyn ViewRenderer,
    ) -> Self {
        Self {
            request,
            response,
            output,
            views,
            named: BTreeMap::new(),
        }
    }

    /// Attach the values of named route placeholders (`{slug}`).
    pub fn with_named(mut self, named: BTreeMap<String, String>) -> Self {
        self.named = named;
        self
    }

    /// Value captured by the named placeholder `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    pub fn named_params(&self) -> &BTreeMap<String, String> {
        &self.named
    }

    /// Write to the buffered output.
    pub fn echo(&mut self, text: &str) {
        self.output.echo(text);
    }

    /// Render a view into the buffered output.
    pub fn view<T: Serialize>(&mut self, name: &str, data: &T) -> HandlerResult {
        let rendered = self.render(name, data)?;
        self.output.echo(&rendered);
        Ok(())
    }

    pub fn has_view(&self, name: &str) -> bool {
        self.views.exists(name)
    }

    /// Render a view and return it without buffering.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, HandlerError> {
        let data = serde_json::to_value(data).map_err(HandlerError::other)?;
        Ok(self.views.render(name, &data)?)
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request", &self.request.id())
            .field("status", &self.response.status())
            .field("buffered", &self.output.len())
            .field("named", &self.named)
            .finish()
    }
}
