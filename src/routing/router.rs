//! Route table and lookup.
//!
//! # Responsibilities
//! - Store routes in registration order
//! - Look up the first route matching a request path
//! - Return a matched handler, a redirect, or an explicit not-found
//!
//! # Design Decisions
//! - Immutable after construction (shared via `Arc`, no locks)
//! - O(n) scan in registration order; first match wins
//! - Explicit NotFound rather than silent default

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::controller::{ClosureHandler, Context, HandlerResult};
use crate::http::ExecutionContext;
use crate::routing::matcher::{Pattern, Placeholders};
use crate::routing::RouteError;

/// Method used when a controller target names none.
pub const DEFAULT_METHOD: &str = "index";

/// Something that can be invoked for a request.
#[derive(Clone)]
pub enum Handler {
    /// Called directly with the matched parameters.
    Closure(ClosureHandler),
    /// Registered controller class and action name.
    Controller { class: String, method: Option<String> },
}

impl Handler {
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&mut Context<'_>, &[String]) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Closure(Arc::new(f))
    }

    /// Parse `"Class::method"` or `"Class"`.
    pub fn controller(class_method: &str) -> Self {
        match class_method.split_once("::") {
            Some((class, method)) if !method.is_empty() => Handler::Controller {
                class: class.to_string(),
                method: Some(method.to_string()),
            },
            Some((class, _)) => Handler::Controller {
                class: class.to_string(),
                method: None,
            },
            None => Handler::Controller {
                class: class_method.to_string(),
                method: None,
            },
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Closure(_) => f.write_str("Closure"),
            Handler::Controller { class, method } => match method {
                Some(m) => write!(f, "{}::{}", class, m),
                None => write!(f, "{}", class),
            },
        }
    }
}

impl From<&str> for Handler {
    fn from(class_method: &str) -> Self {
        Handler::controller(class_method)
    }
}

/// What a route points at.
#[derive(Debug, Clone)]
pub enum Target {
    Handler(Handler),
    Redirect { to: String, status: StatusCode },
}

impl From<Handler> for Target {
    fn from(handler: Handler) -> Self {
        Target::Handler(handler)
    }
}

impl From<&str> for Target {
    fn from(class_method: &str) -> Self {
        Target::Handler(Handler::controller(class_method))
    }
}

/// Which requests a route accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Any,
    Method(Method),
    /// Only requests from the command line.
    Cli,
}

impl Verb {
    fn accepts(&self, method: &Method, context: ExecutionContext) -> bool {
        match self {
            Verb::Any => true,
            Verb::Method(m) => !context.is_cli() && m == method,
            Verb::Cli => context.is_cli(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pattern: Pattern,
    target: Target,
    verb: Verb,
}

impl Route {
    pub fn pattern(&self) -> &str {
        self.pattern.source()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn verb(&self) -> &Verb {
        &self.verb
    }
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub handler: Handler,
    /// Captured values in pattern order.
    pub params: Vec<String>,
    /// Captured values of named placeholders.
    pub named: BTreeMap<String, String>,
    /// Source pattern of the matched route.
    pub pattern: String,
}

/// Result of routing a path.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    Matched(RouteMatch),
    Redirect { to: String, status: StatusCode },
    NotFound,
}

/// Ordered route definitions plus routing policy.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    placeholders: Placeholders,
    override_404: Option<Handler>,
    default_method: Option<String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route for every method.
    pub fn add(&mut self, pattern: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.push(pattern, target.into(), Verb::Any)
    }

    pub fn get(&mut self, pattern: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.push(pattern, target.into(), Verb::Method(Method::GET))
    }

    pub fn post(&mut self, pattern: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.push(pattern, target.into(), Verb::Method(Method::POST))
    }

    pub fn put(&mut self, pattern: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.push(pattern, target.into(), Verb::Method(Method::PUT))
    }

    pub fn patch(&mut self, pattern: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.push(pattern, target.into(), Verb::Method(Method::PATCH))
    }

    pub fn delete(&mut self, pattern: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.push(pattern, target.into(), Verb::Method(Method::DELETE))
    }

    /// Register a route reachable only from the command line.
    pub fn cli(&mut self, pattern: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.push(pattern, target.into(), Verb::Cli)
    }

    /// Register a route for an explicit verb.
    pub fn route(&mut self, verb: Verb, pattern: &str, target: impl Into<Target>) -> Result<&mut Self, RouteError> {
        self.push(pattern, target.into(), verb)
    }

    /// Register a redirect. Status defaults to 302.
    pub fn add_redirect(&mut self, from: &str, to: &str, status: Option<StatusCode>) -> Result<&mut Self, RouteError> {
        let status = status.unwrap_or(StatusCode::FOUND);
        if !status.is_redirection() {
            return Err(RouteError::NotARedirect(status.as_u16()));
        }
        let target = Target::Redirect {
            to: to.to_string(),
            status,
        };
        self.push(from, target, Verb::Any)
    }

    /// Register a custom placeholder class usable as `(:name)` in later routes.
    pub fn add_placeholder(&mut self, name: &str, expr: &str) -> Result<&mut Self, RouteError> {
        self.placeholders.add(name, expr)?;
        Ok(self)
    }

    pub fn set_404_override(&mut self, handler: impl Into<Handler>) -> &mut Self {
        self.override_404 = Some(handler.into());
        self
    }

    pub fn override_404(&self) -> Option<&Handler> {
        self.override_404.as_ref()
    }

    pub fn set_default_method(&mut self, method: &str) -> &mut Self {
        self.default_method = Some(method.to_string());
        self
    }

    pub fn default_method(&self) -> &str {
        self.default_method.as_deref().unwrap_or(DEFAULT_METHOD)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Controller classes referenced by routes and the 404 override.
    pub fn controller_names(&self) -> Vec<&str> {
        let handlers = self
            .routes
            .iter()
            .filter_map(|r| match &r.target {
                Target::Handler(h) => Some(h),
                Target::Redirect { .. } => None,
            })
            .chain(self.override_404.iter());

        let mut names: Vec<&str> = handlers
            .filter_map(|h| match h {
                Handler::Controller { class, .. } => Some(class.as_str()),
                Handler::Closure(_) => None,
            })
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Find the first route accepting `method` whose pattern matches `path`.
    pub fn match_path(&self, method: &Method, context: ExecutionContext, path: &str) -> RouteOutcome {
        for route in &self.routes {
            if !route.verb.accepts(method, context) {
                continue;
            }
            let Some(captures) = route.pattern.captures(path) else {
                continue;
            };

            return match &route.target {
                Target::Redirect { to, status } => RouteOutcome::Redirect {
                    to: to.clone(),
                    status: *status,
                },
                Target::Handler(handler) => RouteOutcome::Matched(RouteMatch {
                    handler: self.with_default_method(handler),
                    params: captures.positional,
                    named: captures.named,
                    pattern: route.pattern.source().to_string(),
                }),
            };
        }
        RouteOutcome::NotFound
    }

    /// Fill in the default method for controller targets that name none.
    pub fn with_default_method(&self, handler: &Handler) -> Handler {
        match handler {
            Handler::Controller { class, method: None } => Handler::Controller {
                class: class.clone(),
                method: Some(self.default_method().to_string()),
            },
            other => other.clone(),
        }
    }

    fn push(&mut self, pattern: &str, target: Target, verb: Verb) -> Result<&mut Self, RouteError> {
        let pattern = Pattern::parse(pattern, &self.placeholders)?;
        tracing::debug!(pattern = pattern.source(), target = ?target, verb = ?verb, "Route registered");
        self.routes.push(Route {
            pattern,
            target,
            verb,
        });
        Ok(self)
    }
}
