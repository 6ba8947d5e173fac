//! Turn a routing result into something invokable.
//!
//! # Rules (in order)
//! 1. A closure target is invoked directly with the matched parameters
//!    (positional and named)
//! 2. A class target is NotFound when the class is unknown, the method starts
//!    with `_`, or the class has neither the method nor a remap action
//! 3. A NotFound result (including "no route matched") is replaced by the
//!    404 override when one is configured; the override gets no parameters
//! 4. Anything still unresolved is NotFound

use std::collections::BTreeMap;
use std::fmt;

use crate::controller::{ClosureHandler, ControllerClass, ControllerRegistry};
use crate::routing::{Handler, RouteMatch, RouteTable};

/// Why a request could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    NoRoute,
    UnknownClass(String),
    PrivateMethod(String),
    MissingMethod { class: String, method: String },
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::NoRoute => write!(f, "no route matched"),
            NotFoundReason::UnknownClass(class) => write!(f, "controller '{}' is not registered", class),
            NotFoundReason::PrivateMethod(method) => write!(f, "method '{}' is not routable", method),
            NotFoundReason::MissingMethod { class, method } => {
                write!(f, "controller '{}' has no method '{}'", class, method)
            }
        }
    }
}

pub enum Resolution<'r> {
    Closure {
        handler: ClosureHandler,
        params: Vec<String>,
        named: BTreeMap<String, String>,
        via_override: bool,
    },
    Class {
        class: &'r dyn ControllerClass,
        name: String,
        method: String,
        params: Vec<String>,
        named: BTreeMap<String, String>,
        via_override: bool,
    },
    NotFound(NotFoundReason),
}

impl Resolution<'_> {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Resolution::NotFound(_))
    }

    pub fn via_override(&self) -> bool {
        match self {
            Resolution::Closure { via_override, .. } | Resolution::Class { via_override, .. } => *via_override,
            Resolution::NotFound(_) => false,
        }
    }
}

impl fmt::Debug for Resolution<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Closure { params, via_override, .. } => f
                .debug_struct("Closure")
                .field("params", params)
                .field("via_override", via_override)
                .finish(),
            Resolution::Class {
                name,
                method,
                params,
                via_override,
                ..
            } => f
                .debug_struct("Class")
                .field("name", name)
                .field("method", method)
                .field("params", params)
                .field("via_override", via_override)
                .finish(),
            Resolution::NotFound(reason) => f.debug_tuple("NotFound").field(reason).finish(),
        }
    }
}

pub struct Resolver<'r> {
    registry: &'r ControllerRegistry,
    routes: &'r RouteTable,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r ControllerRegistry, routes: &'r RouteTable) -> Self {
        Self { registry, routes }
    }

    /// Resolve a route match, or `None` when no route matched.
    pub fn resolve(&self, matched: Option<RouteMatch>) -> Resolution<'r> {
        let primary = match matched {
            Some(m) => self.resolve_handler(&m.handler, m.params, m.named, false),
            None => Resolution::NotFound(NotFoundReason::NoRoute),
        };

        let Resolution::NotFound(reason) = primary else {
            return primary;
        };

        let Some(override_404) = self.routes.override_404() else {
            return Resolution::NotFound(reason);
        };

        tracing::debug!(reason = %reason, override_target = ?override_404, "Using 404 override");
        let handler = self.routes.with_default_method(override_404);
        match self.resolve_handler(&handler, Vec::new(), BTreeMap::new(), true) {
            Resolution::NotFound(override_reason) => {
                tracing::warn!(reason = %override_reason, "404 override is not resolvable");
                Resolution::NotFound(reason)
            }
            resolved => resolved,
        }
    }

    fn resolve_handler(
        &self,
        handler: &Handler,
        params: Vec<String>,
        named: BTreeMap<String, String>,
        via_override: bool,
    ) -> Resolution<'r> {
        match handler {
            Handler::Closure(f) => Resolution::Closure {
                handler: f.clone(),
                params,
                named,
                via_override,
            },
            Handler::Controller { class, method } => {
                let method = method
                    .clone()
                    .unwrap_or_else(|| self.routes.default_method().to_string());

                let Some(def) = self.registry.get(class) else {
                    return Resolution::NotFound(NotFoundReason::UnknownClass(class.clone()));
                };
                if method.starts_with('_') {
                    return Resolution::NotFound(NotFoundReason::PrivateMethod(method));
                }
                if !def.has_action(&method) && !def.has_remap() {
                    return Resolution::NotFound(NotFoundReason::MissingMethod {
                        class: class.clone(),
                        method,
                    });
                }

                Resolution::Class {
                    class: def,
                    name: class.clone(),
                    method,
                    params,
                    named,
                    via_override,
                }
            }
        }
    }
}
