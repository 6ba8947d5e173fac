//! Named controller classes.
//!
//! A class is a factory plus a table of named actions and an optional remap
//! (catch-all) action. The registry stores classes type-erased behind
//! `ControllerClass`, so the resolver can check capabilities without knowing
//! the concrete controller type.

use std::collections::HashMap;
use std::fmt;

use crate::controller::{Context, HandlerError, HandlerResult};
use crate::http::{Request, Response};

/// A named action on controller `C`.
pub type Action<C> = fn(&mut C, &mut Context<'_>, &[String]) -> HandlerResult;

/// Catch-all action: receives the requested method name and the parameters.
pub type Remap<C> = fn(&mut C, &mut Context<'_>, &str, &[String]) -> HandlerResult;

type Factory<C> = Box<dyn Fn(&Request, &mut Response) -> C + Send + Sync>;

/// Type-erased controller class.
pub trait ControllerClass: Send + Sync {
    fn has_action(&self, name: &str) -> bool;

    fn has_remap(&self) -> bool;

    /// Build a fresh instance for one request.
    fn construct<'a>(&'a self, request: &Request, response: &mut Response) -> Box<dyn ControllerInstance + 'a>;
}

/// A constructed controller, alive for exactly one dispatch.
pub trait ControllerInstance {
    /// Run `method`, going through the remap action when the class has one.
    fn invoke(&mut self, ctx: &mut Context<'_>, method: &str, params: &[String]) -> HandlerResult;
}

pub struct ControllerDef<C> {
    factory: Factory<C>,
    actions: HashMap<String, Action<C>>,
    remap: Option<Remap<C>>,
}

impl<C: 'static> ControllerDef<C> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> C + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            actions: HashMap::new(),
            remap: None,
        }
    }

    pub fn action(mut self, name: &str, action: Action<C>) -> Self {
        self.actions.insert(name.to_string(), action);
        self
    }

    pub fn remap(mut self, remap: Remap<C>) -> Self {
        self.remap = Some(remap);
        self
    }
}

impl<C: Default + 'static> Default for ControllerDef<C> {
    fn default() -> Self {
        Self::new(|_, _| C::default())
    }
}

struct Instance<'a, C> {
    def: &'a ControllerDef<C>,
    controller: C,
}

impl<C> ControllerInstance for Instance<'_, C> {
    fn invoke(&mut self, ctx: &mut Context<'_>, method: &str, params: &[String]) -> HandlerResult {
        if let Some(remap) = self.def.remap {
            return remap(&mut self.controller, ctx, method, params);
        }
        match self.def.actions.get(method) {
            Some(action) => action(&mut self.controller, ctx, params),
            None => Err(HandlerError::UnknownAction(method.to_string())),
        }
    }
}

impl<C: 'static> ControllerClass for ControllerDef<C> {
    fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    fn has_remap(&self) -> bool {
        self.remap.is_some()
    }

    fn construct<'a>(&'a self, request: &Request, response: &mut Response) -> Box<dyn ControllerInstance + 'a> {
        Box::new(Instance {
            def: self,
            controller: (self.factory)(request, response),
        })
    }
}

/// Controller classes by name.
#[derive(Default)]
pub struct ControllerRegistry {
    classes: HashMap<String, Box<dyn ControllerClass>>,
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("classes", &self.names())
            .finish()
    }
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `def` under `name`, replacing any previous class.
    pub fn register<C: 'static>(&mut self, name: &str, def: ControllerDef<C>) -> &mut Self {
        if self.classes.insert(name.to_string(), Box::new(def)).is_some() {
            tracing::warn!(class = name, "Controller class replaced");
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn ControllerClass> {
        self.classes.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
