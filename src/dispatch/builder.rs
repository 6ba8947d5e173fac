//! Kernel construction.
//!
//! Routes, controllers and hooks are mutable only while the builder owns
//! them; `build` freezes everything behind `Arc`.

use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::controller::{ControllerDef, ControllerRegistry};
use crate::dispatch::Kernel;
use crate::hooks::Hooks;
use crate::routing::RouteTable;
use crate::view::{TemplateViews, ViewRenderer};

#[derive(Default)]
pub struct KernelBuilder {
    config: AppConfig,
    routes: RouteTable,
    controllers: ControllerRegistry,
    hooks: Hooks,
    views: Option<Arc<dyn ViewRenderer>>,
}

impl KernelBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    pub fn routes(&mut self) -> &mut RouteTable {
        &mut self.routes
    }

    pub fn hooks(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn controller<C: 'static>(&mut self, name: &str, def: ControllerDef<C>) -> &mut Self {
        self.controllers.register(name, def);
        self
    }

    /// Replace the default minijinja views.
    pub fn views(&mut self, views: Arc<dyn ViewRenderer>) -> &mut Self {
        self.views = Some(views);
        self
    }

    pub fn build(self) -> Kernel {
        for name in self.routes.controller_names() {
            if !self.controllers.contains(name) {
                tracing::warn!(controller = name, "Route references an unregistered controller");
            }
        }

        let views = self.views.unwrap_or_else(|| {
            let dir = self.config.views.path.as_deref().map(Path::new);
            Arc::new(TemplateViews::new(dir))
        });

        tracing::debug!(
            routes = self.routes.len(),
            controllers = self.controllers.names().len(),
            "Kernel built"
        );

        Kernel::new(
            Arc::new(self.config),
            Arc::new(self.routes),
            Arc::new(self.controllers),
            Arc::new(self.hooks),
            views,
        )
    }
}
