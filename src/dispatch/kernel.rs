//! The dispatch kernel.
//!
//! # Lifecycle
//!
//! ```text
//! Bootstrap        pre_system hook
//! Security         forced HTTPS redirect, CSRF verification (HTTP only)
//! Routing          route lookup; redirect routes end here
//! PreController    pre_controller hook, output capture begins
//! Resolution       closure / class / 404 override; NotFound ends here (exit 4)
//! Controller       post_controller_constructor hook (classes), handler runs
//! PostController   post_controller hook, output finalized
//! Emission         response sent exactly once (skipped if the handler sent it)
//! PostSystem       post_system hook; failures are only logged
//! ```
//!
//! Any error or panic before emission replaces the response with an error
//! page (500, or 403 for security rejections) and exit code 1.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use serde_json::json;

use crate::config::AppConfig;
use crate::controller::{Context, ControllerRegistry, NotFoundReason, Resolution, Resolver};
use crate::dispatch::output::{substitute_elapsed, Output, ELAPSED_TIME};
use crate::dispatch::timer::{self, Timer};
use crate::error::DispatchError;
use crate::hooks::{HookPoint, Hooks};
use crate::http::{RedirectMethod, Request, Response};
use crate::observability::metrics;
use crate::routing::{RouteOutcome, RouteTable};
use crate::security::{force_https, CsrfGuard, NOT_ALLOWED};
use crate::view::{self, ViewRenderer};

/// Process exit status of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Exit {
    Success = 0,
    Error = 1,
    NotFound = 4,
}

impl Exit {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Lifecycle stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Bootstrap,
    Security,
    Routing,
    PreController,
    Resolution,
    Controller,
    PostController,
    Emission,
    PostSystem,
}

/// Result of one dispatch.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// The sent response.
    pub response: Response,
    pub exit: Exit,
    /// Last stage the lifecycle entered.
    pub terminated_at: Stage,
}

impl DispatchOutcome {
    pub fn exit_code(&self) -> u8 {
        self.exit.code()
    }
}

/// Per-request state, owned by one dispatch.
struct DispatchState {
    request: Request,
    response: Response,
    output: Output,
    timer: Timer,
    stage: Stage,
}

/// Immutable application wiring shared by every dispatch.
pub struct Kernel {
    config: Arc<AppConfig>,
    routes: Arc<RouteTable>,
    controllers: Arc<ControllerRegistry>,
    hooks: Arc<Hooks>,
    views: Arc<dyn ViewRenderer>,
    csrf: CsrfGuard,
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("environment", &self.config.app.environment)
            .field("routes", &self.routes.len())
            .field("controllers", &self.controllers.names())
            .field("hooks", &self.hooks)
            .finish()
    }
}

impl Kernel {
    pub fn new(
        config: Arc<AppConfig>,
        routes: Arc<RouteTable>,
        controllers: Arc<ControllerRegistry>,
        hooks: Arc<Hooks>,
        views: Arc<dyn ViewRenderer>,
    ) -> Self {
        let csrf = CsrfGuard::new(&config.csrf);
        Self {
            config,
            routes,
            controllers,
            hooks,
            views,
            csrf,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn controllers(&self) -> &ControllerRegistry {
        &self.controllers
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn views(&self) -> &dyn ViewRenderer {
        self.views.as_ref()
    }

    /// Run the full lifecycle for one request.
    pub fn dispatch(&self, request: Request) -> DispatchOutcome {
        let start = Instant::now();
        let span = tracing::info_span!(
            "dispatch",
            request_id = %request.id(),
            method = %request.method(),
            path = %request.path(),
        );
        let _enter = span.enter();

        let context = if request.is_cli() { "cli" } else { "http" };
        let mut clock = Timer::new();
        clock.start(timer::TOTAL_EXECUTION);
        clock.start(timer::BOOTSTRAP);

        let mut state = DispatchState {
            request,
            response: Response::new(),
            output: Output::new(),
            timer: clock,
            stage: Stage::Bootstrap,
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(&mut state)));
        let exit = match result {
            Ok(Ok(exit)) => exit,
            Ok(Err(err)) => self.handle_error(&mut state, err),
            Err(payload) => self.handle_error(&mut state, DispatchError::Panic(panic_message(payload))),
        };

        let status = state.response.status();
        metrics::record_dispatch(context, status.as_u16(), exit.code(), start);
        tracing::info!(
            status = status.as_u16(),
            exit = exit.code(),
            stage = ?state.stage,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request dispatched"
        );

        DispatchOutcome {
            response: state.response,
            exit,
            terminated_at: state.stage,
        }
    }

    fn run(&self, st: &mut DispatchState) -> Result<Exit, DispatchError> {
        // Bootstrap
        self.hooks.trigger(HookPoint::PreSystem, &st.request, &st.response)?;
        st.response.set_protocol_version(st.request.protocol_version());
        st.timer.stop(timer::BOOTSTRAP);

        // Security pre-pass
        st.stage = Stage::Security;
        if !st.request.is_cli() {
            if self.config.app.force_global_secure_requests
                && force_https(&self.config.app, &st.request, &mut st.response)?
            {
                st.response.send()?;
                return Ok(Exit::Success);
            }
            if self.config.app.csrf_protection {
                self.csrf.verify(&mut st.request)?;
                self.csrf.ensure_cookie(&st.request, &mut st.response)?;
            }
        }

        // Routing
        st.stage = Stage::Routing;
        st.timer.start(timer::ROUTING);
        let outcome = self
            .routes
            .match_path(st.request.method(), st.request.context(), st.request.path());
        st.timer.stop(timer::ROUTING);

        let matched = match outcome {
            RouteOutcome::Redirect { to, status } => {
                tracing::info!(location = %to, status = status.as_u16(), "Redirect route matched");
                st.response
                    .redirect(&to, RedirectMethod::Auto, Some(status), st.request.method())?;
                st.response.send()?;
                return Ok(Exit::Success);
            }
            RouteOutcome::Matched(m) => {
                tracing::debug!(pattern = %m.pattern, handler = ?m.handler, "Route matched");
                Some(m)
            }
            RouteOutcome::NotFound => None,
        };

        st.stage = Stage::PreController;
        self.hooks.trigger(HookPoint::PreController, &st.request, &st.response)?;

        // Resolution
        st.stage = Stage::Resolution;
        st.timer.start(timer::CONTROLLER);
        st.timer.start(timer::CONTROLLER_CONSTRUCTOR);
        let resolution = Resolver::new(&self.controllers, &self.routes).resolve(matched);

        // Invocation
        match resolution {
            Resolution::NotFound(reason) => return self.not_found(st, &reason),
            Resolution::Closure {
                handler, params, named, ..
            } => {
                st.stage = Stage::Controller;
                st.timer.stop(timer::CONTROLLER_CONSTRUCTOR);
                let mut ctx = Context::new(&st.request, &mut st.response, &mut st.output, self.views.as_ref())
                    .with_named(named);
                handler(&mut ctx, &params)?;
            }
            Resolution::Class {
                class,
                name,
                method,
                params,
                named,
                ..
            } => {
                st.stage = Stage::Controller;
                let mut instance = class.construct(&st.request, &mut st.response);
                st.timer.stop(timer::CONTROLLER_CONSTRUCTOR);
                self.hooks
                    .trigger(HookPoint::PostControllerConstructor, &st.request, &st.response)?;

                tracing::debug!(controller = %name, method = %method, "Invoking controller");
                let mut ctx = Context::new(&st.request, &mut st.response, &mut st.output, self.views.as_ref())
                    .with_named(named);
                instance.invoke(&mut ctx, &method, &params)?;
            }
        }
        st.timer.stop(timer::CONTROLLER);

        st.stage = Stage::PostController;
        self.hooks.trigger(HookPoint::PostController, &st.request, &st.response)?;

        st.stage = Stage::Emission;
        if st.response.is_sent() {
            // The handler emitted the response itself; it is final.
            if !st.output.is_empty() {
                tracing::warn!(
                    discarded_bytes = st.output.len(),
                    "Output written after the response was sent was discarded"
                );
            }
            st.output.clear();
            st.timer.stop(timer::TOTAL_EXECUTION);
        } else {
            self.finalize(st)?;
            st.response.send()?;
        }

        st.stage = Stage::PostSystem;
        if let Err(err) = self.hooks.trigger(HookPoint::PostSystem, &st.request, &st.response) {
            tracing::error!(error = %err, "post_system hook failed after response was sent");
        }
        Ok(Exit::Success)
    }

    /// Move buffered output into the body, substitute the elapsed time and
    /// append the diagnostic footer.
    fn finalize(&self, st: &mut DispatchState) -> Result<(), DispatchError> {
        let mut body = st.response.body().to_string();
        body.push_str(&st.output.take());

        if self.config.toolbar_active() && !st.request.is_cli() && !st.response.is_redirect() {
            let marks: Vec<_> = st
                .timer
                .summary()
                .into_iter()
                .map(|(name, seconds)| json!({ "name": name, "seconds": format!("{:.4}", seconds) }))
                .collect();
            let footer = self.views.render(
                view::DEBUG_TOOLBAR,
                &json!({
                    "environment": self.config.app.environment,
                    "method": st.request.method().as_str(),
                    "path": st.request.path(),
                    "status": st.response.status().as_u16(),
                    "elapsed": ELAPSED_TIME,
                    "marks": marks,
                }),
            )?;
            body.push_str(&footer);
        }

        st.timer.stop(timer::TOTAL_EXECUTION);
        let body = substitute_elapsed(&body, st.timer.seconds(timer::TOTAL_EXECUTION));
        st.response.set_body(body);
        Ok(())
    }

    fn not_found(&self, st: &mut DispatchState, reason: &NotFoundReason) -> Result<Exit, DispatchError> {
        tracing::info!(reason = %reason, "No route or controller for request");
        metrics::record_not_found(if st.request.is_cli() { "cli" } else { "http" });

        st.output.clear();
        st.response.set_status(StatusCode::NOT_FOUND);

        let name = if st.request.is_cli() {
            view::ERROR_404_CLI
        } else {
            view::ERROR_404_HTML
        };
        let data = if self.config.is_production() {
            json!({})
        } else {
            json!({
                "message": format!(
                    "Can't find a route for '{} {}'.",
                    st.request.method(),
                    st.request.path()
                )
            })
        };
        let page = self.views.render(name, &data)?;
        st.response.set_body(page);
        st.response.send()?;
        Ok(Exit::NotFound)
    }

    fn handle_error(&self, st: &mut DispatchState, err: DispatchError) -> Exit {
        metrics::record_error(err.kind());

        if st.response.is_sent() {
            tracing::error!(error = %err, kind = err.kind(), "Error after response was sent");
            return Exit::Success;
        }

        match &err {
            DispatchError::Security(e) => tracing::warn!(error = %e, "Request rejected"),
            _ => tracing::error!(error = %err, kind = err.kind(), stage = ?st.stage, "Dispatch failed"),
        }

        let status = err.status();
        let mut response = Response::new();
        response.set_protocol_version(st.response.protocol_version());
        response.set_status(status);

        let name = if st.request.is_cli() {
            view::ERROR_EXCEPTION_CLI
        } else {
            view::ERROR_EXCEPTION_HTML
        };
        let data = error_page_data(&err, status, self.config.is_production());
        let page = self.views.render(name, &data).unwrap_or_else(|render_err| {
            tracing::error!(error = %render_err, "Error page failed to render");
            format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or("Error"))
        });
        response.set_body(page);
        response.mark_sent();

        st.output.clear();
        st.response = response;
        Exit::Error
    }
}

fn error_page_data(err: &DispatchError, status: StatusCode, production: bool) -> serde_json::Value {
    match err {
        DispatchError::Security(_) => json!({
            "code": status.as_u16(),
            "title": "Forbidden",
            "message": NOT_ALLOWED,
        }),
        _ if production => json!({ "code": status.as_u16() }),
        _ => json!({
            "code": status.as_u16(),
            "title": err.kind(),
            "detail": err.to_string(),
        }),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
