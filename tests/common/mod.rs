//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::http::{Method, StatusCode};
use kindling::config::AppConfig;
use kindling::controller::{Context, ControllerDef, HandlerError, HandlerResult};
use kindling::hooks::HookPoint;
use kindling::{Kernel, KernelBuilder, Request};

/// Shared, ordered record of what ran during a dispatch.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

pub struct UsersController {
    journal: Journal,
}

impl UsersController {
    fn show(&mut self, ctx: &mut Context<'_>, params: &[String]) -> HandlerResult {
        self.journal.push("Users::show");
        ctx.echo(&format!("user {}", params.join(",")));
        Ok(())
    }

    fn create(&mut self, ctx: &mut Context<'_>, _params: &[String]) -> HandlerResult {
        self.journal.push("Users::create");
        let name = ctx.request.get_post("name").unwrap_or("anonymous").to_string();
        ctx.response.set_status(StatusCode::CREATED);
        ctx.echo(&format!("created {}", name));
        Ok(())
    }

    fn article(&mut self, ctx: &mut Context<'_>, _params: &[String]) -> HandlerResult {
        let year = ctx.param("year").unwrap_or("?").to_string();
        let slug = ctx.param("slug").unwrap_or("?").to_string();
        ctx.echo(&format!("article {}/{}", year, slug));
        Ok(())
    }

    fn timed(&mut self, ctx: &mut Context<'_>, _params: &[String]) -> HandlerResult {
        ctx.echo("took {elapsed_time}s");
        Ok(())
    }

    fn prefixed(&mut self, ctx: &mut Context<'_>, _params: &[String]) -> HandlerResult {
        ctx.response.set_body("head;");
        ctx.echo("tail");
        Ok(())
    }

    fn fail(&mut self, _ctx: &mut Context<'_>, _params: &[String]) -> HandlerResult {
        Err(HandlerError::msg("database unavailable"))
    }

    fn explode(&mut self, _ctx: &mut Context<'_>, _params: &[String]) -> HandlerResult {
        panic!("controller blew up");
    }

    fn secret(&mut self, ctx: &mut Context<'_>, _params: &[String]) -> HandlerResult {
        self.journal.push("Users::_secret");
        ctx.echo("secret");
        Ok(())
    }
}

pub fn users(journal: &Journal) -> ControllerDef<UsersController> {
    let journal = journal.clone();
    ControllerDef::new(move |_req, _res| {
        journal.push("Users::new");
        UsersController {
            journal: journal.clone(),
        }
    })
    .action("show", UsersController::show)
    .action("create", UsersController::create)
    .action("article", UsersController::article)
    .action("timed", UsersController::timed)
    .action("prefixed", UsersController::prefixed)
    .action("fail", UsersController::fail)
    .action("explode", UsersController::explode)
    .action("_secret", UsersController::secret)
}

/// Controller that answers every method through its remap action.
#[derive(Default)]
pub struct ApiController;

impl ApiController {
    fn remap(&mut self, ctx: &mut Context<'_>, method: &str, params: &[String]) -> HandlerResult {
        ctx.echo(&format!("api:{}({})", method, params.join(",")));
        Ok(())
    }
}

pub fn api() -> ControllerDef<ApiController> {
    ControllerDef::default().remap(ApiController::remap)
}

/// Custom 404 page controller.
#[derive(Default)]
pub struct ErrorsController;

impl ErrorsController {
    fn missing(&mut self, ctx: &mut Context<'_>, params: &[String]) -> HandlerResult {
        ctx.response.set_status(StatusCode::NOT_FOUND);
        ctx.echo(&format!("custom missing page ({} params)", params.len()));
        Ok(())
    }

    fn soft(&mut self, ctx: &mut Context<'_>, _params: &[String]) -> HandlerResult {
        ctx.echo("soft landing");
        Ok(())
    }
}

pub fn errors() -> ControllerDef<ErrorsController> {
    ControllerDef::default()
        .action("missing", ErrorsController::missing)
        .action("soft", ErrorsController::soft)
}

pub fn development() -> AppConfig {
    let mut config = AppConfig::default();
    config.app.environment = "development".to_string();
    config
}

/// Builder with the Users, Api and Errors controllers and every hook point
/// journaled.
pub fn builder(config: AppConfig, journal: &Journal) -> KernelBuilder {
    let mut builder = KernelBuilder::new(config);
    builder
        .controller("Users", users(journal))
        .controller("Api", api())
        .controller("Errors", errors());

    for point in HookPoint::ALL {
        let journal = journal.clone();
        builder.hooks().register(point, move |ctx| {
            journal.push(ctx.hook);
            Ok(())
        });
    }
    builder
}

/// Kernel with the standard user routes.
pub fn kernel(config: AppConfig, journal: &Journal) -> Kernel {
    let mut builder = builder(config, journal);
    builder
        .routes()
        .get("/users/(:num)", "Users::show")
        .unwrap()
        .post("/users", "Users::create")
        .unwrap()
        .get("/articles/{year:num}/{slug}", "Users::article")
        .unwrap()
        .get("/timed", "Users::timed")
        .unwrap()
        .get("/prefixed", "Users::prefixed")
        .unwrap()
        .get("/fail", "Users::fail")
        .unwrap()
        .get("/explode", "Users::explode")
        .unwrap()
        .get("/secret", "Users::_secret")
        .unwrap()
        .add("/api/(:any)", "Api::lookup")
        .unwrap();
    builder.build()
}

pub fn get(path: &str) -> Request {
    Request::builder().method(Method::GET).uri(path).build()
}

pub fn post_form(path: &str, pairs: &[(&str, &str)]) -> Request {
    Request::builder().method(Method::POST).uri(path).form(pairs).build()
}
