//! End-to-end dispatch lifecycle tests.

use axum::http::{Method, StatusCode, Version};
use kindling::config::AppConfig;
use kindling::controller::HandlerError;
use kindling::dispatch::{Exit, Stage};
use kindling::hooks::{HookError, HookPoint, PRIORITY_HIGH, PRIORITY_LOW};
use kindling::http::{Filter, RedirectMethod};
use kindling::routing::Handler;
use kindling::Request;

mod common;
use common::{builder, development, get, kernel, post_form, Journal};

#[test]
fn test_matched_route_runs_full_lifecycle() {
    let journal = Journal::default();
    let kernel = kernel(AppConfig::default(), &journal);

    let outcome = kernel.dispatch(get("/users/42"));

    assert_eq!(outcome.exit, Exit::Success);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.terminated_at, Stage::PostSystem);
    assert_eq!(outcome.response.status(), StatusCode::OK);
    assert_eq!(outcome.response.body(), "user 42");
    assert!(outcome.response.is_sent());
    assert_eq!(
        journal.entries(),
        vec![
            "pre_system",
            "pre_controller",
            "Users::new",
            "post_controller_constructor",
            "Users::show",
            "post_controller",
            "post_system",
        ]
    );
}

#[test]
fn test_hook_order_is_stable_across_dispatches() {
    let journal = Journal::default();
    let mut builder = builder(AppConfig::default(), &journal);
    builder.routes().get("/", "Users::show").unwrap();
    for (priority, tag) in [(PRIORITY_LOW, "low"), (PRIORITY_HIGH, "high")] {
        let journal = journal.clone();
        builder
            .hooks()
            .register_with_priority(HookPoint::PreSystem, priority, move |_| {
                journal.push(tag);
                Ok(())
            });
    }
    let kernel = builder.build();

    for _ in 0..3 {
        journal.clear();
        kernel.dispatch(get("/"));
        let hooks: Vec<String> = journal
            .entries()
            .into_iter()
            .filter(|e| !e.starts_with("Users::"))
            .collect();
        assert_eq!(
            hooks,
            vec![
                "high",
                "pre_system",
                "low",
                "pre_controller",
                "post_controller_constructor",
                "post_controller",
                "post_system",
            ]
        );
    }
}

#[test]
fn test_first_matching_route_wins() {
    let journal = Journal::default();
    let mut builder = builder(AppConfig::default(), &journal);
    builder
        .routes()
        .get(
            "/items/(:num)",
            Handler::closure(|ctx, _| {
                ctx.echo("numeric");
                Ok(())
            }),
        )
        .unwrap()
        .get(
            "/items/(:segment)",
            Handler::closure(|ctx, _| {
                ctx.echo("segment");
                Ok(())
            }),
        )
        .unwrap();
    let kernel = builder.build();

    assert_eq!(kernel.dispatch(get("/items/7")).response.body(), "numeric");
    assert_eq!(kernel.dispatch(get("/items/seven")).response.body(), "segment");
}

#[test]
fn test_closure_skips_constructor_hook() {
    let journal = Journal::default();
    let mut builder = builder(AppConfig::default(), &journal);
    builder
        .routes()
        .get(
            "/hello/{name}",
            Handler::closure(|ctx, params| {
                ctx.echo(&format!("hello {}", params[0]));
                Ok(())
            }),
        )
        .unwrap();
    let kernel = builder.build();

    let outcome = kernel.dispatch(get("/hello/ada"));
    assert_eq!(outcome.response.body(), "hello ada");
    assert!(!journal.contains("post_controller_constructor"));
    assert!(journal.contains("post_controller"));
}

#[test]
fn test_unmatched_path_is_404_with_exit_4() {
    let journal = Journal::default();
    let kernel = kernel(AppConfig::default(), &journal);

    let outcome = kernel.dispatch(get("/nowhere"));

    assert_eq!(outcome.response.status(), StatusCode::NOT_FOUND);
    assert_eq!(outcome.exit, Exit::NotFound);
    assert_eq!(outcome.exit_code(), 4);
    assert_eq!(outcome.terminated_at, Stage::Resolution);
    assert!(outcome.response.body().contains("<h1>404</h1>"));
    assert!(outcome.response.is_sent());
    // post_controller and post_system do not run on a 404
    assert_eq!(journal.entries(), vec!["pre_system", "pre_controller"]);
}

#[test]
fn test_404_detail_only_outside_production() {
    let journal = Journal::default();

    let outcome = kernel(development(), &journal).dispatch(get("/nowhere"));
    assert!(outcome.response.body().contains("find a route for"));

    let outcome = kernel(AppConfig::default(), &journal).dispatch(get("/nowhere"));
    assert!(!outcome.response.body().contains("find a route for"));
    assert!(outcome.response.body().contains("Cannot seem to find the page"));
}

#[test]
fn test_cli_404_uses_plain_text_page() {
    let journal = Journal::default();
    let kernel = kernel(development(), &journal);

    let outcome = kernel.dispatch(Request::from_cli(["no", "such", "command"], &Default::default()));

    assert_eq!(outcome.exit_code(), 4);
    let body = outcome.response.body();
    assert!(body.contains("ERROR: 404"));
    assert!(body.contains("Can't find a route for 'GET /no/such/command'."));
}

#[test]
fn test_underscore_method_is_not_routable() {
    let journal = Journal::default();
    let kernel = kernel(AppConfig::default(), &journal);

    let outcome = kernel.dispatch(get("/secret"));

    assert_eq!(outcome.response.status(), StatusCode::NOT_FOUND);
    assert!(!journal.contains("Users::new"));
    assert!(!journal.contains("Users::_secret"));
}

#[test]
fn test_redirect_route_short_circuits() {
    let journal = Journal::default();
    let mut builder = builder(AppConfig::default(), &journal);
    builder
        .routes()
        .add_redirect("/old", "/users/1", None)
        .unwrap()
        .add("/old", "Users::show")
        .unwrap();
    let kernel = builder.build();

    let outcome = kernel.dispatch(get("/old"));

    assert_eq!(outcome.response.status(), StatusCode::FOUND);
    assert_eq!(outcome.response.header("location"), Some("/users/1"));
    assert!(outcome.response.body().is_empty());
    assert_eq!(outcome.exit, Exit::Success);
    assert_eq!(outcome.terminated_at, Stage::Routing);
    // Only the bootstrap hook ran; no controller was built
    assert_eq!(journal.entries(), vec!["pre_system"]);
}

#[test]
fn test_redirect_route_explicit_status() {
    let journal = Journal::default();
    let mut builder = builder(AppConfig::default(), &journal);
    builder
        .routes()
        .add_redirect("/legacy", "/", Some(StatusCode::MOVED_PERMANENTLY))
        .unwrap();
    let kernel = builder.build();

    let outcome = kernel.dispatch(Request::builder().method(Method::POST).uri("/legacy").build());
    assert_eq!(outcome.response.status(), StatusCode::MOVED_PERMANENTLY);
}

#[test]
fn test_404_override_keeps_its_own_status() {
    let journal = Journal::default();

    let mut soft = builder(AppConfig::default(), &journal);
    soft.routes().set_404_override("Errors::soft");
    let outcome = soft.build().dispatch(get("/missing/page"));
    assert_eq!(outcome.response.status(), StatusCode::OK);
    assert_eq!(outcome.response.body(), "soft landing");
    assert_eq!(outcome.exit, Exit::Success);

    let mut hard = builder(AppConfig::default(), &journal);
    hard.routes()
        .get("/users/(:num)", "Ghost::show")
        .unwrap()
        .set_404_override("Errors::missing");
    let outcome = hard.build().dispatch(get("/users/5"));
    assert_eq!(outcome.response.status(), StatusCode::NOT_FOUND);
    // Override targets are invoked without the matched parameters
    assert_eq!(outcome.response.body(), "custom missing page (0 params)");
    assert_eq!(outcome.exit, Exit::Success);
}

#[test]
fn test_unresolvable_override_falls_back_to_404() {
    let journal = Journal::default();
    let mut builder = builder(AppConfig::default(), &journal);
    builder.routes().set_404_override("Nobody::home");

    let outcome = builder.build().dispatch(get("/x"));
    assert_eq!(outcome.exit, Exit::NotFound);
    assert_eq!(outcome.response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_remap_receives_method_and_params() {
    let journal = Journal::default();
    let kernel = kernel(AppConfig::default(), &journal);

    let outcome = kernel.dispatch(get("/api/v1/orders"));
    assert_eq!(outcome.response.body(), "api:lookup(v1/orders)");
}

#[test]
fn test_verb_restriction() {
    let journal = Journal::default();
    let kernel = kernel(AppConfig::default(), &journal);

    let outcome = kernel.dispatch(get("/users"));
    assert_eq!(outcome.response.status(), StatusCode::NOT_FOUND);

    let outcome = kernel.dispatch(post_form("/users", &[("name", "grace")]));
    assert_eq!(outcome.response.status(), StatusCode::CREATED);
    assert_eq!(outcome.response.body(), "created grace");
}

#[test]
fn test_cli_request_routes_segments() {
    let journal = Journal::default();
    let mut builder = builder(AppConfig::default(), &journal);
    builder
        .routes()
        .cli(
            "/greet/(:segment)",
            Handler::closure(|ctx, params| {
                let suffix = ctx.request.get_option("suffix").unwrap_or("");
                ctx.echo(&format!("hi {}{}", params[0], suffix));
                Ok(())
            }),
        )
        .unwrap();
    let kernel = builder.build();

    let request = Request::from_cli(["greet", "ada", "--suffix", "!"], &Default::default());
    assert_eq!(request.path(), "/greet/ada");
    let outcome = kernel.dispatch(request);
    assert_eq!(outcome.response.body(), "hi ada!");
    assert_eq!(outcome.exit_code(), 0);

    // CLI routes are invisible to HTTP
    assert_eq!(kernel.dispatch(get("/greet/ada")).exit, Exit::NotFound);
}

#[test]
fn test_elapsed_time_is_substituted() {
    let journal = Journal::default();
    let kernel = kernel(AppConfig::default(), &journal);

    let body = kernel.dispatch(get("/timed")).response.body().to_string();
    assert!(!body.contains("{elapsed_time}"));
    let seconds = body.trim_start_matches("took ").trim_end_matches('s');
    let (_, decimals) = seconds.split_once('.').unwrap();
    assert_eq!(decimals.len(), 4);
    assert!(seconds.parse::<f64>().is_ok());
}

#[test]
fn test_buffered_output_follows_direct_body() {
    let journal = Journal::default();
    let kernel = kernel(AppConfig::default(), &journal);
    assert_eq!(kernel.dispatch(get("/prefixed")).response.body(), "head;tail");
}

#[test]
fn test_toolbar_footer_gating() {
    let journal = Journal::default();

    let mut config = development();
    config.app.toolbar_enabled = true;
    let body = kernel(config.clone(), &journal).dispatch(get("/users/1")).response.body().to_string();
    assert!(body.starts_with("user 1"));
    assert!(body.contains("id=\"debug-bar\""));
    assert!(!body.contains("{elapsed_time}"));

    // Never on CLI output
    let mut cli_builder = builder(config.clone(), &journal);
    cli_builder.routes().cli("/users/(:num)", "Users::show").unwrap();
    let outcome = cli_builder.build().dispatch(Request::from_cli(["users", "1"], &Default::default()));
    assert_eq!(outcome.response.body(), "user 1");

    // Never in production
    config.app.environment = "production".into();
    let body = kernel(config, &journal).dispatch(get("/users/1")).response.body().to_string();
    assert_eq!(body, "user 1");
}

#[test]
fn test_csrf_rejection_happens_before_routing() {
    let journal = Journal::default();
    let mut config = AppConfig::default();
    config.app.csrf_protection = true;
    let kernel = kernel(config, &journal);

    let outcome = kernel.dispatch(post_form("/users", &[("name", "mallory")]));

    assert_eq!(outcome.response.status(), StatusCode::FORBIDDEN);
    assert_eq!(outcome.exit, Exit::Error);
    assert_eq!(outcome.terminated_at, Stage::Security);
    assert!(outcome.response.body().contains("The action you requested is not allowed."));
    assert_eq!(journal.entries(), vec!["pre_system"]);
}

#[test]
fn test_csrf_token_accepted_and_stripped() {
    let journal = Journal::default();
    let mut config = AppConfig::default();
    config.app.csrf_protection = true;
    let mut builder = builder(config, &journal);
    builder
        .routes()
        .post(
            "/echo",
            Handler::closure(|ctx, _| {
                let fields = ctx.request.post_all(None, Filter::Raw);
                ctx.echo(&format!("{:?}", fields.keys().collect::<Vec<_>>()));
                Ok(())
            }),
        )
        .unwrap();
    let kernel = builder.build();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .cookie("csrf_cookie", "t0k3n")
        .form(&[("csrf_token", "t0k3n"), ("title", "hi")])
        .build();
    let outcome = kernel.dispatch(request);
    assert_eq!(outcome.response.status(), StatusCode::OK);
    assert_eq!(outcome.response.body(), "[\"title\"]");
}

#[test]
fn test_csrf_cookie_issued_on_first_visit() {
    let journal = Journal::default();
    let mut config = AppConfig::default();
    config.app.csrf_protection = true;
    let kernel = kernel(config, &journal);

    let outcome = kernel.dispatch(get("/users/1"));
    let cookie = outcome.response.header("set-cookie").unwrap();
    assert!(cookie.starts_with("csrf_cookie="));
}

#[test]
fn test_forced_https_redirects_plain_requests() {
    let journal = Journal::default();
    let mut config = AppConfig::default();
    config.app.force_global_secure_requests = true;
    config.app.base_url = "http://shop.example/".into();
    let kernel = kernel(config, &journal);

    let outcome = kernel.dispatch(get("/users/9?ref=mail"));
    assert_eq!(outcome.response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(outcome.response.header("location"), Some("https://shop.example/users/9?ref=mail"));
    assert!(outcome.response.header("strict-transport-security").is_some());
    assert_eq!(outcome.terminated_at, Stage::Security);
    assert!(!journal.contains("Users::show"));

    let secure = Request::builder().uri("/users/9").secure(true).build();
    assert_eq!(kernel.dispatch(secure).response.body(), "user 9");
}

#[test]
fn test_handler_error_becomes_500() {
    let journal = Journal::default();

    let outcome = kernel(development(), &journal).dispatch(get("/fail"));
    assert_eq!(outcome.response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(outcome.exit, Exit::Error);
    assert!(outcome.response.body().contains("database unavailable"));
    assert!(outcome.response.is_sent());

    let outcome = kernel(AppConfig::default(), &journal).dispatch(get("/fail"));
    assert_eq!(outcome.response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!outcome.response.body().contains("database unavailable"));
}

#[test]
fn test_panic_is_contained() {
    let journal = Journal::default();
    let kernel = kernel(development(), &journal);

    let outcome = kernel.dispatch(get("/explode"));
    assert_eq!(outcome.response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(outcome.exit_code(), 1);
    assert!(outcome.response.body().contains("controller blew up"));

    // The kernel keeps serving
    assert_eq!(kernel.dispatch(get("/users/3")).response.body(), "user 3");
}

#[test]
fn test_hook_error_aborts_with_500() {
    let journal = Journal::default();
    let mut builder = builder(AppConfig::default(), &journal);
    builder.routes().get("/users/(:num)", "Users::show").unwrap();
    builder
        .hooks()
        .register(HookPoint::PreController, |_| Err(HookError::new("maintenance")));
    let kernel = builder.build();

    let outcome = kernel.dispatch(get("/users/1"));
    assert_eq!(outcome.response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!journal.contains("Users::show"));
}

#[test]
fn test_post_system_failure_leaves_response_alone() {
    let journal = Journal::default();
    let mut builder = builder(AppConfig::default(), &journal);
    builder.routes().get("/users/(:num)", "Users::show").unwrap();
    builder
        .hooks()
        .register(HookPoint::PostSystem, |_| Err(HookError::new("audit sink down")));
    let kernel = builder.build();

    let outcome = kernel.dispatch(get("/users/1"));
    assert_eq!(outcome.response.status(), StatusCode::OK);
    assert_eq!(outcome.response.body(), "user 1");
    assert_eq!(outcome.exit, Exit::Success);
}

#[test]
fn test_closure_error_and_protocol_version() {
    let journal = Journal::default();
    let mut builder = builder(AppConfig::default(), &journal);
    builder
        .routes()
        .get("/broken", Handler::closure(|_, _| Err(HandlerError::msg("nope"))))
        .unwrap()
        .get(
            "/moved",
            Handler::closure(|ctx, _| {
                ctx.response.redirect(
                    "/elsewhere",
                    RedirectMethod::Auto,
                    None,
                    ctx.request.method(),
                )?;
                Ok(())
            }),
        )
        .unwrap();
    let kernel = builder.build();

    assert_eq!(kernel.dispatch(get("/broken")).exit, Exit::Error);

    // No negotiated version means HTTP/1.1
    let outcome = kernel.dispatch(get("/moved"));
    assert_eq!(outcome.response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(outcome.response.protocol_version(), Version::HTTP_11);
    assert!(outcome.response.body().is_empty());

    let mut request = get("/moved");
    request.set_protocol_version(Version::HTTP_10).unwrap();
    let outcome = kernel.dispatch(request);
    assert_eq!(outcome.response.status(), StatusCode::FOUND);
    assert_eq!(outcome.response.protocol_version(), Version::HTTP_10);
}

#[test]
fn test_named_captures_reach_handlers() {
    let journal = Journal::default();
    let mut builder = builder(AppConfig::default(), &journal);
    builder
        .routes()
        .get(
            "/tags/{tag:alpha}",
            Handler::closure(|ctx, params| {
                let tag = ctx.param("tag").unwrap_or("none").to_string();
                ctx.echo(&format!("{} {}", tag, params.len()));
                Ok(())
            }),
        )
        .unwrap();
    let kernel = builder.build();
    assert_eq!(kernel.dispatch(get("/tags/rust")).response.body(), "rust 1");

    let kernel = common::kernel(AppConfig::default(), &journal);
    let outcome = kernel.dispatch(get("/articles/2024/hello-world"));
    assert_eq!(outcome.response.status(), StatusCode::OK);
    assert_eq!(outcome.response.body(), "article 2024/hello-world");
}

#[test]
fn test_handler_sent_response_is_final() {
    let journal = Journal::default();
    let mut builder = builder(AppConfig::default(), &journal);
    builder
        .routes()
        .get(
            "/early",
            Handler::closure(|ctx, _| {
                ctx.response.set_body("early");
                ctx.response.send()?;
                ctx.echo(" late");
                Ok(())
            }),
        )
        .unwrap();
    let kernel = builder.build();

    let outcome = kernel.dispatch(get("/early"));

    assert_eq!(outcome.exit, Exit::Success);
    assert_eq!(outcome.terminated_at, Stage::PostSystem);
    assert_eq!(outcome.response.status(), StatusCode::OK);
    assert_eq!(outcome.response.body(), "early");
    assert!(outcome.response.is_sent());
    assert_eq!(
        journal.entries(),
        vec!["pre_system", "pre_controller", "post_controller", "post_system"]
    );
}
