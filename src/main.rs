//! Kindling front controller.
//!
//! # Architecture Overview
//!
//! ```text
//!   kindling serve                          kindling run users 42 --verbose
//!        │                                          │
//!        ▼                                          ▼
//!  ┌────────────┐                          ┌─────────────────┐
//!  │ http       │  Request::from_http      │ Request::from_cli│
//!  │ server     │─────────────┐   ┌────────│ (path /users/42) │
//!  └────────────┘             ▼   ▼        └─────────────────┘
//!                      ┌─────────────────┐
//!                      │ dispatch kernel │  hooks · security · routing
//!                      │                 │  resolver · controller · output
//!                      └────────┬────────┘
//!                               ▼
//!                  response sent once + exit code (0 / 1 / 4)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::net::TcpListener;

use kindling::config::{load_with_env, AppConfig, DotEnv};
use kindling::controller::{Context, ControllerDef, HandlerResult};
use kindling::observability::{logging, metrics};
use kindling::routing::{Handler, RouteError};
use kindling::view;
use kindling::{HttpServer, KernelBuilder, Request, Shutdown};

#[derive(Parser)]
#[command(name = "kindling")]
#[command(about = "Front-controller web framework runtime", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the `.env` file.
    #[arg(long, default_value = ".")]
    env_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve HTTP on the configured listener
    Serve,
    /// Dispatch one request from the command line
    Run {
        /// Path segments and `--option value` pairs
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, env) = match load_with_env(cli.config.as_deref(), &cli.env_dir) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("kindling: {}", e);
            return ExitCode::from(3);
        }
    };
    logging::init_logging(&config.observability.log_level);

    let kernel = match build_kernel(config) {
        Ok(kernel) => Arc::new(kernel),
        Err(e) => {
            tracing::error!(error = %e, "Invalid route definition");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Run { args } => {
            let request = Request::from_cli(args, &env);
            let outcome = kernel.dispatch(request);
            print!("{}", outcome.response.body());
            outcome.exit.into()
        }
        Commands::Serve => match serve(kernel, env) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "Server failed");
                ExitCode::FAILURE
            }
        },
    }
}

fn serve(kernel: Arc<kindling::Kernel>, env: DotEnv) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async move {
        let config = kernel.config().clone();
        tracing::info!(
            bind_address = %config.listener.bind_address,
            request_timeout_secs = config.timeouts.request_secs,
            environment = %config.app.environment,
            "Configuration loaded"
        );

        if config.observability.metrics_enabled {
            match config.observability.metrics_address.parse() {
                Ok(addr) => {
                    if let Err(e) = metrics::init_metrics(addr) {
                        tracing::error!(error = %e, "Failed to start metrics exporter");
                    }
                }
                Err(_) => tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                ),
            }
        }

        let listener = TcpListener::bind(&config.listener.bind_address).await?;
        let shutdown = Shutdown::new();
        let server = HttpServer::new(kernel, Arc::new(env));
        server.run(listener, shutdown.subscribe()).await?;

        tracing::info!("Shutdown complete");
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// The bundled welcome application.
fn build_kernel(config: AppConfig) -> Result<kindling::Kernel, RouteError> {
    let mut builder = KernelBuilder::new(config);
    builder.controller(
        "Home",
        ControllerDef::<Home>::default()
            .action("index", Home::index)
            .action("about", Home::about),
    );

    builder
        .routes()
        .get("/", "Home::index")?
        .get("/about", "Home::about")?
        .add_redirect("/home", "/", None)?
        .get(
            "/hello/{name}",
            Handler::closure(|ctx, params| {
                let name = params.first().map(String::as_str).unwrap_or("stranger");
                ctx.echo(&format!("Hello, {}!", name));
                Ok(())
            }),
        )?
        .cli(
            "/greet/(:segment)",
            Handler::closure(|ctx, params| {
                let name = params.first().map(String::as_str).unwrap_or("stranger");
                let punctuation = if ctx.request.get_option("shout").is_some() { "!" } else { "." };
                ctx.echo(&format!("Hello, {}{}\n", name, punctuation));
                Ok(())
            }),
        )?;

    Ok(builder.build())
}

#[derive(Default)]
struct Home;

#[derive(Serialize)]
struct Page<'a> {
    title: &'a str,
    body: &'a str,
}

impl Home {
    fn index(&mut self, ctx: &mut Context<'_>, _params: &[String]) -> HandlerResult {
        ctx.view(
            view::WELCOME_PAGE,
            &Page {
                title: "Welcome to Kindling",
                body: "Page rendered in {elapsed_time} seconds.",
            },
        )
    }

    fn about(&mut self, ctx: &mut Context<'_>, _params: &[String]) -> HandlerResult {
        let name = if ctx.has_view("about") { "about" } else { view::WELCOME_PAGE };
        ctx.view(
            name,
            &Page {
                title: "About",
                body: "A front controller: one entry point, ordered routes, hooks around every stage.",
            },
        )
    }
}
