//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! app.toml (optional)
//!     → loader.rs (parse & deserialize)
//!     → env.rs (.env overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc with the dispatch kernel
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use env::DotEnv;
pub use loader::{load_config, load_with_env, parse_config, ConfigError};
pub use schema::AppConfig;
pub use schema::CsrfConfig;
pub use schema::ListenerConfig;
