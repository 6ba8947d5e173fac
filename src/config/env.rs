//! `.env` file loading.
//!
//! # Responsibilities
//! - Parse `KEY=VALUE` lines from a `.env` file
//! - Expand `${NAME}` references to earlier keys or the process environment
//! - Override configuration fields from recognised keys
//!
//! # Design Decisions
//! - Loaded once at startup, never re-read per request
//! - Process environment is read but never written
//! - A missing file is not an error (empty environment)

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;

/// Errors raised while reading a `.env` file.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected KEY=VALUE")]
    Malformed { line: usize },

    #[error("line {line}: invalid variable name '{name}'")]
    InvalidName { line: usize, name: String },
}

/// Key/value pairs read from a `.env` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DotEnv {
    vars: BTreeMap<String, String>,
}

impl DotEnv {
    /// Load `.env` from `dir`. Returns an empty set if the file does not exist.
    pub fn load(dir: &Path) -> Result<Self, EnvError> {
        let path = dir.join(".env");
        if !path.exists() {
            tracing::debug!(path = ?path, "No .env file found");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        let env = Self::parse(&content)?;
        tracing::info!(path = ?path, count = env.len(), "Loaded environment file");
        Ok(env)
    }

    /// Parse `.env` content.
    pub fn parse(content: &str) -> Result<Self, EnvError> {
        let mut vars = BTreeMap::new();

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);

            let (name, value) = line
                .split_once('=')
                .ok_or(EnvError::Malformed { line: line_no })?;
            let name = name.trim();
            if !is_valid_name(name) {
                return Err(EnvError::InvalidName {
                    line: line_no,
                    name: name.to_string(),
                });
            }

            let value = parse_value(value.trim());
            let value = expand(&value, &vars);
            vars.insert(name.to_string(), value);
        }

        Ok(Self { vars })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// All variables, ordered by name.
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Strip quotes and trailing comments.
fn parse_value(value: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(rest) = value.strip_prefix(quote) {
            if let Some(end) = rest.find(quote) {
                let inner = &rest[..end];
                return if quote == '"' {
                    inner.replace("\\n", "\n").replace("\\\"", "\"")
                } else {
                    inner.to_string()
                };
            }
        }
    }

    match value.find(" #") {
        Some(pos) => value[..pos].trim_end().to_string(),
        None => value.to_string(),
    }
}

/// Replace `${NAME}` with a previously defined key, then the process environment.
fn expand(value: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if let Some(v) = vars.get(name) {
                    out.push_str(v);
                } else if let Ok(v) = std::env::var(name) {
                    out.push_str(&v);
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    /// Override configuration fields from recognised environment keys.
    pub fn apply_env(&mut self, env: &DotEnv) {
        if let Some(v) = env.get("APP_ENVIRONMENT") {
            self.app.environment = v.to_string();
        }
        if let Some(v) = env.get("APP_BASE_URL") {
            self.app.base_url = v.to_string();
        }
        if let Some(v) = env.get("APP_LOG_LEVEL") {
            self.observability.log_level = v.to_string();
        }

        let flags: [(&str, &mut bool); 3] = [
            ("APP_FORCE_HTTPS", &mut self.app.force_global_secure_requests),
            ("APP_CSRF_PROTECTION", &mut self.app.csrf_protection),
            ("APP_TOOLBAR", &mut self.app.toolbar_enabled),
        ];
        for (key, field) in flags {
            if let Some(raw) = env.get(key) {
                match parse_flag(raw) {
                    Some(flag) => *field = flag,
                    None => tracing::warn!(key, value = raw, "Ignoring non-boolean environment flag"),
                }
            }
        }
    }
}
