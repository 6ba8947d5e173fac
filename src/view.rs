//! View rendering.
//!
//! # Responsibilities
//! - Render named views with a JSON context
//! - Ship built-in error pages, a welcome page and the diagnostic footer
//! - Let an application views directory override any built-in view
//!
//! # Design Decisions
//! - Names are slash-separated paths without extension (`errors/html/error_404`)
//! - Files are looked up as `<dir>/<name>` then `<dir>/<name>.html`
//! - HTML escaping everywhere except `errors/cli/*`

use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment, ErrorKind, Value};
use thiserror::Error;

pub const ERROR_404_HTML: &str = "errors/html/error_404";
pub const ERROR_404_CLI: &str = "errors/cli/error_404";
pub const ERROR_EXCEPTION_HTML: &str = "errors/html/error_exception";
pub const ERROR_EXCEPTION_CLI: &str = "errors/cli/error_exception";
pub const DEBUG_TOOLBAR: &str = "debug/toolbar";
pub const WELCOME_PAGE: &str = "welcome_message";

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("view '{0}' not found")]
    NotFound(String),

    #[error("failed to render view '{name}': {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Something that can turn a view name and data into text.
pub trait ViewRenderer: Send + Sync {
    fn render(&self, name: &str, data: &serde_json::Value) -> Result<String, ViewError>;

    fn exists(&self, name: &str) -> bool;
}

/// minijinja-backed views.
pub struct TemplateViews {
    env: Environment<'static>,
    dir: Option<PathBuf>,
}

impl std::fmt::Debug for TemplateViews {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateViews").field("dir", &self.dir).finish()
    }
}

impl TemplateViews {
    /// Built-in views, optionally overridden from `dir`.
    pub fn new(dir: Option<&Path>) -> Self {
        let mut env = Environment::new();
        let lookup_dir = dir.map(Path::to_path_buf);
        env.set_loader(move |name| load(lookup_dir.as_deref(), name));
        env.set_auto_escape_callback(|name| {
            if name.starts_with("errors/cli/") {
                AutoEscape::None
            } else {
                AutoEscape::Html
            }
        });

        Self {
            env,
            dir: dir.map(Path::to_path_buf),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

impl ViewRenderer for TemplateViews {
    fn render(&self, name: &str, data: &serde_json::Value) -> Result<String, ViewError> {
        let template = self.env.get_template(name).map_err(|e| match e.kind() {
            ErrorKind::TemplateNotFound => ViewError::NotFound(name.to_string()),
            _ => ViewError::Render {
                name: name.to_string(),
                source: e,
            },
        })?;
        template
            .render(Value::from_serialize(data))
            .map_err(|source| ViewError::Render {
                name: name.to_string(),
                source,
            })
    }

    fn exists(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }
}

fn load(dir: Option<&Path>, name: &str) -> Result<Option<String>, minijinja::Error> {
    if name.split('/').any(|part| part == ".." || part.is_empty()) {
        return Ok(None);
    }

    if let Some(dir) = dir {
        for candidate in [dir.join(name), dir.join(format!("{}.html", name))] {
            match std::fs::read_to_string(&candidate) {
                Ok(source) => return Ok(Some(source)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(minijinja::Error::new(
                        ErrorKind::InvalidOperation,
                        format!("could not read view {}", candidate.display()),
                    )
                    .with_source(e))
                }
            }
        }
    }

    Ok(builtin(name).map(str::to_string))
}

fn builtin(name: &str) -> Option<&'static str> {
    match name {
        ERROR_404_HTML => Some(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>404 Page Not Found</title>
</head>
<body>
    <h1>404</h1>
    <p>{{ message | default("Sorry! Cannot seem to find the page you were looking for.") }}</p>
</body>
</html>
"#,
        ),
        ERROR_404_CLI => Some(
            "\nERROR: 404\n\n{{ message | default(\"Can't find a route for the requested path.\") }}\n\n",
        ),
        ERROR_EXCEPTION_HTML => Some(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{{ title | default("Whoops!") }}</title>
</head>
<body>
    <h1>{{ title | default("Whoops!") }}</h1>
    <p>{{ message | default("We seem to have hit a snag. Please try again later.") }}</p>
{%- if detail %}
    <pre>{{ detail }}</pre>
{%- endif %}
</body>
</html>
"#,
        ),
        ERROR_EXCEPTION_CLI => Some(
            "\nERROR: {{ code | default(500) }}\n\n{{ message | default(\"An uncaught error occurred.\") }}\n{% if detail %}\n{{ detail }}\n{% endif %}\n",
        ),
        DEBUG_TOOLBAR => Some(
            r#"<div id="debug-bar" style="font-family: monospace; font-size: 12px; border-top: 1px solid #ccc; padding: 4px;">
    <strong>{{ environment }}</strong> &middot; {{ method }} {{ path }} &middot; {{ status }} &middot; {{ elapsed }}s
{%- for mark in marks %} &middot; {{ mark.name }} {{ mark.seconds }}s{% endfor %}
</div>
"#,
        ),
        WELCOME_PAGE => Some(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{{ title }}</title>
</head>
<body>
    <h1>{{ title }}</h1>
    <p>{{ body }}</p>
</body>
</html>
"#,
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_views_exist() {
        let views = TemplateViews::new(None);
        for name in [
            ERROR_404_HTML,
            ERROR_404_CLI,
            ERROR_EXCEPTION_HTML,
            ERROR_EXCEPTION_CLI,
            DEBUG_TOOLBAR,
            WELCOME_PAGE,
        ] {
            assert!(views.exists(name), "missing {}", name);
        }
        assert!(!views.exists("welcome"));
    }

    #[test]
    fn test_render_escapes_html_only() {
        let views = TemplateViews::new(None);
        let data = json!({ "message": "<b>gone</b>" });

        let html = views.render(ERROR_404_HTML, &data).unwrap();
        assert!(html.contains("&lt;b&gt;gone"));
        assert!(!html.contains("<b>"));

        let cli = views.render(ERROR_404_CLI, &data).unwrap();
        assert!(cli.contains("<b>gone</b>"));
    }

    #[test]
    fn test_welcome_page_escapes_and_keeps_elapsed_marker() {
        let views = TemplateViews::new(None);
        let page = views
            .render(WELCOME_PAGE, &json!({ "title": "A & B", "body": "took {elapsed_time}s" }))
            .unwrap();
        assert!(page.contains("<h1>A &amp; B</h1>"));
        assert!(page.contains("took {elapsed_time}s"));
    }

    #[test]
    fn test_directory_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("errors/html")).unwrap();
        std::fs::write(dir.path().join("errors/html/error_404.html"), "custom {{ message }}").unwrap();
        std::fs::write(dir.path().join("welcome"), "Hi {{ name }}").unwrap();

        let views = TemplateViews::new(Some(dir.path()));
        assert_eq!(views.render(ERROR_404_HTML, &json!({ "message": "x" })).unwrap(), "custom x");
        assert_eq!(views.render("welcome", &json!({ "name": "Ada" })).unwrap(), "Hi Ada");
    }

    #[test]
    fn test_missing_view() {
        let views = TemplateViews::new(None);
        let err = views.render("nope", &json!({})).unwrap_err();
        assert!(matches!(err, ViewError::NotFound(ref n) if n == "nope"));
        assert!(!views.exists("../etc/passwd"));
    }
}
