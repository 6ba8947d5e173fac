//! Forced HTTPS.
//!
//! Plain-HTTP requests are redirected to the same path and query on the
//! configured base URL with the `https` scheme, and the response carries a
//! `Strict-Transport-Security` header.

use url::Url;

use crate::config::schema::AppSection;
use crate::http::{RedirectMethod, Request, Response, ResponseError};

/// Redirect `request` to HTTPS unless it is already secure.
///
/// Returns `true` when a redirect was written to `response`.
pub fn force_https(app: &AppSection, request: &Request, response: &mut Response) -> Result<bool, ResponseError> {
    if request.is_secure() {
        return Ok(false);
    }

    let target = secure_url(&app.base_url, request);
    response.set_header("strict-transport-security", &format!("max-age={}", app.hsts_max_age))?;
    response.redirect(&target, RedirectMethod::Auto, None, request.method())?;

    tracing::info!(request_id = %request.id(), location = %target, "Redirecting to HTTPS");
    Ok(true)
}

fn secure_url(base_url: &str, request: &Request) -> String {
    let mut url = match Url::parse(base_url) {
        Ok(url) => url,
        Err(_) => {
            let host = request.header("host").unwrap_or("localhost");
            match Url::parse(&format!("https://{}/", host)) {
                Ok(url) => url,
                Err(_) => return format!("https://localhost{}", request.path()),
            }
        }
    };

    // Only fails for cannot-be-a-base URLs, which validation rejects.
    let _ = url.set_scheme("https");
    if url.port() == Some(80) {
        let _ = url.set_port(None);
    }

    let base_path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}{}", base_path, request.path()));
    url.set_query(request.uri().query());
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};

    fn app(base_url: &str) -> AppSection {
        AppSection {
            base_url: base_url.to_string(),
            force_global_secure_requests: true,
            ..AppSection::default()
        }
    }

    #[test]
    fn test_redirects_plain_request() {
        let req = Request::builder().uri("/account/settings?tab=2").build();
        let mut res = Response::new();
        assert!(force_https(&app("http://example.com/"), &req, &mut res).unwrap());

        assert_eq!(res.header("location"), Some("https://example.com/account/settings?tab=2"));
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.header("strict-transport-security"), Some("max-age=31536000"));
    }

    #[test]
    fn test_secure_request_untouched() {
        let req = Request::builder().uri("/").secure(true).build();
        let mut res = Response::new();
        assert!(!force_https(&app("http://example.com/"), &req, &mut res).unwrap());
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.header("location").is_none());
    }

    #[test]
    fn test_base_path_and_post_status() {
        let req = Request::builder().method(Method::POST).uri("/login").build();
        let mut res = Response::new();
        force_https(&app("http://example.com:80/app/"), &req, &mut res).unwrap();
        assert_eq!(res.header("location"), Some("https://example.com/app/login"));
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
    }
}
