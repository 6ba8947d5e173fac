//! Outgoing response representation.
//!
//! # Responsibilities
//! - Hold status, headers and body while dispatch runs
//! - Build redirect responses (Location or Refresh)
//! - Enforce single emission (`send` succeeds exactly once)
//! - Convert into an axum response for the HTTP transport
//!
//! # Design Decisions
//! - Status defaults to 200; handlers may change it freely
//! - Body is text: controllers write rendered output, not streams

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Version};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("response already sent")]
    AlreadySent,
    #[error("invalid status code {0}")]
    InvalidStatus(u16),
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
}

/// How a redirect is expressed to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectMethod {
    /// `Location` header; status picked from the request when not given.
    #[default]
    Auto,
    /// `Location` header with the given (or 302) status.
    Location,
    /// `Refresh: 0;url=...` header, status left unchanged.
    Refresh,
}

#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
    protocol_version: Version,
    sent: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// A fresh response: 200, no headers, empty body.
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: String::new(),
            protocol_version: Version::HTTP_11,
            sent: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn set_status_code(&mut self, code: u16) -> Result<(), ResponseError> {
        self.status = StatusCode::from_u16(code).map_err(|_| ResponseError::InvalidStatus(code))?;
        Ok(())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set a header, replacing existing values.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), ResponseError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Add a header value, keeping existing ones.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<(), ResponseError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Add a `Set-Cookie` header scoped to the whole site.
    pub fn set_cookie(&mut self, name: &str, value: &str, secure: bool) -> Result<(), ResponseError> {
        let mut cookie = format!("{}={}; Path=/; SameSite=Lax", name, value);
        if secure {
            cookie.push_str("; Secure");
        }
        self.append_header(header::SET_COOKIE.as_str(), &cookie)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    pub fn append_body(&mut self, chunk: &str) {
        self.body.push_str(chunk);
    }

    pub fn protocol_version(&self) -> Version {
        self.protocol_version
    }

    pub fn set_protocol_version(&mut self, version: Version) {
        self.protocol_version = version;
    }

    /// Turn this response into a redirect to `uri`.
    ///
    /// With `RedirectMethod::Auto` and no explicit status, HTTP/1.1+ requests
    /// get 303 (non-GET) or 307 (GET); older protocols get 302. The body is
    /// cleared.
    pub fn redirect(
        &mut self,
        uri: &str,
        method: RedirectMethod,
        status: Option<StatusCode>,
        request_method: &Method,
    ) -> Result<(), ResponseError> {
        self.body.clear();

        if method == RedirectMethod::Refresh {
            return self.set_header("refresh", &format!("0;url={}", uri));
        }

        let status = match (method, status) {
            (_, Some(status)) => status,
            (RedirectMethod::Auto, None) if self.protocol_version >= Version::HTTP_11 => {
                if request_method == Method::GET {
                    StatusCode::TEMPORARY_REDIRECT
                } else {
                    StatusCode::SEE_OTHER
                }
            }
            _ => StatusCode::FOUND,
        };

        self.status = status;
        self.set_header(header::LOCATION.as_str(), uri)
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection() || self.headers.contains_key("refresh")
    }

    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Finalize the response. Fails if it was already sent.
    pub fn send(&mut self) -> Result<(), ResponseError> {
        if self.sent {
            return Err(ResponseError::AlreadySent);
        }
        self.mark_sent();
        Ok(())
    }

    /// Finalize a response the kernel built itself and knows is unsent.
    pub(crate) fn mark_sent(&mut self) {
        debug_assert!(!self.sent, "response emitted twice");
        if !self.headers.contains_key(header::CONTENT_TYPE) && !self.body.is_empty() {
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=UTF-8"),
            );
        }
        self.sent = true;
    }

    /// Convert into a transport response.
    pub fn into_http(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        *response.version_mut() = self.protocol_version;
        response
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ResponseError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ResponseError::InvalidHeader(name.to_string()))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|_| ResponseError::InvalidHeader(name.to_string()))?;
    Ok((header_name, header_value))
}
