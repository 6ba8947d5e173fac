//! Double-submit cookie CSRF protection.
//!
//! # Responsibilities
//! - Issue a random token cookie to clients that lack one
//! - Require unsafe methods to echo the cookie in a form field or header
//! - Strip the consumed token from the POST data
//!
//! # Design Decisions
//! - Safe methods (GET, HEAD, OPTIONS, TRACE) are never checked
//! - Token comparison is constant-time

use axum::http::Method;
use rand::Rng;

use crate::config::CsrfConfig;
use crate::http::{Request, Response, ResponseError};
use crate::security::SecurityError;

const TOKEN_BYTES: usize = 16;

/// Random hex token.
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Clone)]
pub struct CsrfGuard {
    token_name: String,
    header_name: String,
    cookie_name: String,
}

impl CsrfGuard {
    pub fn new(config: &CsrfConfig) -> Self {
        Self {
            token_name: config.token_name.clone(),
            header_name: config.header_name.clone(),
            cookie_name: config.cookie_name.clone(),
        }
    }

    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Check the request. On success the token field is removed from POST data.
    pub fn verify(&self, request: &mut Request) -> Result<(), SecurityError> {
        if is_safe(request.method()) {
            return Ok(());
        }

        let expected = request
            .get_cookie(&self.cookie_name)
            .ok_or_else(|| SecurityError::MissingCookie(self.cookie_name.clone()))?;
        let supplied = request
            .get_post(&self.token_name)
            .or_else(|| request.header(&self.header_name))
            .ok_or_else(|| SecurityError::MissingToken {
                field: self.token_name.clone(),
                header: self.header_name.clone(),
            })?;

        if !constant_time_eq(expected.as_bytes(), supplied.as_bytes()) {
            return Err(SecurityError::TokenMismatch);
        }

        request.take_post(&self.token_name);
        Ok(())
    }

    /// Set a fresh token cookie when the request carries none.
    pub fn ensure_cookie(&self, request: &Request, response: &mut Response) -> Result<(), ResponseError> {
        if request.get_cookie(&self.cookie_name).is_some() {
            return Ok(());
        }
        response.set_cookie(&self.cookie_name, &generate_token(), request.is_secure())
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
