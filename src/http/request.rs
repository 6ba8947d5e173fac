//! Incoming request representation.
//!
//! # Responsibilities
//! - Build a request from an HTTP transport request or from process arguments
//! - Decode query string, form body and cookies into lookup maps
//! - Expose typed getters with optional value filtering
//!
//! # Design Decisions
//! - Request ID assigned at construction (UUID v4, or taken from `x-request-id`)
//! - Immutable after construction; only the protocol version may be negotiated once
//! - CLI and HTTP requests share one type, distinguished by `ExecutionContext`

use std::borrow::Cow;
use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};
use thiserror::Error;
use url::form_urlencoded;
use uuid::Uuid;

use crate::config::DotEnv;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Where a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    Http,
    Cli,
}

impl ExecutionContext {
    pub fn is_cli(self) -> bool {
        self == ExecutionContext::Cli
    }
}

/// Value filter applied by the filtered getters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Return values unchanged.
    #[default]
    Raw,
    /// URL-encode values (`<` becomes `%3C`).
    Encoded,
}

impl Filter {
    fn apply<'a>(self, value: &'a str) -> Cow<'a, str> {
        match self {
            Filter::Raw => Cow::Borrowed(value),
            Filter::Encoded => Cow::Owned(form_urlencoded::byte_serialize(value.as_bytes()).collect()),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("protocol version already negotiated as {0:?}")]
    ProtocolAlreadySet(Version),
}

/// A request as seen by routing and controllers.
#[derive(Debug, Clone)]
pub struct Request {
    id: Uuid,
    context: ExecutionContext,
    method: Method,
    uri: Uri,
    path: String,
    protocol_version: Option<Version>,
    headers: HeaderMap,
    body: Bytes,
    query: BTreeMap<String, String>,
    post: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
    options: BTreeMap<String, String>,
    secure: bool,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Build from an HTTP transport request.
    ///
    /// The protocol version is copied from the transport.
    pub fn from_http(parts: Parts, body: Bytes, env: &DotEnv) -> Self {
        let secure = is_secure(&parts.uri, &parts.headers);
        let id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .unwrap_or_else(Uuid::new_v4);

        RequestBuilder {
            id: Some(id),
            method: parts.method,
            uri: parts.uri,
            protocol_version: Some(parts.version),
            headers: parts.headers,
            body,
            env: env.vars().clone(),
            secure,
            ..RequestBuilder::default()
        }
        .build()
    }

    /// Build from process arguments.
    ///
    /// Positional arguments become path segments; `--name value` and
    /// `--flag` become options.
    pub fn from_cli<I, S>(args: I, env: &DotEnv) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (segments, options) = parse_cli_args(args);
        let path = format!("/{}", segments.join("/"));
        let uri = path.parse::<Uri>().unwrap_or_else(|_| Uri::from_static("/"));

        let mut request = RequestBuilder {
            context: ExecutionContext::Cli,
            uri,
            env: env.vars().clone(),
            options,
            ..RequestBuilder::default()
        }
        .build();
        // Segments may hold characters a URI cannot.
        request.path = path;
        request
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    pub fn is_cli(&self) -> bool {
        self.context.is_cli()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The path used for routing.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Negotiated protocol version, HTTP/1.1 until set.
    pub fn protocol_version(&self) -> Version {
        self.protocol_version.unwrap_or(Version::HTTP_11)
    }

    /// Set the protocol version. Allowed once.
    pub fn set_protocol_version(&mut self, version: Version) -> Result<(), RequestError> {
        match self.protocol_version {
            Some(existing) => Err(RequestError::ProtocolAlreadySet(existing)),
            None => {
                self.protocol_version = Some(version);
                Ok(())
            }
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Whether the request arrived over HTTPS.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Whether the request carries `X-Requested-With: XMLHttpRequest`.
    pub fn is_ajax(&self) -> bool {
        self.header("x-requested-with")
            .map(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
            .unwrap_or(false)
    }

    pub fn get_get(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn get_post(&self, key: &str) -> Option<&str> {
        self.post.get(key).map(String::as_str)
    }

    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn get_cookie(&self, key: &str) -> Option<&str> {
        self.cookies.get(key).map(String::as_str)
    }

    /// CLI option value (`--name value`); flags map to an empty string.
    pub fn get_option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// POST value, falling back to the query string.
    pub fn get_post_get(&self, key: &str) -> Option<&str> {
        self.get_post(key).or_else(|| self.get_get(key))
    }

    /// Query value, falling back to the POST body.
    pub fn get_get_post(&self, key: &str) -> Option<&str> {
        self.get_get(key).or_else(|| self.get_post(key))
    }

    /// Filtered POST value.
    pub fn post_filtered(&self, key: &str, filter: Filter) -> Option<String> {
        self.get_post(key).map(|v| filter.apply(v).into_owned())
    }

    /// Filtered POST values. `None` selects every key.
    pub fn post_all(&self, keys: Option<&[&str]>, filter: Filter) -> BTreeMap<String, String> {
        select(&self.post, keys, filter)
    }

    /// Filtered query values. `None` selects every key.
    pub fn query_all(&self, keys: Option<&[&str]>, filter: Filter) -> BTreeMap<String, String> {
        select(&self.query, keys, filter)
    }

    /// Remove a POST field (used to strip consumed CSRF tokens).
    pub(crate) fn take_post(&mut self, key: &str) -> Option<String> {
        self.post.remove(key)
    }
}

fn select(
    map: &BTreeMap<String, String>,
    keys: Option<&[&str]>,
    filter: Filter,
) -> BTreeMap<String, String> {
    match keys {
        None => map
            .iter()
            .map(|(k, v)| (k.clone(), filter.apply(v).into_owned()))
            .collect(),
        Some(keys) => keys
            .iter()
            .filter_map(|k| map.get(*k).map(|v| (k.to_string(), filter.apply(v).into_owned())))
            .collect(),
    }
}

fn is_secure(uri: &Uri, headers: &HeaderMap) -> bool {
    if uri.scheme_str() == Some("https") {
        return true;
    }
    let forwarded = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("https"))
        .unwrap_or(false);
    let front_end = headers
        .get("front-end-https")
        .and_then(|v| v.to_str().ok())
        .map(|v| !v.eq_ignore_ascii_case("off"))
        .unwrap_or(false);
    forwarded || front_end
}

fn parse_cli_args<I, S>(args: I) -> (Vec<String>, BTreeMap<String, String>)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut segments = Vec::new();
    let mut options = BTreeMap::new();
    let mut pending: Option<String> = None;

    for arg in args.into_iter().map(Into::into) {
        if let Some(name) = arg.strip_prefix('-') {
            if let Some(prev) = pending.take() {
                options.insert(prev, String::new());
            }
            pending = Some(name.trim_start_matches('-').to_string());
        } else if let Some(name) = pending.take() {
            options.insert(name, arg);
        } else {
            segments.push(arg);
        }
    }
    if let Some(name) = pending {
        options.insert(name, String::new());
    }

    (segments, options)
}

fn parse_pairs(input: &str) -> BTreeMap<String, String> {
    form_urlencoded::parse(input.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn parse_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

/// Builder for requests, used by the transports and by tests.
#[derive(Debug)]
pub struct RequestBuilder {
    id: Option<Uuid>,
    context: ExecutionContext,
    method: Method,
    uri: Uri,
    protocol_version: Option<Version>,
    headers: HeaderMap,
    body: Bytes,
    env: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
    options: BTreeMap<String, String>,
    secure: bool,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            id: None,
            context: ExecutionContext::Http,
            method: Method::GET,
            uri: Uri::from_static("/"),
            protocol_version: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            env: BTreeMap::new(),
            cookies: BTreeMap::new(),
            options: BTreeMap::new(),
            secure: false,
        }
    }
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the URI. Unparseable URIs fall back to `/`.
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.parse().unwrap_or_else(|_| Uri::from_static("/"));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a URL-encoded form body and matching content type.
    pub fn form(self, pairs: &[(&str, &str)]) -> Self {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.header(header::CONTENT_TYPE.as_str(), "application/x-www-form-urlencoded")
            .body(encoded)
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn cli(mut self) -> Self {
        self.context = ExecutionContext::Cli;
        self
    }

    pub fn build(self) -> Request {
        let query = self.uri.query().map(parse_pairs).unwrap_or_default();

        let is_form = self
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);
        let post = if is_form {
            parse_pairs(&String::from_utf8_lossy(&self.body))
        } else {
            BTreeMap::new()
        };

        let mut cookies = parse_cookies(&self.headers);
        cookies.extend(self.cookies);

        let secure = self.secure || self.uri.scheme_str() == Some("https");

        Request {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            context: self.context,
            method: self.method,
            path: self.uri.path().to_string(),
            uri: self.uri,
            protocol_version: self.protocol_version,
            headers: self.headers,
            body: self.body,
            query,
            post,
            env: self.env,
            cookies,
            options: self.options,
            secure,
        }
    }
}
