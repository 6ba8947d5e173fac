//! Hook registry.
//!
//! Hooks are named extension points triggered by the dispatch kernel at fixed
//! lifecycle stages. They observe progress; they cannot reorder or skip
//! stages.
//!
//! # Hook Points
//!
//! ```text
//! pre_system                   → before request/response setup
//! pre_controller               → after routing, before resolution
//! post_controller_constructor  → controller instance built, action not yet run
//! post_controller              → action finished, output not yet finalized
//! post_system                  → response already sent
//! ```
//!
//! # Ordering
//!
//! Callables run by ascending priority (`PRIORITY_HIGH` before
//! `PRIORITY_NORMAL` before `PRIORITY_LOW`); equal priorities run in
//! registration order. The first error stops the trigger and propagates.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::http::{Request, Response};

pub const PRIORITY_HIGH: i32 = 10;
pub const PRIORITY_NORMAL: i32 = 100;
pub const PRIORITY_LOW: i32 = 200;

/// Lifecycle stages at which the kernel triggers hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    PreSystem,
    PreController,
    PostControllerConstructor,
    PostController,
    PostSystem,
}

impl HookPoint {
    pub const ALL: [HookPoint; 5] = [
        HookPoint::PreSystem,
        HookPoint::PreController,
        HookPoint::PostControllerConstructor,
        HookPoint::PostController,
        HookPoint::PostSystem,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HookPoint::PreSystem => "pre_system",
            HookPoint::PreController => "pre_controller",
            HookPoint::PostControllerConstructor => "post_controller_constructor",
            HookPoint::PostController => "post_controller",
            HookPoint::PostSystem => "post_system",
        }
    }
}

impl AsRef<str> for HookPoint {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookPoint::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown hook point '{}'", s))
    }
}

/// Error returned by a hook callable.
#[derive(Debug, Error)]
#[error("hook '{hook}' failed: {message}")]
pub struct HookError {
    /// Name of the hook being triggered; filled in by `Hooks::trigger`.
    pub hook: String,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            hook: String::new(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }
}

/// Read-only view handed to hook callables.
pub struct HookContext<'a> {
    pub hook: &'a str,
    pub request: &'a Request,
    pub response: &'a Response,
}

pub type HookFn = Arc<dyn Fn(&HookContext<'_>) -> Result<(), HookError> + Send + Sync>;

struct HookEntry {
    priority: i32,
    seq: u64,
    callback: HookFn,
}

/// Hook registrations, keyed by hook name.
#[derive(Default)]
pub struct Hooks {
    entries: HashMap<String, Vec<HookEntry>>,
    next_seq: u64,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("Hooks").field("entries", &counts).finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable at `PRIORITY_NORMAL`.
    pub fn register<F>(&mut self, name: impl AsRef<str>, callback: F) -> &mut Self
    where
        F: Fn(&HookContext<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.register_with_priority(name, PRIORITY_NORMAL, callback)
    }

    pub fn register_with_priority<F>(&mut self, name: impl AsRef<str>, priority: i32, callback: F) -> &mut Self
    where
        F: Fn(&HookContext<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        let seq = self.next_seq;
        self.next_seq += 1;

        let list = self.entries.entry(name.as_ref().to_string()).or_default();
        list.push(HookEntry {
            priority,
            seq,
            callback: Arc::new(callback),
        });
        list.sort_by_key(|e| (e.priority, e.seq));
        self
    }

    /// Number of callables registered for `name`.
    pub fn count(&self, name: impl AsRef<str>) -> usize {
        self.entries.get(name.as_ref()).map(Vec::len).unwrap_or(0)
    }

    /// Run every callable registered for `name`, in order.
    pub fn trigger(&self, name: impl AsRef<str>, request: &Request, response: &Response) -> Result<(), HookError> {
        let name = name.as_ref();
        let Some(list) = self.entries.get(name) else {
            return Ok(());
        };

        tracing::trace!(hook = name, callables = list.len(), "Triggering hook");
        let ctx = HookContext {
            hook: name,
            request,
            response,
        };
        for entry in list {
            (entry.callback)(&ctx).map_err(|mut e| {
                e.hook = name.to_string();
                e
            })?;
        }
        Ok(())
    }
}
