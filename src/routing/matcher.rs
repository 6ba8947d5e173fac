//! Route pattern compilation and matching.
//!
//! # Responsibilities
//! - Compile a route pattern into literal and placeholder segments
//! - Match a request path segment by segment
//! - Extract positional and named parameters
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Patterns and paths are compared with surrounding slashes trimmed
//! - Placeholders capture a single segment, except a trailing `(:any)`
//! - Custom expressions are anchored and applied to one segment at a time

use std::collections::BTreeMap;

use regex::Regex;

use crate::routing::RouteError;

/// Constraint applied to a captured segment.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Any non-empty segment (`(:segment)`, `(:hash)`).
    Segment,
    /// ASCII digits (`(:num)`).
    Num,
    /// ASCII letters (`(:alpha)`).
    Alpha,
    /// ASCII letters and digits (`(:alphanum)`).
    AlphaNum,
    /// Anchored custom expression.
    Custom(Regex),
}

impl Constraint {
    /// Compile a custom expression, anchored to the whole segment.
    pub fn expression(expr: &str) -> Result<Self, RouteError> {
        Regex::new(&format!("^(?:{})$", expr))
            .map(Constraint::Custom)
            .map_err(|e| RouteError::InvalidExpression {
                expr: expr.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn matches(&self, segment: &str) -> bool {
        if segment.is_empty() {
            return false;
        }
        match self {
            Constraint::Segment => true,
            Constraint::Num => segment.bytes().all(|b| b.is_ascii_digit()),
            Constraint::Alpha => segment.bytes().all(|b| b.is_ascii_alphabetic()),
            Constraint::AlphaNum => segment.bytes().all(|b| b.is_ascii_alphanumeric()),
            Constraint::Custom(re) => re.is_match(segment),
        }
    }
}

/// Named placeholder classes available to patterns.
#[derive(Debug, Clone)]
pub struct Placeholders {
    classes: BTreeMap<String, Constraint>,
}

impl Default for Placeholders {
    fn default() -> Self {
        let mut classes = BTreeMap::new();
        classes.insert("segment".to_string(), Constraint::Segment);
        classes.insert("hash".to_string(), Constraint::Segment);
        classes.insert("num".to_string(), Constraint::Num);
        classes.insert("alpha".to_string(), Constraint::Alpha);
        classes.insert("alphanum".to_string(), Constraint::AlphaNum);
        Self { classes }
    }
}

impl Placeholders {
    /// Register (or replace) a custom class.
    pub fn add(&mut self, name: &str, expr: &str) -> Result<(), RouteError> {
        if name == ANY {
            return Err(RouteError::ReservedPlaceholder(name.to_string()));
        }
        let constraint = Constraint::expression(expr)?;
        self.classes.insert(name.to_string(), constraint);
        Ok(())
    }

    fn get(&self, name: &str) -> Option<&Constraint> {
        self.classes.get(name)
    }
}

const ANY: &str = "any";

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Capture {
        name: Option<String>,
        constraint: Constraint,
    },
    /// Trailing `(:any)`: everything left in the path, slashes included.
    Remainder { name: Option<String> },
}

/// Values captured from a matched path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    /// Every captured value, in pattern order.
    pub positional: Vec<String>,
    /// Values of `{name}` placeholders.
    pub named: BTreeMap<String, String>,
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(source: &str, placeholders: &Placeholders) -> Result<Self, RouteError> {
        let parts = split(source);
        let last = parts.len().saturating_sub(1);
        let mut segments = Vec::with_capacity(parts.len());

        for (idx, part) in parts.iter().enumerate() {
            let segment = parse_segment(source, part, placeholders)?;
            if matches!(segment, Segment::Remainder { .. }) && idx != last {
                return Err(RouteError::AnyNotLast(source.to_string()));
            }
            segments.push(segment);
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Match the full path. Returns `None` unless every segment matches.
    pub fn captures(&self, path: &str) -> Option<Captures> {
        let parts = split(path);
        let mut captures = Captures::default();

        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(lit) => {
                    if parts.get(idx) != Some(&lit.as_str()) {
                        return None;
                    }
                }
                Segment::Capture { name, constraint } => {
                    let value = parts.get(idx)?;
                    if !constraint.matches(value) {
                        return None;
                    }
                    record(&mut captures, name, value);
                }
                Segment::Remainder { name } => {
                    if idx >= parts.len() {
                        return None;
                    }
                    let rest = parts[idx..].join("/");
                    if rest.is_empty() {
                        return None;
                    }
                    record(&mut captures, name, &rest);
                    return Some(captures);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(captures)
    }
}

fn record(captures: &mut Captures, name: &Option<String>, value: &str) {
    captures.positional.push(value.to_string());
    if let Some(name) = name {
        captures.named.insert(name.clone(), value.to_string());
    }
}

fn split(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

fn parse_segment(source: &str, part: &str, placeholders: &Placeholders) -> Result<Segment, RouteError> {
    // (:class)
    if let Some(class) = part.strip_prefix("(:").and_then(|p| p.strip_suffix(')')) {
        return class_segment(None, class, placeholders);
    }

    // {name} or {name:class}
    if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
        let (name, class) = inner.split_once(':').unwrap_or((inner, "segment"));
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(RouteError::InvalidSegment {
                pattern: source.to_string(),
                segment: part.to_string(),
            });
        }
        return class_segment(Some(name.to_string()), class, placeholders);
    }

    // (expression)
    if let Some(expr) = part.strip_prefix('(').and_then(|p| p.strip_suffix(')')) {
        return Ok(Segment::Capture {
            name: None,
            constraint: Constraint::expression(expr)?,
        });
    }

    if part.contains(['(', ')', '{', '}']) {
        return Err(RouteError::InvalidSegment {
            pattern: source.to_string(),
            segment: part.to_string(),
        });
    }

    Ok(Segment::Literal(part.to_string()))
}

fn class_segment(name: Option<String>, class: &str, placeholders: &Placeholders) -> Result<Segment, RouteError> {
    if class == ANY {
        return Ok(Segment::Remainder { name });
    }
    let constraint = placeholders
        .get(class)
        .cloned()
        .ok_or_else(|| RouteError::UnknownPlaceholder(class.to_string()))?;
    Ok(Segment::Capture { name, constraint })
}
