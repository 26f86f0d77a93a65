//! In-process role policy table.
//!
//! Rules are written one per line in a Casbin-like CSV dialect:
//!
//! ```text
//! p, admin, /api/v1/*, *
//! p, user, /api/v1/feedback/:id/comments, GET|POST
//! ```
//!
//! The table is parsed once at startup and is read-only afterwards.

use thiserror::Error;

use crate::Role;
use crate::action::Action;

/// Rules compiled into the binary; used unless a policy file is configured.
pub const DEFAULT_POLICY: &str = include_str!("../policy.csv");

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("policy line {line}: {message}")]
    Line { line: usize, message: String },

    #[error("policy contains no rules")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
}

/// A resource path pattern: literal segments, `:param` segments and an
/// optional trailing `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePattern {
    segments: Vec<Segment>,
    rest: bool,
}

impl ResourcePattern {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if !raw.starts_with('/') {
            return Err(format!("pattern '{raw}' must start with '/'"));
        }

        let parts: Vec<&str> = split_path(raw).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut rest = false;

        for (idx, part) in parts.iter().enumerate() {
            if *part == "*" {
                if idx + 1 != parts.len() {
                    return Err(format!("'*' must be the last segment in '{raw}'"));
                }
                rest = true;
            } else if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(format!("unnamed parameter in '{raw}'"));
                }
                segments.push(Segment::Param);
            } else if part.contains('*') {
                return Err(format!("wildcards must be whole segments in '{raw}'"));
            } else {
                segments.push(Segment::Literal((*part).to_string()));
            }
        }

        Ok(Self { segments, rest })
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() < self.segments.len() {
            return false;
        }
        if !self.rest && parts.len() != self.segments.len() {
            return false;
        }
        self.segments.iter().zip(parts.iter()).all(|(segment, part)| match segment {
            Segment::Literal(lit) => lit == part,
            Segment::Param => true,
        })
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    pub role: Role,
    pub resource: ResourcePattern,
    pub action: Action,
}

impl PolicyRule {
    pub fn permits(&self, role: Role, path: &str, method: &str) -> bool {
        self.role == role && self.action.permits(method) && self.resource.matches(path)
    }
}

/// Immutable allow-list of `(role, resource, action)` rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    rules: Vec<PolicyRule>,
}

impl PolicyTable {
    pub fn parse(source: &str) -> Result<Self, PolicyError> {
        let mut rules = Vec::new();

        for (idx, raw) in source.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
            let err = |message: String| PolicyError::Line { line, message };

            match fields.as_slice() {
                ["p", role, resource, action] => {
                    let role = role.parse::<Role>().map_err(|e| err(e.to_string()))?;
                    let resource = ResourcePattern::parse(resource).map_err(err)?;
                    let action = action.parse::<Action>().map_err(|e| err(e.to_string()))?;
                    rules.push(PolicyRule { role, resource, action });
                }
                [kind, ..] if *kind != "p" => {
                    return Err(err(format!("unsupported rule type '{kind}'")));
                }
                _ => return Err(err("expected 'p, role, resource, action'".to_string())),
            }
        }

        if rules.is_empty() {
            return Err(PolicyError::Empty);
        }
        Ok(Self { rules })
    }

    /// The embedded default rule set.
    pub fn embedded() -> Result<Self, PolicyError> {
        Self::parse(DEFAULT_POLICY)
    }

    /// Deny unless some rule grants `role` the `method` on `path`.
    pub fn allows(&self, role: Role, path: &str, method: &str) -> bool {
        self.rules.iter().any(|rule| rule.permits(role, path, method))
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }
}
