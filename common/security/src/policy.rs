//! Static route → access table, evaluated after authentication.
//!
//! Rules are ordered once at build time: public rules first, then by longest
//! literal prefix, then method-specific before method-agnostic, then by
//! declaration order. The first matching rule decides. When nothing matches
//! the request still has to be authenticated.

use axum::http::Method;
use thiserror::Error;
use tracing::warn;

use crate::{roles::Role, SecurityContext, SecurityError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("path pattern '{0}' must start with '/'")]
    NotAbsolute(String),
    #[error("path pattern '{0}' may only use '**' as its last segment")]
    MisplacedRest(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Any,
    Rest,
}

/// `/items`, `/items/*`, `/items/:id`, `/docs/**`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    literal_prefix: usize,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PolicyError> {
        if !pattern.starts_with('/') {
            return Err(PolicyError::NotAbsolute(pattern.to_string()));
        }

        let parts: Vec<&str> = path_segments(pattern).collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (index, part) in parts.iter().enumerate() {
            let segment = match *part {
                "**" if index + 1 == parts.len() => Segment::Rest,
                "**" => return Err(PolicyError::MisplacedRest(pattern.to_string())),
                "*" => Segment::Any,
                p if p.starts_with(':') || (p.starts_with('{') && p.ends_with('}')) => Segment::Any,
                p => Segment::Literal(p.to_string()),
            };
            segments.push(segment);
        }

        let literal_prefix = segments
            .iter()
            .take_while(|s| matches!(s, Segment::Literal(_)))
            .map(|s| match s {
                Segment::Literal(l) => l.len() + 1,
                _ => 0,
            })
            .sum();

        Ok(Self { raw: pattern.to_string(), segments, literal_prefix })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn literal_prefix_len(&self) -> usize {
        self.literal_prefix
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut parts = path_segments(path);
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Any => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(expected) => match parts.next() {
                    Some(actual) if actual == expected => {}
                    _ => return false,
                },
            }
        }
        parts.next().is_none()
    }
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No identity needed; role checks are skipped entirely.
    Public,
    /// Any authenticated identity, any role.
    Authenticated,
    /// Authenticated and holding at least one of these roles.
    AnyRole(Vec<Role>),
}

#[derive(Debug, Clone)]
pub struct AuthorizationRule {
    pub method: Option<Method>,
    pub pattern: PathPattern,
    pub access: Access,
    declared_at: usize,
}

impl AuthorizationRule {
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        let method_ok = match &self.method {
            None => true,
            // HEAD is served by GET handlers, so it inherits GET's requirements.
            Some(m) => m == method || (*m == Method::GET && *method == Method::HEAD),
        };
        method_ok && self.pattern.matches(path)
    }

    fn sort_key(&self) -> (bool, std::cmp::Reverse<usize>, bool, usize) {
        (
            self.access != Access::Public,
            std::cmp::Reverse(self.pattern.literal_prefix_len()),
            self.method.is_none(),
            self.declared_at,
        )
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    rules: Vec<AuthorizationRule>,
}

impl AuthorizationPolicy {
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    pub fn rules(&self) -> &[AuthorizationRule] {
        &self.rules
    }

    pub fn rule_for(&self, method: &Method, path: &str) -> Option<&AuthorizationRule> {
        self.rules.iter().find(|rule| rule.matches(method, path))
    }

    pub fn authorize(
        &self,
        method: &Method,
        path: &str,
        ctx: &SecurityContext,
    ) -> Result<(), SecurityError> {
        let access = self
            .rule_for(method, path)
            .map(|rule| &rule.access)
            .unwrap_or(&Access::Authenticated);

        match access {
            Access::Public => Ok(()),
            Access::Authenticated if ctx.is_authenticated() => Ok(()),
            Access::AnyRole(required) if ctx.is_authenticated() => {
                if ctx.has_any_role(required) {
                    Ok(())
                } else {
                    warn!(%method, path, subject = ?ctx.subject, ?required, "role_check_failed");
                    Err(SecurityError::InsufficientRole { required: required.clone() })
                }
            }
            Access::Authenticated | Access::AnyRole(_) => Err(SecurityError::Unauthenticated),
        }
    }
}

#[derive(Debug, Default)]
pub struct PolicyBuilder {
    pending: Vec<(Option<Method>, String, Access)>,
}

impl PolicyBuilder {
    pub fn permit_all(self, method: Option<Method>, pattern: &str) -> Self {
        self.rule(method, pattern, Access::Public)
    }

    pub fn authenticated(self, method: Option<Method>, pattern: &str) -> Self {
        self.rule(method, pattern, Access::Authenticated)
    }

    pub fn require_any<I, R>(self, method: Option<Method>, pattern: &str, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        let roles: Vec<Role> = roles.into_iter().map(Into::into).collect();
        let access = if roles.is_empty() { Access::Authenticated } else { Access::AnyRole(roles) };
        self.rule(method, pattern, access)
    }

    pub fn rule(mut self, method: Option<Method>, pattern: &str, access: Access) -> Self {
        self.pending.push((method, pattern.to_string(), access));
        self
    }

    pub fn build(self) -> Result<AuthorizationPolicy, PolicyError> {
        let mut rules = Vec::with_capacity(self.pending.len());
        for (declared_at, (method, pattern, access)) in self.pending.into_iter().enumerate() {
            rules.push(AuthorizationRule {
                method,
                pattern: PathPattern::parse(&pattern)?,
                access,
                declared_at,
            });
        }
        rules.sort_by_key(AuthorizationRule::sort_key);
        Ok(AuthorizationPolicy { rules })
    }
}
