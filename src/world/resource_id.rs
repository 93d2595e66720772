use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, UNKNOWN_LOCATION};

/// Namespace used when an id is written without one
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Namespace owned by this engine (matcher types, built-in predicates)
pub const CODEX_NAMESPACE: &str = "codex";

/// Namespaced identifier, written `namespace:path`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    namespace: String,
    path: String,
}

impl ResourceId {
    /// Build an id from parts, validating both
    pub fn new(namespace: &str, path: &str) -> Result<Self, ParseError> {
        let literal = format!("{}:{}", namespace, path);
        if namespace.is_empty() || !namespace.chars().all(valid_namespace_char) {
            return Err(invalid(&literal, "namespace must be [a-z0-9_.-] and non-empty"));
        }
        if path.is_empty() || !path.chars().all(valid_path_char) {
            return Err(invalid(&literal, "path must be [a-z0-9_.-/] and non-empty"));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Parse `namespace:path`, defaulting the namespace to `minecraft`
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s.split_once(':') {
            Some((namespace, path)) => Self::new(namespace, path),
            None => Self::new(DEFAULT_NAMESPACE, s),
        }
        .map_err(|_| invalid(s, "expected `namespace:path` using [a-z0-9_.-/]"))
    }

    /// Id in the engine's own namespace. Only for compile-time known paths.
    pub(crate) fn codex(path: &'static str) -> Self {
        Self {
            namespace: CODEX_NAMESPACE.to_string(),
            path: path.to_string(),
        }
    }

    pub(crate) fn minecraft(path: &'static str) -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            path: path.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn valid_namespace_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-')
}

fn valid_path_char(c: char) -> bool {
    valid_namespace_char(c) || c == '/'
}

fn invalid(literal: &str, reason: &str) -> ParseError {
    ParseError::ResourceId {
        literal: literal.to_string(),
        location: UNKNOWN_LOCATION.to_string(),
        reason: reason.to_string(),
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for ResourceId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}
