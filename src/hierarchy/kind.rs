use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::hierarchy::error::EntityError;

/// Category kinds that drive how an entity is attached to the tree.
///
/// `User` entities belong to an account and carry a `user_id`; every other
/// kind is structural and carries a `details` payload instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryKind {
    User,
    Structural(StructuralKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StructuralKind {
    Organization,
    Location,
    Office,
    Other(String),
}

impl CategoryKind {
    /// Parse a stored kind. An empty (or blank) kind is never valid.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let kind = match raw.to_ascii_lowercase().as_str() {
            "user" => CategoryKind::User,
            "organization" => CategoryKind::Structural(StructuralKind::Organization),
            "location" => CategoryKind::Structural(StructuralKind::Location),
            "office" => CategoryKind::Structural(StructuralKind::Office),
            other => CategoryKind::Structural(StructuralKind::Other(other.to_string())),
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryKind::User => "user",
            CategoryKind::Structural(StructuralKind::Organization) => "organization",
            CategoryKind::Structural(StructuralKind::Location) => "location",
            CategoryKind::Structural(StructuralKind::Office) => "office",
            CategoryKind::Structural(StructuralKind::Other(name)) => name,
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CategoryKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CategoryKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CategoryKind::parse(&raw).ok_or_else(|| serde::de::Error::custom("category kind cannot be empty"))
    }
}

/// How an entity hangs off the tree: owned by a user, or described by details.
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    Owner(String),
    Details(Map<String, Value>),
}

impl Attachment {
    /// The single place where the attachment mode of a new entity is decided.
    pub fn resolve(
        kind: &CategoryKind,
        user_id: Option<&str>,
        details: Map<String, Value>,
    ) -> Result<Self, EntityError> {
        match kind {
            CategoryKind::User => match user_id.filter(|id| !id.is_empty()) {
                Some(id) => Ok(Attachment::Owner(id.to_string())),
                None => Err(EntityError::InvalidArgument(
                    "user ID is required for user category entities".to_string(),
                )),
            },
            CategoryKind::Structural(_) => Ok(Attachment::Details(details)),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Attachment::Owner(id) => Some(id),
            Attachment::Details(_) => None,
        }
    }

    pub fn details(&self) -> Option<&Map<String, Value>> {
        match self {
            Attachment::Owner(_) => None,
            Attachment::Details(details) => Some(details),
        }
    }
}
