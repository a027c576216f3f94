//! Resource handles
//!
//! A handle is the Terraform-visible `id` of a managed object. Some remote
//! objects are addressed by more than one field; their handles join those
//! fields with `#` and must be split back before any field is used.

use crate::error::{Result, TfplugError};
use std::fmt;

/// Separator between the parts of a composite handle
pub const SEPARATOR: char = '#';

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    parts: Vec<String>,
}

impl ResourceHandle {
    /// Single-part handle, e.g. an instance id
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(TfplugError::InvalidResourceId {
                id,
                reason: "id must not be empty".to_string(),
            });
        }
        Ok(Self { parts: vec![id] })
    }

    /// Composite handle built from identifying fields in order
    pub fn composite<I, S>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        let joined = parts.join(&SEPARATOR.to_string());
        if parts.is_empty() {
            return Err(TfplugError::InvalidResourceId {
                id: joined,
                reason: "id must not be empty".to_string(),
            });
        }
        if let Some(idx) = parts.iter().position(|p| p.is_empty()) {
            return Err(TfplugError::InvalidResourceId {
                id: joined,
                reason: format!("part {} is empty", idx + 1),
            });
        }
        if parts.iter().any(|p| p.contains(SEPARATOR)) {
            return Err(TfplugError::InvalidResourceId {
                id: joined,
                reason: format!("parts must not contain '{}'", SEPARATOR),
            });
        }
        Ok(Self { parts })
    }

    /// Split `id` and require exactly `expected` non-empty parts
    pub fn parse(id: &str, expected: usize) -> Result<Self> {
        if id.is_empty() {
            return Err(TfplugError::InvalidResourceId {
                id: id.to_string(),
                reason: "id must not be empty".to_string(),
            });
        }

        let parts: Vec<String> = id.split(SEPARATOR).map(str::to_string).collect();
        if parts.len() != expected {
            return Err(TfplugError::InvalidResourceId {
                id: id.to_string(),
                reason: format!(
                    "expected {} parts separated by '{}', got {}",
                    expected,
                    SEPARATOR,
                    parts.len()
                ),
            });
        }
        if let Some(idx) = parts.iter().position(|p| p.is_empty()) {
            return Err(TfplugError::InvalidResourceId {
                id: id.to_string(),
                reason: format!("part {} is empty", idx + 1),
            });
        }

        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn part(&self, idx: usize) -> Option<&str> {
        self.parts.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_composite(&self) -> bool {
        self.parts.len() > 1
    }

    /// Never true for a constructed handle
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join(&SEPARATOR.to_string()))
    }
}
