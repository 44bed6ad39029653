//! Domain primitive types used across the Snapbox workspace.
//!
//! Identifiers are short opaque strings of the form `<prefix>_NNN` where
//! `NNN` is a three-digit zero-padded number drawn from the shared pool
//! `[ID_POOL_MIN, ID_POOL_MAX]`. Images and containers share the numeric
//! pool but are disjoint by prefix.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{CONTAINER_PREFIX, ID_POOL_MAX, ID_POOL_MIN, IMAGE_PREFIX};
use crate::error::{Result, SnapboxError};

fn validate(prefix: &'static str, kind: &'static str, value: &str) -> Result<()> {
    let suffix = value
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .ok_or_else(|| SnapboxError::Config {
            message: format!("{kind} id '{value}' does not start with '{prefix}_'"),
        })?;
    if suffix.len() != 3 || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SnapboxError::Config {
            message: format!("{kind} id '{value}' must end in three decimal digits"),
        });
    }
    let n: u16 = suffix.parse().map_err(|_| SnapboxError::Config {
        message: format!("{kind} id '{value}' has a non-numeric suffix"),
    })?;
    if !(ID_POOL_MIN..=ID_POOL_MAX).contains(&n) {
        return Err(SnapboxError::Config {
            message: format!(
                "{kind} id '{value}' is outside the pool [{ID_POOL_MIN}, {ID_POOL_MAX}]"
            ),
        });
    }
    Ok(())
}

/// Unique identifier for a container image (`img_NNN`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    /// Parses and validates an image ID from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not `img_` followed by three
    /// decimal digits within the identifier pool.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate(IMAGE_PREFIX, "image", &value)?;
        Ok(Self(value))
    }

    /// Builds an image ID from a numeric suffix drawn from the pool.
    #[must_use]
    pub fn from_suffix(n: u16) -> Self {
        Self(format!("{IMAGE_PREFIX}_{n:03}"))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the three-digit numeric suffix.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0[self.0.len() - 3..]
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a container instance (`ps_NNN`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Parses and validates a container ID from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not `ps_` followed by three
    /// decimal digits within the identifier pool.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate(CONTAINER_PREFIX, "container", &value)?;
        Ok(Self(value))
    }

    /// Builds a container ID from a numeric suffix drawn from the pool.
    #[must_use]
    pub fn from_suffix(n: u16) -> Self {
        Self(format!("{CONTAINER_PREFIX}_{n:03}"))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the three-digit numeric suffix.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0[self.0.len() - 3..]
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns a human-readable kind label for an arbitrary identifier.
#[must_use]
pub fn kind_label(id: &str) -> &'static str {
    if id.starts_with(IMAGE_PREFIX) {
        "image"
    } else if id.starts_with(CONTAINER_PREFIX) {
        "container"
    } else {
        "object"
    }
}
