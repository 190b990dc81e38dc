//! Validated identifiers.
//!
//! Every identifier that ends up in a file path is a single path segment:
//! non-empty, at most [`MAX_ID_LEN`] bytes, drawn from `[A-Za-z0-9._-]`,
//! and never `.`, `..` or `.git`. Because of that, the path resolver can join
//! identifiers without ever producing two equal paths for two different keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Longest identifier accepted as a path segment.
pub const MAX_ID_LEN: usize = 128;

fn check_segment(kind: &str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::InvalidInput(format!("{kind} must not be empty")));
    }
    if value.len() > MAX_ID_LEN {
        return Err(StoreError::InvalidInput(format!(
            "{kind} is longer than {MAX_ID_LEN} bytes"
        )));
    }
    if value == "." || value == ".." || value.eq_ignore_ascii_case(".git") {
        return Err(StoreError::InvalidInput(format!("{kind} `{value}` is reserved")));
    }
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !valid {
        return Err(StoreError::InvalidInput(format!(
            "{kind} `{value}` contains characters outside [A-Za-z0-9._-]"
        )));
    }
    Ok(())
}

fn is_hex(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_hexdigit())
}

macro_rules! segment_id {
    ($(#[$meta:meta])* $name:ident, $label:literal, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap an identifier.
            pub fn parse(value: impl Into<String>) -> Result<Self, StoreError> {
                let value = value.into();
                check_segment($label, &value)?;
                Ok(Self(value))
            }

            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(format!("{}-{}", $prefix, Uuid::new_v4()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = StoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

segment_id!(
    /// Identifier of a project.
    ProjectId,
    "project id",
    "project"
);
segment_id!(
    /// Identifier of a block, unique within its project.
    BlockId,
    "block id",
    "block"
);
segment_id!(
    /// Identifier of an order, unique within its project.
    OrderId,
    "order id",
    "order"
);

/// Identifier of a user. Never used as a path segment, only stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn parse(value: impl Into<String>) -> Result<Self, StoreError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(StoreError::InvalidInput("user id must not be empty".to_string()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// MD5 digest of a raw sequence string, as 32 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SequenceHash(String);

impl SequenceHash {
    pub fn parse(value: impl Into<String>) -> Result<Self, StoreError> {
        let value = value.into();
        if value.len() != 32 || !is_hex(&value) {
            return Err(StoreError::InvalidInput(format!(
                "sequence hash `{value}` is not 32 hex digits"
            )));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    /// Hash raw sequence data.
    pub fn of(data: &str) -> Self {
        use md5::{Digest, Md5};

        let digest = Md5::digest(data.as_bytes());
        Self(format!("{digest:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SequenceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SequenceHash {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SequenceHash> for String {
    fn from(hash: SequenceHash) -> Self {
        hash.0
    }
}

impl std::str::FromStr for SequenceHash {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A commit identifier in a project repository (full or abbreviated).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha(String);

impl Sha {
    pub fn parse(value: impl Into<String>) -> Result<Self, StoreError> {
        let value = value.into();
        if !(4..=64).contains(&value.len()) || !is_hex(&value) {
            return Err(StoreError::InvalidInput(format!(
                "sha `{value}` is not 4 to 64 hex digits"
            )));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Sha {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Sha> for String {
    fn from(sha: Sha) -> Self {
        sha.0
    }
}

impl std::str::FromStr for Sha {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
