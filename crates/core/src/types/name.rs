//! Validated names for external search and storage resources.
//!
//! Indexes, indexers, data sources and blob containers live in remote
//! services and are referenced only by name, so a malformed name is rejected
//! here before any request is built.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ResourceName`] or [`ContainerName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The input string is empty.
    #[error("name cannot be empty")]
    Empty,
    /// The input string is outside the allowed length.
    #[error("name must be between {min} and {max} characters (got {len})")]
    Length {
        /// Minimum allowed length.
        min: usize,
        /// Maximum allowed length.
        max: usize,
        /// Actual length.
        len: usize,
    },
    /// The input contains a character outside `[a-z0-9-]`.
    #[error("name contains invalid character '{0}' (allowed: lowercase letters, digits, '-')")]
    InvalidCharacter(char),
    /// The input starts or ends with a dash.
    #[error("name cannot start or end with '-'")]
    EdgeDash,
    /// The input contains two dashes in a row.
    #[error("name cannot contain consecutive dashes")]
    ConsecutiveDashes,
}

fn validate(s: &str, min: usize, max: usize) -> Result<(), NameError> {
    if s.is_empty() {
        return Err(NameError::Empty);
    }

    let len = s.chars().count();
    if len < min || len > max {
        return Err(NameError::Length { min, max, len });
    }

    if let Some(c) = s
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(NameError::InvalidCharacter(c));
    }

    if s.starts_with('-') || s.ends_with('-') {
        return Err(NameError::EdgeDash);
    }

    if s.contains("--") {
        return Err(NameError::ConsecutiveDashes);
    }

    Ok(())
}

/// Name of an index, indexer or data source.
///
/// ## Constraints
///
/// - Length: 1-128 characters
/// - Lowercase ASCII letters, digits and `-` only
/// - Must not start or end with `-`, no `--`
///
/// ## Examples
///
/// ```
/// use searchgate_core::ResourceName;
///
/// assert!(ResourceName::parse("documents-index-01").is_ok());
/// assert!(ResourceName::parse("Documents").is_err()); // uppercase
/// assert!(ResourceName::parse("-index").is_err());    // leading dash
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName(String);

impl ResourceName {
    /// Maximum length of a resource name.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `ResourceName` from a string.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] describing the first rule the input breaks.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        validate(s, 1, Self::MAX_LENGTH)?;
        Ok(Self(s.to_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of a blob container.
///
/// Same character rules as [`ResourceName`], limited to 3-63 characters.
///
/// ```
/// use searchgate_core::ContainerName;
///
/// assert!(ContainerName::parse("mycontainer01").is_ok());
/// assert!(ContainerName::parse("ab").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerName(String);

impl ContainerName {
    /// Minimum length of a container name.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum length of a container name.
    pub const MAX_LENGTH: usize = 63;

    /// Parse a `ContainerName` from a string.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] describing the first rule the input breaks.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        validate(s, Self::MIN_LENGTH, Self::MAX_LENGTH)?;
        Ok(Self(s.to_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_name_traits {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = NameError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = NameError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl From<$name> for String {
            fn from(name: $name) -> Self {
                name.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_name_traits!(ResourceName);
impl_name_traits!(ContainerName);
