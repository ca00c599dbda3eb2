//! Shared identifier types, validation rules, and the SQLite record codec for
//! the Hifumi bot.
//!
//! Every key the store accepts (guild, user, channel, role, tag site) is an
//! opaque string issued by the chat platform. Wrapping them in distinct
//! newtypes keeps a `UserId` from being passed where a `GuildId` is expected,
//! and moves validation to construction time so malformed keys are rejected
//! before any query is issued.

pub mod codec;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command prefix used when a guild has not configured one.
pub const DEFAULT_PREFIX: &str = "~";

/// Locale used when a guild has not configured one.
pub const DEFAULT_LOCALE: &str = "en";

/// Maximum length of a command prefix, in characters.
pub const MAX_PREFIX_LEN: usize = 32;

/// Maximum length of a locale code, in characters.
pub const MAX_LOCALE_LEN: usize = 16;

/// Reasons a key or value is rejected before it reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The value was empty or whitespace only.
    #[error("{kind} must not be empty")]
    Empty {
        /// What kind of value was rejected.
        kind: &'static str,
    },

    /// The value contained an ASCII control character.
    #[error("{kind} must not contain control characters")]
    ControlCharacter {
        /// What kind of value was rejected.
        kind: &'static str,
    },

    /// The value was longer than allowed.
    #[error("{kind} must be at most {max} characters")]
    TooLong {
        /// What kind of value was rejected.
        kind: &'static str,
        /// The maximum accepted length.
        max: usize,
    },

    /// The value contained a character outside its allowed alphabet.
    #[error("{kind} contains invalid character {ch:?}")]
    InvalidCharacter {
        /// What kind of value was rejected.
        kind: &'static str,
        /// The offending character.
        ch: char,
    },
}

/// Checks the rules shared by every opaque identifier.
///
/// The value is accepted as-is; it is not trimmed or normalised.
///
/// # Errors
///
/// Returns `ValidationError::Empty` for empty or whitespace-only input and
/// `ValidationError::ControlCharacter` if any ASCII control character appears.
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { kind });
    }
    if value.chars().any(|c| c.is_ascii_control()) {
        return Err(ValidationError::ControlCharacter { kind });
    }
    Ok(())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validates and wraps a raw identifier.
            ///
            /// # Errors
            ///
            /// Returns `ValidationError` if the value is empty or contains
            /// control characters.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                validate_identifier($kind, &value)?;
                Ok(Self(value))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the raw string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a guild (tenant/server).
    GuildId,
    "guild id"
);
string_id!(
    /// Identifier of a user within the chat platform.
    UserId,
    "user id"
);
string_id!(
    /// Identifier of a text channel.
    ChannelId,
    "channel id"
);
string_id!(
    /// Identifier (or name) of a guild role.
    RoleId,
    "role id"
);
string_id!(
    /// Name of an external content source whose tags are indexed.
    Site,
    "site"
);

/// A guild command prefix: 1 to [`MAX_PREFIX_LEN`] characters, no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Prefix(String);

impl Prefix {
    /// Validates and wraps a prefix.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the prefix is empty, too long, or contains
    /// whitespace or control characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_identifier("prefix", &value)?;
        if value.chars().count() > MAX_PREFIX_LEN {
            return Err(ValidationError::TooLong {
                kind: "prefix",
                max: MAX_PREFIX_LEN,
            });
        }
        if let Some(ch) = value.chars().find(|c| c.is_whitespace()) {
            return Err(ValidationError::InvalidCharacter { kind: "prefix", ch });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A locale code such as `en`, `ja` or `pt-BR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    /// Validates and wraps a locale code.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the code is empty, longer than
    /// [`MAX_LOCALE_LEN`], or contains anything other than ASCII
    /// alphanumerics, `-` and `_`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Empty { kind: "locale" });
        }
        if value.len() > MAX_LOCALE_LEN {
            return Err(ValidationError::TooLong {
                kind: "locale",
                max: MAX_LOCALE_LEN,
            });
        }
        if let Some(ch) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(ValidationError::InvalidCharacter { kind: "locale", ch });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_value_impls {
    ($($name:ident),*) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl FromStr for $name {
                type Err = ValidationError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Self::new(s)
                }
            }

            impl TryFrom<String> for $name {
                type Error = ValidationError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    Self::new(value)
                }
            }

            impl From<$name> for String {
                fn from(value: $name) -> Self {
                    value.0
                }
            }
        )*
    };
}

string_value_impls!(Prefix, Locale);
