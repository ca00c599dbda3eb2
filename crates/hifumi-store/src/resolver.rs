//! Effective prefix and locale for an inbound event.
//!
//! The fallback policy lives here so every call site agrees: no guild
//! context (a private conversation) or no stored value means the process
//! default applies.

use hifumi_types::{GuildId, Locale, Prefix};

use crate::error::StoreError;
use crate::store::Store;

/// Read access to the per-guild settings the resolver needs.
///
/// Implemented by [`Store`]; tests and alternative backends can supply
/// their own.
pub trait GuildSettings {
    fn prefix(&self, guild: &GuildId) -> Result<Option<Prefix>, StoreError>;
    fn locale(&self, guild: &GuildId) -> Result<Option<Locale>, StoreError>;
}

impl GuildSettings for Store {
    fn prefix(&self, guild: &GuildId) -> Result<Option<Prefix>, StoreError> {
        self.get_prefix(guild)
    }

    fn locale(&self, guild: &GuildId) -> Result<Option<Locale>, StoreError> {
        self.get_language(guild)
    }
}

/// Returns the guild's prefix, or `default` outside a guild or when unset.
///
/// # Errors
///
/// Storage failures are returned, not replaced by the default; the caller
/// decides whether to degrade.
pub fn resolve_prefix<S>(
    settings: &S,
    guild: Option<&GuildId>,
    default: &str,
) -> Result<String, StoreError>
where
    S: GuildSettings + ?Sized,
{
    let Some(guild) = guild else {
        return Ok(default.to_string());
    };
    Ok(settings
        .prefix(guild)?
        .map_or_else(|| default.to_string(), String::from))
}

/// Returns the guild's locale, or `default` outside a guild or when unset.
///
/// # Errors
///
/// Storage failures are returned, not replaced by the default.
pub fn resolve_locale<S>(
    settings: &S,
    guild: Option<&GuildId>,
    default: &str,
) -> Result<String, StoreError>
where
    S: GuildSettings + ?Sized,
{
    let Some(guild) = guild else {
        return Ok(default.to_string());
    };
    Ok(settings
        .locale(guild)?
        .map_or_else(|| default.to_string(), String::from))
}
