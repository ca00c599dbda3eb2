//! The injectable store handle that command handlers hold.
//!
//! [`Store`] owns the connection pool and an in-process write lock shared by
//! every clone. Each public mutation is its own atomic unit: it takes the
//! write lock, opens an `IMMEDIATE` transaction, runs its statements, and
//! commits. Reads check out a connection and query directly; WAL mode lets
//! them proceed while a write is in flight.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use hifumi_db::{create_memory_pool, create_pool, run_migrations, DbPool, DbRuntimeSettings};
use hifumi_types::{
    validate_identifier, ChannelId, GuildId, Locale, Prefix, RoleId, Site, UserId,
};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::StoreError;
use crate::{moderation, settings, tags};

/// The key an operation touched, for diagnostics.
struct OpKey<'a> {
    scope: &'a str,
    item: Option<&'a str>,
}

impl<'a> OpKey<'a> {
    fn scope(scope: &'a impl AsRef<str>) -> Self {
        Self {
            scope: scope.as_ref(),
            item: None,
        }
    }

    fn pair(scope: &'a impl AsRef<str>, item: &'a str) -> Self {
        Self {
            scope: scope.as_ref(),
            item: Some(item),
        }
    }
}

impl fmt::Display for OpKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item {
            Some(item) => write!(f, "{}/{}", self.scope, item),
            None => f.write_str(self.scope),
        }
    }
}

/// Typed access to per-guild configuration and moderation records.
///
/// Cheap to clone; clones share the pool and the write lock.
#[derive(Clone)]
pub struct Store {
    pool: DbPool,
    write_lock: Arc<Mutex<()>>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("pool_max_size", &self.pool.max_size())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Opens (creating if needed) a file-backed store and applies pending
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Open` if the pool cannot be created and
    /// `StoreError::Migration` if the schema cannot be brought up to date.
    pub fn open(db_path: &str, runtime: DbRuntimeSettings) -> Result<Self, StoreError> {
        let pool = create_pool(db_path, runtime)?;
        let store = Self::from_pool(pool)?;
        tracing::info!(path = db_path, "store opened");
        Ok(store)
    }

    /// Opens a fresh in-memory store. Used by tests and dry runs.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the connection or migrations fail.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_pool(create_memory_pool(DbRuntimeSettings::default())?)
    }

    /// Wraps an existing pool, applying pending migrations first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if no connection can be checked out or a
    /// migration fails.
    pub fn from_pool(pool: DbPool) -> Result<Self, StoreError> {
        {
            let conn = pool.get()?;
            let applied = run_migrations(&conn)?;
            if applied > 0 {
                tracing::info!(count = applied, "applied database migrations");
            }
        }
        Ok(Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn read<T>(
        &self,
        op: &'static str,
        key: OpKey<'_>,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let result = self
            .pool
            .get()
            .map_err(StoreError::from)
            .and_then(|conn| f(&conn).map_err(StoreError::from));
        if let Err(ref e) = result {
            tracing::error!(op, key = %key, error = %e, "store read failed");
        }
        result
    }

    fn write<T>(
        &self,
        op: &'static str,
        key: OpKey<'_>,
        f: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let result = (|| -> Result<T, StoreError> {
            let mut conn = self.pool.get()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })();

        match &result {
            Ok(_) => tracing::debug!(op, key = %key, "store write committed"),
            Err(e) => tracing::error!(op, key = %key, error = %e, "store write failed"),
        }
        result
    }

    // ── prefix / language ────────────────────────────────────────────

    /// Returns the guild's prefix, or `None` when it has not set one.
    pub fn get_prefix(&self, guild: &GuildId) -> Result<Option<Prefix>, StoreError> {
        self.read("get_prefix", OpKey::scope(guild), |conn| {
            settings::get_prefix(conn, guild)
        })
    }

    /// Sets or replaces the guild's prefix.
    pub fn set_prefix(&self, guild: &GuildId, prefix: &Prefix) -> Result<(), StoreError> {
        self.write("set_prefix", OpKey::scope(guild), |tx| {
            settings::set_prefix(tx, guild, prefix)
        })
    }

    /// Removes the guild's prefix. Returns `true` if one was set.
    pub fn delete_prefix(&self, guild: &GuildId) -> Result<bool, StoreError> {
        self.write("delete_prefix", OpKey::scope(guild), |tx| {
            settings::delete_prefix(tx, guild)
        })
    }

    /// Returns the guild's locale, or `None` when it has not set one.
    pub fn get_language(&self, guild: &GuildId) -> Result<Option<Locale>, StoreError> {
        self.read("get_language", OpKey::scope(guild), |conn| {
            settings::get_language(conn, guild)
        })
    }

    /// Sets or replaces the guild's locale.
    pub fn set_language(&self, guild: &GuildId, locale: &Locale) -> Result<(), StoreError> {
        self.write("set_language", OpKey::scope(guild), |tx| {
            settings::set_language(tx, guild, locale)
        })
    }

    /// Removes the guild's locale. Returns `true` if one was set.
    pub fn delete_language(&self, guild: &GuildId) -> Result<bool, StoreError> {
        self.write("delete_language", OpKey::scope(guild), |tx| {
            settings::delete_language(tx, guild)
        })
    }

    // ── roles / mod-log channels ─────────────────────────────────────

    /// Adds a role. Returns `true` if it was not already present.
    pub fn add_role(&self, guild: &GuildId, role: &RoleId) -> Result<bool, StoreError> {
        self.write("add_role", OpKey::pair(guild, role.as_str()), |tx| {
            moderation::add_role(tx, guild, role)
        })
    }

    /// Removes a role. Returns `true` if it was present.
    pub fn remove_role(&self, guild: &GuildId, role: &RoleId) -> Result<bool, StoreError> {
        self.write("remove_role", OpKey::pair(guild, role.as_str()), |tx| {
            moderation::remove_role(tx, guild, role)
        })
    }

    /// Lists the guild's roles; empty when none are configured.
    pub fn list_roles(&self, guild: &GuildId) -> Result<BTreeSet<RoleId>, StoreError> {
        self.read("list_roles", OpKey::scope(guild), |conn| {
            moderation::list_roles(conn, guild)
        })
    }

    /// Adds a mod-log channel. Returns `true` if it was not already present.
    pub fn add_mod_log(&self, guild: &GuildId, channel: &ChannelId) -> Result<bool, StoreError> {
        self.write("add_mod_log", OpKey::pair(guild, channel.as_str()), |tx| {
            moderation::add_mod_log(tx, guild, channel)
        })
    }

    /// Removes a mod-log channel. Returns `true` if it was present.
    pub fn remove_mod_log(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
    ) -> Result<bool, StoreError> {
        self.write("remove_mod_log", OpKey::pair(guild, channel.as_str()), |tx| {
            moderation::remove_mod_log(tx, guild, channel)
        })
    }

    /// Lists the guild's mod-log channels; empty when none are configured.
    pub fn list_mod_logs(&self, guild: &GuildId) -> Result<BTreeSet<ChannelId>, StoreError> {
        self.read("list_mod_logs", OpKey::scope(guild), |conn| {
            moderation::list_mod_logs(conn, guild)
        })
    }

    // ── warnings ─────────────────────────────────────────────────────

    /// Adds a warning and returns the user's new count.
    pub fn increment_warn(&self, guild: &GuildId, user: &UserId) -> Result<u32, StoreError> {
        self.write("increment_warn", OpKey::pair(guild, user.as_str()), |tx| {
            moderation::increment_warn(tx, guild, user)
        })
    }

    /// Removes a warning unless the count is already zero; returns the
    /// resulting count.
    pub fn decrement_warn(&self, guild: &GuildId, user: &UserId) -> Result<u32, StoreError> {
        self.write("decrement_warn", OpKey::pair(guild, user.as_str()), |tx| {
            moderation::decrement_warn(tx, guild, user)
        })
    }

    /// Returns the user's warning count, zero if none was ever recorded.
    pub fn get_warn(&self, guild: &GuildId, user: &UserId) -> Result<u32, StoreError> {
        self.read("get_warn", OpKey::pair(guild, user.as_str()), |conn| {
            moderation::get_warn(conn, guild, user)
        })
    }

    // ── tag index ────────────────────────────────────────────────────

    /// Adds a tag to a site's index. Returns `true` if it was new.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for an empty tag.
    pub fn write_tag(&self, site: &Site, tag: &str) -> Result<bool, StoreError> {
        validate_identifier("tag", tag)?;
        self.write("write_tag", OpKey::pair(site, tag), |tx| {
            tags::write_tag(tx, site, tag)
        })
    }

    /// Adds many tags in one transaction, returning how many were new.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if any tag is empty; nothing is
    /// written in that case.
    pub fn write_tags<S: AsRef<str>>(&self, site: &Site, batch: &[S]) -> Result<usize, StoreError> {
        for tag in batch {
            validate_identifier("tag", tag.as_ref())?;
        }
        self.write("write_tags", OpKey::scope(site), |tx| {
            tags::write_tags(tx, site, batch.iter().map(|tag| tag.as_ref()))
        })
    }

    /// Removes a tag from a site's index. Returns `true` if it was present.
    pub fn remove_tag(&self, site: &Site, tag: &str) -> Result<bool, StoreError> {
        self.write("remove_tag", OpKey::pair(site, tag), |tx| {
            tags::remove_tag(tx, site, tag)
        })
    }

    /// Exact, case-sensitive tag membership.
    pub fn tag_exists(&self, site: &Site, tag: &str) -> Result<bool, StoreError> {
        self.read("tag_exists", OpKey::pair(site, tag), |conn| {
            tags::tag_exists(conn, site, tag)
        })
    }

    /// Lists every tag known for `site`.
    pub fn list_tags(&self, site: &Site) -> Result<BTreeSet<String>, StoreError> {
        self.read("list_tags", OpKey::scope(site), |conn| tags::list_tags(conn, site))
    }

    /// Returns the best known tag of `site` matching `input`, if any.
    ///
    /// Prefix matches beat interior matches, which beat suffix matches;
    /// ties go to the lexicographically smallest tag.
    pub fn fuzzy_match_tag(&self, site: &Site, input: &str) -> Result<Option<String>, StoreError> {
        self.read("fuzzy_match_tag", OpKey::pair(site, input), |conn| {
            tags::fuzzy_match_tag(conn, site, input)
        })
    }
}
