//! Role allowlists, mod-log channels, and warning counters.
//!
//! Roles and mod-log channels are existence-only rows: a guild owns a set of
//! each. Warning counters are created lazily and never drop below zero; the
//! table's `CHECK (number >= 0)` backs that up at the engine level.

use std::collections::BTreeSet;
use std::str::FromStr;

use hifumi_types::{ChannelId, GuildId, RoleId, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::legacy;

/// Adds a role to the guild's set. Returns `true` if it was not present.
pub fn add_role(conn: &Connection, guild: &GuildId, role: &RoleId) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "INSERT OR IGNORE INTO roles (server, role) VALUES (?1, ?2)",
        params![guild, role],
    )?;
    Ok(count > 0)
}

/// Removes a role from the guild's set. Returns `true` if it was present.
pub fn remove_role(conn: &Connection, guild: &GuildId, role: &RoleId) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "DELETE FROM roles WHERE server = ?1 AND role = ?2",
        params![guild, role],
    )?;
    Ok(count > 0)
}

/// Lists the guild's roles. Empty when none are configured; rows that no
/// longer validate are skipped.
pub fn list_roles(conn: &Connection, guild: &GuildId) -> rusqlite::Result<BTreeSet<RoleId>> {
    let mut stmt = conn.prepare_cached("SELECT role FROM roles WHERE server = ?1")?;
    let rows = stmt.query_map([guild], |row| row.get::<_, String>(0))?;
    let mut roles = BTreeSet::new();
    for raw in rows {
        roles.extend(legacy::decode("roles", &raw?, RoleId::from_str));
    }
    Ok(roles)
}

/// Adds a mod-log channel to the guild's set. Returns `true` if it was not
/// present.
pub fn add_mod_log(
    conn: &Connection,
    guild: &GuildId,
    channel: &ChannelId,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "INSERT OR IGNORE INTO mod_log (server, channel) VALUES (?1, ?2)",
        params![guild, channel],
    )?;
    Ok(count > 0)
}

/// Removes a mod-log channel. Returns `true` if it was present.
pub fn remove_mod_log(
    conn: &Connection,
    guild: &GuildId,
    channel: &ChannelId,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "DELETE FROM mod_log WHERE server = ?1 AND channel = ?2",
        params![guild, channel],
    )?;
    Ok(count > 0)
}

/// Lists the guild's mod-log channels. Empty when none are configured; rows
/// that no longer validate are skipped.
pub fn list_mod_logs(conn: &Connection, guild: &GuildId) -> rusqlite::Result<BTreeSet<ChannelId>> {
    let mut stmt = conn.prepare_cached("SELECT channel FROM mod_log WHERE server = ?1")?;
    let rows = stmt.query_map([guild], |row| row.get::<_, String>(0))?;
    let mut channels = BTreeSet::new();
    for raw in rows {
        channels.extend(legacy::decode("mod_log", &raw?, ChannelId::from_str));
    }
    Ok(channels)
}

/// Adds one warning and returns the new count.
///
/// Creation and increment happen in a single upsert statement, so two
/// concurrent writers cannot both observe the same old value.
pub fn increment_warn(conn: &Connection, guild: &GuildId, user: &UserId) -> rusqlite::Result<u32> {
    conn.query_row(
        "INSERT INTO warns (server, user, number) VALUES (?1, ?2, 1)
         ON CONFLICT (server, user) DO UPDATE SET number = number + 1
         RETURNING number",
        params![guild, user],
        |row| row.get(0),
    )
}

/// Removes one warning if the count is above zero and returns the resulting
/// count. A zero or missing counter is left untouched.
///
/// Issues two statements; callers needing atomicity run it inside a
/// transaction.
pub fn decrement_warn(conn: &Connection, guild: &GuildId, user: &UserId) -> rusqlite::Result<u32> {
    conn.execute(
        "UPDATE warns SET number = number - 1
         WHERE server = ?1 AND user = ?2 AND number > 0",
        params![guild, user],
    )?;
    get_warn(conn, guild, user)
}

/// Returns the user's warning count; zero when no counter exists.
pub fn get_warn(conn: &Connection, guild: &GuildId, user: &UserId) -> rusqlite::Result<u32> {
    let count: Option<u32> = conn
        .query_row(
            "SELECT number FROM warns WHERE server = ?1 AND user = ?2",
            params![guild, user],
            |row| row.get(0),
        )
        .optional()?;
    Ok(count.unwrap_or(0))
}
