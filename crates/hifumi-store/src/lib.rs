//! Per-guild configuration and moderation store for the Hifumi bot.
//!
//! Every inbound event consults or mutates this state: the guild's command
//! prefix and locale, its role allowlist and mod-log channels, per-user
//! warning counters, and a fuzzy-searchable content-tag index.
//!
//! The crate is layered the same way throughout:
//!
//! - [`settings`], [`moderation`] and [`tags`] hold one function per
//!   operation, each taking a `&Connection`.
//! - [`Store`] owns the pool, validates inputs, serializes writers, and
//!   wraps every mutation in its own transaction.
//! - [`resolver`] applies the default-prefix/locale fallback policy.
//! - [`StoreHandle`] bounds each call with a deadline for async callers.
//!
//! Absence is never an error: missing records read as `None`, an empty set,
//! or a zero count.

mod error;
mod handle;
mod legacy;
pub mod moderation;
pub mod resolver;
pub mod settings;
mod store;
pub mod tags;

pub use error::StoreError;
pub use handle::StoreHandle;
pub use resolver::{resolve_locale, resolve_prefix, GuildSettings};
pub use store::Store;
pub use tags::MatchTier;

pub use hifumi_db::DbRuntimeSettings;
