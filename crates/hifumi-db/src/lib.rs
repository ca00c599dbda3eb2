//! Database layer for the Hifumi bot.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. Every table the store reads or writes is
//! created through versioned migrations managed by this crate.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: a single-process bot needs no database
//!   server. WAL mode allows concurrent readers alongside the single writer.
//! - **`r2d2` connection pool**: bounded connection reuse with a checkout
//!   timeout, so no caller waits on the database indefinitely.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!` and cannot drift from the code that depends on them.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_memory_pool, create_pool, DbPool, DbRuntimeSettings, PoolError};
