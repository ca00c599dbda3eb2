//! Hifumi bot runtime: configuration, localization, command parsing and the
//! event dispatcher, wired to the guild store.
//!
//! Platform adapters implement [`ports::ReplySink`] and feed
//! [`ports::InboundEvent`]s to a [`Dispatcher`]. The bundled [`console`]
//! adapter reads events from standard input.

pub mod commands;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod locale;
pub mod ports;

pub use dispatch::{Defaults, Dispatcher};
pub use error::BotError;
