use thiserror::Error;

use hifumi_store::StoreError;

use crate::config::ConfigError;
use crate::locale::LanguageError;
use crate::ports::DeliveryError;

/// Top-level failure of the bot process.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Language(#[from] LanguageError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("console I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
