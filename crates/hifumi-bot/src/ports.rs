//! Collaborator interfaces the dispatcher is written against.
//!
//! A chat platform adapter produces [`InboundEvent`]s and implements
//! [`ReplySink`]. The console adapter in [`crate::console`] is one such
//! implementation; tests supply recording doubles.

use async_trait::async_trait;
use thiserror::Error;

use hifumi_types::{ChannelId, GuildId, UserId};

/// A message received from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// `None` for private conversations.
    pub guild: Option<GuildId>,
    pub channel: ChannelId,
    pub user: UserId,
    pub text: String,
}

/// One named field of a [`RichMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichAuthor {
    pub name: String,
    pub icon_url: Option<String>,
}

/// A structured notice: colour, optional author, fields and footer.
///
/// Built with chained calls:
///
/// ```
/// use hifumi_bot::ports::RichMessage;
///
/// let notice = RichMessage::new(0xE67E22)
///     .author("Warning issued", None)
///     .field("User", "42", true)
///     .footer("hifumi");
/// assert_eq!(notice.fields.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichMessage {
    pub colour: u32,
    pub author: Option<RichAuthor>,
    pub fields: Vec<RichField>,
    pub footer: Option<String>,
}

impl RichMessage {
    pub fn new(colour: u32) -> Self {
        Self {
            colour,
            author: None,
            fields: Vec::new(),
            footer: None,
        }
    }

    #[must_use]
    pub fn author(mut self, name: impl Into<String>, icon_url: Option<String>) -> Self {
        self.author = Some(RichAuthor {
            name: name.into(),
            icon_url,
        });
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(RichField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    #[must_use]
    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }
}

/// Something the bot sends back to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Rich(RichMessage),
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<RichMessage> for Reply {
    fn from(message: RichMessage) -> Self {
        Self::Rich(message)
    }
}

/// Errors a [`ReplySink`] reports when a reply cannot be delivered.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The platform rejected the message or the connection failed.
    #[error("delivery to channel {channel} failed: {reason}")]
    Transport { channel: ChannelId, reason: String },

    /// The sink has shut down.
    #[error("reply sink is closed")]
    Closed,
}

/// Outbound side of a platform adapter.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, channel: &ChannelId, reply: Reply) -> Result<(), DeliveryError>;
}

/// Locale-keyed format strings.
pub trait Localizer: Send + Sync {
    /// Returns the template for `key` in `locale`, without any fallback.
    fn lookup(&self, locale: &str, key: &str) -> Option<&str>;

    /// Whether any templates exist for `locale`.
    fn has_locale(&self, locale: &str) -> bool;

    /// Every available locale, sorted.
    fn locales(&self) -> Vec<&str>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rich_message_builder_keeps_field_order() {
        let message = RichMessage::new(0xff0000)
            .author("Hifumi", Some("https://example.invalid/icon.png".into()))
            .field("a", "1", true)
            .field("b", "2", false)
            .footer("done");

        assert_eq!(message.colour, 0xff0000);
        assert_eq!(message.author.as_ref().map(|a| a.name.as_str()), Some("Hifumi"));
        let names: Vec<_> = message.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(!message.fields[1].inline);
        assert_eq!(message.footer.as_deref(), Some("done"));
    }

    #[test]
    fn replies_convert_from_payloads() {
        assert_eq!(Reply::from("hi".to_string()), Reply::Text("hi".into()));
        let rich = RichMessage::new(0);
        assert_eq!(Reply::from(rich.clone()), Reply::Rich(rich));
    }
}
