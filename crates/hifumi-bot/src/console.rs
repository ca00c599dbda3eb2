//! Line-oriented console adapter.
//!
//! Each input line is one event: `<guild|-> <channel> <user> <text...>`,
//! where `-` marks a private conversation. Replies are written as
//! `[#channel] text`, with rich notices expanded over several lines.

use std::future::Future;
use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;

use hifumi_types::{ChannelId, GuildId, UserId, ValidationError};

use crate::dispatch::Dispatcher;
use crate::error::BotError;
use crate::ports::{DeliveryError, InboundEvent, Reply, ReplySink, RichMessage};

/// Reasons a console line is not an event.
#[derive(Debug, Error)]
pub enum LineError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Parses one console line into an event.
pub fn parse_line(line: &str) -> Result<InboundEvent, LineError> {
    let mut parts = line.trim().splitn(4, ' ');
    let mut field = |name| {
        parts
            .next()
            .filter(|part| !part.is_empty())
            .ok_or(LineError::MissingField(name))
    };

    let guild = match field("guild")? {
        "-" => None,
        id => Some(GuildId::new(id)?),
    };
    let channel = ChannelId::new(field("channel")?)?;
    let user = UserId::new(field("user")?)?;
    let text = field("text")?.to_string();

    Ok(InboundEvent {
        guild,
        channel,
        user,
        text,
    })
}

/// A [`ReplySink`] that prints to any writer.
pub struct WriterSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Returns the writer, consuming the sink.
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn render(channel: &ChannelId, reply: &Reply) -> String {
    match reply {
        Reply::Text(text) => format!("[#{channel}] {text}\n"),
        Reply::Rich(message) => render_rich(channel, message),
    }
}

fn render_rich(channel: &ChannelId, message: &RichMessage) -> String {
    let title = message
        .author
        .as_ref()
        .map_or("", |author| author.name.as_str());
    let mut out = format!("[#{channel}] [{title}] (#{:06x})\n", message.colour);
    for field in &message.fields {
        out.push_str(&format!("    {}: {}\n", field.name, field.value));
    }
    if let Some(footer) = &message.footer {
        out.push_str(&format!("    -- {footer}\n"));
    }
    out
}

#[async_trait]
impl<W: Write + Send> ReplySink for WriterSink<W> {
    async fn send(&self, channel: &ChannelId, reply: Reply) -> Result<(), DeliveryError> {
        let rendered = render(channel, &reply);
        let mut out = self.out.lock().map_err(|_| DeliveryError::Closed)?;
        out.write_all(rendered.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|err| DeliveryError::Transport {
                channel: channel.clone(),
                reason: err.to_string(),
            })
    }
}

/// Feeds lines from `input` to `dispatcher` until end of input or until
/// `shutdown` resolves, then waits for in-flight events to finish.
///
/// # Errors
///
/// Returns `BotError::Io` if reading input fails.
pub async fn run<R, S>(input: R, dispatcher: Dispatcher, shutdown: S) -> Result<(), BotError>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    let mut in_flight = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            () = &mut shutdown => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            tracing::info!("console input closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            Ok(event) => {
                let dispatcher = dispatcher.clone();
                in_flight.spawn(async move { dispatcher.handle(event).await });
            }
            Err(err) => tracing::warn!(error = %err, "ignoring malformed console line"),
        }

        // Reap finished tasks so the set does not grow unbounded.
        while in_flight.try_join_next().is_some() {}
    }

    while let Some(result) = in_flight.join_next().await {
        if let Err(err) = result {
            tracing::error!(error = %err, "event task failed");
        }
    }
    Ok(())
}
