//! Turns inbound events into store operations and replies.
//!
//! Each event runs in its own task. The effective prefix and locale are
//! resolved per event; if the store cannot answer, the configured defaults
//! are used so the bot stays responsive.

use std::sync::Arc;

use tokio::task::JoinHandle;

use hifumi_store::{resolve_locale, resolve_prefix, StoreError, StoreHandle};
use hifumi_types::{ChannelId, GuildId, Locale, Prefix, RoleId, Site, UserId};

use crate::commands::{self, Command, SetAction, SettingAction};
use crate::locale::localize;
use crate::ports::{InboundEvent, Localizer, Reply, ReplySink, RichMessage};

const WARN_COLOUR: u32 = 0xE6_7E_22;
const PARDON_COLOUR: u32 = 0x2E_CC_71;

/// Process-wide fallbacks for guilds without stored settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub prefix: String,
    pub locale: String,
}

/// Per-event values shared by every command handler.
struct Context {
    guild: Option<GuildId>,
    channel: ChannelId,
    user: UserId,
    prefix: String,
    locale: String,
}

#[derive(Clone)]
pub struct Dispatcher {
    store: StoreHandle,
    localizer: Arc<dyn Localizer>,
    sink: Arc<dyn ReplySink>,
    defaults: Arc<Defaults>,
}

impl Dispatcher {
    pub fn new(
        store: StoreHandle,
        localizer: Arc<dyn Localizer>,
        sink: Arc<dyn ReplySink>,
        defaults: Defaults,
    ) -> Self {
        Self {
            store,
            localizer,
            sink,
            defaults: Arc::new(defaults),
        }
    }

    /// Handles `event` on its own task.
    pub fn spawn(&self, event: InboundEvent) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.handle(event).await })
    }

    /// Handles one event to completion. Failures are logged, never returned.
    pub async fn handle(&self, event: InboundEvent) {
        let prefix = self.effective_prefix(event.guild.as_ref()).await;
        let Some(command) = commands::parse(&event.text, &prefix) else {
            return;
        };
        let locale = self.effective_locale(event.guild.as_ref()).await;

        let ctx = Context {
            guild: event.guild,
            channel: event.channel,
            user: event.user,
            prefix,
            locale,
        };
        tracing::debug!(
            command = command.name(),
            guild = ctx.guild.as_ref().map(GuildId::as_str),
            channel = %ctx.channel,
            user = %ctx.user,
            "handling command"
        );

        let reply = match self.execute(&ctx, command).await {
            Ok(reply) => reply,
            Err(StoreError::Validation(err)) => {
                self.text(&ctx.locale, "invalid_input", &[&err.to_string()])
            }
            Err(err) => {
                tracing::error!(channel = %ctx.channel, error = %err, "command failed");
                self.text(&ctx.locale, "store_error", &[])
            }
        };

        if let Err(err) = self.sink.send(&ctx.channel, reply).await {
            tracing::warn!(channel = %ctx.channel, error = %err, "failed to deliver reply");
        }
    }

    async fn effective_prefix(&self, guild: Option<&GuildId>) -> String {
        let guild = guild.cloned();
        let default = self.defaults.prefix.clone();
        let lookup = self
            .store
            .call("resolve_prefix", move |store| {
                resolve_prefix(store, guild.as_ref(), &default)
            })
            .await;
        lookup.unwrap_or_else(|err| {
            tracing::error!(error = %err, "prefix lookup failed, using default");
            self.defaults.prefix.clone()
        })
    }

    async fn effective_locale(&self, guild: Option<&GuildId>) -> String {
        let guild = guild.cloned();
        let default = self.defaults.locale.clone();
        let lookup = self
            .store
            .call("resolve_locale", move |store| {
                resolve_locale(store, guild.as_ref(), &default)
            })
            .await;
        lookup.unwrap_or_else(|err| {
            tracing::error!(error = %err, "locale lookup failed, using default");
            self.defaults.locale.clone()
        })
    }

    fn text(&self, locale: &str, key: &str, args: &[&str]) -> Reply {
        Reply::Text(self.format(locale, key, args))
    }

    fn format(&self, locale: &str, key: &str, args: &[&str]) -> String {
        localize(
            self.localizer.as_ref(),
            locale,
            &self.defaults.locale,
            key,
            args,
        )
    }

    async fn execute(&self, ctx: &Context, command: Command) -> Result<Reply, StoreError> {
        match (command, ctx.guild.clone()) {
            (Command::Help, _) => Ok(self.text(&ctx.locale, "help", &[&ctx.prefix])),
            (Command::Usage(usage), _) => {
                Ok(self.text(&ctx.locale, "usage", &[&ctx.prefix, usage]))
            }
            (Command::Tag { site, query }, _) => self.tag(ctx, &site, query).await,
            (_, None) => Ok(self.text(&ctx.locale, "guild_only", &[])),
            (Command::Prefix(action), Some(guild)) => self.prefix(ctx, guild, action).await,
            (Command::Language(action), Some(guild)) => self.language(ctx, guild, action).await,
            (Command::Warn(user), Some(guild)) => {
                self.warn(ctx, guild, UserId::new(user)?, true).await
            }
            (Command::Pardon(user), Some(guild)) => {
                self.warn(ctx, guild, UserId::new(user)?, false).await
            }
            (Command::Warns(user), Some(guild)) => {
                let user = UserId::new(user)?;
                let target = user.to_string();
                let count = self
                    .store
                    .call("get_warn", move |store| store.get_warn(&guild, &user))
                    .await?;
                Ok(self.text(&ctx.locale, "warn_count", &[&target, &count.to_string()]))
            }
            (Command::Role(action, role), Some(guild)) => {
                self.role(ctx, guild, action, RoleId::new(role)?).await
            }
            (Command::Roles, Some(guild)) => {
                let roles = self
                    .store
                    .call("list_roles", move |store| store.list_roles(&guild))
                    .await?;
                let names: Vec<&str> = roles.iter().map(RoleId::as_str).collect();
                Ok(self.listing(ctx, "roles_list", "roles_empty", &names))
            }
            (Command::ModLog(action), Some(guild)) => self.mod_log(ctx, guild, action).await,
            (Command::ModLogs, Some(guild)) => {
                let channels = self
                    .store
                    .call("list_mod_logs", move |store| store.list_mod_logs(&guild))
                    .await?;
                let names: Vec<&str> = channels.iter().map(ChannelId::as_str).collect();
                Ok(self.listing(ctx, "modlogs_list", "modlogs_empty", &names))
            }
        }
    }

    fn listing(&self, ctx: &Context, list_key: &str, empty_key: &str, names: &[&str]) -> Reply {
        if names.is_empty() {
            self.text(&ctx.locale, empty_key, &[])
        } else {
            self.text(&ctx.locale, list_key, &[&names.join(", ")])
        }
    }

    async fn prefix(
        &self,
        ctx: &Context,
        guild: GuildId,
        action: SettingAction,
    ) -> Result<Reply, StoreError> {
        match action {
            SettingAction::Show => Ok(self.text(&ctx.locale, "prefix_current", &[&ctx.prefix])),
            SettingAction::Set(value) => {
                let prefix = Prefix::new(value)?;
                let shown = prefix.to_string();
                self.store
                    .call("set_prefix", move |store| store.set_prefix(&guild, &prefix))
                    .await?;
                Ok(self.text(&ctx.locale, "prefix_set", &[&shown]))
            }
            SettingAction::Reset => {
                self.store
                    .call("delete_prefix", move |store| store.delete_prefix(&guild))
                    .await?;
                Ok(self.text(&ctx.locale, "prefix_reset", &[&self.defaults.prefix]))
            }
        }
    }

    async fn language(
        &self,
        ctx: &Context,
        guild: GuildId,
        action: SettingAction,
    ) -> Result<Reply, StoreError> {
        match action {
            SettingAction::Show => Ok(self.text(&ctx.locale, "language_current", &[&ctx.locale])),
            SettingAction::Set(value) => {
                let locale = Locale::new(value)?;
                if !self.localizer.has_locale(locale.as_str()) {
                    let available = self.localizer.locales().join(", ");
                    return Ok(self.text(
                        &ctx.locale,
                        "language_unknown",
                        &[locale.as_str(), &available],
                    ));
                }
                let shown = locale.to_string();
                self.store
                    .call("set_language", move |store| store.set_language(&guild, &locale))
                    .await?;
                // Confirm in the language just selected.
                Ok(self.text(&shown, "language_set", &[&shown]))
            }
            SettingAction::Reset => {
                self.store
                    .call("delete_language", move |store| store.delete_language(&guild))
                    .await?;
                let default = &self.defaults.locale;
                Ok(self.text(default, "language_reset", &[default]))
            }
        }
    }

    async fn warn(
        &self,
        ctx: &Context,
        guild: GuildId,
        user: UserId,
        add: bool,
    ) -> Result<Reply, StoreError> {
        let (op, reply_key, notice_key, colour) = if add {
            ("increment_warn", "warn_added", "warn_notice", WARN_COLOUR)
        } else {
            ("decrement_warn", "warn_removed", "pardon_notice", PARDON_COLOUR)
        };

        let (g, u) = (guild.clone(), user.clone());
        let count = self
            .store
            .call(op, move |store| {
                if add {
                    store.increment_warn(&g, &u)
                } else {
                    store.decrement_warn(&g, &u)
                }
            })
            .await?;
        let count = count.to_string();

        let notice = RichMessage::new(colour)
            .author(self.format(&ctx.locale, notice_key, &[]), None)
            .field(self.format(&ctx.locale, "notice_user", &[]), user.as_str(), true)
            .field(
                self.format(&ctx.locale, "notice_moderator", &[]),
                ctx.user.as_str(),
                true,
            )
            .field(self.format(&ctx.locale, "notice_count", &[]), count.as_str(), true)
            .footer(guild.as_str());
        self.notify_mod_logs(guild, notice).await;

        Ok(self.text(&ctx.locale, reply_key, &[user.as_str(), &count]))
    }

    /// Sends `notice` to every mod-log channel of `guild`. Delivery and lookup
    /// failures are logged and otherwise ignored.
    async fn notify_mod_logs(&self, guild: GuildId, notice: RichMessage) {
        let g = guild.clone();
        let channels = match self
            .store
            .call("list_mod_logs", move |store| store.list_mod_logs(&g))
            .await
        {
            Ok(channels) => channels,
            Err(err) => {
                tracing::error!(guild = %guild, error = %err, "could not load mod-log channels");
                return;
            }
        };

        for channel in channels {
            if let Err(err) = self.sink.send(&channel, Reply::Rich(notice.clone())).await {
                tracing::warn!(
                    guild = %guild,
                    channel = %channel,
                    error = %err,
                    "failed to deliver mod-log notice"
                );
            }
        }
    }

    async fn role(
        &self,
        ctx: &Context,
        guild: GuildId,
        action: SetAction,
        role: RoleId,
    ) -> Result<Reply, StoreError> {
        let shown = role.to_string();
        let changed = self
            .store
            .call("update_role", move |store| match action {
                SetAction::Add => store.add_role(&guild, &role),
                SetAction::Remove => store.remove_role(&guild, &role),
            })
            .await?;
        let key = match (action, changed) {
            (SetAction::Add, true) => "role_added",
            (SetAction::Add, false) => "role_exists",
            (SetAction::Remove, true) => "role_removed",
            (SetAction::Remove, false) => "role_missing",
        };
        Ok(self.text(&ctx.locale, key, &[&shown]))
    }

    async fn mod_log(
        &self,
        ctx: &Context,
        guild: GuildId,
        action: SetAction,
    ) -> Result<Reply, StoreError> {
        let channel = ctx.channel.clone();
        let changed = self
            .store
            .call("update_mod_log", move |store| match action {
                SetAction::Add => store.add_mod_log(&guild, &channel),
                SetAction::Remove => store.remove_mod_log(&guild, &channel),
            })
            .await?;
        let key = match (action, changed) {
            (SetAction::Add, true) => "modlog_added",
            (SetAction::Add, false) => "modlog_exists",
            (SetAction::Remove, true) => "modlog_removed",
            (SetAction::Remove, false) => "modlog_missing",
        };
        Ok(self.text(&ctx.locale, key, &[]))
    }

    async fn tag(&self, ctx: &Context, site: &str, query: String) -> Result<Reply, StoreError> {
        let site = Site::new(site)?;
        let shown = site.to_string();
        let q = query.clone();
        let found = self
            .store
            .call("fuzzy_match_tag", move |store| store.fuzzy_match_tag(&site, &q))
            .await?;
        Ok(match found {
            Some(tag) => self.text(&ctx.locale, "tag_found", &[&shown, &tag]),
            None => self.text(&ctx.locale, "tag_not_found", &[&shown, &query]),
        })
    }
}
