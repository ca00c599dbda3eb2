use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use hifumi_bot::locale::LanguageTable;
use hifumi_bot::ports::{DeliveryError, InboundEvent, Reply, ReplySink};
use hifumi_bot::{Defaults, Dispatcher};
use hifumi_store::{Store, StoreHandle};
use hifumi_types::{ChannelId, GuildId, Site, UserId};

/// Records every delivery; channels listed in `failing` reject messages.
#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(ChannelId, Reply)>>,
    failing: Vec<ChannelId>,
}

impl RecordingSink {
    fn take(&self) -> Vec<(ChannelId, Reply)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send(&self, channel: &ChannelId, reply: Reply) -> Result<(), DeliveryError> {
        if self.failing.contains(channel) {
            return Err(DeliveryError::Transport {
                channel: channel.clone(),
                reason: "forbidden".into(),
            });
        }
        self.sent.lock().unwrap().push((channel.clone(), reply));
        Ok(())
    }
}

struct Harness {
    store: Store,
    sink: Arc<RecordingSink>,
    dispatcher: Dispatcher,
}

fn harness(language_dir: &Path, failing: &[&str]) -> Harness {
    let store = Store::open_in_memory().expect("store should open");
    let sink = Arc::new(RecordingSink {
        failing: failing.iter().map(|c| ChannelId::new(*c).unwrap()).collect(),
        ..Default::default()
    });
    let languages = LanguageTable::load_dir(language_dir).expect("languages should load");
    let dispatcher = Dispatcher::new(
        StoreHandle::new(store.clone(), Duration::from_secs(5)),
        Arc::new(languages),
        sink.clone(),
        Defaults {
            prefix: "~".into(),
            locale: "en".into(),
        },
    );
    Harness {
        store,
        sink,
        dispatcher,
    }
}

fn event(guild: Option<&str>, channel: &str, user: &str, text: &str) -> InboundEvent {
    InboundEvent {
        guild: guild.map(|g| GuildId::new(g).unwrap()),
        channel: ChannelId::new(channel).unwrap(),
        user: UserId::new(user).unwrap(),
        text: text.to_string(),
    }
}

fn texts(sent: &[(ChannelId, Reply)]) -> Vec<(&str, &str)> {
    sent.iter()
        .filter_map(|(channel, reply)| match reply {
            Reply::Text(text) => Some((channel.as_str(), text.as_str())),
            Reply::Rich(_) => None,
        })
        .collect()
}

#[tokio::test]
async fn guild_locale_and_prefix_follow_stored_settings() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("ja.json"),
        r#"{"language_set": "言語: {0}", "prefix_set": "プレフィックス: {0}"}"#,
    )
    .unwrap();
    let h = harness(dir.path(), &[]);

    h.dispatcher
        .handle(event(Some("1"), "100", "7", "~language set ja"))
        .await;
    h.dispatcher
        .handle(event(Some("1"), "100", "7", "~prefix set ?"))
        .await;
    // The old prefix no longer addresses the bot in this guild.
    h.dispatcher.handle(event(Some("1"), "100", "7", "~help")).await;
    // Keys missing from the ja table fall back to English.
    h.dispatcher.handle(event(Some("1"), "100", "7", "?prefix")).await;
    // Other guilds and private conversations keep the defaults.
    h.dispatcher.handle(event(Some("2"), "200", "7", "~prefix")).await;

    let sent = h.sink.take();
    assert_eq!(
        texts(&sent),
        [
            ("100", "言語: ja"),
            ("100", "プレフィックス: ?"),
            ("100", "The prefix for this server is `?`."),
            ("200", "The prefix for this server is `~`."),
        ]
    );
    assert_eq!(
        h.store
            .get_language(&GuildId::new("1").unwrap())
            .unwrap()
            .map(String::from),
        Some("ja".to_string())
    );
}

#[tokio::test]
async fn unknown_language_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), &[]);

    h.dispatcher
        .handle(event(Some("1"), "100", "7", "~language set xx"))
        .await;

    let sent = h.sink.take();
    assert_eq!(
        texts(&sent),
        [("100", "`xx` is not a supported language. Available: en")]
    );
    assert_eq!(h.store.get_language(&GuildId::new("1").unwrap()).unwrap(), None);
}

#[tokio::test]
async fn warn_notifies_every_reachable_mod_log() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), &["301"]);

    for channel in ["300", "301"] {
        h.dispatcher
            .handle(event(Some("1"), channel, "7", "~modlog add"))
            .await;
    }
    h.sink.take();

    h.dispatcher
        .handle(event(Some("1"), "100", "7", "~warn <@42>"))
        .await;
    let sent = h.sink.take();

    let notices: Vec<_> = sent
        .iter()
        .filter_map(|(channel, reply)| match reply {
            Reply::Rich(message) => Some((channel.as_str(), message)),
            Reply::Text(_) => None,
        })
        .collect();
    assert_eq!(notices.len(), 1, "the failing channel is skipped");
    let (channel, notice) = notices[0];
    assert_eq!(channel, "300");
    assert_eq!(notice.author.as_ref().unwrap().name, "Warning issued");
    let values: Vec<_> = notice.fields.iter().map(|f| f.value.as_str()).collect();
    assert_eq!(values, ["42", "7", "1"]);

    assert_eq!(
        texts(&sent),
        [("100", "42 has been warned and now has 1 warning(s).")]
    );

    h.dispatcher
        .handle(event(Some("1"), "100", "7", "~pardon 42"))
        .await;
    h.dispatcher
        .handle(event(Some("1"), "100", "7", "~pardon 42"))
        .await;
    let sent = h.sink.take();
    let replies = texts(&sent);
    assert_eq!(
        replies.last(),
        Some(&("100", "42 has been pardoned and now has 0 warning(s)."))
    );
}

#[tokio::test]
async fn guild_commands_are_refused_in_private() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), &[]);

    h.dispatcher.handle(event(None, "100", "7", "~roles")).await;
    h.dispatcher.handle(event(None, "100", "7", "~dance")).await;
    h.dispatcher.handle(event(None, "100", "7", "hello")).await;

    let sent = h.sink.take();
    assert_eq!(
        texts(&sent),
        [("100", "This command can only be used in a server.")]
    );
}

#[tokio::test]
async fn invalid_arguments_get_a_localized_reply() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), &[]);
    let long = format!("~prefix set {}", "!".repeat(40));

    h.dispatcher.handle(event(Some("1"), "100", "7", &long)).await;
    h.dispatcher.handle(event(Some("1"), "100", "7", "~warn")).await;

    let sent = h.sink.take();
    let replies = texts(&sent);
    assert_eq!(replies.len(), 2);
    assert!(replies[0].1.starts_with("Invalid input: "));
    assert_eq!(replies[1].1, "Usage: ~warn <user>");
    assert_eq!(h.store.get_prefix(&GuildId::new("1").unwrap()).unwrap(), None);
}

#[tokio::test]
async fn roles_and_tags_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), &[]);
    let site = Site::new("danbooru").unwrap();
    h.store
        .write_tags(&site, &["cat_girl", "catboy", "wildcat"])
        .unwrap();

    let script = [
        "~role add mods",
        "~role add mods",
        "~roles",
        "~role remove mods",
        "~roles",
    ];
    for line in script {
        h.dispatcher.handle(event(Some("1"), "100", "7", line)).await;
    }
    h.dispatcher
        .spawn(event(None, "100", "7", "~tag danbooru cat"))
        .await
        .expect("event task should not panic");

    let sent = h.sink.take();
    assert_eq!(
        texts(&sent),
        [
            ("100", "Role `mods` added."),
            ("100", "Role `mods` is already on the list."),
            ("100", "Roles: mods"),
            ("100", "Role `mods` removed."),
            ("100", "No roles are configured for this server."),
            ("100", "Closest tag on danbooru: `cat_girl`"),
        ]
    );
}
