//! Command parsing.
//!
//! Parsing is purely textual. Identifiers are validated later, when the
//! dispatcher turns arguments into typed ids.

/// What to do with a single-valued guild setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingAction {
    Show,
    Set(String),
    Reset,
}

/// Membership change for a guild-owned set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Prefix(SettingAction),
    Language(SettingAction),
    Warn(String),
    Pardon(String),
    Warns(String),
    Role(SetAction, String),
    Roles,
    ModLog(SetAction),
    ModLogs,
    Tag { site: String, query: String },
    /// A known command with missing or malformed arguments. Carries the
    /// usage line without the prefix.
    Usage(&'static str),
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Prefix(_) => "prefix",
            Self::Language(_) => "language",
            Self::Warn(_) => "warn",
            Self::Pardon(_) => "pardon",
            Self::Warns(_) => "warns",
            Self::Role(..) => "role",
            Self::Roles => "roles",
            Self::ModLog(_) => "modlog",
            Self::ModLogs => "modlogs",
            Self::Tag { .. } => "tag",
            Self::Usage(_) => "usage",
        }
    }
}

/// Strips `prefix` and any spaces after it. `None` if the text does not
/// start with the prefix.
pub fn strip_prefix<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.strip_prefix(prefix)
        .map(|rest| rest.trim_start_matches(' '))
}

/// Parses `text` as a command under `prefix`.
///
/// Returns `None` when the text is not addressed to the bot or names an
/// unknown command.
pub fn parse(text: &str, prefix: &str) -> Option<Command> {
    let body = strip_prefix(text, prefix)?;
    let mut words = body.split_whitespace();
    let name = words.next()?;

    let command = match name {
        "help" => Command::Help,
        "prefix" => match setting_action(words) {
            Some(action) => Command::Prefix(action),
            None => Command::Usage("prefix [set <prefix>|reset]"),
        },
        "language" => match setting_action(words) {
            Some(action) => Command::Language(action),
            None => Command::Usage("language [set <locale>|reset]"),
        },
        "warn" => one_arg(words, Command::Warn, "warn <user>"),
        "pardon" => one_arg(words, Command::Pardon, "pardon <user>"),
        "warns" => one_arg(words, Command::Warns, "warns <user>"),
        "role" => match (set_action(words.next()), words.next()) {
            (Some(action), Some(role)) => Command::Role(action, role.to_string()),
            _ => Command::Usage("role add|remove <role>"),
        },
        "roles" => Command::Roles,
        "modlog" => match set_action(words.next()) {
            Some(action) => Command::ModLog(action),
            None => Command::Usage("modlog add|remove"),
        },
        "modlogs" => Command::ModLogs,
        "tag" => match (words.next(), words.collect::<Vec<_>>()) {
            (Some(site), query) if !query.is_empty() => Command::Tag {
                site: site.to_string(),
                query: query.join(" "),
            },
            _ => Command::Usage("tag <site> <query>"),
        },
        _ => return None,
    };
    Some(command)
}

/// `None` when the subcommand is malformed.
fn setting_action<'a, I>(mut words: I) -> Option<SettingAction>
where
    I: Iterator<Item = &'a str>,
{
    match (words.next(), words.next(), words.next()) {
        (None, ..) => Some(SettingAction::Show),
        (Some("reset"), None, _) => Some(SettingAction::Reset),
        (Some("set"), Some(value), None) => Some(SettingAction::Set(value.to_string())),
        _ => None,
    }
}

fn set_action(word: Option<&str>) -> Option<SetAction> {
    match word? {
        "add" => Some(SetAction::Add),
        "remove" => Some(SetAction::Remove),
        _ => None,
    }
}

fn one_arg<'a, I>(mut words: I, build: fn(String) -> Command, usage: &'static str) -> Command
where
    I: Iterator<Item = &'a str>,
{
    match (words.next(), words.next()) {
        (Some(arg), None) => build(mention_target(arg).to_string()),
        _ => Command::Usage(usage),
    }
}

/// Unwraps a platform mention such as `<@123>` or `<@!123>` to the bare id.
/// Anything else is returned unchanged.
pub fn mention_target(arg: &str) -> &str {
    arg.strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map(|id| id.strip_prefix('!').unwrap_or(id))
        .filter(|id| !id.is_empty())
        .unwrap_or(arg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_and_following_spaces() {
        assert_eq!(strip_prefix("~  help", "~"), Some("help"));
        assert_eq!(strip_prefix("!!prefix", "!!"), Some("prefix"));
        assert_eq!(strip_prefix("help", "~"), None);
    }

    #[test]
    fn ignores_unaddressed_and_unknown_text() {
        assert_eq!(parse("hello there", "~"), None);
        assert_eq!(parse("~", "~"), None);
        assert_eq!(parse("~dance", "~"), None);
    }

    #[test]
    fn parses_setting_commands() {
        assert_eq!(parse("~prefix", "~"), Some(Command::Prefix(SettingAction::Show)));
        assert_eq!(
            parse("~prefix set ?", "~"),
            Some(Command::Prefix(SettingAction::Set("?".into())))
        );
        assert_eq!(
            parse("~language reset", "~"),
            Some(Command::Language(SettingAction::Reset))
        );
        assert_eq!(
            parse("~prefix set", "~"),
            Some(Command::Usage("prefix [set <prefix>|reset]"))
        );
        assert_eq!(
            parse("~language set ja en", "~"),
            Some(Command::Usage("language [set <locale>|reset]"))
        );
    }

    #[test]
    fn parses_moderation_commands() {
        assert_eq!(parse("~warn <@!42>", "~"), Some(Command::Warn("42".into())));
        assert_eq!(parse("~pardon 42", "~"), Some(Command::Pardon("42".into())));
        assert_eq!(parse("~warns", "~"), Some(Command::Usage("warns <user>")));
        assert_eq!(
            parse("~role add mods", "~"),
            Some(Command::Role(SetAction::Add, "mods".into()))
        );
        assert_eq!(parse("~role drop mods", "~"), Some(Command::Usage("role add|remove <role>")));
        assert_eq!(parse("~modlog remove", "~"), Some(Command::ModLog(SetAction::Remove)));
        assert_eq!(parse("~modlogs", "~"), Some(Command::ModLogs));
    }

    #[test]
    fn tag_query_keeps_remaining_words() {
        assert_eq!(
            parse("~tag danbooru cat girl", "~"),
            Some(Command::Tag {
                site: "danbooru".into(),
                query: "cat girl".into()
            })
        );
        assert_eq!(parse("~tag danbooru", "~"), Some(Command::Usage("tag <site> <query>")));
    }

    #[test]
    fn mention_target_unwraps_mentions_only() {
        assert_eq!(mention_target("<@123>"), "123");
        assert_eq!(mention_target("<@!123>"), "123");
        assert_eq!(mention_target("123"), "123");
        assert_eq!(mention_target("<@>"), "<@>");
    }
}
