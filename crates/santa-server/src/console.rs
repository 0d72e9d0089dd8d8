//! Line-oriented console front end.
//!
//! Each input line is `<user-id> /<command> [args]`, standing in for a chat
//! message from that user. Replies and deliveries are rendered back as
//! plain text.

use santa_core::UserId;

use crate::{
    coordinator::{BotAction, Command, Delivery, ProfileView, Reply},
    registry::{ProfileField, Registration},
    relay::Direction,
};

/// Errors while parsing a console line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Line has no user id
    #[error("expected `<user-id> /<command>`")]
    MissingUser,

    /// User id is not a number
    #[error("invalid user id: {0}")]
    InvalidUser(String),

    /// No `/command` after the user id
    #[error("missing command")]
    MissingCommand,

    /// Command word not recognized
    #[error("unknown command: /{0}")]
    UnknownCommand(String),

    /// Command arguments malformed
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one console line into a sender and command.
pub fn parse_line(line: &str) -> Result<(UserId, Command), ParseError> {
    let line = line.trim();
    let (user, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    if user.is_empty() {
        return Err(ParseError::MissingUser);
    }
    let user: UserId = user.parse().map_err(|_| ParseError::InvalidUser(user.to_string()))?;

    let rest = rest.trim_start();
    let Some(rest) = rest.strip_prefix('/') else {
        return Err(ParseError::MissingCommand);
    };
    let (word, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();

    Ok((user, parse_command(&word.to_lowercase(), args)?))
}

fn parse_command(word: &str, args: &str) -> Result<Command, ParseError> {
    let command = match word {
        "start" | "help" => Command::Help,
        "register" => Command::Register(parse_registration(args)),
        "myinfo" => Command::MyInfo,
        "recipientinfo" => Command::RecipientInfo,
        "updatewishes" => profile(ProfileField::Wishes, args),
        "update_destination" => profile(ProfileField::Address, args),
        "updatephone" => profile(ProfileField::Phone, args),
        "blacklist" => parse_blacklist(args)?,
        "message" => parse_message(args)?,
        "shuffle" => Command::Shuffle,
        "sendinfo" => Command::SendInfo,
        "participants" => Command::Participants,
        "stats" => Command::Stats,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(command)
}

/// `[@username] [first [last]]`
fn parse_registration(args: &str) -> Registration {
    let mut words = args.split_whitespace().peekable();
    let username =
        words.next_if(|w| w.starts_with('@')).map(|w| w.trim_start_matches('@').to_string());
    let first_name = words.next().map(str::to_string);
    let rest: Vec<_> = words.collect();
    let last_name = (!rest.is_empty()).then(|| rest.join(" "));
    Registration { username, first_name, last_name }
}

fn profile(field: ProfileField, args: &str) -> Command {
    Command::UpdateProfile { field, value: args.to_string() }
}

fn parse_blacklist(args: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "/blacklist add @user | /blacklist remove @user | /blacklist list";

    let mut words = args.split_whitespace();
    let command = match (words.next(), words.next(), words.next()) {
        (Some("list"), None, None) => Command::ListExclusions,
        (Some("add"), Some(user), None) => Command::Exclude { username: user.to_string() },
        (Some("remove"), Some(user), None) => Command::Unexclude { username: user.to_string() },
        _ => return Err(ParseError::Usage(USAGE)),
    };
    Ok(command)
}

fn parse_message(args: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "/message recipient <text> | /message sender <text>";

    let (target, text) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
    let direction = match target.to_lowercase().as_str() {
        "recipient" | "получатель" => Direction::ToRecipient,
        "sender" | "отправитель" => Direction::ToGifter,
        _ => return Err(ParseError::Usage(USAGE)),
    };
    Ok(Command::Message { direction, text: text.to_string() })
}

/// Render an action as `(receiver, text)`. Returns `None` for actions with
/// nothing to show.
pub fn render_action(action: &BotAction) -> Option<(UserId, String)> {
    match action {
        BotAction::Reply { to, reply } => Some((*to, render_reply(reply))),
        BotAction::Deliver { to, delivery } => Some((*to, render_delivery(delivery))),
        BotAction::PersistState => None,
    }
}

fn render_profile(view: &ProfileView) -> String {
    let or_unset = |v: &Option<String>| v.clone().unwrap_or_else(|| "not set".to_string());
    format!(
        "{}\n  wishes: {}\n  address: {}\n  phone: {}",
        view.name,
        or_unset(&view.wishes),
        or_unset(&view.address),
        or_unset(&view.phone)
    )
}

fn render_list(title: &str, names: &[String]) -> String {
    if names.is_empty() {
        return format!("{title}: none");
    }
    let mut out = format!("{title}:");
    for name in names {
        out.push_str("\n  ");
        out.push_str(name);
    }
    out
}

/// Text for a reply.
pub fn render_reply(reply: &Reply) -> String {
    match reply {
        Reply::Help { is_admin } => {
            let mut text = String::from(
                "/help /register /myinfo /recipientinfo /updatewishes /update_destination \
                 /updatephone /blacklist /message",
            );
            if *is_admin {
                text.push_str("\nadmin: /shuffle /sendinfo /participants /stats");
            }
            text
        },
        Reply::Registered => "You are registered for the gift exchange.".to_string(),
        Reply::MyInfo { profile, exclusions } => {
            format!("{}\n{}", render_profile(profile), render_list("excluded", exclusions))
        },
        Reply::RecipientInfo(view) => format!("You are gifting to {}", render_profile(view)),
        Reply::ProfileUpdated(field) => format!("Saved your {field}."),
        Reply::ExclusionAdded { name } => format!("{name} added to your exclusions."),
        Reply::ExclusionRemoved { name } => format!("{name} removed from your exclusions."),
        Reply::Exclusions(names) => render_list("excluded", names),
        Reply::MessageSent => "Message sent anonymously.".to_string(),
        Reply::ShuffleCommitted { assigned, attempts } => {
            format!("Shuffle complete: {assigned} assignments after {attempts} attempt(s).")
        },
        Reply::InfoSent { queued, skipped } => {
            format!("Recipient info sent to {queued} gifters ({skipped} skipped).")
        },
        Reply::Participants(names) => render_list("participants", names),
        Reply::Stats { participants, shuffled, assignments } => format!(
            "participants: {participants}\nshuffled: {}\nassignments: {assignments}",
            if *shuffled { "yes" } else { "no" }
        ),
    }
}

/// Text for a delivery.
pub fn render_delivery(delivery: &Delivery) -> String {
    match delivery {
        Delivery::Anonymous { from_gifter: true, text } => {
            format!("Message from your Secret Santa: {text}")
        },
        Delivery::Anonymous { from_gifter: false, text } => {
            format!("Message from your recipient: {text}")
        },
        Delivery::RecipientInfo(view) => format!("You are gifting to {}", render_profile(view)),
    }
}
