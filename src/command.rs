use anyhow::{bail, Context, Result};

/// 下書きに対する変更内容。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DraftField {
    Activity(String),
    Description(Option<String>),
    Elapsed(u64),
    Tags(Vec<String>),
}

/// 対話セッションで受け付けるコマンド。
///
/// 履歴の位置は入力上1始まりで、ここでは0始まりに変換して保持する。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Stop,
    Activity(String),
    Describe(Option<String>),
    Tag(String),
    Untag(String),
    Status,
    History,
    Again(usize),
    Edit(usize),
    Set(DraftField),
    Save,
    Cancel,
    Profile,
    SignIn { email: String, password: String },
    SignUp { name: String, email: String, password: String },
    SignOut,
    Help,
    Quit,
}

pub const HELP: &str = "\
start | pause | stop            control the timer
activity <name>                 set the activity
desc [text]                     set or clear the description
tag <tag> | untag <tag>         add or remove a tag
status                          show the timer
history                         list recorded entries
again <n>                       track again from entry n
edit <n>                        edit entry n
set activity|desc|elapsed|tags  change the entry being edited
save | cancel                   finish editing
profile                         show the account dialog
signin <email> <password>       sign in
signup <name> <email> <password>
signout                         sign out
help | quit";

/// 1行の入力をコマンドに変換する。
///
/// 空行の場合は`None`を返す。
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "pause" => Command::Pause,
        "stop" => Command::Stop,
        "activity" => Command::Activity(required(rest, "activity")?.to_string()),
        "desc" => Command::Describe(optional(rest)),
        "tag" => Command::Tag(required(rest, "tag")?.to_string()),
        "untag" => Command::Untag(required(rest, "untag")?.to_string()),
        "status" => Command::Status,
        "history" => Command::History,
        "again" => Command::Again(parse_position(rest)?),
        "edit" => Command::Edit(parse_position(rest)?),
        "set" => Command::Set(parse_field(rest)?),
        "save" => Command::Save,
        "cancel" => Command::Cancel,
        "profile" => Command::Profile,
        "signin" => {
            let [email, password] = words::<2>(rest, "signin <email> <password>")?;
            Command::SignIn { email, password }
        }
        "signup" => {
            let [name, email, password] = words::<3>(rest, "signup <name> <email> <password>")?;
            Command::SignUp {
                name,
                email,
                password,
            }
        }
        "signout" => Command::SignOut,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("Unknown command: {}", other),
    };

    Ok(Some(command))
}

fn required<'a>(rest: &'a str, command: &str) -> Result<&'a str> {
    if rest.is_empty() {
        bail!("Usage: {} <value>", command);
    }
    Ok(rest)
}

fn optional(rest: &str) -> Option<String> {
    Some(rest).filter(|r| !r.is_empty()).map(str::to_string)
}

fn parse_position(rest: &str) -> Result<usize> {
    let position: usize = rest
        .parse()
        .with_context(|| format!("Invalid entry number: {:?}", rest))?;
    position
        .checked_sub(1)
        .context("Entry numbers start at 1")
}

fn parse_field(rest: &str) -> Result<DraftField> {
    let (field, value) = match rest.split_once(char::is_whitespace) {
        Some((field, value)) => (field, value.trim()),
        None => (rest, ""),
    };

    let field = match field {
        "activity" => DraftField::Activity(required(value, "set activity")?.to_string()),
        "desc" => DraftField::Description(optional(value)),
        "elapsed" => DraftField::Elapsed(
            value
                .parse()
                .with_context(|| format!("Invalid elapsed seconds: {:?}", value))?,
        ),
        "tags" => DraftField::Tags(
            value
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        other => bail!("Unknown field: {:?}", other),
    };

    Ok(field)
}

fn words<const N: usize>(rest: &str, usage: &str) -> Result<[String; N]> {
    let words: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
    words
        .try_into()
        .map_err(|_| anyhow::anyhow!("Usage: {}", usage))
}
