//! Command-line argument parsing.

use anyhow::{anyhow, bail, Result};

/// `tertulia <uid> <command> [args...]`
#[derive(Debug, PartialEq, Eq)]
pub struct Invocation {
    pub uid: String,
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Sign in, setting the display name.
    Register { display_name: String },
    /// Conversation list, newest first.
    Chats,
    /// Find a user by name prefix.
    Search { prefix: String },
    /// Print the conversation with the first user matching `prefix`.
    Read { prefix: String },
    /// Send `text` to the first user matching `prefix`.
    Send { prefix: String, text: String },
    /// Create a group with the first match of every prefix.
    Group { name: String, members: Vec<String> },
    /// Suggested people, most shared interests first.
    Discover,
    /// Toggle light/dark.
    Theme,
}

pub const USAGE: &str = "\
Usage: tertulia <uid> <command> [args...]

Commands:
  register <display name>       Sign in and set the display name
  chats                         List conversations
  search <prefix>               Find a user by name prefix
  read <prefix>                 Show the conversation with a user
  send <prefix> <text...>       Send a text message
  group <name> <prefix>...      Create a group
  discover                      Suggest people to talk to
  theme                         Toggle light/dark theme";

pub fn parse(args: &[String]) -> Result<Invocation> {
    let [uid, command, rest @ ..] = args else {
        bail!("missing uid or command");
    };

    let joined = || rest.join(" ");
    let first = || {
        rest.first()
            .cloned()
            .ok_or_else(|| anyhow!("{command} requires an argument"))
    };

    let command = match command.as_str() {
        "register" => {
            let display_name = joined();
            if display_name.trim().is_empty() {
                bail!("register requires a display name");
            }
            Command::Register { display_name }
        }
        "chats" => Command::Chats,
        "search" => Command::Search { prefix: first()? },
        "read" => Command::Read { prefix: first()? },
        "send" => {
            let prefix = first()?;
            let text = rest[1..].join(" ");
            Command::Send { prefix, text }
        }
        "group" => {
            let name = first()?;
            let members = rest[1..].to_vec();
            if members.is_empty() {
                bail!("group requires at least one member");
            }
            Command::Group { name, members }
        }
        "discover" => Command::Discover,
        "theme" => Command::Theme,
        other => bail!("unknown command: {other}"),
    };

    Ok(Invocation {
        uid: uid.clone(),
        command,
    })
}
