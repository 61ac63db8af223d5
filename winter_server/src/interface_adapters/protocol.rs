// Line protocol shared by both transports: lobby commands in, broadcast lines out.

use crate::domain::{GameId, ShotError};
use std::fmt;

pub const LOBBY_START: &str = "New game is started. ID:";
pub const LOBBY_HELP: &str = "Use 'start {player} [ID]' command to start a new game. ID is optional, use it to join existing game.";
pub const LOBBY_UNKNOWN: &str = "Unknown lobby command, use 'help' to get list of available commands";

/// Commands understood while a session sits in the lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyCommand {
    // `start <name> [id]`; an id that does not parse is ignored.
    Start {
        name: String,
        game_id: Option<GameId>,
    },
    // `help`, and also a bare `start` with no name.
    Help,
    Unknown,
}

impl LobbyCommand {
    /// Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut args = line.split_ascii_whitespace();
        let command = match args.next()? {
            "start" => match args.next() {
                Some(name) => LobbyCommand::Start {
                    name: name.to_string(),
                    game_id: args.next().and_then(|id| id.parse().ok()),
                },
                None => LobbyCommand::Help,
            },
            "help" => LobbyCommand::Help,
            _ => LobbyCommand::Unknown,
        };
        Some(command)
    }
}

/// Every line the server writes to players. `Display` renders the wire text
/// without the trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Started { game_id: GameId },
    Help,
    UnknownCommand,
    Missed { player: String },
    Hit { player: String, target: &'static str },
    ReachedWall { target: &'static str },
    Walk { target: &'static str, x: u32, y: u32 },
    Rejected(ShotError),
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Started { game_id } => write!(f, "{LOBBY_START} {game_id}"),
            ServerMessage::Help => f.write_str(LOBBY_HELP),
            ServerMessage::UnknownCommand => f.write_str(LOBBY_UNKNOWN),
            ServerMessage::Missed { player } => write!(f, "BOOM {player} 0"),
            ServerMessage::Hit { player, target } => write!(f, "BOOM {player} 1 {target}"),
            ServerMessage::ReachedWall { target } => write!(f, "BOOM {target} reached the wall"),
            ServerMessage::Walk { target, x, y } => write!(f, "WALK {target} {x} {y}"),
            ServerMessage::Rejected(err) => write!(f, "{err}"),
        }
    }
}

impl ServerMessage {
    /// Wire form including the line terminator.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}
