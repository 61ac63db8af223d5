// One connection's session: drives its stream through the lobby and gameplay
// states until the stream closes.

use super::game::{Game, Player};
use super::registry::GameRegistry;
use super::types::{Command, SessionSettings};
use crate::domain::{PlayerId, StreamReader, StreamWriter, Target};
use crate::interface_adapters::protocol::ServerMessage;
use crate::interface_adapters::transport::Connection;
use crate::interface_adapters::transport::lines::LineAssembler;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info};

/// A game this session hosts, ready for the gameplay loop.
#[derive(Debug)]
pub struct Round {
    pub game: Arc<Game>,
    pub relayed: mpsc::UnboundedReceiver<Command>,
    pub target: Target,
}

#[derive(Debug)]
pub enum LobbyOutcome {
    /// A new game was registered; this session runs its gameplay.
    Host(Round),
    /// The input stream closed while in the lobby.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEnd {
    /// The target was hit or escaped; go back to the lobby.
    Finished,
    /// The input stream closed mid-round.
    Closed,
}

pub struct Session {
    pub(crate) player: Arc<Player>,
    // Raw lines from this session's own stream.
    pub(crate) input: mpsc::Receiver<String>,
    pub(crate) registry: Arc<GameRegistry>,
    pub(crate) settings: SessionSettings,
    pub(crate) rng: StdRng,
    reader_task: JoinHandle<()>,
}

impl Session {
    pub fn start(
        connection: Connection,
        registry: Arc<GameRegistry>,
        settings: SessionSettings,
    ) -> Self {
        Self::from_parts(connection.reader, connection.writer, registry, settings)
    }

    /// Builds a session over raw stream halves and spawns its input reader.
    pub fn from_parts(
        reader: Box<dyn StreamReader>,
        writer: Box<dyn StreamWriter>,
        registry: Arc<GameRegistry>,
        settings: SessionSettings,
    ) -> Self {
        let player = Arc::new(Player::new(PlayerId::next(), writer));
        let (input_tx, input) = mpsc::channel(settings.input_channel_capacity.max(1));
        let reader_task = tokio::spawn(
            read_lines(reader, input_tx, settings.read_buffer_size.max(1)).in_current_span(),
        );

        Self {
            player,
            input,
            registry,
            settings,
            rng: StdRng::from_entropy(),
            reader_task,
        }
    }

    /// Replaces the session's random source, for reproducible target motion.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn player_id(&self) -> PlayerId {
        self.player.id
    }

    /// Runs lobby and gameplay rounds until the stream closes.
    pub async fn run(mut self) {
        info!(player_id = %self.player.id, "session started");
        loop {
            match self.lobby().await {
                LobbyOutcome::Host(round) => {
                    if self.gameplay(round).await == RoundEnd::Closed {
                        break;
                    }
                }
                LobbyOutcome::Closed => break,
            }
        }
        info!(player_id = %self.player.id, "session ended");
    }

    /// Tags a raw line with the player's current display name.
    pub(crate) async fn command(&self, line: String) -> Command {
        Command {
            line,
            player_name: self.player.name().await,
        }
    }

    /// Writes a line to this session's own stream only.
    pub(crate) async fn reply(&self, msg: &ServerMessage) {
        if let Err(e) = self.player.send(msg).await {
            debug!(player_id = %self.player.id, error = %e, "reply write failed");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

/// Background reader: turns transport chunks into lines until the stream
/// ends or the session stops listening. Dropping `input_tx` on return is
/// what tells the session its stream closed.
async fn read_lines(
    mut reader: Box<dyn StreamReader>,
    input_tx: mpsc::Sender<String>,
    buffer_size: usize,
) {
    let mut buf = vec![0u8; buffer_size];
    let mut lines = LineAssembler::new();

    loop {
        let chunk = match reader.read(&mut buf).await {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!(error = %e, "stream read failed");
                break;
            }
        };

        let mut complete = lines.push(&buf[..chunk.len]);
        if chunk.eof {
            complete.extend(lines.finish());
        }
        for line in complete {
            if input_tx.send(line).await.is_err() {
                return;
            }
        }
        if chunk.eof {
            break;
        }
    }
    debug!("input stream closed");
}
