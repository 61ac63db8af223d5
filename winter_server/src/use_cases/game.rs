// Shared state for one round. Joined sessions reach the host through the
// game's relay channel.

use super::types::Command;
use crate::domain::{GameId, PlayerId, StreamWriter};
use crate::interface_adapters::protocol::ServerMessage;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, Notify, RwLock, mpsc};
use tracing::debug;

pub const DEFAULT_PLAYER_NAME: &str = "Jon Snow";

/// A connected player. The outbox is the player's own stream; every game the
/// player takes part in writes its broadcasts there.
pub struct Player {
    pub id: PlayerId,
    name: RwLock<String>,
    outbox: Mutex<Box<dyn StreamWriter>>,
}

impl Player {
    pub fn new(id: PlayerId, outbox: Box<dyn StreamWriter>) -> Self {
        Self {
            id,
            name: RwLock::new(DEFAULT_PLAYER_NAME.to_string()),
            outbox: Mutex::new(outbox),
        }
    }

    pub async fn name(&self) -> String {
        self.name.read().await.clone()
    }

    pub async fn rename(&self, name: impl Into<String>) {
        *self.name.write().await = name.into();
    }

    pub async fn send(&self, msg: &ServerMessage) -> io::Result<()> {
        self.send_line(msg.to_line().as_bytes()).await
    }

    async fn send_line(&self, line: &[u8]) -> io::Result<()> {
        self.outbox.lock().await.write(line).await
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

struct Roster {
    players: HashMap<PlayerId, Arc<Player>>,
}

pub struct Game {
    id: GameId,
    roster: RwLock<Roster>,
    // Only flipped while the roster write lock is held, but readable without
    // it so lookups never wait behind a broadcast.
    active: AtomicBool,
    relay_tx: mpsc::UnboundedSender<Command>,
    finished: Notify,
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Creates an active game with `host` as its first player. The receiver
    /// carries commands relayed from sessions that join later; only the
    /// host's gameplay loop reads it.
    pub fn new(id: GameId, host: Arc<Player>) -> (Arc<Self>, mpsc::UnboundedReceiver<Command>) {
        let (relay_tx, relay_rx) = mpsc::unbounded_channel();
        let game = Arc::new(Self {
            id,
            roster: RwLock::new(Roster {
                players: HashMap::from([(host.id, host)]),
            }),
            active: AtomicBool::new(true),
            relay_tx,
            finished: Notify::new(),
        });
        (game, relay_rx)
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub async fn player_count(&self) -> usize {
        self.roster.read().await.players.len()
    }

    /// Adds a player to a running game. Returns false once the game finished.
    pub async fn add_player(&self, player: Arc<Player>) -> bool {
        let mut roster = self.roster.write().await;
        if !self.is_active() {
            return false;
        }
        roster.players.insert(player.id, player);
        true
    }

    pub async fn remove_player(&self, id: PlayerId) -> bool {
        self.roster.write().await.players.remove(&id).is_some()
    }

    /// Queues a command for the host's gameplay loop. Returns false when
    /// nobody is reading any more.
    pub fn relay(&self, command: Command) -> bool {
        self.relay_tx.send(command).is_ok()
    }

    /// Flips the game to inactive. Only the first call returns true.
    pub async fn finish(&self) -> bool {
        {
            let _roster = self.roster.write().await;
            if !self.active.swap(false, Ordering::AcqRel) {
                return false;
            }
        }
        self.finished.notify_waiters();
        true
    }

    /// Resolves once the game is no longer active.
    pub async fn finished(&self) {
        let notified = self.finished.notified();
        tokio::pin!(notified);
        // Register interest before checking the flag so a concurrent
        // `finish` cannot slip between the two.
        notified.as_mut().enable();
        if !self.is_active() {
            return;
        }
        notified.await;
    }

    /// Writes `msg` to every player currently in the game. A failed write
    /// only affects that player.
    pub async fn broadcast(&self, msg: &ServerMessage) {
        let line = msg.to_line();
        let roster = self.roster.read().await;
        for player in roster.players.values() {
            if let Err(e) = player.send_line(line.as_bytes()).await {
                debug!(game_id = %self.id, player_id = %player.id, error = %e, "broadcast write failed");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Writer that records every line sent to it.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingWriter {
        pub lines: Arc<StdMutex<Vec<String>>>,
    }

    impl RecordingWriter {
        pub(crate) fn lines(&self) -> Vec<String> {
            self.lines.lock().expect("lines mutex poisoned").clone()
        }
    }

    #[async_trait]
    impl StreamWriter for RecordingWriter {
        async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
            let line = String::from_utf8_lossy(buf).trim_end().to_string();
            self.lines.lock().expect("lines mutex poisoned").push(line);
            Ok(())
        }
    }

    pub(crate) fn recording_player() -> (Arc<Player>, RecordingWriter) {
        let writer = RecordingWriter::default();
        let player = Arc::new(Player::new(PlayerId::next(), Box::new(writer.clone())));
        (player, writer)
    }
}
