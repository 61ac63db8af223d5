// Matchmaking table: lets a second session find a running game by its id.

use super::game::Game;
use crate::domain::GameId;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("game {0} is already registered")]
    AlreadyRegistered(GameId),
}

/// Outcome of publishing a game under its id.
#[derive(Debug)]
pub enum Registration {
    /// The game is now the one joinable under its id.
    Registered,
    /// Another active game already owns the id; join it instead.
    Existing(Arc<Game>),
}

/// Thread-safe map of game id to the game currently accepting joins.
///
/// The first active game stored under an id keeps it until it finishes;
/// later starters get [`Registration::Existing`] back rather than replacing
/// it. A finished game still sitting under its id is replaced.
#[derive(Debug, Default)]
pub struct GameRegistry {
    games: RwLock<HashMap<GameId, Arc<Game>>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the game registered under `id`, if any.
    pub async fn get(&self, id: &GameId) -> Option<Arc<Game>> {
        self.games.read().await.get(id).cloned()
    }

    /// Stores `game` unless an active game already owns its id.
    pub async fn register(&self, game: Arc<Game>) -> Result<(), RegistryError> {
        match self.join_or_register(game).await {
            Registration::Registered => Ok(()),
            Registration::Existing(existing) => {
                Err(RegistryError::AlreadyRegistered(existing.id()))
            }
        }
    }

    /// Atomic load-or-create: either publishes `game` or hands back the
    /// active game that already owns the id.
    pub async fn join_or_register(&self, game: Arc<Game>) -> Registration {
        // Joiners usually find a running game under a read lock.
        if let Some(existing) = self.get(&game.id()).await.filter(|g| g.is_active()) {
            return Registration::Existing(existing);
        }

        let mut games = self.games.write().await;
        if let Some(existing) = games.get(&game.id()) {
            if existing.is_active() {
                return Registration::Existing(existing.clone());
            }
        }
        games.insert(game.id(), game);
        Registration::Registered
    }

    /// Removes `game` if it is still the entry under its id. A newer game
    /// registered under the same id is left alone.
    pub async fn remove(&self, game: &Arc<Game>) -> bool {
        let mut games = self.games.write().await;
        match games.get(&game.id()) {
            Some(current) if Arc::ptr_eq(current, game) => {
                games.remove(&game.id());
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.games.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.games.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlayerId, StreamWriter};
    use crate::interface_adapters::protocol::ServerMessage;
    use crate::use_cases::game::Player;
    use crate::use_cases::game::test_support::recording_player;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Writer for a client that never drains its socket.
    struct StalledWriter;

    #[async_trait]
    impl StreamWriter for StalledWriter {
        async fn write(&mut self, _buf: &[u8]) -> std::io::Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn first_game_under_an_id_wins() {
        let registry = GameRegistry::new();
        let id = GameId::new();
        let (first, _) = Game::new(id, recording_player().0);
        let (second, _) = Game::new(id, recording_player().0);

        assert!(matches!(
            registry.join_or_register(first.clone()).await,
            Registration::Registered
        ));
        match registry.join_or_register(second).await {
            Registration::Existing(existing) => assert!(Arc::ptr_eq(&existing, &first)),
            Registration::Registered => panic!("second game must not replace the first"),
        }
        assert_eq!(registry.len().await, 1);
        assert_eq!(
            registry.register(Game::new(id, recording_player().0).0).await,
            Err(RegistryError::AlreadyRegistered(id))
        );
    }

    #[tokio::test]
    async fn distinct_ids_coexist() {
        let registry = GameRegistry::new();
        let (a, _) = Game::new(GameId::new(), recording_player().0);
        let (b, _) = Game::new(GameId::new(), recording_player().0);

        registry.register(a.clone()).await.expect("register a");
        registry.register(b.clone()).await.expect("register b");

        assert_eq!(registry.len().await, 2);
        assert!(registry.get(&a.id()).await.is_some());
        assert!(registry.get(&b.id()).await.is_some());
    }

    #[tokio::test]
    async fn finished_game_is_replaced() {
        let registry = GameRegistry::new();
        let id = GameId::new();
        let (stale, _) = Game::new(id, recording_player().0);
        registry.register(stale.clone()).await.expect("register stale");
        stale.finish().await;

        let (fresh, _) = Game::new(id, recording_player().0);
        registry.register(fresh.clone()).await.expect("replace stale");

        let current = registry.get(&id).await.expect("fresh registered");
        assert!(Arc::ptr_eq(&current, &fresh));

        // The stale game's cleanup must not evict its replacement.
        assert!(!registry.remove(&stale).await);
        assert!(registry.remove(&fresh).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_starters_share_one_game() {
        let registry = Arc::new(GameRegistry::new());
        let id = GameId::new();

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let (game, _) = Game::new(id, recording_player().0);
                matches!(
                    registry.join_or_register(game).await,
                    Registration::Registered
                )
            }));
        }

        let mut registered = 0;
        for task in tasks {
            if task.await.expect("task") {
                registered += 1;
            }
        }
        assert_eq!(registered, 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn stalled_game_does_not_block_other_games() {
        let registry = Arc::new(GameRegistry::new());
        let stalled_host = Arc::new(Player::new(PlayerId::next(), Box::new(StalledWriter)));
        let (guest, _) = recording_player();
        let (stalled, _) = Game::new(GameId::new(), stalled_host);
        assert!(stalled.add_player(guest.clone()).await);
        registry.register(stalled.clone()).await.expect("register stalled");

        // A broadcast stuck on the slow client holds the roster read lock,
        // and a queued roster writer waits behind it.
        let broadcasting = {
            let stalled = stalled.clone();
            tokio::spawn(async move {
                stalled
                    .broadcast(&ServerMessage::Missed {
                        player: "arya".to_string(),
                    })
                    .await
            })
        };
        let leaving = {
            let stalled = stalled.clone();
            tokio::spawn(async move { stalled.remove_player(guest.id).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let (same_id, _) = Game::new(stalled.id(), recording_player().0);
        let joined = tokio::time::timeout(Duration::from_secs(2), registry.join_or_register(same_id))
            .await
            .expect("lookup of the stalled game returns");
        assert!(matches!(joined, Registration::Existing(_)));

        let (other, _) = Game::new(GameId::new(), recording_player().0);
        let started = tokio::time::timeout(Duration::from_secs(2), registry.join_or_register(other.clone()))
            .await
            .expect("unrelated start completes");
        assert!(matches!(started, Registration::Registered));
        assert!(
            tokio::time::timeout(Duration::from_secs(2), registry.remove(&other))
                .await
                .expect("unrelated removal completes")
        );

        broadcasting.abort();
        leaving.abort();
    }
}
