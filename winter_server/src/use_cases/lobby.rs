// Lobby state: a session either hosts a new game or joins a running one.

use super::game::Game;
use super::registry::Registration;
use super::session::{LobbyOutcome, Round, Session};
use crate::domain::{GameId, Target};
use crate::interface_adapters::protocol::{LobbyCommand, ServerMessage};
use std::sync::Arc;
use tracing::{debug, info};

impl Session {
    /// Handles lobby commands until the session hosts a game or its stream
    /// closes. Joining someone else's game happens inside this state; once
    /// that game finishes the session is back in the lobby.
    pub async fn lobby(&mut self) -> LobbyOutcome {
        let mut game_id = GameId::new();
        let mut target = Target::spawn(self.settings.height, &mut self.rng);

        while let Some(line) = self.input.recv().await {
            let Some(command) = LobbyCommand::parse(&line) else {
                continue;
            };

            match command {
                LobbyCommand::Start { name, game_id: requested } => {
                    self.player.rename(name).await;
                    if let Some(requested) = requested {
                        game_id = requested;
                    }

                    let (game, relayed) = Game::new(game_id, self.player.clone());
                    // Retried when the game found under the id finished
                    // before this session could join it.
                    loop {
                        match self.registry.join_or_register(game.clone()).await {
                            Registration::Registered => {
                                info!(player_id = %self.player.id, %game_id, "game started");
                                game.broadcast(&ServerMessage::Started { game_id }).await;
                                return LobbyOutcome::Host(Round {
                                    game,
                                    relayed,
                                    target,
                                });
                            }
                            Registration::Existing(existing) => match self.join(existing).await {
                                Relay::TooLate => continue,
                                Relay::Finished => break,
                                Relay::Closed => return LobbyOutcome::Closed,
                            },
                        }
                    }
                    game_id = GameId::new();
                    target = Target::spawn(self.settings.height, &mut self.rng);
                }
                LobbyCommand::Help => self.reply(&ServerMessage::Help).await,
                LobbyCommand::Unknown => self.reply(&ServerMessage::UnknownCommand).await,
            }
        }

        LobbyOutcome::Closed
    }

    /// Plays in another session's game by relaying this session's commands
    /// to its host until the game finishes or this session's stream closes.
    pub(crate) async fn join(&mut self, game: Arc<Game>) -> Relay {
        let game_id = game.id();
        if !game.add_player(self.player.clone()).await {
            return Relay::TooLate;
        }
        let players = game.player_count().await;
        info!(
            player_id = %self.player.id,
            %game_id,
            players,
            "joined game"
        );

        let end = loop {
            tokio::select! {
                // A line that arrives as the game ends belongs to the lobby.
                biased;
                _ = game.finished() => break Relay::Finished,
                line = self.input.recv() => match line {
                    Some(line) => {
                        let command = self.command(line).await;
                        if !game.relay(command) {
                            debug!(%game_id, "host stopped reading relayed commands");
                        }
                    }
                    None => break Relay::Closed,
                },
            }
        };

        game.remove_player(self.player.id).await;
        debug!(player_id = %self.player.id, %game_id, ?end, "left game");
        end
    }
}

/// How a join relay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relay {
    /// The game had already finished; nothing was relayed.
    TooLate,
    /// The game finished while this session played in it.
    Finished,
    /// This session's stream closed.
    Closed,
}
