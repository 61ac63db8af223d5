// Gameplay state for the hosting session: resolve shots and move the target
// on every tick until someone hits it or it escapes.

use super::game::Game;
use super::session::{Round, RoundEnd, Session};
use super::types::Command;
use crate::domain::{ShotError, Step, Target, resolve_shot};
use crate::interface_adapters::protocol::ServerMessage;
use std::sync::Arc;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info};

impl Session {
    /// Runs one hosted game. Commands come from this session's own stream
    /// and from every session that joined; the target moves on each tick.
    pub async fn gameplay(&mut self, round: Round) -> RoundEnd {
        let Round {
            game,
            mut relayed,
            mut target,
        } = round;
        let step = self.settings.step_interval;
        let mut ticker = interval_at(Instant::now() + step, step);

        while game.is_active() {
            tokio::select! {
                line = self.input.recv() => match line {
                    Some(line) => {
                        let command = self.command(line).await;
                        self.take_shot(&game, &target, command).await;
                    }
                    None => {
                        // Nobody is left to drive the game.
                        self.end_round(&game).await;
                        return RoundEnd::Closed;
                    }
                },
                Some(command) = relayed.recv() => {
                    self.take_shot(&game, &target, command).await;
                }
                _ = ticker.tick() => {
                    match target.advance(self.settings.width, self.settings.height, &mut self.rng) {
                        Step::ReachedWall => {
                            game.broadcast(&ServerMessage::ReachedWall { target: target.name }).await;
                            self.end_round(&game).await;
                        }
                        Step::Walked => {
                            game.broadcast(&ServerMessage::Walk {
                                target: target.name,
                                x: target.x,
                                y: target.y,
                            })
                            .await;
                        }
                    }
                }
            }
        }

        RoundEnd::Finished
    }

    async fn take_shot(&self, game: &Arc<Game>, target: &Target, command: Command) {
        let Command { line, player_name } = command;

        match resolve_shot(target, &line) {
            Ok(()) => {
                info!(game_id = %game.id(), player = %player_name, "target hit");
                game.broadcast(&ServerMessage::Hit {
                    player: player_name,
                    target: target.name,
                })
                .await;
                self.end_round(game).await;
            }
            Err(ShotError::Missed) => {
                game.broadcast(&ServerMessage::Missed {
                    player: player_name,
                })
                .await;
            }
            Err(e) => {
                debug!(game_id = %game.id(), line = %line, error = %e, "shot rejected");
                game.broadcast(&ServerMessage::Rejected(e)).await;
            }
        }
    }

    /// Finishes the game and withdraws it from the registry. Safe to call
    /// more than once; only the first call does anything.
    async fn end_round(&self, game: &Arc<Game>) {
        if game.finish().await {
            self.registry.remove(game).await;
            info!(game_id = %game.id(), "game finished");
        }
    }
}
