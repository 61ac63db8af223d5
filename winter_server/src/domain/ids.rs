use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Identifier players exchange as text to join a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameId(Uuid);

impl GameId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for GameId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Process-unique identifier for one connected player.
///
/// Allocated from a monotonically increasing counter, so two connections
/// accepted in the same instant still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(u64);

impl PlayerId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_id_round_trips_through_text() {
        let id = GameId::new();
        let parsed: GameId = id.to_string().parse().expect("generated id should parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn game_id_rejects_garbage() {
        assert!("not-a-game".parse::<GameId>().is_err());
        assert!("".parse::<GameId>().is_err());
    }

    #[test]
    fn player_ids_are_unique_and_increasing() {
        let first = PlayerId::next();
        let second = PlayerId::next();
        assert!(second > first);
    }
}
