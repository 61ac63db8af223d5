// Use cases layer: sessions, games and the registry that connects them.

pub mod game;
pub mod gameplay;
pub mod lobby;
pub mod registry;
pub mod session;
pub mod types;

pub use game::{DEFAULT_PLAYER_NAME, Game, Player};
pub use registry::{GameRegistry, Registration, RegistryError};
pub use session::{LobbyOutcome, Round, RoundEnd, Session};
pub use types::{Command, SessionSettings};
