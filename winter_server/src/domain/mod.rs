// Domain layer: game rules and the stream ports the session engine is built on.

pub mod ids;
pub mod ports;
pub mod shot;
pub mod target;

pub use ids::{GameId, PlayerId};
pub use ports::{ReadChunk, StreamReader, StreamWriter};
pub use shot::{ShotError, parse_shot, resolve_shot};
pub use target::{Step, TARGET_NAME, Target};
