// Network adapters: listeners that feed decoded connections to the server.

pub mod source;

pub use source::{OverflowPolicy, SourceSettings, listen, serve};
