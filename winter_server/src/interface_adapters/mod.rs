// Interface adapters: wire protocol, transport codecs and listeners.

pub mod net;
pub mod protocol;
pub mod transport;
