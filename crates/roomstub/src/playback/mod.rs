//! WebSocket playback: the engine and the transport it drives.

mod engine;
mod transport;

pub use engine::{InboundMessage, MatchPolicy, PlaybackEngine, PlaybackState, SessionReport};
pub use transport::{InboundFrame, SessionTransport};
