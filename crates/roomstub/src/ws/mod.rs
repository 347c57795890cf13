//! Connection listener for the playback server.
//!
//! Every path accepts a WebSocket upgrade; each connection gets its own
//! [`PlaybackEngine`](crate::playback::PlaybackEngine) over the shared playbook.

mod handler;

pub use handler::{WsState, router, ws_handler};
