//! Roomstub: a scripted stand-in for a chat room service.
//!
//! A WebSocket server replays a fixed playbook to each client (scripted
//! request/response pairs, then timed unsolicited pushes) and a companion
//! HTTP server returns a fixed JSON document from the rooms endpoint.

pub mod config;
pub mod error;
pub mod http;
pub mod playback;
pub mod playbook;
pub mod server;
pub mod ws;

pub use config::AppConfig;
pub use error::{FixtureLoadError, ProtocolDecodeError, ServerError, SessionAbortedError, SessionError};
pub use playback::{MatchPolicy, PlaybackEngine, PlaybackState, SessionReport};
pub use playbook::{HttpFixture, InteractionEntry, Playbook, TimedPushEntry};
pub use server::{HttpServer, ServerHandle, WsServer};
