//! Error types for fixture loading, playback sessions and server lifecycle.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed transport error, produced by [`crate::playback::SessionTransport`] implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A fixture could not be turned into an in-memory form.
///
/// Fatal at startup: a server whose fixture fails to load never binds.
#[derive(Debug, Error)]
pub enum FixtureLoadError {
    #[error("fixture not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read fixture {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid fixture {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("room_msgs[{index}] has invalid timing {timing}: must be a finite, non-negative number of seconds")]
    InvalidTiming { index: usize, timing: f64 },
}

impl FixtureLoadError {
    pub(crate) fn from_io(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Read { path, source }
        }
    }
}

/// An inbound session message could not be decoded.
#[derive(Debug, Error)]
pub enum ProtocolDecodeError {
    #[error("inbound message is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("inbound message is not a JSON object")]
    NotAnObject,

    #[error("inbound message has no string `msg` field")]
    MissingMsg,

    #[error("expected a text frame, got {len} bytes of binary data")]
    BinaryFrame { len: usize },
}

/// The transport went away or refused a frame mid-session.
#[derive(Debug, Error)]
pub enum SessionAbortedError {
    #[error("peer disconnected while waiting for message {step}")]
    Disconnected { step: usize },

    #[error("failed to receive message {step}: {source}")]
    Receive {
        step: usize,
        #[source]
        source: BoxError,
    },

    #[error("failed to send {kind}: {source}")]
    Send {
        kind: &'static str,
        #[source]
        source: BoxError,
    },
}

/// Why a playback session ended early.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("message {step}: {source}")]
    Decode {
        step: usize,
        #[source]
        source: ProtocolDecodeError,
    },

    #[error(transparent)]
    Aborted(#[from] SessionAbortedError),

    #[error("message {step}: expected trigger {expected:?}, got {actual:?}")]
    TriggerMismatch {
        step: usize,
        expected: String,
        actual: String,
    },

    #[error("session already closed")]
    AlreadyClosed,
}

/// Server construction or lifecycle failure.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Fixture(#[from] FixtureLoadError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server task failed: {0}")]
    Serve(#[source] io::Error),

    #[error("server task panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}
