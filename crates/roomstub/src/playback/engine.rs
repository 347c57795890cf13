//! Per-connection playback state machine.
//!
//! A session walks `Idle -> Interactive -> Pushing -> Closed` exactly once:
//!
//! - **Interactive**: for each `init` entry, wait for one inbound message and
//!   answer with the entry's response, `id` copied from the request. Entries
//!   are consumed by position; the trigger text is only compared.
//! - **Pushing**: for each `room_msgs` entry, sleep for its delay and push the
//!   response verbatim. Inbound traffic is not read in this phase.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::transport::{InboundFrame, SessionTransport};
use crate::error::{ProtocolDecodeError, SessionAbortedError, SessionError};
use crate::playbook::{Playbook, ResponseBody};

/// What to do when an inbound `msg` differs from the current trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Log the mismatch and send the current entry's response anyway.
    #[default]
    Lenient,
    /// End the session without answering.
    Strict,
}

/// Where a session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    /// Waiting on or answering `init[cursor]`.
    Interactive { cursor: usize },
    /// Sleeping before or sending `room_msgs[cursor]`.
    Pushing { cursor: usize },
    Closed,
}

/// Counters for a finished (or aborted) session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub responses_sent: usize,
    pub pushes_sent: usize,
    pub trigger_mismatches: usize,
}

/// A decoded inbound session message.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub msg: String,
    /// Correlation token, `null` when the client sent none.
    pub id: Value,
}

impl InboundMessage {
    pub fn decode(text: &str) -> Result<Self, ProtocolDecodeError> {
        let value: Value = serde_json::from_str(text).map_err(ProtocolDecodeError::Json)?;
        let Value::Object(mut fields) = value else {
            return Err(ProtocolDecodeError::NotAnObject);
        };
        let Some(Value::String(msg)) = fields.remove("msg") else {
            return Err(ProtocolDecodeError::MissingMsg);
        };
        let id = fields.remove("id").unwrap_or(Value::Null);
        Ok(Self { msg, id })
    }
}

/// Copy of `response` carrying the request's correlation id.
fn correlate(response: &ResponseBody, id: Value) -> ResponseBody {
    let mut body = response.clone();
    body.insert("id".to_string(), id);
    body
}

/// Drives one session against a shared, read-only playbook.
#[derive(Debug)]
pub struct PlaybackEngine {
    playbook: Arc<Playbook>,
    policy: MatchPolicy,
    state: PlaybackState,
    report: SessionReport,
}

impl PlaybackEngine {
    pub fn new(playbook: Arc<Playbook>, policy: MatchPolicy) -> Self {
        Self {
            playbook,
            policy,
            state: PlaybackState::Idle,
            report: SessionReport::default(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Progress so far; after a failed `run` this shows how far the session got.
    pub fn report(&self) -> SessionReport {
        self.report
    }

    /// Play the whole script over `transport`. The engine is `Closed` afterwards
    /// whatever the outcome; it does not close the transport itself.
    pub async fn run<T>(&mut self, transport: &mut T) -> Result<SessionReport, SessionError>
    where
        T: SessionTransport + ?Sized,
    {
        if self.state != PlaybackState::Idle {
            return Err(SessionError::AlreadyClosed);
        }

        info!(
            init = self.playbook.init().len(),
            room_msgs = self.playbook.room_msgs().len(),
            "Starting playback"
        );

        let result = self.play(transport).await;
        self.state = PlaybackState::Closed;
        result.map(|()| self.report)
    }

    async fn play<T>(&mut self, transport: &mut T) -> Result<(), SessionError>
    where
        T: SessionTransport + ?Sized,
    {
        let playbook = Arc::clone(&self.playbook);

        for (step, entry) in playbook.init().iter().enumerate() {
            self.state = PlaybackState::Interactive { cursor: step };

            let inbound = next_message(transport, step).await?;

            if inbound.msg != entry.trigger {
                self.report.trigger_mismatches += 1;
                match self.policy {
                    MatchPolicy::Lenient => warn!(
                        step,
                        expected = %entry.trigger,
                        actual = %inbound.msg,
                        "Trigger mismatch, answering with scripted response"
                    ),
                    MatchPolicy::Strict => {
                        return Err(SessionError::TriggerMismatch {
                            step,
                            expected: entry.trigger.clone(),
                            actual: inbound.msg,
                        });
                    }
                }
            }

            let body = Value::Object(correlate(&entry.response, inbound.id)).to_string();
            debug!(step, "Sending response: {}", body);
            transport
                .send(body)
                .await
                .map_err(|source| SessionAbortedError::Send {
                    kind: "response",
                    source,
                })?;
            self.report.responses_sent += 1;
        }

        for (index, entry) in playbook.room_msgs().iter().enumerate() {
            self.state = PlaybackState::Pushing { cursor: index };

            tokio::time::sleep(entry.delay()).await;

            let body = Value::Object(entry.response.clone()).to_string();
            debug!(index, "Pushing message: {}", body);
            transport
                .send(body)
                .await
                .map_err(|source| SessionAbortedError::Send {
                    kind: "push",
                    source,
                })?;
            self.report.pushes_sent += 1;
        }

        Ok(())
    }
}

async fn next_message<T>(transport: &mut T, step: usize) -> Result<InboundMessage, SessionError>
where
    T: SessionTransport + ?Sized,
{
    let frame = transport
        .recv()
        .await
        .map_err(|source| SessionAbortedError::Receive { step, source })?
        .ok_or(SessionAbortedError::Disconnected { step })?;

    let decoded = match frame {
        InboundFrame::Text(text) => InboundMessage::decode(&text),
        InboundFrame::Binary(data) => Err(ProtocolDecodeError::BinaryFrame { len: data.len() }),
    };
    decoded.map_err(|source| SessionError::Decode { step, source })
}
