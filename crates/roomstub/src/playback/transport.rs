//! Transport seam between the playback engine and a live connection.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};

use crate::error::BoxError;

/// A data frame received from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// One bidirectional message channel carrying a single playback session.
#[async_trait]
pub trait SessionTransport: Send {
    /// Wait for the next data frame. `Ok(None)` means the peer went away.
    ///
    /// Control frames are handled by the implementation and never returned.
    async fn recv(&mut self) -> Result<Option<InboundFrame>, BoxError>;

    /// Send one text frame.
    async fn send(&mut self, text: String) -> Result<(), BoxError>;
}

#[async_trait]
impl SessionTransport for WebSocket {
    async fn recv(&mut self) -> Result<Option<InboundFrame>, BoxError> {
        loop {
            let Some(message) = WebSocket::recv(self).await else {
                return Ok(None);
            };
            match message? {
                Message::Text(text) => return Ok(Some(InboundFrame::Text(text.to_string()))),
                Message::Binary(data) => return Ok(Some(InboundFrame::Binary(data.to_vec()))),
                Message::Close(_) => return Ok(None),
                // Pings are answered by axum.
                Message::Ping(_) | Message::Pong(_) => continue,
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), BoxError> {
        WebSocket::send(self, Message::Text(text.into())).await?;
        Ok(())
    }
}
