//! Channel adapter over the persistent connection.
//!
//! Sessions speak through the `Channel` trait so the state machines can be
//! exercised against scripted fakes in tests. `WsChannel` is the production
//! implementation over an Axum WebSocket; once the peer is gone it suppresses
//! further sends instead of erroring, so terminal notifications stay
//! best-effort.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection closed")]
    Closed,
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[async_trait]
pub trait Channel: Send {
    /// Awaits the next JSON text message from the client.
    async fn recv_json(&mut self) -> Result<Value, ChannelError>;

    /// Sends a status/prompt line to the client. Best-effort: a no-op once
    /// the connection is gone.
    async fn send_text(&mut self, text: &str);
}

pub struct WsChannel {
    socket: WebSocket,
    open: bool,
}

impl WsChannel {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket, open: true }
    }
}

#[async_trait]
impl Channel for WsChannel {
    async fn recv_json(&mut self) -> Result<Value, ChannelError> {
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).map_err(ChannelError::from);
                }
                Some(Ok(Message::Ping(payload))) => {
                    if self.socket.send(Message::Pong(payload)).await.is_err() {
                        self.open = false;
                        return Err(ChannelError::Closed);
                    }
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Binary(_))) => {
                    tracing::warn!("ignoring binary frame on attendance socket");
                }
                Some(Ok(Message::Close(_))) | None => {
                    self.open = false;
                    return Err(ChannelError::Closed);
                }
                Some(Err(_)) => {
                    self.open = false;
                    return Err(ChannelError::Closed);
                }
            }
        }
    }

    async fn send_text(&mut self, text: &str) {
        if !self.open {
            return;
        }
        if self
            .socket
            .send(Message::Text(text.to_owned().into()))
            .await
            .is_err()
        {
            self.open = false;
        }
    }
}
