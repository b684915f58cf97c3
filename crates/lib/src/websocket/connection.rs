//! Connection handle passed to every WebSocket handler.
//!
//! Handlers reply through the handle; frames are queued and written by the socket loop that
//! owns the connection, so handlers never touch the socket itself.

use tokio::sync::mpsc;
use uuid::Uuid;

/// Frame queued by a handler for the socket loop to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close { code: u16, reason: String },
}

/// The socket loop behind this connection has exited.
#[derive(Debug, thiserror::Error)]
#[error("connection {0} is closed")]
pub struct ConnectionClosed(pub Uuid);

/// Cloneable handle to one live WebSocket connection.
#[derive(Debug, Clone)]
pub struct Connection {
    id: Uuid,
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl Connection {
    /// New handle plus the receiving end the socket loop drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Self {
            id: Uuid::new_v4(),
            tx,
        };
        (conn, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// False once the socket loop has dropped its receiver.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<(), ConnectionClosed> {
        self.push(Outgoing::Text(text.into()))
    }

    pub fn send_binary(&self, data: impl Into<Vec<u8>>) -> Result<(), ConnectionClosed> {
        self.push(Outgoing::Binary(data.into()))
    }

    pub fn send_ping(&self, data: impl Into<Vec<u8>>) -> Result<(), ConnectionClosed> {
        self.push(Outgoing::Ping(data.into()))
    }

    pub fn send_pong(&self, data: impl Into<Vec<u8>>) -> Result<(), ConnectionClosed> {
        self.push(Outgoing::Pong(data.into()))
    }

    /// Ask the socket loop to send a close frame and stop.
    pub fn close(&self, code: u16, reason: impl Into<String>) -> Result<(), ConnectionClosed> {
        self.push(Outgoing::Close {
            code,
            reason: reason.into(),
        })
    }

    fn push(&self, frame: Outgoing) -> Result<(), ConnectionClosed> {
        self.tx.send(frame).map_err(|_| ConnectionClosed(self.id))
    }
}
