//! Frame dispatcher: routes each completed WebSocket message to its handler.
//!
//! Every handler slot is optional. An empty slot is not an error: the bridge reports
//! [`Dispatch::Default`] and the socket loop applies the runtime's default for that frame.
//! Binary, ping and pong payloads arrive as [`PooledBuffer`] leases owned by the dispatch
//! call, so the lease is released when the call returns, whether the handler returned `Ok`,
//! returned `Err`, panicked, or was never registered.

use super::connection::Connection;
use crate::handler::HandlerResult;
use crate::pool::PooledBuffer;
use std::fmt;
use std::sync::Arc;

/// Close status reported when the peer's close frame carried no code.
pub const NO_STATUS_CODE: u16 = 1005;

pub type TextHandler = Arc<dyn Fn(&Connection, &str) -> HandlerResult + Send + Sync>;
pub type BytesHandler = Arc<dyn Fn(&Connection, &[u8]) -> HandlerResult + Send + Sync>;
pub type CloseHandler = Arc<dyn Fn(&Connection, u16, &str) -> HandlerResult + Send + Sync>;
pub type ErrorHandler =
    Arc<dyn Fn(&Connection, &dyn std::error::Error) -> HandlerResult + Send + Sync>;

/// How a frame was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A registered handler ran.
    Handled,
    /// No handler for this frame kind; the runtime default applies.
    Default,
}

/// Status code and reason of a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseMessage {
    pub code: u16,
    pub reason: String,
}

impl CloseMessage {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

impl Default for CloseMessage {
    fn default() -> Self {
        Self::new(NO_STATUS_CODE, "")
    }
}

/// The handler set for one kind of connection. Fixed once built.
///
/// Handlers run on the connection's async task, between reads. They must not block: hand
/// slow work to another task and reply later through the [`Connection`].
#[derive(Clone, Default)]
pub struct WebSocketHandlers {
    text: Option<TextHandler>,
    binary: Option<BytesHandler>,
    ping: Option<BytesHandler>,
    pong: Option<BytesHandler>,
    close: Option<CloseHandler>,
    error: Option<ErrorHandler>,
}

impl WebSocketHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_text<F>(mut self, f: F) -> Self
    where
        F: Fn(&Connection, &str) -> HandlerResult + Send + Sync + 'static,
    {
        self.text = Some(Arc::new(f));
        self
    }

    pub fn on_binary<F>(mut self, f: F) -> Self
    where
        F: Fn(&Connection, &[u8]) -> HandlerResult + Send + Sync + 'static,
    {
        self.binary = Some(Arc::new(f));
        self
    }

    pub fn on_ping<F>(mut self, f: F) -> Self
    where
        F: Fn(&Connection, &[u8]) -> HandlerResult + Send + Sync + 'static,
    {
        self.ping = Some(Arc::new(f));
        self
    }

    pub fn on_pong<F>(mut self, f: F) -> Self
    where
        F: Fn(&Connection, &[u8]) -> HandlerResult + Send + Sync + 'static,
    {
        self.pong = Some(Arc::new(f));
        self
    }

    /// Called with (connection, code, reason).
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn(&Connection, u16, &str) -> HandlerResult + Send + Sync + 'static,
    {
        self.close = Some(Arc::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&Connection, &dyn std::error::Error) -> HandlerResult + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for WebSocketHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketHandlers")
            .field("text", &self.text.is_some())
            .field("binary", &self.binary.is_some())
            .field("ping", &self.ping.is_some())
            .field("pong", &self.pong.is_some())
            .field("close", &self.close.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// Per-connection dispatcher over a [`WebSocketHandlers`] set.
///
/// Holds no state besides the handlers; frames for one connection must be delivered
/// serially, which the socket loop guarantees.
#[derive(Debug, Clone)]
pub struct WebSocketBridge {
    handlers: WebSocketHandlers,
}

impl WebSocketBridge {
    pub fn new(handlers: WebSocketHandlers) -> Self {
        Self { handlers }
    }

    pub fn on_full_text_message(&self, conn: &Connection, text: &str) -> anyhow::Result<Dispatch> {
        match &self.handlers.text {
            Some(handler) => {
                handler(conn, text)?;
                Ok(Dispatch::Handled)
            }
            None => Ok(unhandled(conn, "text")),
        }
    }

    pub fn on_full_binary_message(
        &self,
        conn: &Connection,
        data: PooledBuffer,
    ) -> anyhow::Result<Dispatch> {
        dispatch_pooled(self.handlers.binary.as_ref(), conn, data, "binary")
    }

    pub fn on_full_ping_message(
        &self,
        conn: &Connection,
        data: PooledBuffer,
    ) -> anyhow::Result<Dispatch> {
        dispatch_pooled(self.handlers.ping.as_ref(), conn, data, "ping")
    }

    pub fn on_full_pong_message(
        &self,
        conn: &Connection,
        data: PooledBuffer,
    ) -> anyhow::Result<Dispatch> {
        dispatch_pooled(self.handlers.pong.as_ref(), conn, data, "pong")
    }

    /// Terminal: no further frames follow for this connection.
    pub fn on_close_message(
        &self,
        message: &CloseMessage,
        conn: &Connection,
    ) -> anyhow::Result<Dispatch> {
        match &self.handlers.close {
            Some(handler) => {
                handler(conn, message.code, &message.reason)?;
                Ok(Dispatch::Handled)
            }
            None => Ok(unhandled(conn, "close")),
        }
    }

    /// Terminal: the connection is torn down after this call.
    pub fn on_error(
        &self,
        conn: &Connection,
        cause: &dyn std::error::Error,
    ) -> anyhow::Result<Dispatch> {
        match &self.handlers.error {
            Some(handler) => {
                handler(conn, cause)?;
                Ok(Dispatch::Handled)
            }
            None => Ok(unhandled(conn, "error")),
        }
    }
}

// `data` is owned by this frame, so it is released on every way out, unwinding included.
fn dispatch_pooled(
    handler: Option<&BytesHandler>,
    conn: &Connection,
    data: PooledBuffer,
    kind: &str,
) -> anyhow::Result<Dispatch> {
    match handler {
        Some(handler) => {
            handler(conn, data.resource())?;
            Ok(Dispatch::Handled)
        }
        None => Ok(unhandled(conn, kind)),
    }
}

fn unhandled(conn: &Connection, kind: &str) -> Dispatch {
    log::debug!("ws {}: no {} handler, using default", conn.id(), kind);
    Dispatch::Default
}
