//! WebSocket side of the bridge.
//!
//! [`WebSocketBridge`] dispatches completed frames to up to six optional handlers;
//! [`serve_socket`] drives it from an upgraded axum socket.

mod bridge;
mod connection;
mod socket;

pub use bridge::{
    BytesHandler, CloseHandler, CloseMessage, Dispatch, ErrorHandler, TextHandler,
    WebSocketBridge, WebSocketHandlers, NO_STATUS_CODE,
};
pub use connection::{Connection, ConnectionClosed, Outgoing};
pub use socket::serve_socket;
