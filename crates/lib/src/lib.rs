//! Tether: serve plain handler callables over axum's HTTP server and WebSocket runtime.
//!
//! Handlers are ordinary closures. The HTTP bridge calls one handler per request and turns
//! handler failures into `500` responses; the WebSocket bridge routes each completed frame
//! to an optional per-kind handler.

pub mod buffers;
pub mod config;
pub mod exchange;
pub mod handler;
pub mod http;
pub mod pool;
pub mod server;
pub mod stream;
pub mod websocket;

pub use exchange::{Exchange, Request, Response};
pub use handler::HandlerResult;
pub use http::HttpBridge;
pub use websocket::{Connection, WebSocketBridge, WebSocketHandlers};
