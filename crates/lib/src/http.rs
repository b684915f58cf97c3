//! HTTP side of the bridge: one handler callable per server.
//!
//! [`HttpBridge::dispatch`] calls the handler once per exchange. A handler that returns
//! `Err` or panics gets a `500` whose body is the failure's description; either way the
//! exchange is marked handled exactly once. [`HttpBridge::wrap`] builds the axum router the
//! server is started with, including WebSocket upgrades requested by the handler.

use crate::config::Config;
use crate::exchange::{Exchange, HeaderMap, Method, Request, Response, StatusCode, Uri};
use crate::handler::{self, HandlerResult};
use crate::pool::BufferPool;
use crate::websocket::{serve_socket, WebSocketBridge};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State, WebSocketUpgrade},
    response::IntoResponse,
    Router,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub type HttpHandler = Arc<dyn Fn(&Request, &mut Response) -> HandlerResult + Send + Sync>;

/// Adapts one request handler to the server's per-request contract. Stateless; share it.
#[derive(Clone)]
pub struct HttpBridge {
    handler: HttpHandler,
}

impl HttpBridge {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Run the handler for one exchange and mark it handled.
    pub fn dispatch(&self, exchange: &mut Exchange) {
        let (request, response) = exchange.parts_mut();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(request, response)));
        if let Some(description) = handler::failure_description(outcome) {
            log::warn!(
                "{} {}: handler failed: {}",
                request.method(),
                request.path(),
                description
            );
            response.send_error(StatusCode::INTERNAL_SERVER_ERROR, &description);
        }
        exchange.set_handled();
    }

    /// Router serving every path with `handler`, using default limits.
    pub fn wrap<F>(handler: F) -> Router
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(handler).into_router(&Config::default())
    }

    /// Router serving every path and method through this bridge. Requests that carry an
    /// upgrade are accepted too; the handler decides by calling [`Response::upgrade`].
    /// Bodies over `server.maxBodyBytes` are answered with `413` before the handler runs.
    pub fn into_router(self, config: &Config) -> Router {
        let state = BridgeState {
            bridge: Arc::new(self),
            pool: BufferPool::new(config.websocket.pool_capacity),
        };
        Router::new()
            .fallback(serve_exchange)
            .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
            .with_state(state)
    }
}

#[derive(Clone)]
struct BridgeState {
    bridge: Arc<HttpBridge>,
    pool: Arc<BufferPool>,
}

async fn serve_exchange(
    State(state): State<BridgeState>,
    ws: Option<WebSocketUpgrade>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let mut exchange = Exchange::new(Request::new(method, uri, headers, body));
    let bridge = Arc::clone(&state.bridge);
    let exchange = match tokio::task::spawn_blocking(move || {
        bridge.dispatch(&mut exchange);
        exchange
    })
    .await
    {
        Ok(exchange) => exchange,
        Err(e) => {
            log::warn!("dispatch task failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let (request, mut response) = exchange.into_parts();
    match (response.take_upgrade(), ws) {
        (None, _) => response.into_axum(),
        (Some(handlers), Some(ws)) => {
            let pool = Arc::clone(&state.pool);
            ws.on_upgrade(move |socket| serve_socket(socket, WebSocketBridge::new(handlers), pool))
        }
        (Some(_), None) => {
            log::debug!("{} {}: upgrade requested without websocket handshake", request.method(), request.path());
            (StatusCode::BAD_REQUEST, "websocket upgrade required").into_response()
        }
    }
}
