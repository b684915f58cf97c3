//! Socket loop: reads frames from an upgraded axum socket and feeds them to the bridge.

use super::bridge::{CloseMessage, Dispatch, WebSocketBridge};
use super::connection::{Connection, Outgoing};
use crate::pool::BufferPool;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::SinkExt;
use std::borrow::Cow;
use std::sync::Arc;

enum Step {
    Continue,
    Stop,
}

/// Serve one upgraded connection until it closes, fails, or a handler fails.
///
/// Frames are handed to the bridge one at a time, in arrival order. Replies queued on the
/// [`Connection`] are written between frames and drained before the loop exits. The sink is
/// closed on every exit, which completes the closing handshake a peer's close frame started.
pub async fn serve_socket(mut socket: WebSocket, bridge: WebSocketBridge, pool: Arc<BufferPool>) {
    let (conn, mut outgoing) = Connection::new();
    log::debug!("ws {} opened", conn.id());

    loop {
        tokio::select! {
            biased;

            frame = outgoing.recv() => {
                let Some(frame) = frame else { break };
                let closing = matches!(frame, Outgoing::Close { .. });
                if socket.send(to_message(frame)).await.is_err() || closing {
                    break;
                }
            }
            msg = socket.recv() => {
                let step = match msg {
                    None => Step::Stop,
                    Some(Err(e)) => {
                        match bridge.on_error(&conn, &e) {
                            Ok(Dispatch::Handled) => {}
                            Ok(Dispatch::Default) => log::debug!("ws {}: read failed: {}", conn.id(), e),
                            Err(handler_err) => log::warn!("ws {}: error handler failed: {:#}", conn.id(), handler_err),
                        }
                        Step::Stop
                    }
                    Some(Ok(msg)) => match deliver(&bridge, &pool, &conn, msg) {
                        Ok(step) => step,
                        Err(e) => {
                            log::warn!("ws {}: handler failed, closing: {:#}", conn.id(), e);
                            let _ = socket
                                .send(Message::Close(Some(CloseFrame {
                                    code: close_code::ERROR,
                                    reason: Cow::Borrowed(""),
                                })))
                                .await;
                            Step::Stop
                        }
                    },
                };
                if let Step::Stop = step {
                    break;
                }
            }
        }
    }

    while let Ok(frame) = outgoing.try_recv() {
        if socket.send(to_message(frame)).await.is_err() {
            break;
        }
    }
    // A received close only queues the reply; closing the sink writes it out.
    if let Err(e) = SinkExt::close(&mut socket).await {
        log::debug!("ws {}: close failed: {}", conn.id(), e);
    }
    log::debug!("ws {} closed", conn.id());
}

fn deliver(
    bridge: &WebSocketBridge,
    pool: &Arc<BufferPool>,
    conn: &Connection,
    msg: Message,
) -> anyhow::Result<Step> {
    match msg {
        Message::Text(text) => bridge.on_full_text_message(conn, &text)?,
        Message::Binary(data) => bridge.on_full_binary_message(conn, pool.lease(&data))?,
        // The runtime has already queued the pong reply by the time a ping surfaces here.
        Message::Ping(data) => bridge.on_full_ping_message(conn, pool.lease(&data))?,
        Message::Pong(data) => bridge.on_full_pong_message(conn, pool.lease(&data))?,
        Message::Close(frame) => {
            let message = frame
                .map(|f| CloseMessage::new(f.code, f.reason.into_owned()))
                .unwrap_or_default();
            bridge.on_close_message(&message, conn)?;
            return Ok(Step::Stop);
        }
    };
    Ok(Step::Continue)
}

fn to_message(frame: Outgoing) -> Message {
    match frame {
        Outgoing::Text(text) => Message::Text(text),
        Outgoing::Binary(data) => Message::Binary(data),
        Outgoing::Ping(data) => Message::Ping(data),
        Outgoing::Pong(data) => Message::Pong(data),
        Outgoing::Close { code, reason } => Message::Close(Some(CloseFrame {
            code,
            reason: Cow::Owned(reason),
        })),
    }
}
