//! Integration test: serve a bridged handler on an ephemeral port and talk to it over real
//! HTTP and WebSocket connections.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether::config::Config;
use tether::exchange::StatusCode;
use tether::{HttpBridge, Request, Response, WebSocketHandlers};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

type Closes = Arc<Mutex<Vec<(u16, String)>>>;

fn app_handler(closes: Closes) -> impl Fn(&Request, &mut Response) -> tether::HandlerResult {
    move |request: &Request, response: &mut Response| {
        match request.path() {
            "/" => {
                response.set_header("x-served-by", "tether")?;
                response.write("hello");
            }
            "/echo" => response.write(request.body()),
            "/fail" => anyhow::bail!("storage offline"),
            "/panic" => panic!("unexpected state"),
            "/ws" => {
                let closes = Arc::clone(&closes);
                response.upgrade(
                    WebSocketHandlers::new()
                        .on_text(|conn, text| {
                            if text == "explode" {
                                anyhow::bail!("refusing to echo");
                            }
                            conn.send_text(text)?;
                            Ok(())
                        })
                        .on_binary(|conn, data| {
                            let mut reversed = data.to_vec();
                            reversed.reverse();
                            conn.send_binary(reversed)?;
                            Ok(())
                        })
                        .on_close(move |_, code, reason| {
                            closes.lock().unwrap().push((code, reason.to_string()));
                            Ok(())
                        }),
                );
            }
            "/ws-text-only" => response.upgrade(WebSocketHandlers::new().on_text(|conn, text| {
                conn.send_text(text)?;
                Ok(())
            })),
            _ => response.send_error(StatusCode::NOT_FOUND, ""),
        }
        Ok(())
    }
}

async fn start(closes: Closes) -> SocketAddr {
    serve_app(HttpBridge::wrap(app_handler(closes))).await
}

async fn serve_app(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = tether::server::serve_with_shutdown(listener, app, std::future::pending()).await;
    });
    addr
}

fn no_closes() -> Closes {
    Arc::new(Mutex::new(Vec::new()))
}

#[tokio::test]
async fn successful_handler_response_is_served() {
    let addr = start(no_closes()).await;

    let resp = reqwest::get(format!("http://{}/", addr)).await.expect("GET /");

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-served-by").and_then(|v| v.to_str().ok()),
        Some("tether")
    );
    assert_eq!(resp.text().await.unwrap(), "hello");
}

#[tokio::test]
async fn request_body_reaches_the_handler() {
    let addr = start(no_closes()).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/echo", addr))
        .body("ping body")
        .send()
        .await
        .expect("POST /echo");

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ping body");
}

#[tokio::test]
async fn handler_error_and_panic_become_500() {
    let addr = start(no_closes()).await;

    let resp = reqwest::get(format!("http://{}/fail", addr)).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.text().await.unwrap(), "storage offline");

    let resp = reqwest::get(format!("http://{}/panic", addr)).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.text().await.unwrap(), "unexpected state");

    let resp = reqwest::get(format!("http://{}/", addr)).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn upgrade_without_handshake_is_rejected() {
    let addr = start(no_closes()).await;

    let resp = reqwest::get(format!("http://{}/ws", addr)).await.unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn websocket_frames_are_dispatched_to_handlers() {
    let closes = no_closes();
    let addr = start(Arc::clone(&closes)).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("websocket connect");

    ws.send(Message::Text("hi".to_string())).await.unwrap();
    assert_eq!(ws.next().await.unwrap().unwrap(), Message::Text("hi".to_string()));

    ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    assert_eq!(ws.next().await.unwrap().unwrap(), Message::Binary(vec![3, 2, 1]));

    ws.send(Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "done".into(),
    })))
    .await
    .unwrap();

    for _ in 0..100 {
        if !closes.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(*closes.lock().unwrap(), vec![(1000, "done".to_string())]);
}

#[tokio::test]
async fn failing_frame_handler_closes_the_connection() {
    let addr = start(no_closes()).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("websocket connect");

    ws.send(Message::Text("explode".to_string())).await.unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("close within 5s")
        .expect("a frame")
        .expect("valid frame");
    match frame {
        Message::Close(Some(close)) => assert_eq!(u16::from(close.code), 1011),
        other => panic!("expected close frame, got {:?}", other),
    }
}

async fn next_frame<S>(ws: &mut S) -> Message
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("frame within 5s")
        .expect("stream still open")
        .expect("valid frame")
}

async fn assert_close_is_answered(path: &str, closes: Closes) {
    let addr = start(closes).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}{}", addr, path))
        .await
        .expect("websocket connect");

    ws.send(Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "done".into(),
    })))
    .await
    .unwrap();

    match next_frame(&mut ws).await {
        Message::Close(_) => {}
        other => panic!("expected close reply, got {:?}", other),
    }
}

#[tokio::test]
async fn peer_close_is_answered_when_close_handler_is_registered() {
    let closes = no_closes();
    assert_close_is_answered("/ws", Arc::clone(&closes)).await;
    assert_eq!(*closes.lock().unwrap(), vec![(1000, "done".to_string())]);
}

#[tokio::test]
async fn peer_close_is_answered_without_close_handler() {
    assert_close_is_answered("/ws-text-only", no_closes()).await;
}

#[tokio::test]
async fn oversized_body_is_rejected_before_the_handler() {
    let mut config = Config::default();
    config.server.max_body_bytes = 8;
    let hits = Arc::new(Mutex::new(0u32));
    let counted = Arc::clone(&hits);
    let app = HttpBridge::new(move |_: &Request, response: &mut Response| {
        *counted.lock().unwrap() += 1;
        response.write("ok");
        Ok(())
    })
    .into_router(&config);
    let addr = serve_app(app).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{}/", addr))
        .body(vec![b'x'; 64])
        .send()
        .await
        .expect("POST oversized");
    assert_eq!(resp.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(*hits.lock().unwrap(), 0);

    let resp = client
        .post(format!("http://{}/", addr))
        .body("small")
        .send()
        .await
        .expect("POST small");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(*hits.lock().unwrap(), 1);
}
