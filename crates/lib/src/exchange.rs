//! Request/response pair handed to HTTP handlers.
//!
//! These types carry only the parsed request and the response being built, so handler code
//! does not depend on axum's extractor or body types.

use crate::stream::DeferredFlushWriter;
use crate::websocket::WebSocketHandlers;
use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderName, HeaderValue};
pub use axum::http::{HeaderMap, Method, StatusCode, Uri};

/// An already-parsed inbound request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as a string; `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// True when the client asked to switch to the WebSocket protocol.
    pub fn is_upgrade(&self) -> bool {
        self.header("upgrade")
            .map_or(false, |v| v.trim().eq_ignore_ascii_case("websocket"))
    }
}

/// Response under construction. Starts as an empty `200 OK`.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    upgrade: Option<WebSocketHandlers>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            upgrade: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set (replace) a header. Fails on an invalid name or value.
    pub fn set_header(&mut self, name: &str, value: &str) -> anyhow::Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Append bytes to the body.
    pub fn write(&mut self, bytes: impl AsRef<[u8]>) {
        self.body.extend_from_slice(bytes.as_ref());
    }

    /// Streaming writer over the body. Interim flushes are ignored; call `close` when done.
    pub fn writer(&mut self) -> DeferredFlushWriter<&mut Vec<u8>> {
        DeferredFlushWriter::new(&mut self.body)
    }

    /// Replace whatever was written with a plain-text error. An empty message falls back to
    /// the status's canonical reason. Cancels a pending upgrade.
    pub fn send_error(&mut self, status: StatusCode, message: &str) {
        let message = if message.trim().is_empty() {
            status.canonical_reason().unwrap_or("")
        } else {
            message
        };
        self.status = status;
        self.headers.clear();
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.body.clear();
        self.body.extend_from_slice(message.as_bytes());
        self.upgrade = None;
    }

    /// Switch this exchange to WebSocket, served by `handlers`. Only honoured when the
    /// request [is an upgrade](Request::is_upgrade).
    pub fn upgrade(&mut self, handlers: WebSocketHandlers) {
        self.upgrade = Some(handlers);
    }

    pub fn is_upgrading(&self) -> bool {
        self.upgrade.is_some()
    }

    pub(crate) fn take_upgrade(&mut self) -> Option<WebSocketHandlers> {
        self.upgrade.take()
    }

    pub(crate) fn into_axum(self) -> axum::response::Response {
        let mut res = axum::response::Response::new(Body::from(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

/// One request/response cycle.
#[derive(Debug)]
pub struct Exchange {
    request: Request,
    response: Response,
    handled_marks: u32,
}

impl Exchange {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::new(),
            handled_marks: 0,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Split borrow for handler calls.
    pub fn parts_mut(&mut self) -> (&Request, &mut Response) {
        (&self.request, &mut self.response)
    }

    /// Mark the exchange as fully handled so the server applies no further processing.
    pub fn set_handled(&mut self) {
        self.handled_marks += 1;
        if self.handled_marks > 1 {
            log::warn!(
                "{} {} marked handled {} times",
                self.request.method,
                self.request.path(),
                self.handled_marks
            );
        }
    }

    pub fn is_handled(&self) -> bool {
        self.handled_marks > 0
    }

    /// How many times [`set_handled`](Self::set_handled) was called.
    pub fn handled_marks(&self) -> u32 {
        self.handled_marks
    }

    pub fn into_parts(self) -> (Request, Response) {
        (self.request, self.response)
    }
}
