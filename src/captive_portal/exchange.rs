//! 传输层无关的 HTTP 请求/响应，以及传输线程与门户循环之间的请求队列
//!
//! Transports (the ESP-IDF HTTP server, tests) never touch portal state
//! directly. They submit a [`Request`] through a [`PortalClient`] and wait for
//! the [`Response`] the portal loop sends back.

use std::borrow::Cow;

use http::{Method, StatusCode};
use tokio::sync::{mpsc, oneshot};

pub const TEXT_HTML: &str = "text/html; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Path without the query string.
    pub path: String,
    /// Decoded form pairs, query string first, then body.
    pub params: Vec<(String, String)>,
}

impl Request {
    /// Builds a request from a raw URI (`/save?ssid=x`) and an optional
    /// `application/x-www-form-urlencoded` body.
    pub fn new(method: Method, uri: &str, body: Option<&str>) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (uri, ""),
        };
        let mut params = parse_form(query);
        if let Some(body) = body {
            params.extend(parse_form(body));
        }
        Self {
            method,
            path: path.to_string(),
            params,
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri, None)
    }

    pub fn post(uri: &str, body: &str) -> Self {
        Self::new(Method::POST, uri, Some(body))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn html(status: StatusCode, body: String) -> Self {
        Self {
            status,
            content_type: TEXT_HTML,
            body,
        }
    }

    pub fn json(body: String) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: APPLICATION_JSON,
            body,
        }
    }

    /// Returned when the portal loop cannot take the request.
    pub fn unavailable() -> Self {
        Self::html(
            StatusCode::SERVICE_UNAVAILABLE,
            "<!DOCTYPE html><html><body>Busy, please retry.</body></html>".to_string(),
        )
    }
}

/// Decodes `a=1&b=two+words` style pairs. Pairs with an empty name are dropped.
pub fn parse_form(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = decode_component(name);
            if name.is_empty() {
                return None;
            }
            Some((name, decode_component(value)))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        // Escapes that are not UTF-8 are decoded lossily instead of dropped.
        Err(_) => {
            let bytes = urlencoding::decode_binary(spaced.as_bytes());
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }
}

/// A request waiting in the queue together with the way back to its client.
pub struct Exchange {
    pub request: Request,
    reply: oneshot::Sender<Response>,
}

impl Exchange {
    pub fn respond(self, response: Response) {
        if self.reply.send(response).is_err() {
            log::warn!("client of '{}' went away before the reply", self.request.path);
        }
    }
}

/// Creates the transport side and the portal side of the request queue.
pub fn channel(depth: usize) -> (PortalClient, RequestQueue) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (PortalClient { tx }, RequestQueue { rx })
}

#[derive(Clone)]
pub struct PortalClient {
    tx: mpsc::Sender<Exchange>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// The queue is full; the portal is still working through earlier requests.
    Busy,
    /// The portal loop is gone (restarting).
    Closed,
}

impl PortalClient {
    /// Queues `request` without blocking.
    pub fn submit(&self, request: Request) -> Result<PendingResponse, SubmitError> {
        let (reply, rx) = oneshot::channel();
        match self.tx.try_send(Exchange { request, reply }) {
            Ok(()) => Ok(PendingResponse { rx }),
            Err(mpsc::error::TrySendError::Full(ex)) => {
                log::warn!("request queue full, rejecting '{}'", ex.request.path);
                Err(SubmitError::Busy)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SubmitError::Closed),
        }
    }

    /// Queues `request` and blocks the calling (transport) thread until the
    /// portal loop answers. Always yields a response.
    pub fn call_blocking(&self, request: Request) -> Response {
        match self.submit(request) {
            Ok(pending) => pending.wait().unwrap_or_else(Response::unavailable),
            Err(_) => Response::unavailable(),
        }
    }
}

pub struct PendingResponse {
    rx: oneshot::Receiver<Response>,
}

impl PendingResponse {
    /// Non-blocking; `None` while the portal has not answered yet.
    pub fn try_take(&mut self) -> Option<Response> {
        self.rx.try_recv().ok()
    }

    /// Blocks until answered. `None` if the portal dropped the request.
    pub fn wait(self) -> Option<Response> {
        self.rx.blocking_recv().ok()
    }
}

pub struct RequestQueue {
    rx: mpsc::Receiver<Exchange>,
}

impl RequestQueue {
    /// Takes the oldest pending request, if any.
    pub fn try_next(&mut self) -> Option<Exchange> {
        self.rx.try_recv().ok()
    }

    /// Stops accepting requests; already queued ones stay retrievable.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
