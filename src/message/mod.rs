//! # Message Transport Adapter
//!
//! Bridges request/response style messages carried over a socket (or any
//! other message transport) into the router.
//!
//! An inbound [`Message`] carries an `id`, an optional `method` and `url`, and
//! a JSON `body`. [`handle_message`] turns it into a [`MessageRequest`] (with
//! the query string parsed) and a [`MessageResponse`] that reports back
//! through a [`Responder`], then dispatches it.
//!
//! Messages without a method or url are not router traffic: `handle_message`
//! returns `false` and the caller handles them some other way.
//!
//! Responses are wrapped as `{ "status": <code>, "body": <body> }` and go to
//! [`Responder::respond`] for 2xx codes and [`Responder::respond_with_error`]
//! otherwise.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ResponseDispatchError;
use crate::router::Router;
use crate::server::{Params, Request, Response};

#[cfg(test)]
mod tests;

/// Router specialised for message traffic.
pub type MessageRouter = Router<MessageRequest, MessageResponse>;

/// Inbound request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub body: Value,
}

/// Sink for responses to a message.
pub trait Responder: Send + Sync {
    /// Deliver a successful response for request `id`
    fn respond(&self, id: &str, payload: Value) -> Result<(), ResponseDispatchError>;

    /// Deliver an error response for request `id`
    fn respond_with_error(&self, id: &str, payload: Value) -> Result<(), ResponseDispatchError>;
}

/// Request built from a [`Message`].
#[derive(Debug, Clone)]
pub struct MessageRequest {
    id: String,
    method: String,
    url: String,
    query: HashMap<String, Vec<String>>,
    body: Value,
    params: Params,
}

impl MessageRequest {
    /// Build a request, splitting any `?query` off `url` and decoding it.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        method: impl Into<String>,
        url: &str,
        body: Value,
    ) -> Self {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (url, HashMap::new()),
        };
        Self {
            id: id.into(),
            method: method.into(),
            url: path.to_string(),
            query,
            body,
            params: Params::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// All decoded query parameters. Repeated keys keep every value in order.
    #[must_use]
    pub fn query(&self) -> &HashMap<String, Vec<String>> {
        &self.query
    }

    /// First value of a query parameter
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

impl Request for MessageRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn set_params(&mut self, params: Params) {
        self.params = params;
    }
}

/// Percent-decodes `key=value` pairs. A `+` stays a literal plus.
fn parse_query(query: &str) -> HashMap<String, Vec<String>> {
    let query = query.replace('+', "%2B");
    let mut parsed: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        parsed
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    parsed
}

/// Response that reports through a [`Responder`].
pub struct MessageResponse {
    id: String,
    status: u16,
    sent: bool,
    responder: Arc<dyn Responder>,
}

impl MessageResponse {
    #[must_use]
    pub fn new(id: impl Into<String>, responder: Arc<dyn Responder>) -> Self {
        Self {
            id: id.into(),
            status: 200,
            sent: false,
            responder,
        }
    }

    /// Status that the next `send` will use
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Whether anything has been delivered for this request
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Deliver `payload` as a success, bypassing the status envelope.
    ///
    /// # Errors
    ///
    /// Whatever the responder fails with.
    pub fn respond(&mut self, payload: Value) -> Result<(), ResponseDispatchError> {
        self.sent = true;
        self.responder.respond(&self.id, payload)
    }

    /// Deliver `payload` as an error, bypassing the status envelope.
    ///
    /// # Errors
    ///
    /// Whatever the responder fails with.
    pub fn respond_with_error(&mut self, payload: Value) -> Result<(), ResponseDispatchError> {
        self.sent = true;
        self.responder.respond_with_error(&self.id, payload)
    }
}

impl Response for MessageResponse {
    fn status(&mut self, code: u16) -> &mut Self {
        self.status = code;
        self
    }

    fn send(&mut self, body: Value) -> Result<(), ResponseDispatchError> {
        let payload = json!({ "status": self.status, "body": body });
        let success = http::StatusCode::from_u16(self.status).is_ok_and(|s| s.is_success());
        if success {
            self.respond(payload)
        } else {
            self.respond_with_error(payload)
        }
    }
}

impl std::fmt::Debug for MessageResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageResponse")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("sent", &self.sent)
            .finish_non_exhaustive()
    }
}

/// Dispatch a message through `router`.
///
/// Returns `false` without touching the router when the message has no
/// method or no url, or either one is empty.
pub async fn handle_message(
    router: &MessageRouter,
    responder: Arc<dyn Responder>,
    message: Message,
) -> bool {
    let Message {
        id,
        method,
        url,
        body,
    } = message;

    let (Some(method), Some(url)) = (
        method.filter(|m| !m.is_empty()),
        url.filter(|u| !u.is_empty()),
    ) else {
        debug!(id = %id, "Message is not a routed request");
        return false;
    };

    let mut req = MessageRequest::new(id.as_str(), method, &url, body);
    let mut res = MessageResponse::new(id, responder);
    router.handle(&mut req, &mut res).await;

    if !res.is_sent() {
        warn!(
            id = %req.id(),
            method = %req.method(),
            url = %req.url(),
            "Request finished without a response"
        );
    }
    true
}
