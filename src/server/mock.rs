use serde_json::Value;

use super::{Params, Request, Response};
use crate::error::ResponseDispatchError;

/// In-memory request that records which handlers touched it.
#[derive(Debug, Default)]
pub(crate) struct MockRequest {
    pub method: String,
    pub url: String,
    pub params: Params,
    pub log: Vec<String>,
}

impl MockRequest {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn hit(&mut self, name: &str) {
        self.log.push(name.to_string());
    }
}

impl Request for MockRequest {
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

/// In-memory response capturing every `send`.
#[derive(Debug)]
pub(crate) struct MockResponse {
    pub status: u16,
    pub sent: Vec<(u16, Value)>,
    pub fail_send: bool,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            sent: Vec::new(),
            fail_send: false,
        }
    }
}

impl MockResponse {
    pub fn failing() -> Self {
        Self {
            fail_send: true,
            ..Default::default()
        }
    }
}

impl Response for MockResponse {
    fn status(&mut self, code: u16) -> &mut Self {
        self.status = code;
        self
    }

    fn send(&mut self, body: Value) -> Result<(), ResponseDispatchError> {
        if self.fail_send {
            return Err(ResponseDispatchError::new("connection closed"));
        }
        self.sent.push((self.status, body));
        Ok(())
    }
}
