use futures::executor::block_on;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

use super::*;
use crate::chain::{handler, Next, Outcome};
use crate::error::{HandlerError, ResponseDispatchError};

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(String, bool, Value)>>,
}

impl Responder for Recorder {
    fn respond(&self, id: &str, payload: Value) -> Result<(), ResponseDispatchError> {
        self.calls.lock().push((id.to_string(), true, payload));
        Ok(())
    }

    fn respond_with_error(&self, id: &str, payload: Value) -> Result<(), ResponseDispatchError> {
        self.calls.lock().push((id.to_string(), false, payload));
        Ok(())
    }
}

fn message(id: &str, method: Option<&str>, url: Option<&str>) -> Message {
    Message {
        id: id.to_string(),
        method: method.map(str::to_string),
        url: url.map(str::to_string),
        body: json!({ "name": "rex" }),
    }
}

fn echo_router() -> MessageRouter {
    let mut router = MessageRouter::new();
    router
        .post(
            "pets/:id",
            handler(|req: &mut MessageRequest, res: &mut MessageResponse, _next: Next| {
                let body = json!({
                    "id": req.params().get("id"),
                    "verbose": req.query_param("verbose"),
                    "echo": req.body(),
                });
                res.status(201).send(body)?;
                Ok(Outcome::halt())
            }),
        )
        .unwrap();
    router
}

#[test]
fn test_request_without_query() {
    let req = MessageRequest::new("1", "get", "pets", Value::Null);
    assert_eq!(req.url(), "pets");
    assert!(req.query().is_empty());
    assert_eq!(req.id(), "1");
}

#[test]
fn test_request_parses_query() {
    let req = MessageRequest::new("1", "get", "pets?test=hello&name=a%20b", Value::Null);
    assert_eq!(req.url(), "pets");
    assert_eq!(req.query_param("test"), Some("hello"));
    assert_eq!(req.query_param("name"), Some("a b"));
    assert_eq!(req.query_param("missing"), None);
}

#[test]
fn test_request_query_keeps_plus_sign() {
    let req = MessageRequest::new("1", "get", "search?q=a+b&tag=c%2Bd", Value::Null);
    assert_eq!(req.query_param("q"), Some("a+b"));
    assert_eq!(req.query_param("tag"), Some("c+d"));
}

#[test]
fn test_request_keeps_duplicate_query_values() {
    let req = MessageRequest::new("1", "get", "url?test=foo&test=bar&test=baz", Value::Null);
    assert_eq!(
        req.query().get("test"),
        Some(&vec!["foo".to_string(), "bar".to_string(), "baz".to_string()])
    );
    assert_eq!(req.query_param("test"), Some("foo"));
}

#[test]
fn test_response_defaults_to_200() {
    let recorder = Arc::new(Recorder::default());
    let mut res = MessageResponse::new("abc", recorder.clone());
    assert_eq!(res.status_code(), 200);
    assert!(!res.is_sent());

    res.send(json!("hi")).unwrap();
    assert!(res.is_sent());
    assert_eq!(
        *recorder.calls.lock(),
        vec![("abc".to_string(), true, json!({ "status": 200, "body": "hi" }))]
    );
}

#[test]
fn test_response_non_2xx_is_error() {
    let recorder = Arc::new(Recorder::default());
    let mut res = MessageResponse::new("abc", recorder.clone());
    res.status(404).send(json!({ "message": "gone" })).unwrap();
    res.status(302).send(Value::Null).unwrap();

    let calls = recorder.calls.lock();
    assert!(!calls[0].1);
    assert_eq!(calls[0].2, json!({ "status": 404, "body": { "message": "gone" } }));
    assert!(!calls[1].1);
}

#[test]
fn test_response_raw_respond() {
    let recorder = Arc::new(Recorder::default());
    let mut res = MessageResponse::new("abc", recorder.clone());
    res.respond_with_error(json!("raw")).unwrap();
    assert!(res.is_sent());
    assert_eq!(recorder.calls.lock()[0].2, json!("raw"));
}

#[test]
fn test_message_deserializes_without_method() {
    let msg: Message = serde_json::from_str(r#"{"id":"7","body":{"a":1}}"#).unwrap();
    assert_eq!(msg.method, None);
    assert_eq!(msg.url, None);
    assert_eq!(msg.body, json!({ "a": 1 }));
}

#[test]
fn test_handle_message_requires_method_and_url() {
    let router = echo_router();
    let recorder = Arc::new(Recorder::default());

    assert!(!block_on(handle_message(
        &router,
        recorder.clone(),
        message("1", None, Some("pets/1"))
    )));
    assert!(!block_on(handle_message(
        &router,
        recorder.clone(),
        message("2", Some("post"), None)
    )));
    assert!(!block_on(handle_message(
        &router,
        recorder.clone(),
        message("3", Some(""), Some("pets/1"))
    )));
    assert!(!block_on(handle_message(
        &router,
        recorder.clone(),
        message("4", Some("post"), Some(""))
    )));
    assert!(recorder.calls.lock().is_empty());
}

#[test]
fn test_handle_message_dispatches() {
    let router = echo_router();
    let recorder = Arc::new(Recorder::default());

    let handled = block_on(handle_message(
        &router,
        recorder.clone(),
        message("req-1", Some("POST"), Some("/pets/42?verbose=yes")),
    ));
    assert!(handled);
    assert_eq!(
        *recorder.calls.lock(),
        vec![(
            "req-1".to_string(),
            true,
            json!({
                "status": 201,
                "body": { "id": "42", "verbose": "yes", "echo": { "name": "rex" } }
            })
        )]
    );
}

#[test]
fn test_handle_message_not_found() {
    let router = echo_router();
    let recorder = Arc::new(Recorder::default());

    assert!(block_on(handle_message(
        &router,
        recorder.clone(),
        message("req-2", Some("get"), Some("cats"))
    )));
    let calls = recorder.calls.lock();
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].1);
    assert_eq!(
        calls[0].2,
        json!({ "status": 404, "body": { "message": HandlerError::NOT_FOUND } })
    );
}
