#![allow(dead_code)]

pub mod doubles {
    use chainroute::{Params, Request, Response, ResponseDispatchError};
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::Arc;

    /// Shared, ordered record of handler activity across concurrent dispatches.
    #[derive(Clone, Default)]
    pub struct Journal(Arc<Mutex<Vec<String>>>);

    impl Journal {
        pub fn push(&self, entry: impl Into<String>) {
            self.0.lock().push(entry.into());
        }

        pub fn entries(&self) -> Vec<String> {
            self.0.lock().clone()
        }
    }

    /// Request double that records which handlers saw it.
    #[derive(Debug, Default)]
    pub struct TestRequest {
        pub method: String,
        pub url: String,
        pub params: Params,
        pub seen: Vec<String>,
    }

    impl TestRequest {
        pub fn new(method: &str, url: &str) -> Self {
            Self {
                method: method.to_string(),
                url: url.to_string(),
                ..Default::default()
            }
        }
    }

    impl Request for TestRequest {
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

    /// Response double that keeps every delivered body.
    #[derive(Debug)]
    pub struct TestResponse {
        pub status: u16,
        pub sent: Vec<(u16, Value)>,
        pub fail_send: bool,
    }

    impl Default for TestResponse {
        fn default() -> Self {
            Self {
                status: 200,
                sent: Vec::new(),
                fail_send: false,
            }
        }
    }

    impl Response for TestResponse {
        fn status(&mut self, code: u16) -> &mut Self {
            self.status = code;
            self
        }

        fn send(&mut self, body: Value) -> Result<(), ResponseDispatchError> {
            if self.fail_send {
                return Err(ResponseDispatchError::new("peer gone"));
            }
            self.sent.push((self.status, body));
            Ok(())
        }
    }
}

pub mod handlers {
    use super::doubles::{TestRequest, TestResponse};
    use chainroute::{handler, Handler, Next, Outcome, Response};
    use serde_json::json;

    pub type TestHandler = Handler<TestRequest, TestResponse>;

    /// Record `name` and continue.
    pub fn mark(name: &'static str) -> TestHandler {
        handler(move |req: &mut TestRequest, _res: &mut TestResponse, next: Next| {
            req.seen.push(name.to_string());
            Ok(next.proceed())
        })
    }

    /// Record `name`, answer `{"handler": name}` and stop.
    pub fn reply(name: &'static str) -> TestHandler {
        handler(move |req: &mut TestRequest, res: &mut TestResponse, _next: Next| {
            req.seen.push(name.to_string());
            res.status(200).send(json!({ "handler": name }))?;
            Ok(Outcome::halt())
        })
    }
}

pub mod tracing_util {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Install a test-friendly subscriber once per test binary.
    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("chainroute=debug")
                .with_test_writer()
                .try_init();
        });
    }
}
