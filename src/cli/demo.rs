use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::chain::{error_handler, handler, HandlerResult, Next, Outcome};
use crate::error::{HandlerError, RegistrationError};
use crate::message::{MessageRequest, MessageResponse, MessageRouter};
use crate::router::Use;
use crate::server::{Request, Response};

/// Upper bound for `sleep/:ms`.
pub const MAX_SLEEP_MS: u64 = 10_000;

/// Router served by the replay command.
///
/// | Method | Path | Behaviour |
/// |--------|------|-----------|
/// | GET | `health` | `{"status":"ok"}` |
/// | GET | `echo/:word` | echoes the parameter and query |
/// | POST | `echo` | echoes the body |
/// | GET | `sleep/:ms` | answers after a delay (deferred) |
/// | any | `teapot` | fails with 418 |
///
/// # Errors
///
/// Only if a route pattern above fails to compile.
pub fn demo_router() -> Result<MessageRouter, RegistrationError> {
    let mut router = MessageRouter::new();
    router.use_(Use::Middleware(handler(log_request).into()))?;
    router
        .get("health", handler(health))?
        .get("echo/:word", handler(echo_word))?
        .post("echo", handler(echo_body))?
        .get(r"sleep/:ms(\d+)", handler(sleep))?
        .all("teapot", handler(teapot))?
        .error(error_handler(render_error))?;
    Ok(router)
}

fn log_request<'a>(
    req: &'a mut MessageRequest,
    _res: &'a mut MessageResponse,
    next: Next,
) -> HandlerResult<'a> {
    info!(id = %req.id(), method = %req.method(), url = %req.url(), "Request received");
    Ok(next.proceed())
}

fn health<'a>(
    _req: &'a mut MessageRequest,
    res: &'a mut MessageResponse,
    _next: Next,
) -> HandlerResult<'a> {
    res.send(json!({ "status": "ok" }))?;
    Ok(Outcome::halt())
}

fn echo_word<'a>(
    req: &'a mut MessageRequest,
    res: &'a mut MessageResponse,
    _next: Next,
) -> HandlerResult<'a> {
    res.send(json!({
        "word": req.params().get("word"),
        "query": req.query(),
    }))?;
    Ok(Outcome::halt())
}

fn echo_body<'a>(
    req: &'a mut MessageRequest,
    res: &'a mut MessageResponse,
    _next: Next,
) -> HandlerResult<'a> {
    res.status(201).send(req.body().clone())?;
    Ok(Outcome::halt())
}

fn sleep<'a>(
    req: &'a mut MessageRequest,
    res: &'a mut MessageResponse,
    _next: Next,
) -> HandlerResult<'a> {
    let ms: u64 = req
        .params()
        .get("ms")
        .unwrap_or_default()
        .parse()
        .map_err(|_| HandlerError::with_status(400, "ms must be a number"))?;
    let ms = ms.min(MAX_SLEEP_MS);

    Ok(Outcome::defer(async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        res.send(json!({ "slept_ms": ms })).map_err(HandlerError::from)
    }))
}

fn teapot<'a>(
    _req: &'a mut MessageRequest,
    _res: &'a mut MessageResponse,
    _next: Next,
) -> HandlerResult<'a> {
    Err(HandlerError::with_status(418, "I'm a teapot"))
}

fn render_error<'a>(
    err: &'a HandlerError,
    _req: &'a mut MessageRequest,
    res: &'a mut MessageResponse,
    _next: Next,
) -> HandlerResult<'a> {
    res.status(err.status.unwrap_or(500))
        .send(json!({ "error": err.message }))?;
    Ok(Outcome::halt())
}
