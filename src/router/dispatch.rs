use serde_json::json;
use tracing::{debug, error, info, warn};

use super::core::Router;
use crate::chain::{RouteChain, Traversal};
use crate::error::HandlerError;
use crate::matcher::clean_request_path;
use crate::server::{Params, Request, Response};

/// Chain selected for a request, with the parameters of a pattern match.
struct Resolved<Req, Res> {
    chain: RouteChain<Req, Res>,
    params: Option<Params>,
    route: String,
}

impl<Req: Request, Res: Response> Router<Req, Res> {
    /// Dispatch one request.
    ///
    /// Literal routes are tried first, then pattern routes in registration
    /// order. The first pattern whose path matches and whose chain serves the
    /// request method wins; a path match without a method match keeps scanning.
    /// No match, or any failure while running the chain, goes to the error
    /// handlers. If those fail too, or none are registered, the error is sent
    /// as the response.
    ///
    /// Handlers may answer the request themselves; the router only writes to
    /// `res` when sending an error.
    pub async fn handle(&self, req: &mut Req, res: &mut Res) {
        let path = clean_request_path(req.url()).to_string();
        let method = req.method().to_string();

        debug!(method = %method, path = %path, "Route match attempt");

        let Some(resolved) = self.resolve(&path, &method) else {
            warn!(method = %method, path = %path, "No route matched");
            self.dispatch_error(req, res, HandlerError::not_found()).await;
            return;
        };

        info!(
            method = %method,
            path = %path,
            route = %resolved.route,
            path_params = ?resolved.params,
            "Route matched"
        );

        if let Some(params) = resolved.params {
            req.set_params(params);
        }

        match resolved.chain.traverse(req, res, None).await {
            Ok(Traversal::Exhausted) => {
                debug!(method = %method, path = %path, "Chain exhausted");
            }
            Ok(Traversal::Halted) => {}
            Err(err) => self.dispatch_error(req, res, err).await,
        }
    }

    fn resolve(&self, path: &str, method: &str) -> Option<Resolved<Req, Res>> {
        if let Some(entry) = self.routes.get(path) {
            if entry.handled_methods.supports(method) {
                return Some(Resolved {
                    chain: entry.chain.clone(),
                    params: None,
                    route: path.to_string(),
                });
            }
            debug!(
                method = %method,
                path = %path,
                handled_methods = ?entry.handled_methods,
                "Literal route does not serve method, trying patterns"
            );
        }

        self.pattern_routes.iter().find_map(|entry| {
            if !entry.handled_methods.supports(method) {
                return None;
            }
            let params = entry.matcher.captures(path)?;
            Some(Resolved {
                chain: entry.chain.clone(),
                params: Some(params),
                route: entry.pattern().to_string(),
            })
        })
    }

    /// Run the error-handler chain for `err`, sending `err` directly when no
    /// error handlers exist and sending whatever the chain fails with.
    async fn dispatch_error(&self, req: &mut Req, res: &mut Res, err: HandlerError) {
        let chain = self.error_handlers.clone();
        if chain.is_empty() {
            send_error(res, err);
            return;
        }

        debug!(error = %err, handlers = chain.len(), "Running error handlers");
        if let Err(failure) = chain.traverse(req, res, Some(&err)).await {
            warn!(
                original = %err,
                error = %failure,
                "Error handler failed, sending its error"
            );
            send_error(res, failure);
        }
    }
}

/// Send an error as the response.
///
/// The status field is removed from `err` and used as the response status
/// (500 when absent); the rest of the error is the body. A failed send is
/// logged and dropped.
pub fn send_error<Res: Response>(res: &mut Res, mut err: HandlerError) {
    let status = err.take_status().unwrap_or(500);
    let body = serde_json::to_value(&err).unwrap_or_else(|e| {
        error!(error = %e, "Failed to serialize error body");
        json!({ "message": err.message })
    });

    if let Err(e) = res.status(status).send(body) {
        error!(status, error = %e, "Failed to send error response");
    }
}
