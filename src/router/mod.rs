//! # Router Module
//!
//! The router owns four things: a table of literal routes, an ordered list of
//! pattern routes, the global middleware chain and the global error-handler
//! chain. Every registration call ends up appending a [`RouteChain`] to one or
//! more of them.
//!
//! ## Registration
//!
//! ```rust,ignore
//! use chainroute::chain::{handler, Next, Outcome};
//! use chainroute::router::{Router, Use};
//!
//! let mut api = Router::new();
//! api.get("users/:id", handler(|req: &mut MyRequest, res: &mut MyResponse, _next: Next| {
//!     res.status(200).send(json!({ "id": req.params().get("id") }))?;
//!     Ok(Outcome::halt())
//! }))?;
//!
//! let mut root = Router::new();
//! root.use_(Use::Middleware(handler(log_request).into()))?;
//! root.mount("api", &api)?;
//! ```
//!
//! Middleware is copied into every route that exists when it is registered and
//! seeds every route created afterwards, so it always runs before route
//! handlers registered later. Mounting re-registers the sub-router's routes on
//! the parent, which puts the parent's middleware in front of them.
//!
//! ## Dispatch
//!
//! [`Router::handle`] takes `&self`, so a finished router can be shared across
//! tasks with an `Arc` and dispatch any number of requests concurrently. Each
//! dispatch traverses its own copy of the matched chain.
//!
//! Resolution order:
//!
//! 1. literal route whose chain serves the method
//! 2. first pattern route (in registration order) that matches the path and
//!    serves the method
//! 3. a synthesized 404 handed to the error handlers
//!
//! [`RouteChain`]: crate::chain::RouteChain

mod core;
mod dispatch;
#[cfg(test)]
mod tests;

pub use core::{PatternRouteEntry, Paths, RouteEntry, RouteSource, Router, Use};
pub use dispatch::send_error;
