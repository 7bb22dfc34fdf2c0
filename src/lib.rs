//! # chainroute
//!
//! **chainroute** is a transport-agnostic request router. It matches requests
//! against literal and parameterized paths, runs ordered chains of middleware
//! and handlers (synchronous or deferred), and funnels every failure through a
//! layered error-handler pipeline.
//!
//! The router never touches sockets. Any transport plugs in by implementing
//! the two small traits in [`server`]; [`message`] is a ready-made adapter for
//! `{id, method, url, body}` request messages.
//!
//! ## Architecture
//!
//! - **[`chain`]** - method-tagged handler chains and their traversal
//! - **[`matcher`]** - path pattern compilation and matching
//! - **[`router`]** - route tables, middleware, mounting and dispatch
//! - **[`server`]** - the `Request` / `Response` contract and path parameters
//! - **[`message`]** - message transport adapter
//! - **[`error`]** - registration, handler and response errors
//! - **[`logging`]** - `tracing` subscriber setup for binaries
//! - **[`cli`]** - the `chainroute-replay` command
//!
//! ### Dispatch Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant T as Transport
//!     participant R as Router
//!     participant C as RouteChain
//!     participant E as Error chain
//!
//!     T->>R: handle(req, res)
//!     R->>R: clean path, exact lookup
//!     alt no literal route serves the method
//!         R->>R: scan pattern routes, set params
//!     end
//!     alt matched
//!         R->>C: traverse(req, res)
//!         C-->>R: Err(HandlerError)?
//!     else no match
//!         R->>R: HandlerError::not_found()
//!     end
//!     opt failure
//!         R->>E: traverse(req, res, error)
//!         E-->>R: Err(HandlerError)?
//!         R->>T: res.status(code).send(error)
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chainroute::chain::{handler, Next, Outcome};
//! use chainroute::message::{handle_message, Message, MessageRequest, MessageResponse, MessageRouter};
//! use chainroute::server::{Request, Response};
//! use serde_json::json;
//!
//! let mut router = MessageRouter::new();
//! router.get("pets/:id", handler(|req: &mut MessageRequest, res: &mut MessageResponse, _next: Next| {
//!     res.send(json!({ "id": req.params().get("id") }))?;
//!     Ok(Outcome::halt())
//! }))?;
//!
//! let router = std::sync::Arc::new(router);
//! handle_message(&router, responder, message).await;
//! ```
//!
//! ## Concurrency
//!
//! Registration takes `&mut Router`; dispatch takes `&Router`. Once built, a
//! router can be shared behind an `Arc` and any number of dispatches can run
//! at once. A dispatch suspends only while a deferred handler outcome is
//! pending, and there is no timeout on that wait.

pub mod chain;
pub mod cli;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod message;
pub mod router;
pub mod server;

pub use chain::{error_handler, handler, Handler, HandlerResult, MethodTag, Next, Outcome, RouteChain};
pub use error::{HandlerError, RegistrationError, ResponseDispatchError};
pub use matcher::PathMatcher;
pub use router::{RouteSource, Router, Use};
pub use server::{Params, Request, Response};
