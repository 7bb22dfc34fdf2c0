//! # Route Chain Module
//!
//! A route chain is the ordered list of method-tagged handlers that run for a
//! matched request. Chains are the single building block of the router: routes,
//! middleware and error handlers are all chains, and every registration call is
//! ultimately an [`RouteChain::append`].
//!
//! ## Handlers
//!
//! A [`Handler`] comes in two shapes:
//!
//! - [`Handler::Route`] is called as `(request, response, next)`
//! - [`Handler::Error`] is called as `(error, request, response, next)` and only
//!   runs while an error is being propagated
//!
//! Both return a [`HandlerResult`]. `Err` is a synchronous failure. `Ok` carries
//! an [`Outcome`]:
//!
//! - `next.proceed()` continues with the next matching entry
//! - [`Outcome::halt`] stops the chain (the handler answered the request)
//! - [`Outcome::defer`] suspends the chain until a future settles; `Ok(())`
//!   continues, `Err` fails
//!
//! `Next` is consumed by `proceed`, so a handler can continue a chain at most once.
//!
//! ## Example
//!
//! ```rust,ignore
//! use chainroute::chain::{handler, MethodTag, Outcome, RouteChain};
//!
//! let chain = RouteChain::create(
//!     MethodTag::Get,
//!     handler(|req: &mut MyRequest, res: &mut MyResponse, next| {
//!         res.set_header("x-seen", "1");
//!         Ok(next.proceed())
//!     }),
//! )?;
//! ```
//!
//! ## Traversal
//!
//! [`RouteChain::traverse`] walks the chain with an index cursor, so a chain
//! can be traversed by any number of concurrent dispatches. Entries whose method
//! tag is neither `all` nor the request method are skipped. Handler panics are
//! caught and reported as 500 errors, the same way synchronous failures are.

mod core;

pub use core::{
    error_handler, handler, ChainEntry, ErrorFn, HandledMethods, Handler, HandlerResult,
    Handlers, MethodTag, Next, Outcome, RouteChain, RouteFn, Traversal,
};
