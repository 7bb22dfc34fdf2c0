//! # Server Contract
//!
//! The router never sees sockets, frames or serialization. It works against two
//! small traits that any transport can implement:
//!
//! - [`Request`] exposes the method and url and accepts the path parameters the
//!   router extracts from a pattern route.
//! - [`Response`] is what the error pipeline needs: a chainable `status` and a
//!   fallible `send`.
//!
//! Handlers are generic over the concrete types, so a transport can add any
//! fields it likes (headers, body, query) and handlers can read them directly.

pub mod request;
pub mod response;

pub use request::{ParamVec, Params, Request, MAX_INLINE_PARAMS};
pub use response::Response;

#[cfg(test)]
pub(crate) mod mock;
