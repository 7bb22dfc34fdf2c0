use serde_json::Value;

use crate::error::ResponseDispatchError;

/// The response side of the router contract.
///
/// The router only calls these two methods itself, on the error path
/// (`res.status(code).send(body)`). Handlers are free to use whatever else
/// the concrete type offers.
pub trait Response: Send {
    /// Set the status code for the next `send`
    fn status(&mut self, code: u16) -> &mut Self;

    /// Deliver a body.
    ///
    /// An `Err` here while the router is sending an error is terminal: it is
    /// logged and no further response is attempted.
    fn send(&mut self, body: Value) -> Result<(), ResponseDispatchError>;
}
