//! # CLI Module
//!
//! Command-line front end for exercising a router without a network
//! transport. It serves a small demonstration router (see [`demo_router`])
//! through the message adapter.
//!
//! ## Commands
//!
//! ### `replay`
//!
//! Reads newline-delimited JSON messages, dispatches them all concurrently and
//! prints one JSON line per response:
//!
//! ```bash
//! printf '%s\n' \
//!     '{"id":"1","method":"get","url":"sleep/200"}' \
//!     '{"id":"2","method":"get","url":"echo/hi?x=1"}' \
//!     | chainroute-replay replay
//! # {"id":"2","ok":true,"payload":{"status":200,"body":{"word":"hi","query":{"x":["1"]}}}}
//! # {"id":"1","ok":true,"payload":{"status":200,"body":{"slept_ms":200}}}
//! ```
//!
//! Options:
//! - `--input <FILE>` - read messages from a file instead of stdin
//!
//! ### `routes`
//!
//! Prints the demo router's routing table.
//!
//! ## Global options
//!
//! - `--log-level <LEVEL>` (env `CHAINROUTE_LOG_LEVEL`)
//! - `--log-format <json|pretty>` (env `CHAINROUTE_LOG_FORMAT`)
//!
//! Logs go to stderr, responses to stdout.

mod commands;
mod demo;


pub use commands::{
    open_input, replay, route_table, run_cli, ChannelResponder, Cli, Commands, ReplayLine,
    ReplaySummary,
};
pub use demo::{demo_router, MAX_SLEEP_MS};
