//! # Path Matcher
//!
//! Compiles route paths into matchers and provides the slash handling shared by
//! registration and dispatch.
//!
//! ## Overview
//!
//! A route path is classified when it is registered:
//!
//! - **Exact routes** contain no parameter syntax and are resolved by a direct
//!   table lookup on the cleaned request path.
//! - **Pattern routes** contain at least one parameter and compile to an anchored,
//!   case-insensitive regular expression plus the ordered list of parameter names
//!   that correspond to its capture groups.
//!
//! ## Pattern Syntax
//!
//! | Syntax          | Meaning                                              |
//! |-----------------|------------------------------------------------------|
//! | `:id`           | named segment, matches `[^/]+?`                      |
//! | `:id(\d+)`      | named parameter with a custom group                  |
//! | `(\d+)`         | unnamed parameter, keyed by its index (`"0"`, ...)   |
//! | `:id?`          | optional; absorbs the preceding `/` or `.`           |
//! | `:path*`        | zero or more segments                                |
//! | `:path+`        | one or more segments                                 |
//! | `*`             | unnamed wildcard, matches anything                   |
//! | `\:`            | literal character                                    |
//!
//! A trailing `/` on the request path is tolerated.
//!
//! ## Example
//!
//! ```rust
//! use chainroute::matcher::PathMatcher;
//!
//! let matcher = PathMatcher::compile("users/:id/posts/:post_id").unwrap();
//! let params = matcher.captures("users/42/posts/abc").unwrap();
//! assert_eq!(params.get("id"), Some("42"));
//! assert_eq!(params.get("post_id"), Some("abc"));
//! ```

mod core;
mod path;

pub use core::{PathMatcher, PatternMatcher};
pub use path::{clean_request_path, combine_urls, trim_slashes};
