//! Configuration for exemplar.
//!
//! Precedence is CLI > `.exemplar/config.toml` > built-in defaults.

mod config;

pub use config::*;
