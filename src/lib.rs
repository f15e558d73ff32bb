pub mod config;
pub mod dns;
pub mod emitter;
pub mod endpoint;
mod error;
pub mod trace;
pub use error::{Error, Result};

pub const TRACEPOST_VERSION: &str = "tracepost 0.1.0";
