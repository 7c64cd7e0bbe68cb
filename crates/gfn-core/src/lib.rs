//! # GFN-Core
//!
//! Configuration, stream layout types and errors for the Gated Field
//! Network, independent of the tensor framework that runs it.

pub mod config;
pub mod error;
pub mod types;

pub use self::config::*;
pub use error::{Error, Result};
pub use types::*;
