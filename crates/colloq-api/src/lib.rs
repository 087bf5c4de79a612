//! colloq-api: Typed client for the colloq chat backend
//!
//! This crate defines the wire shapes of the chat service, validates
//! responses against them, and provides an HTTP implementation of the
//! [`ChatBackend`] boundary.

pub mod backend;
pub mod error;
pub mod types;

pub use backend::{ChatBackend, http::HttpBackend};
pub use error::{Error, Result};
pub use types::*;
