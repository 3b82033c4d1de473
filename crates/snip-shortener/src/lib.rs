//! URL lifecycle on top of any storage engine.
//!
//! [`ShortenerService`] pairs a [`snip_core::Repository`] with a
//! [`snip_generator::Generator`] and implements the "already shortened"
//! rule shared by every transport.

pub mod error;
pub mod service;

pub use error::ShortenerError;
pub use service::{ShortenerService, MAX_TOKEN_ATTEMPTS};
