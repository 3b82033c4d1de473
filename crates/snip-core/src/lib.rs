//! Core types and traits for the snip URL shortener.
//!
//! This crate provides the record model, the token type, the storage error
//! enum and the storage contract shared by every engine and by the
//! shortener service.

pub mod error;
pub mod repository;
pub mod token;

pub use error::{ErrorKind, StorageError};
pub use repository::{Repository, StorageType, UrlRecord};
pub use token::Token;
