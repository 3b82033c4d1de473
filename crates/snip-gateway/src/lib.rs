//! HTTP front end for the snip URL shortener.

pub mod app;
pub mod auth;
pub mod cli;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;
pub mod worker;

pub use app::App;
pub use state::AppState;
