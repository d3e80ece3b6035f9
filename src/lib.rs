pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod state;
pub mod webhooks;

pub use app::{app, cors_layer};
pub use state::AppState;
