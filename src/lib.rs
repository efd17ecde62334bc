//! User registration and credential storage over PostgreSQL.

pub mod app;
pub mod config;
pub mod state;
pub mod users;

pub use config::{AppConfig, HasherConfig, IdStrategy};
pub use state::AppState;
