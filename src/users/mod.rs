use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod error;
pub mod handlers;
#[cfg(test)]
pub(crate) mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod validation;

pub use error::{DuplicateField, UserError, ValidationErrors};
pub use password::{PasswordError, PasswordHasher};
pub use repo::{PgUserRepository, UserRepository};
pub use repo_types::{NewUser, User};
pub use services::UserService;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::user_routes())
        .merge(handlers::auth_routes())
}
