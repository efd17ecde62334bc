use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use super::password::PasswordError;

/// Field name → message for every rule the input broke.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Which unique column a registration collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateField {
    Email,
    Username,
}

impl DuplicateField {
    /// Maps a Postgres unique constraint name back to the column it guards.
    pub fn from_constraint(name: &str) -> Option<Self> {
        match name {
            "users_email_key" => Some(DuplicateField::Email),
            "users_username_key" => Some(DuplicateField::Username),
            _ => None,
        }
    }
}

impl std::fmt::Display for DuplicateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateField::Email => f.write_str("email"),
            DuplicateField::Username => f.write_str("username"),
        }
    }
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0} already registered")]
    Duplicate(DuplicateField),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl UserError {
    /// Translates a unique violation on `users` into `Duplicate`; anything else stays a store error.
    pub fn from_insert(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                if let Some(field) = db_err.constraint().and_then(DuplicateField::from_constraint) {
                    return UserError::Duplicate(field);
                }
            }
        }
        UserError::Store(err)
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            UserError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "Validation failed",
                    "code": "VALIDATION_ERROR",
                    "fields": fields,
                }),
            ),
            UserError::Duplicate(field) => (
                StatusCode::CONFLICT,
                serde_json::json!({
                    "error": format!("{field} already registered"),
                    "code": "DUPLICATE_USER",
                    "field": field,
                }),
            ),
            UserError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": msg, "code": "NOT_FOUND" }),
            ),
            UserError::Store(e) => {
                error!(error = %e, "store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Database error", "code": "INTERNAL_ERROR" }),
                )
            }
            UserError::Password(e) => {
                error!(error = %e, "password error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Internal error", "code": "INTERNAL_ERROR" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
