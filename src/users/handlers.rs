use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::state::AppState;

use super::dto::{PublicUser, RegistrationRequest, VerifyRequest};
use super::error::UserError;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/:username", get(get_user))
        .route("/users/:id/deactivate", post(deactivate))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/verify", post(verify_credentials))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegistrationRequest>,
) -> Result<(StatusCode, HeaderMap, Json<PublicUser>), UserError> {
    let user = state.users.register(payload).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/users/{}", user.username)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(user.into())))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<PublicUser>, UserError> {
    match state.users.get_by_username(&username).await? {
        Some(user) => Ok(Json(user.into())),
        None => Err(UserError::NotFound(format!("user {username}"))),
    }
}

#[instrument(skip(state))]
pub async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, UserError> {
    let user = state.users.deactivate(id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn verify_credentials(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<PublicUser>, Response> {
    match state
        .users
        .authenticate(&payload.username, &payload.password)
        .await
    {
        Ok(Some(user)) => {
            info!(user_id = %user.id, "credentials verified");
            Ok(Json(user.into()))
        }
        Ok(None) => {
            warn!("invalid credentials");
            Err((
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "Invalid credentials",
                    "code": "INVALID_CREDENTIALS",
                })),
            )
                .into_response())
        }
        Err(e) => Err(e.into_response()),
    }
}
