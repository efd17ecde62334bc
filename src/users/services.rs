use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::IdStrategy;

use super::dto::RegistrationRequest;
use super::error::UserError;
use super::password::PasswordHasher;
use super::repo::UserRepository;
use super::repo_types::{NewUser, User};
use super::validation::{normalize_email, normalize_username, validate_registration};

/// Registration, lookup and credential checks over a [`UserRepository`].
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    hasher: Arc<PasswordHasher>,
    id_strategy: IdStrategy,
}

impl UserService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        hasher: Arc<PasswordHasher>,
        id_strategy: IdStrategy,
    ) -> Self {
        Self {
            repo,
            hasher,
            id_strategy,
        }
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Validates, checks for duplicates, hashes and persists a new user.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegistrationRequest) -> Result<User, UserError> {
        let valid = validate_registration(input).map_err(|errors| {
            warn!(%errors, "registration rejected");
            UserError::Validation(errors)
        })?;

        if let Some(field) = self
            .repo
            .find_conflict(&valid.email, &valid.username)
            .await?
        {
            warn!(%field, "registration conflicts with an existing user");
            return Err(UserError::Duplicate(field));
        }

        let password_hash = self.hasher.hash(&valid.password)?;

        let id = match self.id_strategy {
            IdStrategy::Client => Some(Uuid::new_v4()),
            IdStrategy::Database => None,
        };

        let user = self
            .repo
            .insert(NewUser {
                id,
                first_name: valid.first_name,
                last_name: valid.last_name,
                email: valid.email,
                username: valid.username,
                password_hash,
            })
            .await
            .inspect_err(|e| {
                if let UserError::Duplicate(field) = e {
                    warn!(%field, "unique constraint rejected registration");
                }
            })?;

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Absence is `Ok(None)`, never an error.
    #[instrument(skip(self))]
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserError> {
        self.repo.find_by_username(&normalize_username(username)).await
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
        self.repo.find_by_id(id).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        self.repo.find_by_email(&normalize_email(email)).await
    }

    /// Returns the user only if it exists, is active, and the password matches.
    ///
    /// Every path runs one Argon2 verification, so timing does not reveal whether
    /// the username exists.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, UserError> {
        let Some(user) = self
            .repo
            .find_by_username(&normalize_username(username))
            .await?
        else {
            self.hasher.verify_dummy(password);
            warn!("authenticate: unknown username");
            return Ok(None);
        };
        let password_ok = user.verify_password(&self.hasher, password)?;
        if !user.is_active {
            warn!(user_id = %user.id, "authenticate: inactive user");
            return Ok(None);
        }
        if !password_ok {
            warn!(user_id = %user.id, "authenticate: wrong password");
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Soft-deletes by clearing `is_active`.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<User, UserError> {
        let user = self
            .repo
            .set_active(id, false)
            .await?
            .ok_or_else(|| UserError::NotFound(format!("user {id}")))?;
        info!(user_id = %user.id, "user deactivated");
        Ok(user)
    }

    pub async fn count(&self) -> Result<i64, UserError> {
        self.repo.count().await
    }
}
