use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::{DuplicateField, UserError};
use super::repo_types::{NewUser, User};

/// Persistence for [`User`] records.
///
/// Implementations must enforce uniqueness of `email` and `username` at write time
/// and report a collision as [`UserError::Duplicate`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fast-path lookup of an existing record sharing the email or the username.
    async fn find_conflict(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<DuplicateField>, UserError>;

    async fn insert(&self, new_user: NewUser) -> Result<User, UserError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserError>;

    /// Sets `is_active` and refreshes `updated_at`. `None` when the id is unknown.
    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>, UserError>;

    async fn count(&self) -> Result<i64, UserError>;
}

/// Picks the reported field; email wins when both collide.
pub(crate) fn classify_conflict<'a, I>(
    rows: I,
    email: &str,
    username: &str,
) -> Option<DuplicateField>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut found = None;
    for (row_email, row_username) in rows {
        if row_email == email {
            return Some(DuplicateField::Email);
        }
        if row_username == username {
            found = Some(DuplicateField::Username);
        }
    }
    found
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn conflict_in<'e, E>(
        executor: E,
        email: &str,
        username: &str,
    ) -> Result<Option<DuplicateField>, UserError>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT email, username
            FROM users
            WHERE email = $1 OR username = $2
            "#,
        )
        .bind(email)
        .bind(username)
        .fetch_all(executor)
        .await?;
        Ok(classify_conflict(
            rows.iter().map(|(e, u)| (e.as_str(), u.as_str())),
            email,
            username,
        ))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_conflict(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<DuplicateField>, UserError> {
        Self::conflict_in(&self.db, email, username).await
    }

    /// Re-checks and inserts inside one transaction. The unique constraints stay the
    /// final word: a concurrent insert that slips past the check surfaces as 23505.
    async fn insert(&self, new_user: NewUser) -> Result<User, UserError> {
        let mut tx = self.db.begin().await?;

        if let Some(field) =
            Self::conflict_in(&mut *tx, &new_user.email, &new_user.username).await?
        {
            warn!(%field, "conflict found inside insert transaction");
            return Err(UserError::Duplicate(field));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, first_name, last_name, email, username, password_hash)
            VALUES (COALESCE($1, gen_random_uuid()), $2, $3, $4, $5, $6)
            RETURNING id, first_name, last_name, email, username, password_hash,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(new_user.id)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(UserError::from_insert)?;

        tx.commit().await.map_err(UserError::from_insert)?;
        debug!(user_id = %user.id, "user row inserted");
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, username, password_hash,
                   is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, username, password_hash,
                   is_active, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, username, password_hash,
                   is_active, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>, UserError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_active = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, first_name, last_name, email, username, password_hash,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(active)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn count(&self) -> Result<i64, UserError> {
        let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}
