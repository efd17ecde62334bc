use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::{DuplicateField, UserError};
use super::repo::{classify_conflict, UserRepository};
use super::repo_types::{NewUser, User};

/// In-process repository. `insert` enforces uniqueness itself, standing in for the
/// table constraints.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<User>>,
    blind_fast_path: AtomicBool,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `find_conflict` always miss, as if a concurrent insert landed between
    /// the check and the write.
    pub fn blind_fast_path(&self) {
        self.blind_fast_path.store(true, Ordering::SeqCst);
    }

    fn find<P>(&self, pred: P) -> Option<User>
    where
        P: Fn(&User) -> bool,
    {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        users.iter().find(|u| pred(u)).cloned()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_conflict(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<DuplicateField>, UserError> {
        if self.blind_fast_path.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(classify_conflict(
            users.iter().map(|u| (u.email.as_str(), u.username.as_str())),
            email,
            username,
        ))
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, UserError> {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(UserError::Duplicate(DuplicateField::Email));
        }
        if users.iter().any(|u| u.username == new_user.username) {
            return Err(UserError::Duplicate(DuplicateField::Username));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: new_user.id.unwrap_or_else(Uuid::new_v4),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            username: new_user.username,
            password_hash: new_user.password_hash,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
        Ok(self.find(|u| u.id == id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        Ok(self.find(|u| u.email == email))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserError> {
        Ok(self.find(|u| u.username == username))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>, UserError> {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.is_active = active;
            u.updated_at = OffsetDateTime::now_utc();
            u.clone()
        }))
    }

    async fn count(&self) -> Result<i64, UserError> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(users.len() as i64)
    }
}
