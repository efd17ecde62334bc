use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;
use crate::users::{PasswordHasher, PgUserRepository, UserRepository, UserService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserService,
}

impl AppState {
    /// Wires the Postgres-backed user service from config.
    pub fn with_postgres(config: Arc<AppConfig>, db: PgPool) -> anyhow::Result<Self> {
        let repo = Arc::new(PgUserRepository::new(db)) as Arc<dyn UserRepository>;
        Self::from_parts(config, repo)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        repo: Arc<dyn UserRepository>,
    ) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(config.hasher).context("build password hasher")?;
        let users = UserService::new(repo, Arc::new(hasher), config.id_strategy);
        Ok(Self { config, users })
    }
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}
