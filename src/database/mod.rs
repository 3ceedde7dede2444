pub mod models;
pub mod schema;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::error::LgtmError;
use models::{Repo, User};

/// Lookups the webhook flow needs from persistent storage.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_repo_by_slug(&self, slug: &str) -> Result<Option<Repo>, LgtmError>;

    async fn get_user(&self, id: i64) -> Result<Option<User>, LgtmError>;
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, LgtmError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Database { pool })
    }

    /// Single-connection in-memory database; every connection to
    /// `sqlite::memory:` would otherwise see its own empty schema.
    pub async fn new_in_memory() -> Result<Self, LgtmError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Database { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<(), LgtmError> {
        for statement in schema::MIGRATIONS {
            sqlx::query(*statement).execute(&self.pool).await?;
        }
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn create_user(
        &self,
        login: &str,
        token: &str,
        avatar: &str,
    ) -> Result<User, LgtmError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, token, avatar)
            VALUES (?, ?, ?)
            ON CONFLICT (login) DO UPDATE SET
                token = excluded.token,
                avatar = excluded.avatar
            RETURNING id, login, token, avatar
            "#,
        )
        .bind(login)
        .bind(token)
        .bind(avatar)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn create_repo(&self, user_id: i64, repo: &Repo) -> Result<Repo, LgtmError> {
        let repo = sqlx::query_as::<_, Repo>(
            r#"
            INSERT INTO repos (user_id, owner, name, slug, link, private)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, user_id, owner, name, slug, link, private
            "#,
        )
        .bind(user_id)
        .bind(&repo.owner)
        .bind(&repo.name)
        .bind(&repo.slug)
        .bind(&repo.link)
        .bind(repo.private)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LgtmError::DatabaseError(format!("Error creating repo {}: {}", repo.slug, e)))?;
        Ok(repo)
    }

    pub async fn get_user_by_login(&self, login: &str) -> Result<Option<User>, LgtmError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, login, token, avatar FROM users WHERE login = ?",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Returns whether a repository was removed.
    pub async fn delete_repo(&self, slug: &str) -> Result<bool, LgtmError> {
        let result = sqlx::query("DELETE FROM repos WHERE slug = ?")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for Database {
    async fn get_repo_by_slug(&self, slug: &str) -> Result<Option<Repo>, LgtmError> {
        let repo = sqlx::query_as::<_, Repo>(
            "SELECT id, user_id, owner, name, slug, link, private FROM repos WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(repo)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, LgtmError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, login, token, avatar FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
