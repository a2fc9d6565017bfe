use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::contract::model::{DeletedUser, Note, User};

/// User row as needed for credential checks.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Everything needed to persist a newly registered user.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

/// Returned (inside `anyhow::Error`) by [`UsersRepository::insert`] when the
/// username unique constraint rejects the row.
#[derive(Debug, Error)]
#[error("username '{0}' is already taken")]
pub struct UsernameTaken(pub String);

/// Port for the domain layer: persistence operations the domain needs.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<User>>;

    async fn find_credentials(&self, username: &str) -> anyhow::Result<Option<UserCredentials>>;

    async fn username_exists(&self, username: &str) -> anyhow::Result<bool>;

    /// Insert and return the stored user with its generated id.
    async fn insert(&self, record: NewUserRecord) -> anyhow::Result<User>;

    /// All users ordered by id.
    async fn list(&self) -> anyhow::Result<Vec<User>>;

    /// Remove the user, their notes and their tokens atomically.
    /// `None` when no such user exists.
    async fn delete_cascade(&self, username: &str) -> anyhow::Result<Option<DeletedUser>>;
}

#[async_trait]
pub trait NotesRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Note>>;

    /// Notes of one owner, most recently edited first (ties by id, newest first).
    async fn list_by_owner(&self, owner_id: i32) -> anyhow::Result<Vec<Note>>;

    async fn insert(&self, owner: &User, text: String, at: DateTime<Utc>) -> anyhow::Result<Note>;

    /// `false` when the note no longer exists.
    async fn update(&self, id: i32, text: String, edited_at: DateTime<Utc>) -> anyhow::Result<bool>;

    async fn delete(&self, id: i32) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait TokensRepository: Send + Sync {
    async fn insert(&self, user_id: i32, key_hash: String, at: DateTime<Utc>) -> anyhow::Result<()>;

    /// Owner of the token with this key hash.
    async fn find_user(&self, key_hash: &str) -> anyhow::Result<Option<User>>;

    async fn delete(&self, key_hash: &str) -> anyhow::Result<bool>;
}
