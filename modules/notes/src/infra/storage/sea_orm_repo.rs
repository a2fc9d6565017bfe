//! SeaORM-backed repository implementation for the domain ports.
//!
//! Generic over `C: ConnectionTrait + TransactionTrait`, so it works with a
//! `DatabaseConnection` or inside an outer transaction.

use anyhow::Context;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};

use crate::contract::model::{DeletedUser, Note, User};
use crate::domain::repo::{
    NewUserRecord, NotesRepository, TokensRepository, UserCredentials, UsernameTaken,
    UsersRepository,
};
use crate::infra::storage::entity::{auth_token, note, user};
use crate::infra::storage::mapper::note_to_contract;

/// SeaORM repository impl.
/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

fn with_owner(row: (note::Model, Option<user::Model>)) -> anyhow::Result<Note> {
    let (n, owner) = row;
    let owner = owner.with_context(|| format!("note {} has no owner row", n.id))?;
    Ok(note_to_contract(n, owner.into()))
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<User>> {
        let found = user::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find user by id failed")?;
        Ok(found.map(Into::into))
    }

    async fn find_credentials(&self, username: &str) -> anyhow::Result<Option<UserCredentials>> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("find user by username failed")?;
        Ok(found.map(|m| UserCredentials {
            password_hash: m.password_hash.clone(),
            user: m.into(),
        }))
    }

    async fn username_exists(&self, username: &str) -> anyhow::Result<bool> {
        let count = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .count(&self.conn)
            .await
            .context("username_exists failed")?;
        Ok(count > 0)
    }

    async fn insert(&self, record: NewUserRecord) -> anyhow::Result<User> {
        let username = record.username.clone();
        let m = user::ActiveModel {
            id: NotSet,
            username: Set(record.username),
            email: Set(record.email),
            password_hash: Set(record.password_hash),
            date_joined: Set(record.date_joined),
        };
        match m.insert(&self.conn).await {
            Ok(saved) => Ok(saved.into()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(UsernameTaken(username).into())
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user failed")),
        }
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let rows = user::Entity::find()
            .order_by_asc(user::Column::Id)
            .all(&self.conn)
            .await
            .context("list users failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_cascade(&self, username: &str) -> anyhow::Result<Option<DeletedUser>> {
        let txn = self.conn.begin().await.context("begin failed")?;

        let Some(found) = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&txn)
            .await
            .context("find user by username failed")?
        else {
            txn.rollback().await.context("rollback failed")?;
            return Ok(None);
        };

        // Explicit deletes keep the result independent of FK enforcement
        let tokens = auth_token::Entity::delete_many()
            .filter(auth_token::Column::UserId.eq(found.id))
            .exec(&txn)
            .await
            .context("delete user tokens failed")?
            .rows_affected;
        let notes = note::Entity::delete_many()
            .filter(note::Column::UserId.eq(found.id))
            .exec(&txn)
            .await
            .context("delete user notes failed")?
            .rows_affected;
        user::Entity::delete_by_id(found.id)
            .exec(&txn)
            .await
            .context("delete user failed")?;

        txn.commit().await.context("commit failed")?;

        Ok(Some(DeletedUser {
            user: found.into(),
            notes,
            tokens,
        }))
    }
}

#[async_trait::async_trait]
impl<C> NotesRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Note>> {
        let found = note::Entity::find_by_id(id)
            .find_also_related(user::Entity)
            .one(&self.conn)
            .await
            .context("find note by id failed")?;
        found.map(with_owner).transpose()
    }

    async fn list_by_owner(&self, owner_id: i32) -> anyhow::Result<Vec<Note>> {
        let rows = note::Entity::find()
            .filter(note::Column::UserId.eq(owner_id))
            .order_by_desc(note::Column::DateEdited)
            .order_by_desc(note::Column::Id)
            .find_also_related(user::Entity)
            .all(&self.conn)
            .await
            .context("list notes failed")?;
        rows.into_iter().map(with_owner).collect()
    }

    async fn insert(&self, owner: &User, text: String, at: DateTime<Utc>) -> anyhow::Result<Note> {
        let m = note::ActiveModel {
            id: NotSet,
            text: Set(text),
            date_created: Set(at),
            date_edited: Set(at),
            user_id: Set(owner.id),
        };
        let saved = m.insert(&self.conn).await.context("insert note failed")?;
        Ok(note_to_contract(saved, owner.clone()))
    }

    async fn update(&self, id: i32, text: String, edited_at: DateTime<Utc>) -> anyhow::Result<bool> {
        let res = note::Entity::update_many()
            .col_expr(note::Column::Text, Expr::value(text))
            .col_expr(note::Column::DateEdited, Expr::value(edited_at))
            .filter(note::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("update note failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn delete(&self, id: i32) -> anyhow::Result<bool> {
        let res = note::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("delete note failed")?;
        Ok(res.rows_affected > 0)
    }
}

#[async_trait::async_trait]
impl<C> TokensRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn insert(&self, user_id: i32, key_hash: String, at: DateTime<Utc>) -> anyhow::Result<()> {
        let m = auth_token::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            key_hash: Set(key_hash),
            created_at: Set(at),
        };
        let _ = m.insert(&self.conn).await.context("insert token failed")?;
        Ok(())
    }

    async fn find_user(&self, key_hash: &str) -> anyhow::Result<Option<User>> {
        let found = auth_token::Entity::find()
            .filter(auth_token::Column::KeyHash.eq(key_hash))
            .find_also_related(user::Entity)
            .one(&self.conn)
            .await
            .context("find token failed")?;
        Ok(found.and_then(|(_, owner)| owner).map(Into::into))
    }

    async fn delete(&self, key_hash: &str) -> anyhow::Result<bool> {
        let res = auth_token::Entity::delete_many()
            .filter(auth_token::Column::KeyHash.eq(key_hash))
            .exec(&self.conn)
            .await
            .context("delete token failed")?;
        Ok(res.rows_affected > 0)
    }
}
