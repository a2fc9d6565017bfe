use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::{debug, info, instrument, warn};

use crate::contract::model::{DeletedUser, NewNote, NewUser, Note, NotePatch, User};
use crate::domain::error::{DomainError, FieldError};
use crate::domain::password::Hasher;
use crate::domain::repo::{
    NewUserRecord, NotesRepository, TokensRepository, UserCredentials, UsernameTaken,
    UsersRepository,
};
use crate::domain::{token, validation};

/// Domain service with the business rules for users, credentials and notes.
/// Depends only on the repository ports, not on infra types.
#[derive(Clone)]
pub struct Service {
    users: Arc<dyn UsersRepository>,
    notes: Arc<dyn NotesRepository>,
    tokens: Arc<dyn TokensRepository>,
    hasher: Hasher,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub min_password_length: usize,
    pub max_username_length: usize,
    pub allow_basic_auth: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            min_password_length: 8,
            max_username_length: 150,
            allow_basic_auth: true,
        }
    }
}

/// Result of a successful login: the raw key is only ever returned here.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

/// Current time at the storage precision (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Edit timestamp strictly after `previous`, even if the clock has not moved.
pub fn next_edit_time(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

fn db_err(e: anyhow::Error) -> DomainError {
    DomainError::database(format!("{e:#}"))
}

impl Service {
    pub fn new(
        users: Arc<dyn UsersRepository>,
        notes: Arc<dyn NotesRepository>,
        tokens: Arc<dyn TokensRepository>,
        hasher: Hasher,
        config: ServiceConfig,
    ) -> Self {
        Self {
            users,
            notes,
            tokens,
            hasher,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ---- users & credentials ----

    #[instrument(
        name = "notes.service.register",
        skip(self, new_user),
        fields(username = %new_user.username)
    )]
    pub async fn register(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Registering new user");

        let username = new_user.username.trim().to_string();
        let email = new_user
            .email
            .map(|e| e.trim().to_string())
            .unwrap_or_default();

        let mut errors = Vec::new();
        let username_ok =
            validation::check_username(&username, self.config.max_username_length, &mut errors);
        validation::check_email(&email, &mut errors);
        validation::check_password(
            &new_user.password,
            self.config.min_password_length,
            &mut errors,
        );

        if username_ok && self.users.username_exists(&username).await.map_err(db_err)? {
            errors.push(Self::username_taken());
        }
        if !errors.is_empty() {
            debug!(count = errors.len(), "Registration rejected");
            return Err(DomainError::Validation { errors });
        }

        let password_hash = self.hash_password(new_user.password).await?;
        let record = NewUserRecord {
            username,
            email,
            password_hash,
            date_joined: now(),
        };

        let user = match self.users.insert(record).await {
            Ok(user) => user,
            // lost a race with a concurrent registration
            Err(e) if e.downcast_ref::<UsernameTaken>().is_some() => {
                return Err(DomainError::Validation {
                    errors: vec![Self::username_taken()],
                })
            }
            Err(e) => return Err(db_err(e)),
        };

        info!(user_id = user.id, "Successfully registered user");
        Ok(user)
    }

    fn username_taken() -> FieldError {
        FieldError::new("username", "A user with that username already exists.")
    }

    #[instrument(name = "notes.service.login", skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, DomainError> {
        let mut errors = Vec::new();
        if username.trim().is_empty() {
            errors.push(FieldError::new("username", validation::BLANK));
        }
        if password.is_empty() {
            errors.push(FieldError::new("password", validation::BLANK));
        }
        if !errors.is_empty() {
            return Err(DomainError::Validation { errors });
        }

        let user = self
            .check_password(username.trim(), password)
            .await?
            .ok_or(DomainError::InvalidCredentials)?;

        let key = token::generate_key();
        self.tokens
            .insert(user.id, token::hash_key(&key), now())
            .await
            .map_err(db_err)?;

        info!(user_id = user.id, "Issued API token");
        Ok(LoginOutcome { token: key, user })
    }

    /// Revoke a token; `false` when it was already gone.
    #[instrument(name = "notes.service.logout", skip_all)]
    pub async fn logout(&self, key: &str) -> Result<bool, DomainError> {
        let removed = self
            .tokens
            .delete(&token::hash_key(key))
            .await
            .map_err(db_err)?;
        debug!(removed, "Token revoked");
        Ok(removed)
    }

    #[instrument(name = "notes.service.authenticate_token", skip_all)]
    pub async fn authenticate_token(&self, key: &str) -> Result<User, DomainError> {
        self.tokens
            .find_user(&token::hash_key(key))
            .await
            .map_err(db_err)?
            .ok_or(DomainError::NotAuthenticated)
    }

    #[instrument(name = "notes.service.authenticate_basic", skip(self, password))]
    pub async fn authenticate_basic(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User, DomainError> {
        if !self.config.allow_basic_auth {
            return Err(DomainError::NotAuthenticated);
        }
        self.check_password(username, password)
            .await?
            .ok_or(DomainError::NotAuthenticated)
    }

    /// The user when `password` matches, `None` for unknown users and mismatches alike.
    async fn check_password(&self, username: &str, password: &str) -> Result<Option<User>, DomainError> {
        let Some(UserCredentials {
            user,
            password_hash,
        }) = self
            .users
            .find_credentials(username)
            .await
            .map_err(db_err)?
        else {
            debug!("Unknown username");
            return Ok(None);
        };

        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
            .await
            .map_err(|e| DomainError::internal(format!("password verification task failed: {e}")))?;

        if matches {
            Ok(Some(user))
        } else {
            debug!("Password mismatch");
            Ok(None)
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, DomainError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| DomainError::internal(format!("password hashing task failed: {e}")))?
    }

    #[instrument(name = "notes.service.get_user", skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: i32) -> Result<User, DomainError> {
        debug!("Getting user by id");
        self.users
            .find_by_id(id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    #[instrument(name = "notes.service.list_users", skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        let users = self.users.list().await.map_err(db_err)?;
        debug!("Listed {} users", users.len());
        Ok(users)
    }

    #[instrument(name = "notes.service.delete_user", skip(self))]
    pub async fn delete_user(&self, username: &str) -> Result<DeletedUser, DomainError> {
        info!("Deleting user with notes and tokens");
        let deleted = self
            .users
            .delete_cascade(username)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::user_not_found(username))?;
        info!(
            user_id = deleted.user.id,
            notes = deleted.notes,
            tokens = deleted.tokens,
            "User deleted"
        );
        Ok(deleted)
    }

    // ---- notes ----

    #[instrument(name = "notes.service.list_notes", skip(self, requester), fields(user_id = requester.id))]
    pub async fn list_notes(&self, requester: &User) -> Result<Vec<Note>, DomainError> {
        let notes = self
            .notes
            .list_by_owner(requester.id)
            .await
            .map_err(db_err)?;
        debug!("Listed {} notes", notes.len());
        Ok(notes)
    }

    #[instrument(name = "notes.service.create_note", skip(self, requester, new_note), fields(user_id = requester.id))]
    pub async fn create_note(&self, requester: &User, new_note: NewNote) -> Result<Note, DomainError> {
        let text = validation::clean_text(&new_note.text).map_err(|e| DomainError::Validation {
            errors: vec![e],
        })?;

        let note = self
            .notes
            .insert(requester, text, now())
            .await
            .map_err(db_err)?;
        info!(note_id = note.id, "Created note");
        Ok(note)
    }

    /// Load a note and make sure `requester` owns it.
    /// Every single-note read or write goes through here first.
    async fn authorize_note(&self, requester: &User, id: i32) -> Result<Note, DomainError> {
        let note = self
            .notes
            .find_by_id(id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::note_not_found(id))?;

        if note.user.id != requester.id {
            warn!(
                note_id = id,
                owner_id = note.user.id,
                requester_id = requester.id,
                "Denied access to another user's note"
            );
            return Err(DomainError::note_forbidden(id));
        }
        Ok(note)
    }

    #[instrument(name = "notes.service.get_note", skip(self, requester), fields(user_id = requester.id))]
    pub async fn get_note(&self, requester: &User, id: i32) -> Result<Note, DomainError> {
        self.authorize_note(requester, id).await
    }

    /// Apply `patch`; `date_edited` moves forward even when nothing else changes.
    #[instrument(name = "notes.service.update_note", skip(self, requester, patch), fields(user_id = requester.id))]
    pub async fn update_note(
        &self,
        requester: &User,
        id: i32,
        patch: NotePatch,
    ) -> Result<Note, DomainError> {
        let current = self.authorize_note(requester, id).await?;

        let text = match patch.text {
            Some(t) => validation::clean_text(&t).map_err(|e| DomainError::Validation {
                errors: vec![e],
            })?,
            None => current.text.clone(),
        };
        let date_edited = next_edit_time(current.date_edited, now());

        let updated = self
            .notes
            .update(id, text.clone(), date_edited)
            .await
            .map_err(db_err)?;
        if !updated {
            return Err(DomainError::note_not_found(id));
        }

        info!(note_id = id, "Updated note");
        Ok(Note {
            text,
            date_edited,
            ..current
        })
    }

    #[instrument(name = "notes.service.delete_note", skip(self, requester), fields(user_id = requester.id))]
    pub async fn delete_note(&self, requester: &User, id: i32) -> Result<(), DomainError> {
        self.authorize_note(requester, id).await?;

        let deleted = self.notes.delete(id).await.map_err(db_err)?;
        if !deleted {
            return Err(DomainError::note_not_found(id));
        }
        info!(note_id = id, "Deleted note");
        Ok(())
    }
}
