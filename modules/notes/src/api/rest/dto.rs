use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::contract::model::{NewNote, NewUser, Note, NotePatch, User};

/// Public user representation; the password is write-only and never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NoteDto {
    pub id: i32,
    pub text: String,
    pub date_created: DateTime<Utc>,
    pub date_edited: DateTime<Utc>,
    /// Owner; always the authenticated creator.
    pub user: UserDto,
}

/// Note body for create/replace/patch. Read-only fields (`id`, dates, `user`) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NoteReq {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterReq {
    pub username: Option<String>,
    pub email: Option<String>,
    /// Write-only; at least 8 characters by default.
    #[schema(min_length = 8, format = Password)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub username: Option<String>,
    #[schema(format = Password)]
    pub password: Option<String>,
}

/// Issued at login; send it back as `Authorization: Token <token>`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenDto {
    pub token: String,
    pub user: UserDto,
}

// Conversion implementations between REST DTOs and contract models

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

impl From<Note> for NoteDto {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            text: note.text,
            date_created: note.date_created,
            date_edited: note.date_edited,
            user: note.user.into(),
        }
    }
}

// A missing field becomes an empty value so the domain reports it as blank.

impl From<NoteReq> for NewNote {
    fn from(req: NoteReq) -> Self {
        Self {
            text: req.text.unwrap_or_default(),
        }
    }
}

impl NoteReq {
    /// PUT semantics: `text` must be present.
    pub fn into_replacement(self) -> NotePatch {
        NotePatch {
            text: Some(self.text.unwrap_or_default()),
        }
    }
}

impl From<NoteReq> for NotePatch {
    fn from(req: NoteReq) -> Self {
        Self { text: req.text }
    }
}

impl From<RegisterReq> for NewUser {
    fn from(req: RegisterReq) -> Self {
        Self {
            username: req.username.unwrap_or_default(),
            email: req.email,
            password: req.password.unwrap_or_default(),
        }
    }
}
