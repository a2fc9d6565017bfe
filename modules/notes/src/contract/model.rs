use chrono::{DateTime, Utc};

/// Registered user, as exposed to other modules. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Empty when the user registered without an email.
    pub email: String,
    pub date_joined: DateTime<Utc>,
}

/// A note together with its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: i32,
    pub text: String,
    pub date_created: DateTime<Utc>,
    pub date_edited: DateTime<Utc>,
    pub user: User,
}

/// Registration input
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub text: String,
}

/// Partial note update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub text: Option<String>,
}

/// Outcome of removing a user together with everything they own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedUser {
    pub user: User,
    pub notes: u64,
    pub tokens: u64,
}
