use thiserror::Error;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Note not found: {id}")]
    NoteNotFound { id: i32 },

    #[error("User not found: {key}")]
    UserNotFound { key: String },

    #[error("Note {id} belongs to another user")]
    NoteForbidden { id: i32 },

    #[error("Validation failed: {}", summarize(.errors))]
    Validation { errors: Vec<FieldError> },

    #[error("Authentication credentials were not provided or are invalid")]
    NotAuthenticated,

    #[error("Unable to log in with provided credentials")]
    InvalidCredentials,

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl DomainError {
    pub fn note_not_found(id: i32) -> Self {
        Self::NoteNotFound { id }
    }

    pub fn user_not_found(key: impl ToString) -> Self {
        Self::UserNotFound {
            key: key.to_string(),
        }
    }

    pub fn note_forbidden(id: i32) -> Self {
        Self::NoteForbidden { id }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_fields() {
        let e = DomainError::Validation {
            errors: vec![
                FieldError::new("username", "This field may not be blank."),
                FieldError::new("password", "Ensure this field has at least 8 characters."),
            ],
        };
        let msg = e.to_string();
        assert!(msg.contains("username: This field may not be blank."));
        assert!(msg.contains("password: Ensure this field"));
    }
}
