use axum::http::StatusCode;
use modkit::api::problem::{Problem, ProblemResponse, ValidationError};

use crate::domain::error::DomainError;

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    ProblemResponse(problem(status, code, title, detail, instance))
}

fn problem(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> Problem {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.example.com/{code}"))
        .with_code(code)
        .with_instance(instance);

    // Add trace id from current tracing span if available
    if let Some(id) = tracing::Span::current().id() {
        problem.with_trace_id(id.into_u64().to_string())
    } else {
        problem
    }
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::NoteNotFound { id } => from_parts(
            StatusCode::NOT_FOUND,
            "NOTES_NOT_FOUND",
            "Note not found",
            format!("Note with id {id} was not found"),
            instance,
        ),
        DomainError::UserNotFound { key } => from_parts(
            StatusCode::NOT_FOUND,
            "USERS_NOT_FOUND",
            "User not found",
            format!("User {key} was not found"),
            instance,
        ),
        DomainError::NoteForbidden { .. } => from_parts(
            StatusCode::FORBIDDEN,
            "NOTES_FORBIDDEN",
            "Forbidden",
            "You do not have permission to perform this action.",
            instance,
        ),
        DomainError::Validation { errors } => {
            let field_errors = errors
                .iter()
                .map(|f| ValidationError {
                    detail: f.message.clone(),
                    pointer: format!("/{}", f.field),
                })
                .collect();
            ProblemResponse(
                problem(
                    StatusCode::BAD_REQUEST,
                    "NOTES_VALIDATION",
                    "Validation error",
                    e.to_string(),
                    instance,
                )
                .with_errors(field_errors),
            )
        }
        DomainError::NotAuthenticated => from_parts(
            StatusCode::UNAUTHORIZED,
            "NOTES_NOT_AUTHENTICATED",
            "Not authenticated",
            "Authentication credentials were not provided or are invalid.",
            instance,
        ),
        DomainError::InvalidCredentials => from_parts(
            StatusCode::UNAUTHORIZED,
            "NOTES_INVALID_CREDENTIALS",
            "Invalid credentials",
            "Unable to log in with provided credentials.",
            instance,
        ),
        DomainError::Database { .. } | DomainError::Internal { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Internal error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_DB",
                "Internal error",
                "An internal error occurred",
                instance,
            )
        }
    }
}

/// Body could not be read or parsed.
pub fn malformed_body(status: StatusCode, detail: impl Into<String>, instance: &str) -> ProblemResponse {
    from_parts(status, "NOTES_MALFORMED_BODY", "Malformed request body", detail, instance)
}
