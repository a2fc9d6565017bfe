use std::sync::Arc;

use axum::{
    extract::Path,
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use modkit::api::problem::{Problem, ProblemResponse};
use tracing::{error, info};

use crate::api::rest::auth::CurrentUser;
use crate::api::rest::dto::{LoginReq, NoteDto, NoteReq, RegisterReq, TokenDto, UserDto};
use crate::api::rest::error::map_domain_error;
use crate::api::rest::extract::Payload;
use crate::domain::service::Service;

// ---- notes ----

/// List the requester's notes, most recently edited first
#[utoipa::path(
    get,
    path = "/notes/",
    tag = "notes",
    operation_id = "notes.list_notes",
    responses(
        (status = 200, description = "Notes of the requester", body = [NoteDto]),
        (status = 401, description = "Not authenticated", body = Problem, content_type = "application/problem+json"),
    ),
    security(("token" = []))
)]
pub async fn list_notes(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser { user, .. }: CurrentUser,
    uri: Uri,
) -> Result<Json<Vec<NoteDto>>, ProblemResponse> {
    info!(user_id = user.id, "Listing notes");

    match svc.list_notes(&user).await {
        Ok(notes) => Ok(Json(notes.into_iter().map(NoteDto::from).collect())),
        Err(e) => {
            error!("Failed to list notes: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Create a note owned by the requester
#[utoipa::path(
    post,
    path = "/notes/",
    tag = "notes",
    operation_id = "notes.create_note",
    request_body(content = NoteReq, description = "Note text; also accepted as a form"),
    responses(
        (status = 201, description = "Created note", body = NoteDto),
        (status = 400, description = "Invalid body", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Not authenticated", body = Problem, content_type = "application/problem+json"),
    ),
    security(("token" = []))
)]
pub async fn create_note(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser { user, .. }: CurrentUser,
    Payload(req_body): Payload<NoteReq>,
) -> Result<(StatusCode, Json<NoteDto>), ProblemResponse> {
    info!(user_id = user.id, "Creating note");

    match svc.create_note(&user, req_body.into()).await {
        Ok(note) => Ok((StatusCode::CREATED, Json(NoteDto::from(note)))),
        Err(e) => {
            error!("Failed to create note: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get one of the requester's notes
#[utoipa::path(
    get,
    path = "/notes/{id}/",
    tag = "notes",
    operation_id = "notes.get_note",
    params(("id" = i32, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note found", body = NoteDto),
        (status = 401, description = "Not authenticated", body = Problem, content_type = "application/problem+json"),
        (status = 403, description = "Note belongs to another user", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json"),
    ),
    security(("token" = []))
)]
pub async fn get_note(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<i32>,
    uri: Uri,
) -> Result<Json<NoteDto>, ProblemResponse> {
    info!(user_id = user.id, "Getting note with id: {}", id);

    match svc.get_note(&user, id).await {
        Ok(note) => Ok(Json(NoteDto::from(note))),
        Err(e) => {
            error!("Failed to get note {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Replace the note text
#[utoipa::path(
    put,
    path = "/notes/{id}/",
    tag = "notes",
    operation_id = "notes.replace_note",
    params(("id" = i32, Path, description = "Note id")),
    request_body(content = NoteReq, description = "Full note; `text` is required"),
    responses(
        (status = 200, description = "Updated note", body = NoteDto),
        (status = 400, description = "Invalid body", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Not authenticated", body = Problem, content_type = "application/problem+json"),
        (status = 403, description = "Note belongs to another user", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json"),
    ),
    security(("token" = []))
)]
pub async fn replace_note(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<i32>,
    Payload(req_body): Payload<NoteReq>,
) -> Result<Json<NoteDto>, ProblemResponse> {
    info!(user_id = user.id, "Replacing note {}", id);

    match svc
        .update_note(&user, id, req_body.into_replacement())
        .await
    {
        Ok(note) => Ok(Json(NoteDto::from(note))),
        Err(e) => {
            error!("Failed to replace note {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Partially update a note; `date_edited` is refreshed even for an empty patch
#[utoipa::path(
    patch,
    path = "/notes/{id}/",
    tag = "notes",
    operation_id = "notes.update_note",
    params(("id" = i32, Path, description = "Note id")),
    request_body(content = NoteReq, description = "Fields to change"),
    responses(
        (status = 200, description = "Updated note", body = NoteDto),
        (status = 400, description = "Invalid body", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Not authenticated", body = Problem, content_type = "application/problem+json"),
        (status = 403, description = "Note belongs to another user", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json"),
    ),
    security(("token" = []))
)]
pub async fn update_note(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<i32>,
    Payload(req_body): Payload<NoteReq>,
) -> Result<Json<NoteDto>, ProblemResponse> {
    info!(user_id = user.id, "Updating note {}", id);

    match svc.update_note(&user, id, req_body.into()).await {
        Ok(note) => Ok(Json(NoteDto::from(note))),
        Err(e) => {
            error!("Failed to update note {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Delete a note
#[utoipa::path(
    delete,
    path = "/notes/{id}/",
    tag = "notes",
    operation_id = "notes.delete_note",
    params(("id" = i32, Path, description = "Note id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not authenticated", body = Problem, content_type = "application/problem+json"),
        (status = 403, description = "Note belongs to another user", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json"),
    ),
    security(("token" = []))
)]
pub async fn delete_note(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<i32>,
    uri: Uri,
) -> Result<StatusCode, ProblemResponse> {
    info!(user_id = user.id, "Deleting note: {}", id);

    match svc.delete_note(&user, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to delete note {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

// ---- users ----

/// List all users
#[utoipa::path(
    get,
    path = "/users/",
    tag = "users",
    operation_id = "notes.list_users",
    responses(
        (status = 200, description = "Users ordered by id", body = [UserDto]),
        (status = 401, description = "Not authenticated", body = Problem, content_type = "application/problem+json"),
    ),
    security(("token" = []))
)]
pub async fn list_users(
    Extension(svc): Extension<Arc<Service>>,
    _requester: CurrentUser,
    uri: Uri,
) -> Result<Json<Vec<UserDto>>, ProblemResponse> {
    match svc.list_users().await {
        Ok(users) => Ok(Json(users.into_iter().map(UserDto::from).collect())),
        Err(e) => {
            error!("Failed to list users: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/users/register/",
    tag = "users",
    operation_id = "notes.register",
    request_body(content = RegisterReq, description = "Username, optional email and password; also accepted as a form"),
    responses(
        (status = 201, description = "Registered user", body = UserDto),
        (status = 400, description = "Validation error", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn register(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Payload(req_body): Payload<RegisterReq>,
) -> Result<(StatusCode, Json<UserDto>), ProblemResponse> {
    info!("Registering user");

    match svc.register(req_body.into()).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(UserDto::from(user)))),
        Err(e) => {
            info!("Registration rejected: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/users/{id}/",
    tag = "users",
    operation_id = "notes.get_user",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserDto),
        (status = 401, description = "Not authenticated", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json"),
    ),
    security(("token" = []))
)]
pub async fn get_user(
    Extension(svc): Extension<Arc<Service>>,
    _requester: CurrentUser,
    Path(id): Path<i32>,
    uri: Uri,
) -> Result<Json<UserDto>, ProblemResponse> {
    match svc.get_user(id).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            error!("Failed to get user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// The authenticated user
#[utoipa::path(
    get,
    path = "/users/me/",
    tag = "users",
    operation_id = "notes.me",
    responses(
        (status = 200, description = "Requester", body = UserDto),
        (status = 401, description = "Not authenticated", body = Problem, content_type = "application/problem+json"),
    ),
    security(("token" = []))
)]
pub async fn me(CurrentUser { user, .. }: CurrentUser) -> Json<UserDto> {
    Json(UserDto::from(user))
}

// ---- auth ----

/// Exchange username and password for an API token
#[utoipa::path(
    post,
    path = "/auth/login/",
    tag = "auth",
    operation_id = "notes.login",
    request_body(content = LoginReq, description = "Credentials; also accepted as a form"),
    responses(
        (status = 200, description = "Token issued", body = TokenDto),
        (status = 400, description = "Missing fields", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Invalid credentials", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn login(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Payload(req_body): Payload<LoginReq>,
) -> Result<Json<TokenDto>, ProblemResponse> {
    let username = req_body.username.unwrap_or_default();
    let password = req_body.password.unwrap_or_default();

    match svc.login(&username, &password).await {
        Ok(outcome) => Ok(Json(TokenDto {
            token: outcome.token,
            user: outcome.user.into(),
        })),
        Err(e) => {
            info!("Login rejected: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Revoke the token used for this request
#[utoipa::path(
    post,
    path = "/auth/logout/",
    tag = "auth",
    operation_id = "notes.logout",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Not authenticated", body = Problem, content_type = "application/problem+json"),
    ),
    security(("token" = []))
)]
pub async fn logout(
    Extension(svc): Extension<Arc<Service>>,
    requester: CurrentUser,
    uri: Uri,
) -> Result<StatusCode, ProblemResponse> {
    // Basic-authenticated requests have no token to revoke
    if let Some(key) = requester.token.as_deref() {
        if let Err(e) = svc.logout(key).await {
            error!("Failed to revoke token: {}", e);
            return Err(map_domain_error(&e, uri.path()));
        }
    }
    info!(user_id = requester.user.id, "Logged out");
    Ok(StatusCode::NO_CONTENT)
}
