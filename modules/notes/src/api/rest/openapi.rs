use modkit::api::problem::{Problem, ValidationError};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::rest::dto::{LoginReq, NoteDto, NoteReq, RegisterReq, TokenDto, UserDto};
use crate::api::rest::handlers;

/// OpenAPI document for the notes REST surface; merged into the ingress document.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_notes,
        handlers::create_note,
        handlers::get_note,
        handlers::replace_note,
        handlers::update_note,
        handlers::delete_note,
        handlers::list_users,
        handlers::register,
        handlers::get_user,
        handlers::me,
        handlers::login,
        handlers::logout,
    ),
    components(schemas(
        NoteDto,
        NoteReq,
        UserDto,
        RegisterReq,
        LoginReq,
        TokenDto,
        Problem,
        ValidationError
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "notes", description = "Personal notes of the authenticated user"),
        (name = "users", description = "User accounts"),
        (name = "auth", description = "API token issue and revocation"),
    )
)]
pub struct NotesApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "token",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "Authorization",
                "`Token <key>` with a key issued by /auth/login/",
            ))),
        );
        components.add_security_scheme("basic", SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_all_routes() {
        let doc = NotesApiDoc::openapi();
        for p in [
            "/notes/",
            "/notes/{id}/",
            "/users/",
            "/users/register/",
            "/users/{id}/",
            "/users/me/",
            "/auth/login/",
            "/auth/logout/",
        ] {
            assert!(doc.paths.paths.contains_key(p), "missing {p}");
        }
    }

    #[test]
    fn security_schemes_are_declared() {
        let doc = NotesApiDoc::openapi();
        let schemes = &doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("token"));
        assert!(schemes.contains_key("basic"));
    }
}
