use axum::routing::{get, post, MethodRouter};
use axum::{Extension, Router};
use modkit::api::OpenApiRegistry;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::api::rest::handlers;
use crate::api::rest::openapi::NotesApiDoc;
use crate::domain::service::Service;

/// Mount `route` at `path` (which ends with `/`) and at the same path without the slash.
fn both(router: Router, path: &str, route: MethodRouter) -> Router {
    let bare = path.trim_end_matches('/');
    router.route(path, route.clone()).route(bare, route)
}

pub fn register_routes(
    router: Router,
    openapi: &dyn OpenApiRegistry,
    service: Arc<Service>,
) -> anyhow::Result<Router> {
    let mut routes = Router::new();

    // notes
    routes = both(
        routes,
        "/notes/",
        get(handlers::list_notes).post(handlers::create_note),
    );
    routes = both(
        routes,
        "/notes/{id}/",
        get(handlers::get_note)
            .put(handlers::replace_note)
            .patch(handlers::update_note)
            .delete(handlers::delete_note),
    );

    // users; "/users/me/" is a static segment and wins over "{id}"
    routes = both(
        routes,
        "/users/",
        get(handlers::list_users).post(handlers::register),
    );
    routes = both(routes, "/users/register/", post(handlers::register));
    routes = both(routes, "/users/me/", get(handlers::me));
    routes = both(routes, "/users/{id}/", get(handlers::get_user));

    // auth
    routes = both(routes, "/auth/login/", post(handlers::login));
    routes = both(routes, "/users/login/", post(handlers::login));
    routes = both(routes, "/auth/logout/", post(handlers::logout));

    openapi.register_openapi(NotesApiDoc::openapi());

    tracing::debug!("notes routes registered");
    Ok(router.merge(routes.layer(Extension(service))))
}
