use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
    response::{IntoResponse, Response},
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::api::rest::error::map_domain_error;
use crate::contract::model::User;
use crate::domain::error::DomainError;
use crate::domain::service::Service;

/// Value of `WWW-Authenticate` on 401 responses.
pub const AUTH_SCHEME: &str = "Token";

/// Credentials carried by the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Token <key>` or `Bearer <key>`
    Token(String),
    /// `Basic base64(username:password)`
    Basic { username: String, password: String },
}

/// Parse an `Authorization` header value. `None` for unknown schemes and
/// malformed values.
pub fn parse_authorization(value: &str) -> Option<Credentials> {
    let (scheme, rest) = value.trim().split_once(' ')?;
    let rest = rest.trim();
    if rest.is_empty() || rest.contains(' ') {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        return Some(Credentials::Token(rest.to_owned()));
    }
    if scheme.eq_ignore_ascii_case("basic") {
        let decoded = STANDARD.decode(rest).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        return Some(Credentials::Basic {
            username: username.to_owned(),
            password: password.to_owned(),
        });
    }
    None
}

/// 401 problem with the `WWW-Authenticate` challenge.
pub fn unauthorized(e: &DomainError, instance: &str) -> Response {
    let mut resp = map_domain_error(e, instance).into_response();
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(AUTH_SCHEME));
    resp
}

/// The authenticated requester.
///
/// Resolved from the `Authorization` header against the service in the
/// request extensions. `token` holds the raw key when token auth was used.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: Option<String>,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    #[allow(clippy::manual_async_fn)]
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl core::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let instance = parts.uri.path().to_owned();

            let Some(svc) = parts.extensions.get::<Arc<Service>>().cloned() else {
                tracing::error!("notes service missing from request extensions");
                return Err(map_domain_error(
                    &DomainError::internal("service not wired"),
                    &instance,
                )
                .into_response());
            };

            let credentials = parts
                .headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_authorization);

            let result = match credentials {
                Some(Credentials::Token(key)) => svc
                    .authenticate_token(&key)
                    .await
                    .map(|user| CurrentUser {
                        user,
                        token: Some(key),
                    }),
                Some(Credentials::Basic { username, password }) => svc
                    .authenticate_basic(&username, &password)
                    .await
                    .map(|user| CurrentUser { user, token: None }),
                None => Err(DomainError::NotAuthenticated),
            };

            result.map_err(|e| match e {
                DomainError::NotAuthenticated => unauthorized(&e, &instance),
                other => map_domain_error(&other, &instance).into_response(),
            })
        }
    }
}
