//! Request body extractor accepting JSON, urlencoded forms and multipart forms.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    Form,
};
use modkit::api::problem::ProblemResponse;
use serde::de::DeserializeOwned;

use crate::api::rest::error::malformed_body;

/// Deserialized request body. The content type picks the decoder:
/// `application/json` (also assumed when absent), `application/x-www-form-urlencoded`
/// or `multipart/form-data`. An empty JSON body reads as `{}`.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

enum BodyKind {
    Json,
    UrlEncoded,
    Multipart,
    Unsupported(String),
}

fn body_kind(content_type: Option<&str>) -> BodyKind {
    let Some(ct) = content_type else {
        return BodyKind::Json;
    };
    let essence = ct
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "" | "application/json" => BodyKind::Json,
        "application/x-www-form-urlencoded" => BodyKind::UrlEncoded,
        "multipart/form-data" => BodyKind::Multipart,
        other if other.ends_with("+json") => BodyKind::Json,
        other => BodyKind::Unsupported(other.to_string()),
    }
}

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ProblemResponse;

    #[allow(clippy::manual_async_fn)]
    fn from_request(
        req: Request,
        state: &S,
    ) -> impl core::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let instance = req.uri().path().to_owned();
            let content_type = req
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);

            match body_kind(content_type.as_deref()) {
                BodyKind::Json => {
                    let bytes = Bytes::from_request(req, state)
                        .await
                        .map_err(|e| malformed_body(e.status(), e.body_text(), &instance))?;
                    let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
                        b"{}"
                    } else {
                        &bytes
                    };
                    serde_json::from_slice(body).map(Payload).map_err(|e| {
                        malformed_body(StatusCode::BAD_REQUEST, format!("JSON parse error - {e}"), &instance)
                    })
                }
                BodyKind::UrlEncoded => Form::<T>::from_request(req, state)
                    .await
                    .map(|Form(v)| Payload(v))
                    .map_err(|e| malformed_body(e.status(), e.body_text(), &instance)),
                BodyKind::Multipart => {
                    let mut multipart = Multipart::from_request(req, state)
                        .await
                        .map_err(|e| malformed_body(e.status(), e.body_text(), &instance))?;

                    // Text fields only; repeated names keep the last value
                    let mut fields = serde_json::Map::new();
                    while let Some(field) = multipart
                        .next_field()
                        .await
                        .map_err(|e| malformed_body(e.status(), e.body_text(), &instance))?
                    {
                        let Some(name) = field.name().map(str::to_owned) else {
                            continue;
                        };
                        let value = field
                            .text()
                            .await
                            .map_err(|e| malformed_body(e.status(), e.body_text(), &instance))?;
                        fields.insert(name, serde_json::Value::String(value));
                    }

                    serde_json::from_value(serde_json::Value::Object(fields))
                        .map(Payload)
                        .map_err(|e| {
                            malformed_body(StatusCode::BAD_REQUEST, format!("Form parse error - {e}"), &instance)
                        })
                }
                BodyKind::Unsupported(ct) => Err(malformed_body(
                    StatusCode::BAD_REQUEST,
                    format!("Unsupported media type \"{ct}\" in request."),
                    &instance,
                )),
            }
        }
    }
}
