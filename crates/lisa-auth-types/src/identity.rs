//! Bearer-token identity extractor.

use axum::Json;
use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::response::{IntoResponse, Response};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use http::StatusCode;
use http::request::Parts;
use uuid::Uuid;

use lisa_domain::user::UserRole;

use crate::token::validate_access_token;

/// HMAC secret used to validate access tokens. Provide it from the service
/// state with a `FromRef` impl.
#[derive(Debug, Clone)]
pub struct TokenSecret(pub String);

/// Caller identity taken from `Authorization: Bearer <access token>`.
///
/// Returns 401 if the header is absent or the token does not validate.
/// Role enforcement (403) is done after extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: UserRole,
}

/// 401 rejection rendered as `{"kind":"INVALID_TOKEN","message":..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRejection {
    MissingToken,
    InvalidToken,
}

impl IdentityRejection {
    fn message(self) -> &'static str {
        match self {
            Self::MissingToken => "missing bearer token",
            Self::InvalidToken => "invalid token",
        }
    }
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "kind": "INVALID_TOKEN",
            "message": self.message(),
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

fn bearer_identity(parts: &Parts, secret: &str) -> Option<Result<Identity, IdentityRejection>> {
    let header = parts.headers.typed_get::<Authorization<Bearer>>();
    if header.is_none() && parts.headers.contains_key(http::header::AUTHORIZATION) {
        return Some(Err(IdentityRejection::InvalidToken));
    }
    let Authorization(bearer) = header?;
    Some(
        validate_access_token(bearer.token(), secret)
            .map(|info| Identity {
                user_id: info.user_id,
                role: info.role,
            })
            .map_err(|_| IdentityRejection::InvalidToken),
    )
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    TokenSecret: FromRef<S>,
{
    type Rejection = IdentityRejection;

    // axum-core 0.5 declares `fn -> impl Future + Send`; do the work up front and
    // return a 'static future.
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let TokenSecret(secret) = TokenSecret::from_ref(state);
        let result =
            bearer_identity(parts, &secret).unwrap_or(Err(IdentityRejection::MissingToken));
        async move { result }
    }
}

/// `Option<Identity>`: `None` without an `Authorization` header, 401 when the
/// header is present but invalid.
impl<S> OptionalFromRequestParts<S> for Identity
where
    S: Send + Sync,
    TokenSecret: FromRef<S>,
{
    type Rejection = IdentityRejection;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Option<Self>, Self::Rejection>> + Send {
        let TokenSecret(secret) = TokenSecret::from_ref(state);
        let result = bearer_identity(parts, &secret).transpose();
        async move { result }
    }
}
