//! Bearer-token helpers for router tests.
//!
//! `MockAuth` signs a real access token with the test secret so requests pass
//! through the same `Identity` extractor as production traffic.

use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use uuid::Uuid;

use lisa_auth_types::token::{TokenKind, issue_token};
use lisa_domain::user::UserRole;

pub struct MockAuth {
    pub user_id: Uuid,
    pub role: UserRole,
    pub secret: String,
}

impl MockAuth {
    pub fn new(user_id: Uuid, role: UserRole, secret: &str) -> Self {
        Self {
            user_id,
            role,
            secret: secret.to_owned(),
        }
    }

    pub fn customer(secret: &str) -> Self {
        Self::new(Uuid::now_v7(), UserRole::Customer, secret)
    }

    pub fn admin(secret: &str) -> Self {
        Self::new(Uuid::now_v7(), UserRole::Admin, secret)
    }

    /// Signed access token valid for ten minutes.
    pub fn access_token(&self) -> String {
        issue_token(
            self.user_id,
            self.role,
            TokenKind::Access,
            600,
            &self.secret,
        )
        .expect("sign test token")
        .token
    }

    /// `Authorization: Bearer <token>` value.
    pub fn bearer(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", self.access_token()))
            .expect("bearer header value")
    }

    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, self.bearer());
        map
    }
}
