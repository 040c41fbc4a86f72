use uuid::Uuid;

use lisa_auth_types::token::{AuthError, TokenKind, issue_token, validate_token};

use crate::domain::repository::UserRepository;
use crate::domain::types::User;
use crate::error::ShopError;

/// Lifetimes and signing secret for issued sessions.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub jwt_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

/// Bearer access token plus refresh token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub access_token: String,
    pub access_token_exp: u64,
    pub refresh_token: String,
    pub refresh_token_exp: u64,
}

fn internal(e: AuthError) -> ShopError {
    ShopError::Internal(anyhow::Error::new(e).context("sign session token"))
}

pub fn issue_session(user: &User, settings: &TokenSettings) -> Result<Session, ShopError> {
    let access = issue_token(
        user.id,
        user.role,
        TokenKind::Access,
        settings.access_ttl_secs,
        &settings.jwt_secret,
    )
    .map_err(internal)?;
    let refresh = issue_token(
        user.id,
        user.role,
        TokenKind::Refresh,
        settings.refresh_ttl_secs,
        &settings.jwt_secret,
    )
    .map_err(internal)?;
    Ok(Session {
        user_id: user.id,
        access_token: access.token,
        access_token_exp: access.exp,
        refresh_token: refresh.token,
        refresh_token_exp: refresh.exp,
    })
}

// ── RefreshSession ───────────────────────────────────────────────────────────

pub struct RefreshSessionUseCase<U: UserRepository> {
    pub users: U,
    pub tokens: TokenSettings,
}

impl<U: UserRepository> RefreshSessionUseCase<U> {
    /// Trade a valid refresh token for a new pair. The role is re-read from the
    /// account so promotions and demotions take effect on refresh.
    pub async fn execute(&self, refresh_token: &str) -> Result<Session, ShopError> {
        let info = validate_token(refresh_token, TokenKind::Refresh, &self.tokens.jwt_secret)
            .map_err(|_| ShopError::InvalidToken)?;
        let user = self
            .users
            .find_by_id(info.user_id)
            .await?
            .ok_or(ShopError::InvalidToken)?;
        issue_session(&user, &self.tokens)
    }
}
