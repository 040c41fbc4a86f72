use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use lisa_auth_types::identity::Identity;

use crate::error::ShopError;
use crate::handlers::user::UserResponse;
use crate::state::AppState;
use crate::usecase::account::{LoginUseCase, RegisterInput, RegisterUseCase};
use crate::usecase::token::{RefreshSessionUseCase, Session};

#[derive(Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub access_token_expires_at: u64,
    pub refresh_token: String,
    pub refresh_token_expires_at: u64,
    pub token_type: &'static str,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            access_token: session.access_token,
            access_token_expires_at: session.access_token_exp,
            refresh_token: session.refresh_token,
            refresh_token_expires_at: session.refresh_token_exp,
            token_type: "Bearer",
        }
    }
}

#[derive(Serialize)]
pub struct SignedInResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub session: SessionResponse,
}

// ── POST /register ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterRequest>, ShopError>,
) -> Result<(StatusCode, Json<SignedInResponse>), ShopError> {
    let usecase = RegisterUseCase {
        users: state.user_repo(),
        tokens: state.tokens.clone(),
        admin_emails: state.admin_emails.clone(),
    };
    let (user, session) = usecase
        .execute(RegisterInput {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SignedInResponse {
            user: user.into(),
            session: session.into(),
        }),
    ))
}

// ── POST /login ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<LoginRequest>, ShopError>,
) -> Result<Json<SignedInResponse>, ShopError> {
    let usecase = LoginUseCase {
        users: state.user_repo(),
        tokens: state.tokens.clone(),
    };
    let (user, session) = usecase.execute(&body.email, &body.password).await?;
    Ok(Json(SignedInResponse {
        user: user.into(),
        session: session.into(),
    }))
}

// ── POST /refresh ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RefreshRequest>, ShopError>,
) -> Result<Json<SessionResponse>, ShopError> {
    let usecase = RefreshSessionUseCase {
        users: state.user_repo(),
        tokens: state.tokens.clone(),
    };
    let session = usecase.execute(&body.refresh_token).await?;
    Ok(Json(session.into()))
}

// ── POST /logout ─────────────────────────────────────────────────────────────

/// Tokens are stateless; clients drop them. Only checks the caller is signed in.
pub async fn logout(identity: Identity) -> StatusCode {
    tracing::debug!(user_id = %identity.user_id, "logout");
    StatusCode::NO_CONTENT
}
