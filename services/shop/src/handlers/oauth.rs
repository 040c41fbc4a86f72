use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use lisa_auth_types::identity::Identity;

use crate::domain::types::Actor;
use crate::error::ShopError;
use crate::handlers::auth::SignedInResponse;
use crate::state::AppState;
use crate::usecase::oauth::{
    CompleteRegistrationUseCase, ProviderLoginOutcome, ProviderLoginUseCase,
    REGISTRATION_TICKET_TTL_SECS,
};

// ── POST /auth/yandex/callback ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CallbackRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct RegistrationRequiredResponse {
    pub registration_ticket: String,
    pub expires_in: u64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// 200 with a session when the Yandex identity maps to an account, 202 with a
/// registration ticket otherwise. A bearer token links the identity to the
/// caller's account.
pub async fn yandex_callback(
    identity: Option<Identity>,
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<CallbackRequest>, ShopError>,
) -> Result<Response, ShopError> {
    let usecase = ProviderLoginUseCase {
        users: state.user_repo(),
        provider: state.yandex.clone(),
        tokens: state.tokens.clone(),
        email_link_policy: state.email_link_policy,
    };
    let outcome = usecase
        .execute(&body.code, identity.map(Actor::from))
        .await?;

    Ok(match outcome {
        ProviderLoginOutcome::SignedIn { user, session } => Json(SignedInResponse {
            user: user.into(),
            session: session.into(),
        })
        .into_response(),
        ProviderLoginOutcome::NeedsRegistration { ticket, profile } => (
            StatusCode::ACCEPTED,
            Json(RegistrationRequiredResponse {
                registration_ticket: ticket,
                expires_in: REGISTRATION_TICKET_TTL_SECS,
                email: profile.email,
                first_name: profile.first_name,
                last_name: profile.last_name,
            }),
        )
            .into_response(),
    })
}

// ── POST /auth/yandex/register ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CompleteRegistrationRequest {
    pub registration_ticket: String,
    pub password: String,
}

pub async fn yandex_register(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<CompleteRegistrationRequest>, ShopError>,
) -> Result<(StatusCode, Json<SignedInResponse>), ShopError> {
    let usecase = CompleteRegistrationUseCase {
        users: state.user_repo(),
        tokens: state.tokens.clone(),
        admin_emails: state.admin_emails.clone(),
    };
    let (user, session) = usecase
        .execute(&body.registration_ticket, body.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SignedInResponse {
            user: user.into(),
            session: session.into(),
        }),
    ))
}
