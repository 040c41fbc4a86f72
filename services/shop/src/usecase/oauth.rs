use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use lisa_auth_types::token::now_secs;

use crate::domain::repository::{IdentityProvider, UserRepository};
use crate::domain::types::{Actor, EmailLinkPolicy, ProviderProfile, User, normalize_email};
use crate::error::ShopError;
use crate::usecase::account::initial_role;
use crate::usecase::password::{hash_password, validate_password};
use crate::usecase::token::{Session, TokenSettings, issue_session};

/// Registration tickets are valid for ten minutes.
pub const REGISTRATION_TICKET_TTL_SECS: u64 = 600;
const REGISTRATION_TICKET_TYP: &str = "oauth_registration";

/// Signed proof that the bearer completed a provider login for an identity
/// with no local account yet.
#[derive(Debug, Serialize, Deserialize)]
struct RegistrationClaims {
    sub: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    exp: u64,
    typ: String,
}

pub fn issue_registration_ticket(
    profile: &ProviderProfile,
    secret: &str,
) -> Result<String, ShopError> {
    let claims = RegistrationClaims {
        sub: profile.provider_id.clone(),
        email: profile.email.clone(),
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone(),
        exp: now_secs() + REGISTRATION_TICKET_TTL_SECS,
        typ: REGISTRATION_TICKET_TYP.to_owned(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ShopError::Internal(anyhow::Error::new(e).context("sign registration ticket")))
}

pub fn validate_registration_ticket(
    ticket: &str,
    secret: &str,
) -> Result<ProviderProfile, ShopError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);
    let claims = decode::<RegistrationClaims>(
        ticket,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| ShopError::InvalidToken)?
    .claims;
    if claims.typ != REGISTRATION_TICKET_TYP {
        return Err(ShopError::InvalidToken);
    }
    Ok(ProviderProfile {
        provider_id: claims.sub,
        email: claims.email,
        first_name: claims.first_name,
        last_name: claims.last_name,
    })
}

// ── ProviderLogin ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ProviderLoginOutcome {
    /// The provider identity maps to an account; a session was issued.
    SignedIn { user: User, session: Session },
    /// No account yet. The client finishes with a password and this ticket.
    NeedsRegistration {
        ticket: String,
        profile: ProviderProfile,
    },
}

pub struct ProviderLoginUseCase<U: UserRepository, I: IdentityProvider> {
    pub users: U,
    pub provider: I,
    pub tokens: TokenSettings,
    pub email_link_policy: EmailLinkPolicy,
}

impl<U: UserRepository, I: IdentityProvider> ProviderLoginUseCase<U, I> {
    /// Exchange the authorization code and link the provider identity.
    ///
    /// With `current` set, the identity is attached to that account.
    pub async fn execute(
        &self,
        code: &str,
        current: Option<Actor>,
    ) -> Result<ProviderLoginOutcome, ShopError> {
        if code.trim().is_empty() {
            return Err(ShopError::Validation("code is required".into()));
        }
        let token_set = self.provider.exchange_code(code).await?;
        let mut profile = self.provider.fetch_profile(&token_set.access_token).await?;
        profile.email = normalize_email(&profile.email).map_err(|_| {
            ShopError::Validation("provider account has no usable email".into())
        })?;
        let cached = token_set.into_cached(Utc::now());
        let provider_id = profile.provider_id.clone();

        let existing = self.users.find_by_yandex_id(&provider_id).await?;

        let user = match (current, existing) {
            (Some(actor), Some(owner)) if owner.id != actor.user_id => {
                return Err(ShopError::ProviderAlreadyLinked);
            }
            (Some(_), Some(owner)) | (None, Some(owner)) => {
                self.users
                    .refresh_provider_session(owner.id, &profile, &cached)
                    .await?
            }
            (Some(actor), None) => {
                let account = self
                    .users
                    .find_by_id(actor.user_id)
                    .await?
                    .ok_or(ShopError::UserNotFound)?;
                if account.yandex_id.is_some() {
                    // One provider identity per account; unlinking is not offered.
                    return Err(ShopError::ProviderAlreadyLinked);
                }
                let user = self
                    .users
                    .link_provider(actor.user_id, &provider_id, &profile, &cached)
                    .await?;
                info!(user_id = %user.id, "provider identity linked to signed-in account");
                user
            }
            (None, None) => match self.users.find_by_email(&profile.email).await? {
                Some(by_email) => {
                    if by_email.yandex_id.is_some()
                        || self.email_link_policy == EmailLinkPolicy::Reject
                    {
                        return Err(ShopError::EmailAlreadyRegistered);
                    }
                    let user = self
                        .users
                        .link_provider(by_email.id, &provider_id, &profile, &cached)
                        .await?;
                    info!(user_id = %user.id, "provider identity linked by email");
                    user
                }
                None => {
                    let ticket = issue_registration_ticket(&profile, &self.tokens.jwt_secret)?;
                    return Ok(ProviderLoginOutcome::NeedsRegistration { ticket, profile });
                }
            },
        };

        let session = issue_session(&user, &self.tokens)?;
        Ok(ProviderLoginOutcome::SignedIn { user, session })
    }
}

// ── CompleteRegistration ─────────────────────────────────────────────────────

pub struct CompleteRegistrationUseCase<U: UserRepository> {
    pub users: U,
    pub tokens: TokenSettings,
    pub admin_emails: Vec<String>,
}

impl<U: UserRepository> CompleteRegistrationUseCase<U> {
    /// Create an account holding both the provider identity and a password.
    pub async fn execute(&self, ticket: &str, password: String) -> Result<(User, Session), ShopError> {
        let profile = validate_registration_ticket(ticket, &self.tokens.jwt_secret)?;
        validate_password(&password)?;

        if self
            .users
            .find_by_yandex_id(&profile.provider_id)
            .await?
            .is_some()
        {
            return Err(ShopError::ProviderAlreadyLinked);
        }
        if self.users.find_by_email(&profile.email).await?.is_some() {
            return Err(ShopError::UserAlreadyExists);
        }

        let password_hash = hash_password(password).await?;
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            role: initial_role(&profile.email, &self.admin_emails),
            email: profile.email,
            password_hash: Some(password_hash),
            yandex_id: Some(profile.provider_id),
            first_name: profile.first_name,
            last_name: profile.last_name,
            provider_tokens: None,
            created_at: now,
            updated_at: now,
        };
        self.users.create(&user).await?;
        info!(user_id = %user.id, "account registered through provider");

        let session = issue_session(&user, &self.tokens)?;
        Ok((user, session))
    }
}
