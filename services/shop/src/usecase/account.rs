use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use lisa_domain::pagination::PageRequest;
use lisa_domain::user::UserRole;

use crate::domain::repository::UserRepository;
use crate::domain::types::{Actor, User, normalize_email};
use crate::error::ShopError;
use crate::usecase::password::{hash_password, validate_password, verify_password};
use crate::usecase::token::{Session, TokenSettings, issue_session};

const MAX_NAME_LEN: usize = 100;

/// Role for a new account: admin when the email is on the configured list.
pub fn initial_role(email: &str, admin_emails: &[String]) -> UserRole {
    if admin_emails.iter().any(|e| e == email) {
        UserRole::Admin
    } else {
        UserRole::Customer
    }
}

fn clean_name(name: Option<String>) -> Result<Option<String>, ShopError> {
    match name.map(|n| n.trim().to_owned()) {
        Some(n) if n.chars().count() > MAX_NAME_LEN => Err(ShopError::Validation(format!(
            "names must be at most {MAX_NAME_LEN} characters"
        ))),
        Some(n) if n.is_empty() => Ok(None),
        other => Ok(other),
    }
}

// ── Register ─────────────────────────────────────────────────────────────────

pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub struct RegisterUseCase<U: UserRepository> {
    pub users: U,
    pub tokens: TokenSettings,
    pub admin_emails: Vec<String>,
}

impl<U: UserRepository> RegisterUseCase<U> {
    pub async fn execute(&self, input: RegisterInput) -> Result<(User, Session), ShopError> {
        let email = normalize_email(&input.email)?;
        validate_password(&input.password)?;
        let first_name = clean_name(input.first_name)?;
        let last_name = clean_name(input.last_name)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ShopError::UserAlreadyExists);
        }

        let password_hash = hash_password(input.password).await?;
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            role: initial_role(&email, &self.admin_emails),
            email,
            password_hash: Some(password_hash),
            yandex_id: None,
            first_name,
            last_name,
            provider_tokens: None,
            created_at: now,
            updated_at: now,
        };
        self.users.create(&user).await?;
        info!(user_id = %user.id, role = ?user.role, "account registered");

        let session = issue_session(&user, &self.tokens)?;
        Ok((user, session))
    }
}

// ── Login ────────────────────────────────────────────────────────────────────

pub struct LoginUseCase<U: UserRepository> {
    pub users: U,
    pub tokens: TokenSettings,
}

impl<U: UserRepository> LoginUseCase<U> {
    pub async fn execute(&self, email: &str, password: &str) -> Result<(User, Session), ShopError> {
        let email = normalize_email(email).map_err(|_| ShopError::InvalidCredentials)?;
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(ShopError::InvalidCredentials)?;
        // Provider-only accounts have no password to check.
        let stored = user
            .password_hash
            .clone()
            .ok_or(ShopError::InvalidCredentials)?;
        if !verify_password(password.to_owned(), stored).await? {
            return Err(ShopError::InvalidCredentials);
        }
        let session = issue_session(&user, &self.tokens)?;
        Ok((user, session))
    }
}

// ── Profile ──────────────────────────────────────────────────────────────────

pub struct GetUserUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> GetUserUseCase<U> {
    pub async fn execute(&self, user_id: Uuid) -> Result<User, ShopError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(ShopError::UserNotFound)
    }
}

pub struct UpdateProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub struct UpdateProfileUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> UpdateProfileUseCase<U> {
    pub async fn execute(&self, user_id: Uuid, input: UpdateProfileInput) -> Result<User, ShopError> {
        if input.first_name.is_none() && input.last_name.is_none() {
            return Err(ShopError::Validation("nothing to update".into()));
        }
        let first_name = clean_name(input.first_name)?;
        let last_name = clean_name(input.last_name)?;
        self.users
            .update_profile(user_id, first_name.as_deref(), last_name.as_deref())
            .await
    }
}

// ── Admin ────────────────────────────────────────────────────────────────────

pub struct ListUsersUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> ListUsersUseCase<U> {
    pub async fn execute(&self, actor: Actor, page: PageRequest) -> Result<Vec<User>, ShopError> {
        actor.require_role(UserRole::Admin)?;
        self.users.list(page).await
    }
}

pub struct SetUserRoleUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> SetUserRoleUseCase<U> {
    pub async fn execute(
        &self,
        actor: Actor,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<(), ShopError> {
        actor.require_role(UserRole::Admin)?;
        if actor.user_id == user_id && role != UserRole::Admin {
            return Err(ShopError::Validation("admins cannot demote themselves".into()));
        }
        if !self.users.set_role(user_id, role).await? {
            return Err(ShopError::UserNotFound);
        }
        info!(admin_id = %actor.user_id, %user_id, role = ?role, "user role changed");
        Ok(())
    }
}
