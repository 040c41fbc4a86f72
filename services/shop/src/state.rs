use axum::extract::FromRef;
use sea_orm::DatabaseConnection;

use lisa_auth_types::identity::TokenSecret;

use crate::domain::types::EmailLinkPolicy;
use crate::infra::db::{
    DbOrderRepository, DbPaymentRepository, DbProductRepository, DbUserRepository,
};
use crate::infra::storage::LocalFileStorage;
use crate::infra::yandex::YandexProvider;
use crate::infra::yookassa::YooKassaGateway;
use crate::usecase::payment::PaymentSettings;
use crate::usecase::token::TokenSettings;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub tokens: TokenSettings,
    pub payments: PaymentSettings,
    pub admin_emails: Vec<String>,
    pub email_link_policy: EmailLinkPolicy,
    pub gateway: YooKassaGateway,
    pub yandex: YandexProvider,
    pub storage: LocalFileStorage,
}

impl AppState {
    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn product_repo(&self) -> DbProductRepository {
        DbProductRepository {
            db: self.db.clone(),
        }
    }

    pub fn order_repo(&self) -> DbOrderRepository {
        DbOrderRepository {
            db: self.db.clone(),
        }
    }

    pub fn payment_repo(&self) -> DbPaymentRepository {
        DbPaymentRepository {
            db: self.db.clone(),
        }
    }
}

impl FromRef<AppState> for TokenSecret {
    fn from_ref(state: &AppState) -> Self {
        TokenSecret(state.tokens.jwt_secret.clone())
    }
}
