#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use lisa_domain::order::OrderStatus;
use lisa_domain::pagination::PageRequest;
use lisa_domain::user::UserRole;

use crate::domain::types::{
    CartLine, GatewayPayment, GatewayPaymentRequest, Order, Payment, Product, ProductFilter,
    ProductPatch, ProviderProfile, ProviderTokenSet, ProviderTokens, User,
};
use crate::error::ShopError;

/// Repository for shop accounts.
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ShopError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ShopError>;
    async fn find_by_yandex_id(&self, yandex_id: &str) -> Result<Option<User>, ShopError>;

    /// Insert a new account. `UserAlreadyExists` on a duplicate email,
    /// `ProviderAlreadyLinked` on a duplicate provider id.
    async fn create(&self, user: &User) -> Result<(), ShopError>;

    async fn update_profile(
        &self,
        id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User, ShopError>;

    /// Attach a provider identity and cache its tokens. Names are only filled
    /// in where the account has none. `ProviderAlreadyLinked` if another
    /// account owns `yandex_id`.
    async fn link_provider(
        &self,
        id: Uuid,
        yandex_id: &str,
        profile: &ProviderProfile,
        tokens: &ProviderTokens,
    ) -> Result<User, ShopError>;

    /// Refresh cached provider tokens and names after a provider login.
    async fn refresh_provider_session(
        &self,
        id: Uuid,
        profile: &ProviderProfile,
        tokens: &ProviderTokens,
    ) -> Result<User, ShopError>;

    /// Returns `false` if no such user exists.
    async fn set_role(&self, id: Uuid, role: UserRole) -> Result<bool, ShopError>;

    async fn list(&self, page: PageRequest) -> Result<Vec<User>, ShopError>;
}

/// Repository for catalog products.
pub trait ProductRepository: Send + Sync {
    async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Vec<Product>, ShopError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, ShopError>;
    async fn create(&self, product: &Product) -> Result<(), ShopError>;

    /// Write only the fields present in `patch`. `None` if no such product.
    async fn update(
        &self,
        id: Uuid,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>, ShopError>;

    async fn set_image(
        &self,
        id: Uuid,
        image_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>, ShopError>;

    /// Delete a product. Returns `false` if it did not exist, `ProductInUse`
    /// if orders reference it.
    async fn delete(&self, id: Uuid) -> Result<bool, ShopError>;
}

/// Repository for orders and their line items. Every mutating method is one
/// transaction.
pub trait OrderRepository: Send + Sync {
    /// Lock the products of a normalized cart, check and decrement stock, and
    /// insert the order with its items.
    async fn create_with_items(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        lines: &[CartLine],
        now: DateTime<Utc>,
    ) -> Result<Order, ShopError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, ShopError>;

    /// Orders of one user, oldest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>, ShopError>;

    /// All orders, newest first.
    async fn list_all(&self, page: PageRequest) -> Result<Vec<Order>, ShopError>;

    /// Cancel under a row lock and restore stock. `InvalidTransition` if the
    /// order is no longer cancellable.
    async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> Result<Order, ShopError>;

    /// Unconditional status overwrite.
    async fn set_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Order, ShopError>;
}

/// Result of applying the gateway's status to a local payment.
#[derive(Debug, Clone)]
pub struct ReconciledPayment {
    pub payment: Payment,
    /// Set when this call moved the order to paid.
    pub order_paid: bool,
}

/// Repository for local payment mirrors.
pub trait PaymentRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Payment>, ShopError>;
    async fn find_active_for_order(&self, order_id: Uuid) -> Result<Option<Payment>, ShopError>;
    async fn count_for_order(&self, order_id: Uuid) -> Result<u64, ShopError>;

    /// Insert unless the order already has an active payment; returns `false`
    /// when the single-active-payment constraint rejected the row.
    async fn insert_if_no_active(&self, payment: &Payment) -> Result<bool, ShopError>;

    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Payment>, ShopError>;
    async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<Payment>, ShopError>;

    /// Apply the gateway's answer under row locks; cascades to the order on
    /// the first observed success.
    async fn reconcile(
        &self,
        id: &str,
        remote: &GatewayPayment,
        now: DateTime<Utc>,
    ) -> Result<ReconciledPayment, ShopError>;

    /// Mark an active payment cancelled and record `cancelled_at`.
    async fn mark_cancelled(&self, id: &str, now: DateTime<Utc>) -> Result<Payment, ShopError>;
}

/// Port for the third-party payment gateway.
pub trait PaymentGateway: Send + Sync {
    async fn create(&self, request: &GatewayPaymentRequest) -> Result<GatewayPayment, ShopError>;

    /// `None` when the gateway does not know the id.
    async fn find(&self, id: &str) -> Result<Option<GatewayPayment>, ShopError>;

    async fn cancel(&self, id: &str, idempotency_key: &str)
    -> Result<GatewayPayment, ShopError>;
}

/// Port for the OAuth identity provider.
pub trait IdentityProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<ProviderTokenSet, ShopError>;
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ShopError>;
}

/// Port for uploaded files.
pub trait FileStorage: Send + Sync {
    /// Store `bytes` and return the public URL.
    async fn store(&self, folder: &str, extension: &str, bytes: &[u8])
    -> Result<String, ShopError>;
}
