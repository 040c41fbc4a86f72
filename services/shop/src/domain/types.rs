use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use lisa_domain::order::{OrderPaymentStatus, OrderStatus};
use lisa_domain::payment::PaymentStatus;
use lisa_domain::user::UserRole;

use crate::error::ShopError;

// ── Actor ────────────────────────────────────────────────────────────────────

/// Authenticated caller a use case acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn require_role(&self, role: UserRole) -> Result<(), ShopError> {
        if self.role >= role {
            Ok(())
        } else {
            Err(ShopError::Forbidden)
        }
    }

    /// Owners and admins may read or act on a resource.
    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> Result<(), ShopError> {
        if self.user_id == owner_id || self.role.is_admin() {
            Ok(())
        } else {
            Err(ShopError::Forbidden)
        }
    }
}

impl From<lisa_auth_types::identity::Identity> for Actor {
    fn from(identity: lisa_auth_types::identity::Identity) -> Self {
        Self::new(identity.user_id, identity.role)
    }
}

// ── Accounts ─────────────────────────────────────────────────────────────────

/// Tokens issued to us by the OAuth provider, cached on the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub yandex_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    pub provider_tokens: Option<ProviderTokens>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

/// Emails are compared case-insensitively and stored lower-cased.
pub fn normalize_email(email: &str) -> Result<String, ShopError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid || email.len() > 255 {
        return Err(ShopError::Validation("invalid email".into()));
    }
    Ok(email)
}

/// Profile returned by the OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Token set returned by the provider's code exchange.
#[derive(Debug, Clone)]
pub struct ProviderTokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl ProviderTokenSet {
    pub fn into_cached(self, now: DateTime<Utc>) -> ProviderTokens {
        ProviderTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_in
                .map(|secs| now + chrono::Duration::seconds(secs)),
        }
    }
}

/// What to do when a provider login arrives for an email that already has a
/// local account without a linked provider identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailLinkPolicy {
    Link,
    Reject,
}

impl FromStr for EmailLinkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "link" => Ok(Self::Link),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown email link policy: {other}")),
        }
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial product update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.stock_quantity.is_none()
            && self.is_active.is_none()
    }

    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(stock) = self.stock_quantity {
            product.stock_quantity = stock;
        }
        if let Some(active) = self.is_active {
            product.is_active = active;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    /// Admins may list deactivated products too.
    pub include_inactive: bool,
}

// ── Orders ───────────────────────────────────────────────────────────────────

/// One requested (product, quantity) pair from a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub product_id: Uuid,
    /// Resolved at read time; `None` until loaded.
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub total_amount: Decimal,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Payments ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Payment {
    /// Gateway-assigned id.
    pub id: String,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: Option<String>,
    /// confirmation_url, payment_method, idempotency_key, cancelled_at.
    pub metadata: serde_json::Value,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn confirmation_url(&self) -> Option<String> {
        self.metadata
            .get("confirmation_url")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    }
}

/// Request to open a payment at the gateway.
#[derive(Debug, Clone)]
pub struct GatewayPaymentRequest {
    pub order_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub return_url: String,
    pub idempotency_key: String,
}

/// Why the gateway cancelled a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationDetails {
    pub party: String,
    pub reason: String,
}

/// Payment as the gateway reports it.
#[derive(Debug, Clone)]
pub struct GatewayPayment {
    pub id: String,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub currency: String,
    pub confirmation_url: Option<String>,
    pub payment_method: Option<String>,
    pub cancellation: Option<CancellationDetails>,
}
