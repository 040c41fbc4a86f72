use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lisa_domain::order::OrderStatus;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Shop service error variants.
#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("forbidden")]
    Forbidden,
    #[error("user not found")]
    UserNotFound,
    #[error("product not found")]
    ProductNotFound,
    #[error("order not found")]
    OrderNotFound,
    #[error("payment not found")]
    PaymentNotFound,
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("email is already registered")]
    EmailAlreadyRegistered,
    #[error("provider account is linked to another user")]
    ProviderAlreadyLinked,
    #[error("product is referenced by orders")]
    ProductInUse,
    #[error("insufficient stock")]
    InsufficientStock {
        product_id: Uuid,
        available: i32,
        requested: i32,
    },
    #[error("cannot change order status from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("order is already paid")]
    OrderAlreadyPaid,
    #[error("order cannot be paid")]
    OrderNotPayable,
    #[error("order has a pending payment")]
    PaymentPending {
        payment_id: String,
        confirmation_url: Option<String>,
    },
    #[error("invalid authorization code")]
    InvalidGrant,
    #[error("authorization code expired")]
    ExpiredCode,
    #[error("upstream provider error")]
    Gateway(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ShopError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Forbidden => "FORBIDDEN",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::ProductNotFound => "PRODUCT_NOT_FOUND",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::PaymentNotFound => "PAYMENT_NOT_FOUND",
            Self::UserAlreadyExists => "USER_ALREADY_EXISTS",
            Self::EmailAlreadyRegistered => "EMAIL_ALREADY_REGISTERED",
            Self::ProviderAlreadyLinked => "PROVIDER_ALREADY_LINKED",
            Self::ProductInUse => "PRODUCT_IN_USE",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::OrderAlreadyPaid => "ORDER_ALREADY_PAID",
            Self::OrderNotPayable => "ORDER_NOT_PAYABLE",
            Self::PaymentPending { .. } => "PAYMENT_PENDING",
            Self::InvalidGrant => "INVALID_GRANT",
            Self::ExpiredCode => "EXPIRED_CODE",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn invalid_transition(from: OrderStatus, to: OrderStatus) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn insufficient_stock(product_id: Uuid, available: i32, requested: i32) -> Self {
        Self::InsufficientStock {
            product_id,
            available,
            requested,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InsufficientStock {
                product_id,
                available,
                requested,
            } => Some(serde_json::json!({
                "product_id": product_id,
                "available": available,
                "requested": requested,
            })),
            Self::InvalidTransition { from, to } => Some(serde_json::json!({
                "from": from,
                "to": to,
            })),
            Self::PaymentPending {
                payment_id,
                confirmation_url,
            } => Some(serde_json::json!({
                "payment_id": payment_id,
                "confirmation_url": confirmation_url,
            })),
            _ => None,
        }
    }
}

// Extractor rejections surface as VALIDATION errors.

impl From<JsonRejection> for ShopError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ShopError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ShopError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Money amounts are rendered as strings with two decimals, e.g. `"25.00"`.
pub fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) | Self::InvalidGrant | Self::ExpiredCode => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::UserNotFound
            | Self::ProductNotFound
            | Self::OrderNotFound
            | Self::PaymentNotFound => StatusCode::NOT_FOUND,
            Self::UserAlreadyExists
            | Self::EmailAlreadyRegistered
            | Self::ProviderAlreadyLinked
            | Self::ProductInUse
            | Self::InsufficientStock { .. }
            | Self::InvalidTransition { .. }
            | Self::OrderAlreadyPaid
            | Self::OrderNotPayable
            | Self::PaymentPending { .. } => StatusCode::CONFLICT,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // TraceLayer records every status; only upstream and internal failures
        // carry a cause worth logging here.
        match &self {
            Self::Internal(e) => {
                tracing::error!(error = %format!("{e:#}"), kind = "INTERNAL", "internal error");
            }
            Self::Gateway(detail) => {
                tracing::error!(error = %detail, kind = "GATEWAY_ERROR", "upstream provider error");
            }
            _ => {}
        }
        let mut body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Some(details) = self.details() {
            body["details"] = details;
        }
        (status, axum::Json(body)).into_response()
    }
}
