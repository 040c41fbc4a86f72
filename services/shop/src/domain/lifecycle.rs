//! Pure order and payment state rules.
//!
//! Repositories call these inside their transactions so the database and the
//! in-memory test doubles apply the same arithmetic and transitions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use lisa_domain::order::{OrderPaymentStatus, OrderStatus};
use lisa_domain::payment::PaymentStatus;

use crate::domain::types::{CartLine, GatewayPayment, OrderItem, Payment, Product};
use crate::error::ShopError;

/// Validate a cart and merge duplicate products.
///
/// The result is sorted by product id, which is also the row-lock order.
pub fn normalize_cart(lines: &[CartLine]) -> Result<Vec<CartLine>, ShopError> {
    if lines.is_empty() {
        return Err(ShopError::Validation("cart is empty".into()));
    }
    let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
    for line in lines {
        if line.quantity < 1 {
            return Err(ShopError::Validation(format!(
                "quantity for product {} must be at least 1",
                line.product_id
            )));
        }
        let entry = merged.entry(line.product_id).or_insert(0);
        *entry = entry
            .checked_add(line.quantity)
            .ok_or_else(|| ShopError::Validation("quantity is too large".into()))?;
    }
    Ok(merged
        .into_iter()
        .map(|(product_id, quantity)| CartLine {
            product_id,
            quantity,
        })
        .collect())
}

/// A cart checked against current product rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub items: Vec<OrderItem>,
    pub total: Decimal,
}

/// Price a normalized cart against the (locked) product rows.
///
/// Fails with `ProductNotFound` for a missing or inactive product and with
/// `InsufficientStock` when a quantity exceeds stock. Nothing is mutated.
pub fn price_cart(lines: &[CartLine], products: &[Product]) -> Result<PricedCart, ShopError> {
    let mut items = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;
    for line in lines {
        let product = products
            .iter()
            .find(|p| p.id == line.product_id && p.is_active)
            .ok_or(ShopError::ProductNotFound)?;
        if line.quantity > product.stock_quantity {
            return Err(ShopError::insufficient_stock(
                product.id,
                product.stock_quantity,
                line.quantity,
            ));
        }
        let item = OrderItem {
            product_id: product.id,
            product_name: Some(product.name.clone()),
            quantity: line.quantity,
            unit_price: product.price,
        };
        total += item.line_total();
        items.push(item);
    }
    Ok(PricedCart {
        items,
        total: total.round_dp(2),
    })
}

/// Check a customer cancellation and return the new status.
pub fn cancel_transition(current: OrderStatus) -> Result<OrderStatus, ShopError> {
    if current.can_transition_to(OrderStatus::Cancelled) {
        Ok(OrderStatus::Cancelled)
    } else {
        Err(ShopError::invalid_transition(current, OrderStatus::Cancelled))
    }
}

/// Idempotency key for the `attempt`-th payment of an order (0-based).
///
/// A retry that persisted nothing reuses the key; a new attempt after a
/// cancelled payment gets a fresh one.
pub fn payment_idempotency_key(order_id: Uuid, attempt: u64) -> String {
    format!("{order_id}-{attempt}")
}

/// Local payment fields after applying the gateway's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub payment_method: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    /// True only on the call that first observes `succeeded`.
    pub newly_succeeded: bool,
    /// True when an active payment is first seen cancelled.
    pub newly_cancelled: bool,
}

pub fn reconcile_payment(
    local: &Payment,
    remote: &GatewayPayment,
    now: DateTime<Utc>,
) -> PaymentUpdate {
    let newly_succeeded =
        remote.status == PaymentStatus::Succeeded && local.status != PaymentStatus::Succeeded;
    let newly_cancelled = remote.status == PaymentStatus::Cancelled && local.status.is_active();
    let paid_at = match (local.paid_at, newly_succeeded) {
        (Some(at), _) => Some(at),
        (None, true) => Some(now),
        (None, false) => None,
    };
    let (error_code, error_description) = match &remote.cancellation {
        Some(details) => (Some(details.reason.clone()), Some(details.party.clone())),
        None => (local.error_code.clone(), local.error_description.clone()),
    };
    PaymentUpdate {
        status: remote.status,
        payment_method: remote
            .payment_method
            .clone()
            .or_else(|| local.payment_method.clone()),
        error_code,
        error_description,
        paid_at,
        newly_succeeded,
        newly_cancelled,
    }
}

/// Order status after its payment succeeded. Only a pending order advances;
/// an order cancelled meanwhile stays cancelled.
pub fn order_status_after_payment(current: OrderStatus) -> OrderStatus {
    if current == OrderStatus::Pending {
        OrderStatus::Processing
    } else {
        current
    }
}

/// Order payment status once its active payment is cancelled. A paid order
/// stays paid; a later payment attempt resets it to pending.
pub fn order_payment_after_cancel(current: OrderPaymentStatus) -> OrderPaymentStatus {
    match current {
        OrderPaymentStatus::Succeeded => OrderPaymentStatus::Succeeded,
        OrderPaymentStatus::Pending | OrderPaymentStatus::Cancelled => {
            OrderPaymentStatus::Cancelled
        }
    }
}
