use chrono::Utc;
use tracing::{info, warn};

use lisa_domain::order::{OrderPaymentStatus, OrderStatus};
use lisa_domain::payment::PaymentStatus;

use crate::domain::lifecycle::payment_idempotency_key;
use crate::domain::repository::{OrderRepository, PaymentGateway, PaymentRepository};
use crate::domain::types::{Actor, GatewayPaymentRequest, Payment};
use crate::error::ShopError;

/// Static parameters for opening gateway payments.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub currency: String,
    pub return_url: String,
}

fn pending_conflict(payment: &Payment) -> ShopError {
    ShopError::PaymentPending {
        payment_id: payment.id.clone(),
        confirmation_url: payment.confirmation_url(),
    }
}

// ── CreatePayment ────────────────────────────────────────────────────────────

pub struct CreatePaymentUseCase<O: OrderRepository, P: PaymentRepository, G: PaymentGateway> {
    pub orders: O,
    pub payments: P,
    pub gateway: G,
    pub settings: PaymentSettings,
}

impl<O: OrderRepository, P: PaymentRepository, G: PaymentGateway> CreatePaymentUseCase<O, P, G> {
    /// Open a gateway payment for the order total and store its local mirror.
    ///
    /// Nothing is persisted unless the gateway accepted the payment.
    pub async fn execute(&self, actor: Actor, order_id: uuid::Uuid) -> Result<Payment, ShopError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(ShopError::OrderNotFound)?;
        actor.require_owner_or_admin(order.user_id)?;
        if order.payment_status == OrderPaymentStatus::Succeeded {
            return Err(ShopError::OrderAlreadyPaid);
        }
        if order.status == OrderStatus::Cancelled {
            return Err(ShopError::OrderNotPayable);
        }
        if let Some(active) = self.payments.find_active_for_order(order.id).await? {
            return Err(pending_conflict(&active));
        }

        let attempt = self.payments.count_for_order(order.id).await?;
        let idempotency_key = payment_idempotency_key(order.id, attempt);
        let request = GatewayPaymentRequest {
            order_id: order.id,
            amount: order.total_amount,
            currency: self.settings.currency.clone(),
            description: format!("Payment for order {}", order.id),
            return_url: self.settings.return_url.clone(),
            idempotency_key: idempotency_key.clone(),
        };
        let remote = self.gateway.create(&request).await?;
        if remote.amount != order.total_amount {
            warn!(
                %order_id,
                payment_id = %remote.id,
                expected = %order.total_amount,
                reported = %remote.amount,
                "gateway reported a different amount"
            );
        }

        let now = Utc::now();
        let payment = Payment {
            id: remote.id.clone(),
            order_id: order.id,
            user_id: order.user_id,
            amount: order.total_amount,
            currency: request.currency,
            status: remote.status,
            payment_method: remote.payment_method.clone(),
            metadata: serde_json::json!({
                "confirmation_url": remote.confirmation_url,
                "payment_method": remote.payment_method,
                "idempotency_key": idempotency_key,
            }),
            error_code: None,
            error_description: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };

        if !self.payments.insert_if_no_active(&payment).await? {
            // Lost the race against a concurrent create for the same order.
            let active = self
                .payments
                .find_active_for_order(order.id)
                .await?
                .ok_or_else(|| {
                    anyhow::anyhow!("active payment vanished after constraint conflict")
                })?;
            return Err(pending_conflict(&active));
        }

        info!(
            %order_id,
            payment_id = %payment.id,
            amount = %payment.amount,
            status = %payment.status,
            "payment created"
        );
        Ok(payment)
    }
}

// ── GetPaymentStatus ─────────────────────────────────────────────────────────

pub struct GetPaymentStatusUseCase<P: PaymentRepository, G: PaymentGateway> {
    pub payments: P,
    pub gateway: G,
}

impl<P: PaymentRepository, G: PaymentGateway> GetPaymentStatusUseCase<P, G> {
    /// Fetch the authoritative status and reconcile the local payment and order.
    pub async fn execute(&self, actor: Actor, payment_id: &str) -> Result<Payment, ShopError> {
        let local = self
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or(ShopError::PaymentNotFound)?;
        actor.require_owner_or_admin(local.user_id)?;

        let remote = self.gateway.find(payment_id).await?.ok_or_else(|| {
            ShopError::Gateway(format!("payment {payment_id} is unknown to the gateway"))
        })?;

        let reconciled = self.payments.reconcile(payment_id, &remote, Utc::now()).await?;
        if reconciled.order_paid {
            info!(
                %payment_id,
                order_id = %reconciled.payment.order_id,
                "payment succeeded, order marked paid"
            );
        } else if reconciled.payment.status != local.status {
            info!(
                %payment_id,
                from = %local.status,
                to = %reconciled.payment.status,
                "payment status changed"
            );
        }
        Ok(reconciled.payment)
    }
}

// ── CancelPayment ────────────────────────────────────────────────────────────

pub struct CancelPaymentUseCase<P: PaymentRepository, G: PaymentGateway> {
    pub payments: P,
    pub gateway: G,
}

impl<P: PaymentRepository, G: PaymentGateway> CancelPaymentUseCase<P, G> {
    pub async fn execute(&self, actor: Actor, payment_id: &str) -> Result<Payment, ShopError> {
        let local = self
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or(ShopError::PaymentNotFound)?;
        actor.require_owner_or_admin(local.user_id)?;
        if !local.status.is_active() {
            return Err(ShopError::InvalidTransition {
                from: local.status.to_string(),
                to: PaymentStatus::Cancelled.to_string(),
            });
        }

        let remote = self
            .gateway
            .cancel(payment_id, &format!("{payment_id}-cancel"))
            .await?;
        if remote.status != PaymentStatus::Cancelled {
            // The gateway moved on (e.g. captured) before our cancel arrived.
            let reconciled = self.payments.reconcile(payment_id, &remote, Utc::now()).await?;
            return Err(ShopError::InvalidTransition {
                from: reconciled.payment.status.to_string(),
                to: PaymentStatus::Cancelled.to_string(),
            });
        }

        let cancelled = self.payments.mark_cancelled(payment_id, Utc::now()).await?;
        info!(%payment_id, order_id = %cancelled.order_id, "payment cancelled");
        Ok(cancelled)
    }
}

// ── ListPayments ─────────────────────────────────────────────────────────────

pub struct ListPaymentsUseCase<P: PaymentRepository> {
    pub payments: P,
}

impl<P: PaymentRepository> ListPaymentsUseCase<P> {
    /// Local history only; statuses may lag the gateway.
    pub async fn execute(&self, actor: Actor) -> Result<Vec<Payment>, ShopError> {
        self.payments.list_by_user(actor.user_id).await
    }
}
