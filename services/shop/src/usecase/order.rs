use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use lisa_domain::order::OrderStatus;
use lisa_domain::pagination::PageRequest;
use lisa_domain::user::UserRole;

use crate::domain::lifecycle::{cancel_transition, normalize_cart};
use crate::domain::repository::{OrderRepository, PaymentRepository};
use crate::domain::types::{Actor, CartLine, Order, Payment};
use crate::error::ShopError;

// ── CreateOrder ──────────────────────────────────────────────────────────────

pub struct CreateOrderUseCase<O: OrderRepository> {
    pub orders: O,
}

impl<O: OrderRepository> CreateOrderUseCase<O> {
    /// Reserve stock and create a pending order. All or nothing.
    pub async fn execute(&self, actor: Actor, lines: Vec<CartLine>) -> Result<Order, ShopError> {
        let lines = normalize_cart(&lines)?;
        let order = self
            .orders
            .create_with_items(Uuid::now_v7(), actor.user_id, &lines, Utc::now())
            .await?;
        info!(
            order_id = %order.id,
            user_id = %actor.user_id,
            total = %order.total_amount,
            items = order.items.len(),
            "order created"
        );
        Ok(order)
    }
}

// ── GetOrder ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: Order,
    pub payments: Vec<Payment>,
}

pub struct GetOrderUseCase<O: OrderRepository, P: PaymentRepository> {
    pub orders: O,
    pub payments: P,
}

impl<O: OrderRepository, P: PaymentRepository> GetOrderUseCase<O, P> {
    pub async fn execute(&self, actor: Actor, order_id: Uuid) -> Result<OrderDetails, ShopError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(ShopError::OrderNotFound)?;
        actor.require_owner_or_admin(order.user_id)?;
        let payments = self.payments.list_by_order(order.id).await?;
        Ok(OrderDetails { order, payments })
    }
}

// ── ListOrders ───────────────────────────────────────────────────────────────

pub struct ListOrdersUseCase<O: OrderRepository> {
    pub orders: O,
}

impl<O: OrderRepository> ListOrdersUseCase<O> {
    pub async fn execute(&self, actor: Actor) -> Result<Vec<Order>, ShopError> {
        self.orders.list_by_user(actor.user_id).await
    }
}

// ── CancelOrder ──────────────────────────────────────────────────────────────

pub struct CancelOrderUseCase<O: OrderRepository> {
    pub orders: O,
}

impl<O: OrderRepository> CancelOrderUseCase<O> {
    /// Cancel a pending or processing order and put its stock back.
    pub async fn execute(&self, actor: Actor, order_id: Uuid) -> Result<Order, ShopError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(ShopError::OrderNotFound)?;
        actor.require_owner_or_admin(order.user_id)?;
        // Fast path; the repository re-checks under the row lock.
        cancel_transition(order.status)?;

        let cancelled = self.orders.cancel(order_id, Utc::now()).await?;
        info!(%order_id, user_id = %actor.user_id, "order cancelled, stock restored");
        Ok(cancelled)
    }
}

// ── Admin ────────────────────────────────────────────────────────────────────

pub struct AdminListOrdersUseCase<O: OrderRepository> {
    pub orders: O,
}

impl<O: OrderRepository> AdminListOrdersUseCase<O> {
    pub async fn execute(&self, actor: Actor, page: PageRequest) -> Result<Vec<Order>, ShopError> {
        actor.require_role(UserRole::Admin)?;
        self.orders.list_all(page).await
    }
}

pub struct AdminChangeStatusUseCase<O: OrderRepository> {
    pub orders: O,
}

impl<O: OrderRepository> AdminChangeStatusUseCase<O> {
    /// Overwrite the status without consulting the transition table or
    /// touching stock.
    pub async fn execute(
        &self,
        actor: Actor,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, ShopError> {
        actor.require_role(UserRole::Admin)?;
        let order = self.orders.set_status(order_id, status, Utc::now()).await?;
        info!(%order_id, admin_id = %actor.user_id, status = %status, "order status overridden");
        Ok(order)
    }
}
