use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lisa_auth_types::identity::Identity;
use lisa_domain::order::{OrderPaymentStatus, OrderStatus};

use crate::domain::types::{CartLine, Order, OrderItem};
use crate::error::{ShopError, money};
use crate::handlers::payment::PaymentResponse;
use crate::state::AppState;
use crate::usecase::order::{
    CancelOrderUseCase, CreateOrderUseCase, GetOrderUseCase, ListOrdersUseCase,
};

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            line_total: money(item.line_total()),
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price: money(item.unit_price),
        }
    }
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub total_amount: String,
    pub items: Vec<OrderItemResponse>,
    #[serde(serialize_with = "lisa_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "lisa_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            payment_status: order.payment_status,
            total_amount: money(order.total_amount),
            items: order.items.into_iter().map(Into::into).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct OrderDetailsResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub payments: Vec<PaymentResponse>,
}

// ── POST /orders ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CartLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CartLineRequest>,
}

pub async fn create_order(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<CreateOrderRequest>, ShopError>,
) -> Result<(StatusCode, Json<OrderResponse>), ShopError> {
    let usecase = CreateOrderUseCase {
        orders: state.order_repo(),
    };
    let lines = body
        .items
        .into_iter()
        .map(|line| CartLine {
            product_id: line.product_id,
            quantity: line.quantity,
        })
        .collect();
    let order = usecase.execute(identity.into(), lines).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

// ── GET /orders ──────────────────────────────────────────────────────────────

pub async fn list_orders(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>, ShopError> {
    let usecase = ListOrdersUseCase {
        orders: state.order_repo(),
    };
    let orders = usecase.execute(identity.into()).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

// ── GET /orders/{id} ─────────────────────────────────────────────────────────

pub async fn get_order(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ShopError>,
) -> Result<Json<OrderDetailsResponse>, ShopError> {
    let usecase = GetOrderUseCase {
        orders: state.order_repo(),
        payments: state.payment_repo(),
    };
    let details = usecase.execute(identity.into(), id).await?;
    Ok(Json(OrderDetailsResponse {
        order: details.order.into(),
        payments: details.payments.into_iter().map(Into::into).collect(),
    }))
}

// ── POST /orders/{id}/cancel ─────────────────────────────────────────────────

pub async fn cancel_order(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ShopError>,
) -> Result<Json<OrderResponse>, ShopError> {
    let usecase = CancelOrderUseCase {
        orders: state.order_repo(),
    };
    let order = usecase.execute(identity.into(), id).await?;
    Ok(Json(order.into()))
}
