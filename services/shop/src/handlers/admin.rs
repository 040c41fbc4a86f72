use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use uuid::Uuid;

use lisa_auth_types::identity::Identity;
use lisa_domain::order::OrderStatus;
use lisa_domain::pagination::PageRequest;
use lisa_domain::user::UserRole;

use crate::error::ShopError;
use crate::handlers::order::OrderResponse;
use crate::handlers::user::UserResponse;
use crate::state::AppState;
use crate::usecase::account::{ListUsersUseCase, SetUserRoleUseCase};
use crate::usecase::order::{AdminChangeStatusUseCase, AdminListOrdersUseCase};

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct AdminListQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

impl AdminListQuery {
    fn page(&self) -> PageRequest {
        PageRequest {
            per_page: self.per_page.unwrap_or(20),
            page: self.page.unwrap_or(1),
        }
    }
}

// ── GET /admin/orders ────────────────────────────────────────────────────────

pub async fn list_all_orders(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<AdminListQuery>, ShopError>,
) -> Result<Json<Vec<OrderResponse>>, ShopError> {
    let usecase = AdminListOrdersUseCase {
        orders: state.order_repo(),
    };
    let orders = usecase.execute(identity.into(), query.page()).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

// ── PUT /admin/orders/{id}/status ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChangeStatusRequest {
    pub status: OrderStatus,
}

pub async fn change_order_status(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ShopError>,
    WithRejection(Json(body), _): WithRejection<Json<ChangeStatusRequest>, ShopError>,
) -> Result<Json<OrderResponse>, ShopError> {
    let usecase = AdminChangeStatusUseCase {
        orders: state.order_repo(),
    };
    let order = usecase.execute(identity.into(), id, body.status).await?;
    Ok(Json(order.into()))
}

// ── GET /admin/users ─────────────────────────────────────────────────────────

pub async fn list_users(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<AdminListQuery>, ShopError>,
) -> Result<Json<Vec<UserResponse>>, ShopError> {
    let usecase = ListUsersUseCase {
        users: state.user_repo(),
    };
    let users = usecase.execute(identity.into(), query.page()).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

// ── PUT /admin/users/{id}/role ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChangeRoleRequest {
    pub role: UserRole,
}

pub async fn change_user_role(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ShopError>,
    WithRejection(Json(body), _): WithRejection<Json<ChangeRoleRequest>, ShopError>,
) -> Result<StatusCode, ShopError> {
    let usecase = SetUserRoleUseCase {
        users: state.user_repo(),
    };
    usecase.execute(identity.into(), id, body.role).await?;
    Ok(StatusCode::NO_CONTENT)
}
