use std::collections::HashMap;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel as _, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    sea_query::Expr,
};
use uuid::Uuid;

use lisa_domain::order::{OrderPaymentStatus, OrderStatus};
use lisa_domain::pagination::PageRequest;
use lisa_shop_schema::{order_items, orders, products};

use super::catalog::product_from_model;
use super::tx_error;
use crate::domain::lifecycle::{cancel_transition, price_cart};
use crate::domain::repository::OrderRepository;
use crate::domain::types::{CartLine, Order, OrderItem, Product};
use crate::error::ShopError;

#[derive(Clone)]
pub struct DbOrderRepository {
    pub db: DatabaseConnection,
}

/// Lock product rows in id order so concurrent checkouts cannot deadlock.
async fn lock_products<C: ConnectionTrait>(
    conn: &C,
    ids: Vec<Uuid>,
) -> Result<Vec<Product>, ShopError> {
    let models = products::Entity::find()
        .filter(products::Column::Id.is_in(ids))
        .order_by_asc(products::Column::Id)
        .lock_exclusive()
        .all(conn)
        .await
        .context("lock products")?;
    Ok(models.into_iter().map(product_from_model).collect())
}

async fn adjust_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    delta: i32,
    now: DateTime<Utc>,
) -> Result<(), ShopError> {
    products::Entity::update_many()
        .col_expr(
            products::Column::StockQuantity,
            Expr::col(products::Column::StockQuantity).add(delta),
        )
        .col_expr(products::Column::UpdatedAt, Expr::value(now))
        .filter(products::Column::Id.eq(product_id))
        .exec(conn)
        .await
        .context("adjust product stock")?;
    Ok(())
}

/// Line items of the given orders keyed by order id, with current product names.
async fn load_items<C: ConnectionTrait>(
    conn: &C,
    order_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, Vec<OrderItem>>, ShopError> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = order_items::Entity::find()
        .filter(order_items::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_items::Column::ProductId)
        .find_also_related(products::Entity)
        .all(conn)
        .await
        .context("load order items")?;

    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for (item, product) in rows {
        grouped.entry(item.order_id).or_default().push(OrderItem {
            product_id: item.product_id,
            product_name: product.map(|p| p.name),
            quantity: item.quantity,
            unit_price: item.unit_price,
        });
    }
    Ok(grouped)
}

fn order_from_model(model: orders::Model, items: Vec<OrderItem>) -> Result<Order, ShopError> {
    let status: OrderStatus = model
        .status
        .parse()
        .with_context(|| format!("order {} has unknown status", model.id))?;
    let payment_status: OrderPaymentStatus = model
        .payment_status
        .parse()
        .with_context(|| format!("order {} has unknown payment status", model.id))?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        status,
        payment_status,
        total_amount: model.total_amount,
        items,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

impl DbOrderRepository {
    async fn with_items(&self, models: Vec<orders::Model>) -> Result<Vec<Order>, ShopError> {
        let mut items = load_items(&self.db, models.iter().map(|m| m.id).collect()).await?;
        models
            .into_iter()
            .map(|m| {
                let lines = items.remove(&m.id).unwrap_or_default();
                order_from_model(m, lines)
            })
            .collect()
    }
}

impl OrderRepository for DbOrderRepository {
    async fn create_with_items(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        lines: &[CartLine],
        now: DateTime<Utc>,
    ) -> Result<Order, ShopError> {
        let lines = lines.to_vec();
        self.db
            .transaction::<_, Order, ShopError>(move |txn| {
                Box::pin(async move {
                    let ids = lines.iter().map(|l| l.product_id).collect();
                    let locked = lock_products(txn, ids).await?;
                    let priced = price_cart(&lines, &locked)?;

                    for line in &lines {
                        adjust_stock(txn, line.product_id, -line.quantity, now).await?;
                    }

                    orders::ActiveModel {
                        id: Set(order_id),
                        user_id: Set(user_id),
                        status: Set(OrderStatus::Pending.as_str().to_owned()),
                        payment_status: Set(OrderPaymentStatus::Pending.as_str().to_owned()),
                        total_amount: Set(priced.total),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .context("insert order")?;

                    order_items::Entity::insert_many(priced.items.iter().map(|item| {
                        order_items::ActiveModel {
                            order_id: Set(order_id),
                            product_id: Set(item.product_id),
                            quantity: Set(item.quantity),
                            unit_price: Set(item.unit_price),
                        }
                    }))
                    .exec_without_returning(txn)
                    .await
                    .context("insert order items")?;

                    Ok(Order {
                        id: order_id,
                        user_id,
                        status: OrderStatus::Pending,
                        payment_status: OrderPaymentStatus::Pending,
                        total_amount: priced.total,
                        items: priced.items,
                        created_at: now,
                        updated_at: now,
                    })
                })
            })
            .await
            .map_err(|e| tx_error(e, "create order"))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, ShopError> {
        let Some(model) = orders::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find order by id")?
        else {
            return Ok(None);
        };
        let mut orders = self.with_items(vec![model]).await?;
        Ok(orders.pop())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>, ShopError> {
        let models = orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_asc(orders::Column::CreatedAt)
            .order_by_asc(orders::Column::Id)
            .all(&self.db)
            .await
            .context("list orders by user")?;
        self.with_items(models).await
    }

    async fn list_all(&self, page: PageRequest) -> Result<Vec<Order>, ShopError> {
        let models = orders::Entity::find()
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list all orders")?;
        self.with_items(models).await
    }

    async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> Result<Order, ShopError> {
        self.db
            .transaction::<_, (), ShopError>(move |txn| {
                Box::pin(async move {
                    let model = orders::Entity::find_by_id(id)
                        .lock_exclusive()
                        .one(txn)
                        .await
                        .context("lock order")?
                        .ok_or(ShopError::OrderNotFound)?;
                    let current: OrderStatus = model
                        .status
                        .parse()
                        .with_context(|| format!("order {id} has unknown status"))?;
                    let next = cancel_transition(current)?;

                    let items = order_items::Entity::find()
                        .filter(order_items::Column::OrderId.eq(id))
                        .all(txn)
                        .await
                        .context("load items of cancelled order")?;
                    lock_products(txn, items.iter().map(|i| i.product_id).collect()).await?;
                    for item in &items {
                        adjust_stock(txn, item.product_id, item.quantity, now).await?;
                    }

                    let mut am = model.into_active_model();
                    am.status = Set(next.as_str().to_owned());
                    am.updated_at = Set(now);
                    am.update(txn).await.context("update order status")?;
                    Ok(())
                })
            })
            .await
            .map_err(|e| tx_error(e, "cancel order"))?;

        self.find_by_id(id).await?.ok_or(ShopError::OrderNotFound)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Order, ShopError> {
        let result = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(status.as_str()))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now))
            .filter(orders::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("set order status")?;
        if result.rows_affected == 0 {
            return Err(ShopError::OrderNotFound);
        }
        self.find_by_id(id).await?.ok_or(ShopError::OrderNotFound)
    }
}
