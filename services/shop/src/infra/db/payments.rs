use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IntoActiveModel as _, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, sea_query::Expr,
};
use tracing::warn;
use uuid::Uuid;

use lisa_domain::order::{OrderPaymentStatus, OrderStatus};
use lisa_domain::payment::PaymentStatus;
use lisa_shop_schema::{orders, payments};

use super::{tx_error, unique_violation};
use crate::domain::lifecycle::{
    order_payment_after_cancel, order_status_after_payment, reconcile_payment,
};
use crate::domain::repository::{PaymentRepository, ReconciledPayment};
use crate::domain::types::{GatewayPayment, Payment};
use crate::error::ShopError;

const ACTIVE_STATUSES: [PaymentStatus; 2] =
    [PaymentStatus::Pending, PaymentStatus::WaitingForCapture];

#[derive(Clone)]
pub struct DbPaymentRepository {
    pub db: DatabaseConnection,
}

fn payment_from_model(model: payments::Model) -> Result<Payment, ShopError> {
    let status: PaymentStatus = model
        .status
        .parse()
        .with_context(|| format!("payment {} has unknown status", model.id))?;
    Ok(Payment {
        id: model.id,
        order_id: model.order_id,
        user_id: model.user_id,
        amount: model.amount,
        currency: model.currency,
        status,
        payment_method: model.payment_method,
        metadata: model.metadata,
        error_code: model.error_code,
        error_description: model.error_description,
        created_at: model.created_at,
        updated_at: model.updated_at,
        paid_at: model.paid_at,
    })
}

async fn cancel_order_payment(
    txn: &DatabaseTransaction,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), ShopError> {
    let order = orders::Entity::find_by_id(order_id)
        .lock_exclusive()
        .one(txn)
        .await
        .context("lock order of payment")?
        .ok_or(ShopError::OrderNotFound)?;
    let current: OrderPaymentStatus = order
        .payment_status
        .parse()
        .with_context(|| format!("order {} has unknown payment status", order.id))?;
    let next = order_payment_after_cancel(current);
    if next != current {
        let mut am = order.into_active_model();
        am.payment_status = Set(next.as_str().to_owned());
        am.updated_at = Set(now);
        am.update(txn).await.context("mark order payment cancelled")?;
    }
    Ok(())
}

fn payments_from_models(models: Vec<payments::Model>) -> Result<Vec<Payment>, ShopError> {
    models.into_iter().map(payment_from_model).collect()
}

impl PaymentRepository for DbPaymentRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Payment>, ShopError> {
        let model = payments::Entity::find_by_id(id.to_owned())
            .one(&self.db)
            .await
            .context("find payment by id")?;
        model.map(payment_from_model).transpose()
    }

    async fn find_active_for_order(&self, order_id: Uuid) -> Result<Option<Payment>, ShopError> {
        let model = payments::Entity::find()
            .filter(payments::Column::OrderId.eq(order_id))
            .filter(payments::Column::Status.is_in(ACTIVE_STATUSES.map(PaymentStatus::as_str)))
            .one(&self.db)
            .await
            .context("find active payment for order")?;
        model.map(payment_from_model).transpose()
    }

    async fn count_for_order(&self, order_id: Uuid) -> Result<u64, ShopError> {
        let count = payments::Entity::find()
            .filter(payments::Column::OrderId.eq(order_id))
            .count(&self.db)
            .await
            .context("count payments for order")?;
        Ok(count)
    }

    async fn insert_if_no_active(&self, payment: &Payment) -> Result<bool, ShopError> {
        let result = payments::ActiveModel {
            id: Set(payment.id.clone()),
            order_id: Set(payment.order_id),
            user_id: Set(payment.user_id),
            amount: Set(payment.amount),
            currency: Set(payment.currency.clone()),
            status: Set(payment.status.as_str().to_owned()),
            payment_method: Set(payment.payment_method.clone()),
            metadata: Set(payment.metadata.clone()),
            error_code: Set(payment.error_code.clone()),
            error_description: Set(payment.error_description.clone()),
            created_at: Set(payment.created_at),
            updated_at: Set(payment.updated_at),
            paid_at: Set(payment.paid_at),
        }
        .insert(&self.db)
        .await;
        match result {
            Ok(_) => {
                orders::Entity::update_many()
                    .col_expr(
                        orders::Column::PaymentStatus,
                        Expr::value(OrderPaymentStatus::Pending.as_str()),
                    )
                    .col_expr(orders::Column::UpdatedAt, Expr::value(payment.created_at))
                    .filter(orders::Column::Id.eq(payment.order_id))
                    .filter(
                        orders::Column::PaymentStatus.eq(OrderPaymentStatus::Cancelled.as_str()),
                    )
                    .exec(&self.db)
                    .await
                    .context("reopen order payment")?;
                Ok(true)
            }
            // uq_payments_active_order: another active payment won the race.
            Err(e) if unique_violation(&e).is_some() => Ok(false),
            Err(e) => Err(anyhow::Error::new(e).context("insert payment").into()),
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Payment>, ShopError> {
        let models = payments::Entity::find()
            .filter(payments::Column::UserId.eq(user_id))
            .order_by_desc(payments::Column::CreatedAt)
            .order_by_desc(payments::Column::Id)
            .all(&self.db)
            .await
            .context("list payments by user")?;
        payments_from_models(models)
    }

    async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<Payment>, ShopError> {
        let models = payments::Entity::find()
            .filter(payments::Column::OrderId.eq(order_id))
            .order_by_desc(payments::Column::CreatedAt)
            .order_by_desc(payments::Column::Id)
            .all(&self.db)
            .await
            .context("list payments by order")?;
        payments_from_models(models)
    }

    async fn reconcile(
        &self,
        id: &str,
        remote: &GatewayPayment,
        now: DateTime<Utc>,
    ) -> Result<ReconciledPayment, ShopError> {
        let id = id.to_owned();
        let remote = remote.clone();
        self.db
            .transaction::<_, ReconciledPayment, ShopError>(move |txn| {
                Box::pin(async move {
                    let model = payments::Entity::find_by_id(id.clone())
                        .lock_exclusive()
                        .one(txn)
                        .await
                        .context("lock payment")?
                        .ok_or(ShopError::PaymentNotFound)?;
                    let local = payment_from_model(model.clone())?;
                    let update = reconcile_payment(&local, &remote, now);

                    let mut am = model.into_active_model();
                    am.status = Set(update.status.as_str().to_owned());
                    am.payment_method = Set(update.payment_method);
                    am.error_code = Set(update.error_code);
                    am.error_description = Set(update.error_description);
                    am.paid_at = Set(update.paid_at);
                    am.updated_at = Set(now);
                    let saved = am.update(txn).await.context("update payment")?;

                    if update.newly_succeeded {
                        let order = orders::Entity::find_by_id(local.order_id)
                            .lock_exclusive()
                            .one(txn)
                            .await
                            .context("lock order of payment")?
                            .ok_or(ShopError::OrderNotFound)?;
                        let current: OrderStatus = order
                            .status
                            .parse()
                            .with_context(|| format!("order {} has unknown status", order.id))?;
                        if current == OrderStatus::Cancelled {
                            warn!(
                                payment_id = %id,
                                order_id = %order.id,
                                "payment succeeded for a cancelled order"
                            );
                        }
                        let mut order_am = order.into_active_model();
                        order_am.payment_status =
                            Set(OrderPaymentStatus::Succeeded.as_str().to_owned());
                        order_am.status = Set(order_status_after_payment(current).as_str().to_owned());
                        order_am.updated_at = Set(now);
                        order_am.update(txn).await.context("mark order paid")?;
                    } else if update.newly_cancelled {
                        cancel_order_payment(txn, local.order_id, now).await?;
                    }

                    Ok(ReconciledPayment {
                        payment: payment_from_model(saved)?,
                        order_paid: update.newly_succeeded,
                    })
                })
            })
            .await
            .map_err(|e| tx_error(e, "reconcile payment"))
    }

    async fn mark_cancelled(&self, id: &str, now: DateTime<Utc>) -> Result<Payment, ShopError> {
        let id = id.to_owned();
        self.db
            .transaction::<_, Payment, ShopError>(move |txn| {
                Box::pin(async move {
                    let model = payments::Entity::find_by_id(id)
                        .lock_exclusive()
                        .one(txn)
                        .await
                        .context("lock payment")?
                        .ok_or(ShopError::PaymentNotFound)?;
                    let local = payment_from_model(model.clone())?;
                    if !local.status.is_active() {
                        return Err(ShopError::InvalidTransition {
                            from: local.status.to_string(),
                            to: PaymentStatus::Cancelled.to_string(),
                        });
                    }

                    let mut metadata = model.metadata.clone();
                    if let Some(map) = metadata.as_object_mut() {
                        map.insert("cancelled_at".to_owned(), serde_json::json!(now.to_rfc3339()));
                    }
                    let mut am = model.into_active_model();
                    am.status = Set(PaymentStatus::Cancelled.as_str().to_owned());
                    am.metadata = Set(metadata);
                    am.updated_at = Set(now);
                    let saved = am.update(txn).await.context("cancel payment")?;
                    cancel_order_payment(txn, local.order_id, now).await?;
                    payment_from_model(saved)
                })
            })
            .await
            .map_err(|e| tx_error(e, "cancel payment"))
    }
}
