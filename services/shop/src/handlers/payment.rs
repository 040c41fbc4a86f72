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
use lisa_domain::payment::PaymentStatus;

use crate::domain::types::Payment;
use crate::error::{ShopError, money};
use crate::state::AppState;
use crate::usecase::payment::{
    CancelPaymentUseCase, CreatePaymentUseCase, GetPaymentStatusUseCase, ListPaymentsUseCase,
};

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub order_id: Uuid,
    pub amount: String,
    pub currency: String,
    pub status: PaymentStatus,
    pub confirmation_url: Option<String>,
    pub payment_method: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    #[serde(serialize_with = "lisa_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "lisa_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
    #[serde(serialize_with = "lisa_core::serde::opt_to_rfc3339_ms")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            confirmation_url: payment.confirmation_url(),
            id: payment.id,
            order_id: payment.order_id,
            amount: money(payment.amount),
            currency: payment.currency,
            status: payment.status,
            payment_method: payment.payment_method,
            error_code: payment.error_code,
            error_description: payment.error_description,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
            paid_at: payment.paid_at,
        }
    }
}

// ── POST /payments/create ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
}

pub async fn create_payment(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<CreatePaymentRequest>, ShopError>,
) -> Result<(StatusCode, Json<PaymentResponse>), ShopError> {
    let usecase = CreatePaymentUseCase {
        orders: state.order_repo(),
        payments: state.payment_repo(),
        gateway: state.gateway.clone(),
        settings: state.payments.clone(),
    };
    let payment = usecase.execute(identity.into(), body.order_id).await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

// ── GET /payments ────────────────────────────────────────────────────────────

pub async fn list_payments(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentResponse>>, ShopError> {
    let usecase = ListPaymentsUseCase {
        payments: state.payment_repo(),
    };
    let payments = usecase.execute(identity.into()).await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}

// ── GET /payments/{id} ───────────────────────────────────────────────────────

/// Reconciles with the gateway before answering.
pub async fn get_payment(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ShopError>,
) -> Result<Json<PaymentResponse>, ShopError> {
    let usecase = GetPaymentStatusUseCase {
        payments: state.payment_repo(),
        gateway: state.gateway.clone(),
    };
    let payment = usecase.execute(identity.into(), &id).await?;
    Ok(Json(payment.into()))
}

// ── POST /payments/{id}/cancel ───────────────────────────────────────────────

pub async fn cancel_payment(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ShopError>,
) -> Result<Json<PaymentResponse>, ShopError> {
    let usecase = CancelPaymentUseCase {
        payments: state.payment_repo(),
        gateway: state.gateway.clone(),
    };
    let payment = usecase.execute(identity.into(), &id).await?;
    Ok(Json(payment.into()))
}
