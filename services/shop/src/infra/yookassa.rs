use std::str::FromStr;
use std::time::Duration;

use anyhow::Context as _;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use lisa_domain::payment::PaymentStatus;

use crate::config::YooKassaConfig;
use crate::domain::repository::PaymentGateway;
use crate::domain::types::{CancellationDetails, GatewayPayment, GatewayPaymentRequest};
use crate::error::{ShopError, money};

const IDEMPOTENCE_KEY_HEADER: &str = "Idempotence-Key";

/// YooKassa REST client (API v3).
#[derive(Clone)]
pub struct YooKassaGateway {
    client: reqwest::Client,
    config: YooKassaConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Amount {
    value: String,
    currency: String,
}

#[derive(Debug, Serialize)]
struct Confirmation<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    return_url: &'a str,
}

#[derive(Debug, Serialize)]
struct CreatePaymentBody<'a> {
    amount: Amount,
    confirmation: Confirmation<'a>,
    capture: bool,
    description: &'a str,
    metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ConfirmationView {
    confirmation_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodView {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct CancellationView {
    party: String,
    reason: String,
}

#[derive(Debug, Deserialize)]
struct PaymentView {
    id: String,
    status: String,
    amount: Amount,
    confirmation: Option<ConfirmationView>,
    payment_method: Option<PaymentMethodView>,
    cancellation_details: Option<CancellationView>,
}

impl TryFrom<PaymentView> for GatewayPayment {
    type Error = ShopError;

    fn try_from(view: PaymentView) -> Result<Self, Self::Error> {
        let status = PaymentStatus::from_str(&view.status)
            .map_err(|e| ShopError::Gateway(format!("payment {}: {e}", view.id)))?;
        let amount = Decimal::from_str(&view.amount.value).map_err(|e| {
            ShopError::Gateway(format!("payment {} amount {:?}: {e}", view.id, view.amount.value))
        })?;
        Ok(GatewayPayment {
            id: view.id,
            status,
            amount,
            currency: view.amount.currency,
            confirmation_url: view.confirmation.and_then(|c| c.confirmation_url),
            payment_method: view.payment_method.map(|m| m.kind),
            cancellation: view.cancellation_details.map(|c| CancellationDetails {
                party: c.party,
                reason: c.reason,
            }),
        })
    }
}

fn transport(e: reqwest::Error) -> ShopError {
    ShopError::Gateway(format!("yookassa request failed: {e}"))
}

impl YooKassaGateway {
    pub fn new(config: YooKassaConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build yookassa http client")?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    async fn read_payment(&self, response: reqwest::Response) -> Result<GatewayPayment, ShopError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "yookassa rejected request");
            return Err(ShopError::Gateway(format!("yookassa returned {status}")));
        }
        let view: PaymentView = response.json().await.map_err(transport)?;
        view.try_into()
    }
}

impl PaymentGateway for YooKassaGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create(&self, request: &GatewayPaymentRequest) -> Result<GatewayPayment, ShopError> {
        let body = CreatePaymentBody {
            amount: Amount {
                value: money(request.amount),
                currency: request.currency.clone(),
            },
            confirmation: Confirmation {
                kind: "redirect",
                return_url: &request.return_url,
            },
            capture: true,
            description: &request.description,
            metadata: serde_json::json!({ "order_id": request.order_id }),
        };
        let response = self
            .client
            .post(self.url("/payments"))
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            .header(IDEMPOTENCE_KEY_HEADER, &request.idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        self.read_payment(response).await
    }

    #[instrument(skip(self))]
    async fn find(&self, id: &str) -> Result<Option<GatewayPayment>, ShopError> {
        let response = self
            .client
            .get(self.url(&format!("/payments/{id}")))
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.read_payment(response).await.map(Some)
    }

    #[instrument(skip(self))]
    async fn cancel(&self, id: &str, idempotency_key: &str) -> Result<GatewayPayment, ShopError> {
        let response = self
            .client
            .post(self.url(&format!("/payments/{id}/cancel")))
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            .header(IDEMPOTENCE_KEY_HEADER, idempotency_key)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(transport)?;
        self.read_payment(response).await
    }
}
