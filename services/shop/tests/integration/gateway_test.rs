use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{
    basic_auth, body_partial_json, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lisa_domain::payment::PaymentStatus;
use lisa_shop::config::{YandexConfig, YooKassaConfig};
use lisa_shop::domain::repository::{IdentityProvider, PaymentGateway};
use lisa_shop::domain::types::{EmailLinkPolicy, GatewayPaymentRequest};
use lisa_shop::error::ShopError;
use lisa_shop::infra::yandex::YandexProvider;
use lisa_shop::infra::yookassa::YooKassaGateway;

fn yookassa(server: &MockServer) -> YooKassaGateway {
    YooKassaGateway::new(YooKassaConfig {
        shop_id: "123456".to_owned(),
        secret_key: "test_secret".to_owned(),
        api_url: server.uri(),
        return_url: "https://shop.test/payments/return".to_owned(),
        currency: "RUB".to_owned(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn yandex(server: &MockServer) -> YandexProvider {
    YandexProvider::new(YandexConfig {
        client_id: "client-id".to_owned(),
        client_secret: "client-secret".to_owned(),
        token_url: format!("{}/token", server.uri()),
        userinfo_url: format!("{}/info", server.uri()),
        email_link_policy: EmailLinkPolicy::Link,
        timeout_secs: 5,
    })
    .unwrap()
}

fn payment_json(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "status": status,
        "paid": status == "succeeded",
        "amount": { "value": "25.00", "currency": "RUB" },
        "confirmation": {
            "type": "redirect",
            "confirmation_url": format!("https://yoomoney.ru/checkout/payments/v2/contract?orderId={id}")
        },
        "created_at": "2026-10-16T09:00:00.000Z",
        "test": true
    })
}

// ── YooKassa ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_payment_with_auth_and_idempotence_key() {
    let server = MockServer::start().await;
    let order_id = Uuid::now_v7();
    Mock::given(method("POST"))
        .and(path("/payments"))
        .and(basic_auth("123456", "test_secret"))
        .and(header("Idempotence-Key", format!("{order_id}-0").as_str()))
        .and(body_partial_json(json!({
            "amount": { "value": "25.00", "currency": "RUB" },
            "confirmation": { "type": "redirect", "return_url": "https://shop.test/payments/return" },
            "capture": true,
            "metadata": { "order_id": order_id }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(payment_json("2d9c", "pending")))
        .expect(1)
        .mount(&server)
        .await;

    let payment = yookassa(&server)
        .create(&GatewayPaymentRequest {
            order_id,
            amount: dec!(25),
            currency: "RUB".to_owned(),
            description: format!("Payment for order {order_id}"),
            return_url: "https://shop.test/payments/return".to_owned(),
            idempotency_key: format!("{order_id}-0"),
        })
        .await
        .unwrap();

    assert_eq!(payment.id, "2d9c");
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, dec!(25.00));
    assert!(payment.confirmation_url.unwrap().contains("orderId=2d9c"));
}

#[tokio::test]
async fn should_report_rejected_create_as_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "type": "error",
            "code": "invalid_credentials"
        })))
        .mount(&server)
        .await;

    let result = yookassa(&server)
        .create(&GatewayPaymentRequest {
            order_id: Uuid::now_v7(),
            amount: dec!(1.00),
            currency: "RUB".to_owned(),
            description: "x".to_owned(),
            return_url: "https://shop.test".to_owned(),
            idempotency_key: "k".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(ShopError::Gateway(_))),
        "expected Gateway, got {result:?}"
    );
}

#[tokio::test]
async fn should_read_payment_with_method_and_cancellation() {
    let server = MockServer::start().await;
    let mut body = payment_json("2d9c", "canceled");
    body["payment_method"] = json!({ "type": "bank_card", "id": "2d9c", "saved": false });
    body["cancellation_details"] = json!({ "party": "yoo_money", "reason": "expired_on_confirmation" });
    Mock::given(method("GET"))
        .and(path("/payments/2d9c"))
        .and(basic_auth("123456", "test_secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let payment = yookassa(&server).find("2d9c").await.unwrap().unwrap();

    assert_eq!(payment.status, PaymentStatus::Cancelled);
    assert_eq!(payment.payment_method.as_deref(), Some("bank_card"));
    let cancellation = payment.cancellation.unwrap();
    assert_eq!(cancellation.party, "yoo_money");
    assert_eq!(cancellation.reason, "expired_on_confirmation");
}

#[tokio::test]
async fn should_return_none_for_unknown_payment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(yookassa(&server).find("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn should_cancel_with_idempotence_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/2d9c/cancel"))
        .and(header("Idempotence-Key", "2d9c-cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payment_json("2d9c", "canceled")))
        .expect(1)
        .mount(&server)
        .await;

    let payment = yookassa(&server).cancel("2d9c", "2d9c-cancel").await.unwrap();

    assert_eq!(payment.status, PaymentStatus::Cancelled);
}

// ── Yandex ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_exchange_code_for_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=4721"))
        .and(body_string_contains("client_id=client-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "bearer",
            "access_token": "AQAAAAA",
            "expires_in": 31536000,
            "refresh_token": "1:GN686QVt0mmakDd9"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = yandex(&server).exchange_code("4721").await.unwrap();

    assert_eq!(tokens.access_token, "AQAAAAA");
    assert_eq!(tokens.refresh_token.as_deref(), Some("1:GN686QVt0mmakDd9"));
    assert_eq!(tokens.expires_in, Some(31_536_000));
}

#[tokio::test]
async fn should_map_token_endpoint_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=old"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Code has expired"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=used"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Code has already been used"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=boom"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;
    let provider = yandex(&server);

    let result = provider.exchange_code("old").await;
    assert!(
        matches!(result, Err(ShopError::ExpiredCode)),
        "expected ExpiredCode, got {result:?}"
    );
    let result = provider.exchange_code("used").await;
    assert!(
        matches!(result, Err(ShopError::InvalidGrant)),
        "expected InvalidGrant, got {result:?}"
    );
    let result = provider.exchange_code("boom").await;
    assert!(
        matches!(result, Err(ShopError::Gateway(_))),
        "expected Gateway, got {result:?}"
    );
}

#[tokio::test]
async fn should_fetch_profile_with_oauth_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/info"))
        .and(query_param("format", "json"))
        .and(header("Authorization", "OAuth AQAAAAA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "1000034426",
            "login": "ann.petrova",
            "default_email": "ann.petrova@yandex.ru",
            "first_name": "Ann",
            "last_name": ""
        })))
        .mount(&server)
        .await;

    let profile = yandex(&server).fetch_profile("AQAAAAA").await.unwrap();

    assert_eq!(profile.provider_id, "1000034426");
    assert_eq!(profile.email, "ann.petrova@yandex.ru");
    assert_eq!(profile.first_name.as_deref(), Some("Ann"));
    assert_eq!(profile.last_name, None);
}

#[tokio::test]
async fn should_reject_profile_without_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "1000034426" })))
        .mount(&server)
        .await;

    let result = yandex(&server).fetch_profile("AQAAAAA").await;

    assert!(
        matches!(result, Err(ShopError::Validation(_))),
        "expected Validation, got {result:?}"
    );
}
