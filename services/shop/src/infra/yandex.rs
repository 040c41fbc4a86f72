use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::config::YandexConfig;
use crate::domain::repository::IdentityProvider;
use crate::domain::types::{ProviderProfile, ProviderTokenSet};
use crate::error::ShopError;

/// Yandex ID OAuth client: code exchange and profile lookup.
#[derive(Clone)]
pub struct YandexProvider {
    client: reqwest::Client,
    config: YandexConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    id: String,
    default_email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

/// Map an OAuth error body from the token endpoint.
fn token_error(body: &TokenErrorResponse) -> ShopError {
    if body.error != "invalid_grant" {
        return ShopError::Gateway(format!("token exchange failed: {}", body.error));
    }
    let expired = body
        .error_description
        .as_deref()
        .is_some_and(|d| d.to_ascii_lowercase().contains("expired"));
    if expired {
        ShopError::ExpiredCode
    } else {
        ShopError::InvalidGrant
    }
}

fn transport(e: reqwest::Error) -> ShopError {
    ShopError::Gateway(format!("yandex request failed: {e}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl YandexProvider {
    pub fn new(config: YandexConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build yandex http client")?;
        Ok(Self { client, config })
    }
}

impl IdentityProvider for YandexProvider {
    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<ProviderTokenSet, ShopError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(error) => token_error(&error),
                Err(_) => {
                    warn!(%status, %body, "yandex token endpoint failed");
                    ShopError::Gateway(format!("yandex token endpoint returned {status}"))
                }
            });
        }

        let token: TokenResponse = response.json().await.map_err(transport)?;
        Ok(ProviderTokenSet {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
        })
    }

    #[instrument(skip_all)]
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ShopError> {
        let response = self
            .client
            .get(&self.config.userinfo_url)
            .query(&[("format", "json")])
            .header(reqwest::header::AUTHORIZATION, format!("OAuth {access_token}"))
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "yandex userinfo request failed");
            return Err(ShopError::Gateway(format!("yandex userinfo returned {status}")));
        }

        let info: UserInfo = response.json().await.map_err(transport)?;
        let email = non_blank(info.default_email).ok_or_else(|| {
            ShopError::Validation("provider account has no usable email".into())
        })?;
        Ok(ProviderProfile {
            provider_id: info.id,
            email,
            first_name: non_blank(info.first_name),
            last_name: non_blank(info.last_name),
        })
    }
}
