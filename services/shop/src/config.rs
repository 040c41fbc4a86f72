use crate::domain::types::EmailLinkPolicy;

/// Shop service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// HMAC secret for signing access, refresh and registration tokens.
    pub jwt_secret: String,
    /// TCP port to listen on (default 3114). Env var: `SHOP_PORT`.
    pub shop_port: u16,
    /// Apply pending migrations at startup. Env var: `RUN_MIGRATIONS`.
    pub run_migrations: bool,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    /// Emails that get the admin role when their account is created.
    pub admin_emails: Vec<String>,
    pub yookassa: YooKassaConfig,
    pub yandex: YandexConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct YooKassaConfig {
    pub shop_id: String,
    pub secret_key: String,
    /// Base URL without trailing slash (default `https://api.yookassa.ru/v3`).
    pub api_url: String,
    /// Where the gateway sends the buyer after confirmation.
    pub return_url: String,
    pub currency: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct YandexConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub email_link_policy: EmailLinkPolicy,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Local directory uploads are written to (default `uploads`).
    pub upload_dir: String,
    /// URL prefix the upload directory is served under (default `/static/uploads`).
    pub public_path: String,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ShopConfig {
    pub fn from_env() -> Self {
        let gateway_timeout_secs = parsed_or("GATEWAY_TIMEOUT_SECS", 10);
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET"),
            shop_port: parsed_or("SHOP_PORT", 3114),
            run_migrations: parsed_or("RUN_MIGRATIONS", false),
            access_token_ttl_secs: parsed_or("ACCESS_TOKEN_TTL_SECS", 900),
            refresh_token_ttl_secs: parsed_or("REFRESH_TOKEN_TTL_SECS", 604_800),
            admin_emails: parse_admin_emails(&var_or("ADMIN_EMAILS", "")),
            yookassa: YooKassaConfig {
                shop_id: std::env::var("YOOKASSA_SHOP_ID").expect("YOOKASSA_SHOP_ID"),
                secret_key: std::env::var("YOOKASSA_SECRET_KEY").expect("YOOKASSA_SECRET_KEY"),
                api_url: var_or("YOOKASSA_API_URL", "https://api.yookassa.ru/v3")
                    .trim_end_matches('/')
                    .to_owned(),
                return_url: std::env::var("PAYMENT_RETURN_URL").expect("PAYMENT_RETURN_URL"),
                currency: var_or("PAYMENT_CURRENCY", "RUB"),
                timeout_secs: gateway_timeout_secs,
            },
            yandex: YandexConfig {
                client_id: std::env::var("YANDEX_CLIENT_ID").expect("YANDEX_CLIENT_ID"),
                client_secret: std::env::var("YANDEX_CLIENT_SECRET")
                    .expect("YANDEX_CLIENT_SECRET"),
                token_url: var_or("YANDEX_TOKEN_URL", "https://oauth.yandex.ru/token"),
                userinfo_url: var_or("YANDEX_USERINFO_URL", "https://login.yandex.ru/info"),
                email_link_policy: var_or("OAUTH_EMAIL_LINKING", "link")
                    .parse()
                    .expect("OAUTH_EMAIL_LINKING must be `link` or `reject`"),
                timeout_secs: gateway_timeout_secs,
            },
            storage: StorageConfig {
                upload_dir: var_or("UPLOAD_DIR", "uploads"),
                public_path: var_or("UPLOAD_PUBLIC_PATH", "/static/uploads")
                    .trim_end_matches('/')
                    .to_owned(),
            },
        }
    }
}

/// Comma-separated list, trimmed and lower-cased; blanks dropped.
pub fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
