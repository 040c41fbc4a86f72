use sea_orm::Database;
use tracing::info;

use lisa_shop::config::ShopConfig;
use lisa_shop::infra::storage::LocalFileStorage;
use lisa_shop::infra::yandex::YandexProvider;
use lisa_shop::infra::yookassa::YooKassaGateway;
use lisa_shop::router::build_router;
use lisa_shop::state::AppState;
use lisa_shop::usecase::payment::PaymentSettings;
use lisa_shop::usecase::token::TokenSettings;
use lisa_shop_migration::{Migrator, MigratorTrait};

#[tokio::main]
async fn main() {
    lisa_core::tracing::init_tracing();

    let config = ShopConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    if config.run_migrations {
        Migrator::up(&db, None)
            .await
            .expect("failed to apply migrations");
        info!("migrations applied");
    }

    let state = AppState {
        db,
        tokens: TokenSettings {
            jwt_secret: config.jwt_secret.clone(),
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
        },
        payments: PaymentSettings {
            currency: config.yookassa.currency.clone(),
            return_url: config.yookassa.return_url.clone(),
        },
        admin_emails: config.admin_emails.clone(),
        email_link_policy: config.yandex.email_link_policy,
        gateway: YooKassaGateway::new(config.yookassa.clone())
            .expect("failed to build YooKassa client"),
        yandex: YandexProvider::new(config.yandex.clone()).expect("failed to build Yandex client"),
        storage: LocalFileStorage::new(&config.storage),
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.shop_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("shop service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
