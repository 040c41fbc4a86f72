use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use lisa_core::health::{healthz, readyz};
use lisa_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    admin::{change_order_status, change_user_role, list_all_orders, list_users},
    auth::{login, logout, refresh, register},
    oauth::{yandex_callback, yandex_register},
    order::{cancel_order, create_order, get_order, list_orders},
    payment::{cancel_payment, create_payment, get_payment, list_payments},
    product::{
        create_product, delete_product, get_product, list_products, update_product,
        upload_product_image,
    },
    user::{get_me, update_me},
};
use crate::state::AppState;
use crate::usecase::catalog::MAX_IMAGE_BYTES;

pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.storage.upload_dir);
    let uploads_path = state.storage.public_path.clone();

    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Local accounts
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        // Yandex OAuth
        .route("/auth/yandex/callback", post(yandex_callback))
        .route("/auth/yandex/register", post(yandex_register))
        // Profile
        .route("/users/@me", get(get_me))
        .route("/users/@me", patch(update_me))
        // Catalog
        .route("/products", get(list_products))
        .route("/products", post(create_product))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}", put(update_product))
        .route("/products/{id}", delete(delete_product))
        .route(
            "/products/{id}/image",
            put(upload_product_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        // Orders
        .route("/orders", post(create_order))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/cancel", post(cancel_order))
        // Payments
        .route("/payments/create", post(create_payment))
        .route("/payments", get(list_payments))
        .route("/payments/{id}", get(get_payment))
        .route("/payments/{id}/cancel", post(cancel_payment))
        // Admin
        .route("/admin/orders", get(list_all_orders))
        .route("/admin/orders/{id}/status", put(change_order_status))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/role", put(change_user_role))
        // Uploaded files
        .nest_service(&uploads_path, uploads)
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
