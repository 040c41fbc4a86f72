use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lisa_auth_types::identity::Identity;
use lisa_domain::pagination::PageRequest;

use crate::domain::types::{Actor, Product, ProductPatch};
use crate::error::{ShopError, money};
use crate::state::AppState;
use crate::usecase::catalog::{
    CreateProductInput, CreateProductUseCase, DeleteProductUseCase, GetProductUseCase,
    ListProductsUseCase, UpdateProductUseCase, UploadProductImageUseCase,
};

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub price: String,
    pub category: String,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
    pub is_active: bool,
    #[serde(serialize_with = "lisa_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "lisa_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: money(product.price),
            category: product.category,
            image_url: product.image_url,
            stock_quantity: product.stock_quantity,
            is_active: product.is_active,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

// ── GET /products ────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ProductListQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
    pub category: Option<String>,
    /// Honoured for admins only.
    pub include_inactive: Option<bool>,
}

pub async fn list_products(
    identity: Option<Identity>,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ProductListQuery>, ShopError>,
) -> Result<Json<Vec<ProductResponse>>, ShopError> {
    let page = PageRequest {
        per_page: query.per_page.unwrap_or(20),
        page: query.page.unwrap_or(1),
    };
    let usecase = ListProductsUseCase {
        products: state.product_repo(),
    };
    let products = usecase
        .execute(
            identity.map(Actor::from),
            query.category,
            query.include_inactive.unwrap_or(false),
            page,
        )
        .await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

// ── GET /products/{id} ───────────────────────────────────────────────────────

pub async fn get_product(
    identity: Option<Identity>,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ShopError>,
) -> Result<Json<ProductResponse>, ShopError> {
    let usecase = GetProductUseCase {
        products: state.product_repo(),
    };
    let product = usecase.execute(identity.map(Actor::from), id).await?;
    Ok(Json(product.into()))
}

// ── POST /products ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: Decimal,
    pub category: String,
    #[serde(default)]
    pub stock_quantity: i32,
    pub is_active: Option<bool>,
}

pub async fn create_product(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<CreateProductRequest>, ShopError>,
) -> Result<(StatusCode, Json<ProductResponse>), ShopError> {
    let usecase = CreateProductUseCase {
        products: state.product_repo(),
    };
    let product = usecase
        .execute(
            identity.into(),
            CreateProductInput {
                name: body.name,
                price: body.price,
                category: body.category,
                stock_quantity: body.stock_quantity,
                is_active: body.is_active.unwrap_or(true),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

// ── PUT /products/{id} ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

pub async fn update_product(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ShopError>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateProductRequest>, ShopError>,
) -> Result<Json<ProductResponse>, ShopError> {
    let usecase = UpdateProductUseCase {
        products: state.product_repo(),
    };
    let patch = ProductPatch {
        name: body.name,
        price: body.price,
        category: body.category,
        stock_quantity: body.stock_quantity,
        is_active: body.is_active,
    };
    let product = usecase.execute(identity.into(), id, patch).await?;
    Ok(Json(product.into()))
}

// ── DELETE /products/{id} ────────────────────────────────────────────────────

pub async fn delete_product(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ShopError>,
) -> Result<StatusCode, ShopError> {
    let usecase = DeleteProductUseCase {
        products: state.product_repo(),
    };
    usecase.execute(identity.into(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── PUT /products/{id}/image ─────────────────────────────────────────────────

/// Raw image body; the type comes from `Content-Type`.
pub async fn upload_product_image(
    identity: Identity,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ShopError>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ProductResponse>, ShopError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let usecase = UploadProductImageUseCase {
        products: state.product_repo(),
        storage: state.storage.clone(),
    };
    let product = usecase
        .execute(identity.into(), id, content_type, &body)
        .await?;
    Ok(Json(product.into()))
}
