use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use lisa_domain::pagination::PageRequest;
use lisa_domain::user::UserRole;

use crate::domain::repository::{FileStorage, ProductRepository};
use crate::domain::types::{Actor, Product, ProductFilter, ProductPatch};
use crate::error::ShopError;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

fn validate_name(name: &str) -> Result<(), ShopError> {
    let len = name.trim().chars().count();
    if len == 0 || len > 200 {
        return Err(ShopError::Validation(
            "name must be 1 to 200 characters".into(),
        ));
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<(), ShopError> {
    let len = category.trim().chars().count();
    if len == 0 || len > 100 {
        return Err(ShopError::Validation(
            "category must be 1 to 100 characters".into(),
        ));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), ShopError> {
    if price.is_sign_negative() {
        return Err(ShopError::Validation("price must not be negative".into()));
    }
    if price.normalize().scale() > 2 {
        return Err(ShopError::Validation(
            "price must have at most two decimal places".into(),
        ));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> Result<(), ShopError> {
    if stock < 0 {
        return Err(ShopError::Validation(
            "stock_quantity must not be negative".into(),
        ));
    }
    Ok(())
}

/// File extension for an accepted image content type.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

// ── ListProducts ─────────────────────────────────────────────────────────────

pub struct ListProductsUseCase<P: ProductRepository> {
    pub products: P,
}

impl<P: ProductRepository> ListProductsUseCase<P> {
    pub async fn execute(
        &self,
        actor: Option<Actor>,
        category: Option<String>,
        include_inactive: bool,
        page: PageRequest,
    ) -> Result<Vec<Product>, ShopError> {
        let is_admin = actor.is_some_and(|a| a.role.is_admin());
        let filter = ProductFilter {
            category: category.filter(|c| !c.trim().is_empty()),
            include_inactive: include_inactive && is_admin,
        };
        self.products.list(&filter, page).await
    }
}

// ── GetProduct ───────────────────────────────────────────────────────────────

pub struct GetProductUseCase<P: ProductRepository> {
    pub products: P,
}

impl<P: ProductRepository> GetProductUseCase<P> {
    /// Deactivated products are only visible to admins.
    pub async fn execute(&self, actor: Option<Actor>, id: Uuid) -> Result<Product, ShopError> {
        let product = self
            .products
            .find_by_id(id)
            .await?
            .ok_or(ShopError::ProductNotFound)?;
        let is_admin = actor.is_some_and(|a| a.role.is_admin());
        if !product.is_active && !is_admin {
            return Err(ShopError::ProductNotFound);
        }
        Ok(product)
    }
}

// ── CreateProduct ────────────────────────────────────────────────────────────

pub struct CreateProductInput {
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub stock_quantity: i32,
    pub is_active: bool,
}

pub struct CreateProductUseCase<P: ProductRepository> {
    pub products: P,
}

impl<P: ProductRepository> CreateProductUseCase<P> {
    pub async fn execute(
        &self,
        actor: Actor,
        input: CreateProductInput,
    ) -> Result<Product, ShopError> {
        actor.require_role(UserRole::Admin)?;
        validate_name(&input.name)?;
        validate_category(&input.category)?;
        validate_price(input.price)?;
        validate_stock(input.stock_quantity)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::now_v7(),
            name: input.name.trim().to_owned(),
            price: input.price,
            category: input.category.trim().to_owned(),
            image_url: None,
            stock_quantity: input.stock_quantity,
            is_active: input.is_active,
            created_by: Some(actor.user_id),
            created_at: now,
            updated_at: now,
        };
        self.products.create(&product).await?;
        info!(product_id = %product.id, admin_id = %actor.user_id, "product created");
        Ok(product)
    }
}

// ── UpdateProduct ────────────────────────────────────────────────────────────

pub struct UpdateProductUseCase<P: ProductRepository> {
    pub products: P,
}

impl<P: ProductRepository> UpdateProductUseCase<P> {
    pub async fn execute(
        &self,
        actor: Actor,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<Product, ShopError> {
        actor.require_role(UserRole::Admin)?;
        if patch.is_empty() {
            return Err(ShopError::Validation("nothing to update".into()));
        }
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(category) = &patch.category {
            validate_category(category)?;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
        }
        if let Some(stock) = patch.stock_quantity {
            validate_stock(stock)?;
        }

        let patch = ProductPatch {
            name: patch.name.map(|n| n.trim().to_owned()),
            category: patch.category.map(|c| c.trim().to_owned()),
            ..patch
        };
        self.products
            .update(id, &patch, Utc::now())
            .await?
            .ok_or(ShopError::ProductNotFound)
    }
}

// ── DeleteProduct ────────────────────────────────────────────────────────────

pub struct DeleteProductUseCase<P: ProductRepository> {
    pub products: P,
}

impl<P: ProductRepository> DeleteProductUseCase<P> {
    /// Products referenced by orders cannot be deleted; deactivate them instead.
    pub async fn execute(&self, actor: Actor, id: Uuid) -> Result<(), ShopError> {
        actor.require_role(UserRole::Admin)?;
        if !self.products.delete(id).await? {
            return Err(ShopError::ProductNotFound);
        }
        info!(product_id = %id, admin_id = %actor.user_id, "product deleted");
        Ok(())
    }
}

// ── UploadProductImage ───────────────────────────────────────────────────────

pub struct UploadProductImageUseCase<P: ProductRepository, S: FileStorage> {
    pub products: P,
    pub storage: S,
}

impl<P: ProductRepository, S: FileStorage> UploadProductImageUseCase<P, S> {
    pub async fn execute(
        &self,
        actor: Actor,
        id: Uuid,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<Product, ShopError> {
        actor.require_role(UserRole::Admin)?;
        let extension = image_extension(content_type).ok_or_else(|| {
            ShopError::Validation("image must be png, jpeg, webp or gif".into())
        })?;
        if bytes.is_empty() || bytes.len() > MAX_IMAGE_BYTES {
            return Err(ShopError::Validation(format!(
                "image must be between 1 byte and {MAX_IMAGE_BYTES} bytes"
            )));
        }
        if self.products.find_by_id(id).await?.is_none() {
            return Err(ShopError::ProductNotFound);
        }

        let url = self.storage.store("products", extension, bytes).await?;
        self.products
            .set_image(id, &url, Utc::now())
            .await?
            .ok_or(ShopError::ProductNotFound)
    }
}
