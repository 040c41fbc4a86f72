use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};
use uuid::Uuid;

use lisa_domain::pagination::PageRequest;
use lisa_shop_schema::{order_items, products};

use super::foreign_key_violation;
use crate::domain::repository::ProductRepository;
use crate::domain::types::{Product, ProductFilter, ProductPatch};
use crate::error::ShopError;

#[derive(Clone)]
pub struct DbProductRepository {
    pub db: DatabaseConnection,
}

fn active_model(product: &Product) -> products::ActiveModel {
    products::ActiveModel {
        id: Set(product.id),
        name: Set(product.name.clone()),
        price: Set(product.price),
        category: Set(product.category.clone()),
        image_url: Set(product.image_url.clone()),
        stock_quantity: Set(product.stock_quantity),
        is_active: Set(product.is_active),
        created_by: Set(product.created_by),
        created_at: Set(product.created_at),
        updated_at: Set(product.updated_at),
    }
}

impl ProductRepository for DbProductRepository {
    async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Vec<Product>, ShopError> {
        let mut query = products::Entity::find();
        if let Some(category) = &filter.category {
            query = query.filter(products::Column::Category.eq(category.as_str()));
        }
        if !filter.include_inactive {
            query = query.filter(products::Column::IsActive.eq(true));
        }
        let models = query
            .order_by_desc(products::Column::CreatedAt)
            .order_by_desc(products::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list products")?;
        Ok(models.into_iter().map(product_from_model).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, ShopError> {
        let model = products::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find product by id")?;
        Ok(model.map(product_from_model))
    }

    async fn create(&self, product: &Product) -> Result<(), ShopError> {
        active_model(product)
            .insert(&self.db)
            .await
            .context("create product")?;
        Ok(())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>, ShopError> {
        let mut query = products::Entity::update_many()
            .col_expr(products::Column::UpdatedAt, Expr::value(now))
            .filter(products::Column::Id.eq(id));
        if let Some(name) = &patch.name {
            query = query.col_expr(products::Column::Name, Expr::value(name.clone()));
        }
        if let Some(price) = patch.price {
            query = query.col_expr(products::Column::Price, Expr::value(price));
        }
        if let Some(category) = &patch.category {
            query = query.col_expr(products::Column::Category, Expr::value(category.clone()));
        }
        if let Some(stock) = patch.stock_quantity {
            query = query.col_expr(products::Column::StockQuantity, Expr::value(stock));
        }
        if let Some(active) = patch.is_active {
            query = query.col_expr(products::Column::IsActive, Expr::value(active));
        }
        let result = query.exec(&self.db).await.context("update product")?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn set_image(
        &self,
        id: Uuid,
        image_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>, ShopError> {
        let result = products::Entity::update_many()
            .col_expr(products::Column::ImageUrl, Expr::value(image_url.to_owned()))
            .col_expr(products::Column::UpdatedAt, Expr::value(now))
            .filter(products::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("set product image")?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ShopError> {
        let referenced = order_items::Entity::find()
            .filter(order_items::Column::ProductId.eq(id))
            .count(&self.db)
            .await
            .context("count order items for product")?;
        if referenced > 0 {
            return Err(ShopError::ProductInUse);
        }
        match products::Entity::delete_by_id(id).exec(&self.db).await {
            Ok(result) => Ok(result.rows_affected > 0),
            // An order referencing the product landed after the count.
            Err(e) if foreign_key_violation(&e) => Err(ShopError::ProductInUse),
            Err(e) => Err(anyhow::Error::new(e).context("delete product").into()),
        }
    }
}

pub(super) fn product_from_model(model: products::Model) -> Product {
    Product {
        id: model.id,
        name: model.name,
        price: model.price,
        category: model.category,
        image_url: model.image_url,
        stock_quantity: model.stock_quantity,
        is_active: model.is_active,
        created_by: model.created_by,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
