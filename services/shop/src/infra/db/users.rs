use anyhow::Context as _;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel as _, QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};
use uuid::Uuid;

use lisa_domain::pagination::PageRequest;
use lisa_domain::user::UserRole;
use lisa_shop_schema::users;

use super::unique_violation;
use crate::domain::repository::UserRepository;
use crate::domain::types::{ProviderProfile, ProviderTokens, User};
use crate::error::ShopError;

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl DbUserRepository {
    async fn find_model(&self, id: Uuid) -> Result<users::Model, ShopError> {
        users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?
            .ok_or(ShopError::UserNotFound)
    }
}

fn set_tokens(am: &mut users::ActiveModel, tokens: &ProviderTokens) {
    am.provider_access_token = Set(Some(tokens.access_token.clone()));
    am.provider_refresh_token = Set(tokens.refresh_token.clone());
    am.provider_token_expires_at = Set(tokens.expires_at);
}

fn map_link_error(err: sea_orm::DbErr, what: &'static str) -> ShopError {
    if unique_violation(&err).is_some() {
        ShopError::ProviderAlreadyLinked
    } else {
        ShopError::Internal(anyhow::Error::new(err).context(what))
    }
}

impl UserRepository for DbUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ShopError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?;
        model.map(user_from_model).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ShopError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find user by email")?;
        model.map(user_from_model).transpose()
    }

    async fn find_by_yandex_id(&self, yandex_id: &str) -> Result<Option<User>, ShopError> {
        let model = users::Entity::find()
            .filter(users::Column::YandexId.eq(yandex_id))
            .one(&self.db)
            .await
            .context("find user by yandex id")?;
        model.map(user_from_model).transpose()
    }

    async fn create(&self, user: &User) -> Result<(), ShopError> {
        let tokens = user.provider_tokens.as_ref();
        let result = users::ActiveModel {
            id: Set(user.id),
            email: Set(user.email.clone()),
            password_hash: Set(user.password_hash.clone()),
            yandex_id: Set(user.yandex_id.clone()),
            first_name: Set(user.first_name.clone()),
            last_name: Set(user.last_name.clone()),
            role: Set(i16::from(user.role.as_u8())),
            provider_access_token: Set(tokens.map(|t| t.access_token.clone())),
            provider_refresh_token: Set(tokens.and_then(|t| t.refresh_token.clone())),
            provider_token_expires_at: Set(tokens.and_then(|t| t.expires_at)),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
        .insert(&self.db)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) => match unique_violation(&e) {
                Some(message) if message.contains("yandex_id") => {
                    Err(ShopError::ProviderAlreadyLinked)
                }
                Some(_) => Err(ShopError::UserAlreadyExists),
                None => Err(anyhow::Error::new(e).context("create user").into()),
            },
        }
    }

    async fn update_profile(
        &self,
        id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User, ShopError> {
        let mut am = self.find_model(id).await?.into_active_model();
        if let Some(first) = first_name {
            am.first_name = Set(Some(first.to_owned()));
        }
        if let Some(last) = last_name {
            am.last_name = Set(Some(last.to_owned()));
        }
        am.updated_at = Set(Utc::now());
        let model = am.update(&self.db).await.context("update user profile")?;
        user_from_model(model)
    }

    async fn link_provider(
        &self,
        id: Uuid,
        yandex_id: &str,
        profile: &ProviderProfile,
        tokens: &ProviderTokens,
    ) -> Result<User, ShopError> {
        let model = self.find_model(id).await?;
        if model
            .yandex_id
            .as_deref()
            .is_some_and(|linked| linked != yandex_id)
        {
            return Err(ShopError::ProviderAlreadyLinked);
        }
        let keep_first = model.first_name.is_some();
        let keep_last = model.last_name.is_some();
        let mut am = model.into_active_model();
        am.yandex_id = Set(Some(yandex_id.to_owned()));
        if !keep_first {
            am.first_name = Set(profile.first_name.clone());
        }
        if !keep_last {
            am.last_name = Set(profile.last_name.clone());
        }
        set_tokens(&mut am, tokens);
        am.updated_at = Set(Utc::now());
        let model = am
            .update(&self.db)
            .await
            .map_err(|e| map_link_error(e, "link provider identity"))?;
        user_from_model(model)
    }

    async fn refresh_provider_session(
        &self,
        id: Uuid,
        profile: &ProviderProfile,
        tokens: &ProviderTokens,
    ) -> Result<User, ShopError> {
        let mut am = self.find_model(id).await?.into_active_model();
        if profile.first_name.is_some() {
            am.first_name = Set(profile.first_name.clone());
        }
        if profile.last_name.is_some() {
            am.last_name = Set(profile.last_name.clone());
        }
        set_tokens(&mut am, tokens);
        am.updated_at = Set(Utc::now());
        let model = am
            .update(&self.db)
            .await
            .context("refresh provider session")?;
        user_from_model(model)
    }

    async fn set_role(&self, id: Uuid, role: UserRole) -> Result<bool, ShopError> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::Role, Expr::value(i16::from(role.as_u8())))
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("set user role")?;
        Ok(result.rows_affected > 0)
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<User>, ShopError> {
        let models = users::Entity::find()
            .order_by_asc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list users")?;
        models.into_iter().map(user_from_model).collect()
    }
}

fn user_from_model(model: users::Model) -> Result<User, ShopError> {
    let role = u8::try_from(model.role)
        .ok()
        .and_then(UserRole::from_u8)
        .with_context(|| format!("unknown role {} on user {}", model.role, model.id))?;
    let provider_tokens = model.provider_access_token.map(|access_token| ProviderTokens {
        access_token,
        refresh_token: model.provider_refresh_token,
        expires_at: model.provider_token_expires_at,
    });
    Ok(User {
        id: model.id,
        email: model.email,
        password_hash: model.password_hash,
        yandex_id: model.yandex_id,
        first_name: model.first_name,
        last_name: model.last_name,
        role,
        provider_tokens,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}
