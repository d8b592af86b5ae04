use crate::{
    db::DbPool,
    entities::{category, product},
    errors::ServiceError,
    services::{ensure_tenant, non_blank},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_CATEGORY_EMOJI: &str = "📂";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Category name is required"))]
    pub name: String,
    pub emoji: Option<String>,
    pub description: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Category name cannot be empty"))]
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_system: bool,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            emoji: model.emoji,
            description: model.description,
            is_active: model.is_active,
            is_system: model.is_system,
        }
    }
}

#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Categories ordered by name. Inactive ones are skipped unless asked for.
    #[instrument(skip(self))]
    pub async fn list_categories(
        &self,
        tenant_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<CategoryResponse>, ServiceError> {
        let db = &*self.db_pool;
        ensure_tenant(db, tenant_id).await?;

        let mut query = category::Entity::find().filter(category::Column::TenantId.eq(tenant_id));
        if !include_inactive {
            query = query.filter(category::Column::IsActive.eq(true));
        }

        let categories = query
            .order_by_asc(category::Column::Name)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, %tenant_id, "Failed to list categories");
                ServiceError::DatabaseError(e)
            })?;

        Ok(categories.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_category(
        &self,
        tenant_id: Uuid,
        request: CreateCategoryRequest,
    ) -> Result<CategoryResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        ensure_tenant(db, tenant_id).await?;

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Category name is required".to_string(),
            ));
        }
        self.ensure_name_free(tenant_id, &name, None).await?;

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            name: Set(name),
            emoji: Set(Some(
                non_blank(request.emoji).unwrap_or_else(|| DEFAULT_CATEGORY_EMOJI.to_string()),
            )),
            description: Set(non_blank(request.description)),
            is_active: Set(true),
            is_system: Set(false),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, %tenant_id, "Failed to create category");
            ServiceError::DatabaseError(e)
        })?;

        info!(category_id = %model.id, %tenant_id, "Category created");
        Ok(model.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_category(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<CategoryResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let existing = self.find_category(tenant_id, category_id).await?;
        if existing.is_system {
            return Err(ServiceError::ValidationError(format!(
                "Category {} is a system category and cannot be edited",
                existing.name
            )));
        }

        let mut active: category::ActiveModel = existing.into();
        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::ValidationError(
                    "Category name cannot be empty".to_string(),
                ));
            }
            self.ensure_name_free(tenant_id, &name, Some(category_id))
                .await?;
            active.name = Set(name);
        }
        if let Some(emoji) = request.emoji {
            active.emoji = Set(non_blank(Some(emoji)));
        }
        if let Some(description) = request.description {
            active.description = Set(non_blank(Some(description)));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, %category_id, "Failed to update category");
            ServiceError::DatabaseError(e)
        })?;
        info!(%category_id, "Category updated");
        Ok(updated.into())
    }

    /// Hard delete. System categories and categories still holding products are refused.
    #[instrument(skip(self))]
    pub async fn delete_category(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = self.find_category(tenant_id, category_id).await?;
        if existing.is_system {
            return Err(ServiceError::ValidationError(format!(
                "Category {} is a system category and cannot be deleted",
                existing.name
            )));
        }

        let in_use = product::Entity::find()
            .filter(product::Column::TenantId.eq(tenant_id))
            .filter(product::Column::CategoryId.eq(category_id))
            .count(db)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category {} is used by {} product(s)",
                existing.name, in_use
            )));
        }

        existing.delete(db).await.map_err(|e| {
            error!(error = %e, %category_id, "Failed to delete category");
            ServiceError::DatabaseError(e)
        })?;
        info!(%category_id, "Category deleted");
        Ok(())
    }

    pub(crate) async fn find_category(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(category_id)
            .filter(category::Column::TenantId.eq(tenant_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", category_id))
    }

    async fn ensure_name_free(
        &self,
        tenant_id: Uuid,
        name: &str,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = category::Entity::find()
            .filter(category::Column::TenantId.eq(tenant_id))
            .filter(category::Column::Name.eq(name));
        if let Some(id) = except {
            query = query.filter(category::Column::Id.ne(id));
        }
        if query.one(&*self.db_pool).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A category named {} already exists",
                name
            )));
        }
        Ok(())
    }
}
