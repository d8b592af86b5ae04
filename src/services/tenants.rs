use crate::{
    db::{self, DbPool},
    entities::{category, tenant},
    errors::ServiceError,
    services::non_blank,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Name of the category every tenant gets for combo products
pub const COMBO_CATEGORY_NAME: &str = "Combo";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 200, message = "Tenant name is required"))]
    pub name: String,
    #[validate(length(max = 32))]
    pub document: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Partial update of the tenant's registration details.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateTenantRequest {
    #[validate(length(min = 1, max = 200, message = "Tenant name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(max = 32))]
    pub document: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TenantResponse {
    pub id: Uuid,
    pub name: String,
    pub document: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<tenant::Model> for TenantResponse {
    fn from(model: tenant::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            document: model.document,
            phone: model.phone,
            address: model.address,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

async fn ensure_document_free<C: ConnectionTrait>(
    conn: &C,
    document: &str,
    owner: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = tenant::Entity::find().filter(tenant::Column::Document.eq(document));
    if let Some(owner) = owner {
        query = query.filter(tenant::Column::Id.ne(owner));
    }
    if query.one(conn).await?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "A tenant with document {} already exists",
            document
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct TenantService {
    db_pool: Arc<DbPool>,
}

impl TenantService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Registers a tenant together with its system "Combo" category.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_tenant(
        &self,
        request: CreateTenantRequest,
    ) -> Result<TenantResponse, ServiceError> {
        request.validate()?;

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Tenant name is required".to_string(),
            ));
        }
        let document = non_blank(request.document);
        let phone = non_blank(request.phone);
        let address = non_blank(request.address);

        let created = db::transaction(&self.db_pool, "create_tenant", move |txn| {
            Box::pin(async move {
                if let Some(doc) = &document {
                    ensure_document_free(txn, doc, None).await?;
                }

                let tenant_id = Uuid::new_v4();
                let model = tenant::ActiveModel {
                    id: Set(tenant_id),
                    name: Set(name),
                    document: Set(document),
                    phone: Set(phone),
                    address: Set(address),
                    is_active: Set(true),
                    last_order_number: Set(0),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                category::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    tenant_id: Set(tenant_id),
                    name: Set(COMBO_CATEGORY_NAME.to_string()),
                    emoji: Set(Some("🎁".to_string())),
                    description: Set(Some("Combo products".to_string())),
                    is_active: Set(true),
                    is_system: Set(true),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                Ok(model)
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create tenant");
            e
        })?;

        info!(tenant_id = %created.id, "Tenant created");
        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn get_tenant(&self, tenant_id: Uuid) -> Result<TenantResponse, ServiceError> {
        let model = tenant::Entity::find_by_id(tenant_id)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, %tenant_id, "Failed to fetch tenant");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::not_found("Tenant", tenant_id))?;
        Ok(model.into())
    }

    /// Renames the tenant or changes its contact details. A blank document,
    /// phone or address clears the field.
    #[instrument(skip(self, request))]
    pub async fn update_tenant(
        &self,
        tenant_id: Uuid,
        request: UpdateTenantRequest,
    ) -> Result<TenantResponse, ServiceError> {
        request.validate()?;

        let updated = db::transaction(&self.db_pool, "update_tenant", move |txn| {
            Box::pin(async move {
                let existing = tenant::Entity::find_by_id(tenant_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Tenant", tenant_id))?;

                let mut active: tenant::ActiveModel = existing.into();
                if let Some(name) = request.name {
                    let name = name.trim().to_string();
                    if name.is_empty() {
                        return Err(ServiceError::ValidationError(
                            "Tenant name cannot be empty".to_string(),
                        ));
                    }
                    active.name = Set(name);
                }
                if let Some(document) = request.document {
                    let document = non_blank(Some(document));
                    if let Some(doc) = &document {
                        ensure_document_free(txn, doc, Some(tenant_id)).await?;
                    }
                    active.document = Set(document);
                }
                if let Some(phone) = request.phone {
                    active.phone = Set(non_blank(Some(phone)));
                }
                if let Some(address) = request.address {
                    active.address = Set(non_blank(Some(address)));
                }
                Ok(active.update(txn).await?)
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, %tenant_id, "Failed to update tenant");
            e
        })?;

        info!(%tenant_id, name = %updated.name, "Tenant updated");
        Ok(updated.into())
    }
}
