// Tenant and catalog management
pub mod categories;
pub mod products;
pub mod tenants;

// Stock ledger shared by orders and manual adjustments
pub mod stock;

// Combo configuration and order lifecycle
pub mod combos;
pub mod orders;

use crate::{entities::tenant, errors::ServiceError};
use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

/// Fails with `NotFound` unless the tenant exists.
pub(crate) async fn ensure_tenant<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
) -> Result<tenant::Model, ServiceError> {
    tenant::Entity::find_by_id(tenant_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Tenant", tenant_id))
}

/// Trims an optional text field, mapping blank input to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
