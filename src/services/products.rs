use crate::{
    db::{self, DbPool},
    entities::{
        category, combo, combo_slot, combo_slot_item, max_money, order, order_combo_choice,
        order_item, product, stock_movement, MovementReason, OrderStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{ensure_tenant, non_blank, stock},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

const DEFAULT_PREP_TIME_MINUTES: i32 = 15;

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    let message = if price.is_sign_negative() {
        "Price cannot be negative"
    } else if price.normalize().scale() > 2 {
        "Price cannot have more than two decimal places"
    } else if *price > max_money() {
        "Price cannot exceed 99999999.99"
    } else {
        return Ok(());
    };
    let mut err = ValidationError::new("price");
    err.message = Some(message.into());
    Err(err)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    #[validate(range(min = 0, message = "Preparation time cannot be negative"))]
    pub prep_time_minutes: Option<i32>,
    /// Opening stock, recorded as a manual movement
    #[serde(default)]
    pub stock_quantity: i32,
    pub is_active: Option<bool>,
}

/// Partial update. `stock_quantity` sets an absolute count; the difference is
/// booked as a manual movement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Product name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    #[validate(range(min = 0, message = "Preparation time cannot be negative"))]
    pub prep_time_minutes: Option<i32>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SetAvailabilityRequest {
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct StockAdjustmentRequest {
    /// Signed change in units; must not be zero
    pub delta: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub active_only: bool,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub is_active: bool,
    pub prep_time_minutes: i32,
    pub stock_quantity: i32,
    pub is_combo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductResponse {
    pub fn from_model(model: product::Model, is_combo: bool) -> Self {
        Self {
            id: model.id,
            category_id: model.category_id,
            name: model.name,
            description: model.description,
            price: model.price,
            is_active: model.is_active,
            prep_time_minutes: model.prep_time_minutes,
            stock_quantity: model.stock_quantity,
            is_combo,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Product ids among `product_ids` that carry a combo configuration.
pub(crate) async fn combo_product_ids<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    product_ids: Vec<Uuid>,
) -> Result<HashSet<Uuid>, ServiceError> {
    if product_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let combos = combo::Entity::find()
        .filter(combo::Column::TenantId.eq(tenant_id))
        .filter(combo::Column::ProductId.is_in(product_ids))
        .all(conn)
        .await?;
    Ok(combos.into_iter().map(|c| c.product_id).collect())
}

/// Loads a product, scoped to its tenant.
pub(crate) async fn find_product<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    product_id: Uuid,
) -> Result<product::Model, ServiceError> {
    product::Entity::find_by_id(product_id)
        .filter(product::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Product", product_id))
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    enforce_stock: bool,
}

impl ProductService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        enforce_stock: bool,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            enforce_stock,
        }
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.publish(event).await;
        }
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        tenant_id: Uuid,
        filter: ProductFilter,
    ) -> Result<Vec<ProductResponse>, ServiceError> {
        let db = &*self.db_pool;
        ensure_tenant(db, tenant_id).await?;

        let mut query = product::Entity::find().filter(product::Column::TenantId.eq(tenant_id));
        if filter.active_only {
            query = query.filter(product::Column::IsActive.eq(true));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }

        let products = query
            .order_by_asc(product::Column::Name)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, %tenant_id, "Failed to list products");
                ServiceError::DatabaseError(e)
            })?;

        let combos =
            combo_product_ids(db, tenant_id, products.iter().map(|p| p.id).collect()).await?;
        Ok(products
            .into_iter()
            .map(|p| {
                let is_combo = combos.contains(&p.id);
                ProductResponse::from_model(p, is_combo)
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_product(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductResponse, ServiceError> {
        let db = &*self.db_pool;
        let model = find_product(db, tenant_id, product_id).await?;
        let is_combo = !combo_product_ids(db, tenant_id, vec![product_id])
            .await?
            .is_empty();
        Ok(ProductResponse::from_model(model, is_combo))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        tenant_id: Uuid,
        request: CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Product name is required".to_string(),
            ));
        }
        let enforce = self.enforce_stock;

        let created = db::transaction(&self.db_pool, "create_product", move |txn| {
            Box::pin(async move {
                ensure_tenant(txn, tenant_id).await?;
                if let Some(category_id) = request.category_id {
                    ensure_category(txn, tenant_id, category_id).await?;
                }

                let product_id = Uuid::new_v4();
                product::ActiveModel {
                    id: Set(product_id),
                    tenant_id: Set(tenant_id),
                    category_id: Set(request.category_id),
                    name: Set(name),
                    description: Set(non_blank(request.description)),
                    price: Set(request.price),
                    is_active: Set(request.is_active.unwrap_or(true)),
                    prep_time_minutes: Set(request
                        .prep_time_minutes
                        .unwrap_or(DEFAULT_PREP_TIME_MINUTES)),
                    stock_quantity: Set(0),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                if request.stock_quantity != 0 {
                    stock::apply_stock_delta(
                        txn,
                        tenant_id,
                        product_id,
                        request.stock_quantity,
                        MovementReason::ManualAdjustment,
                        None,
                        enforce,
                    )
                    .await?;
                }

                find_product(txn, tenant_id, product_id).await
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, %tenant_id, "Failed to create product");
            e
        })?;

        info!(product_id = %created.id, %tenant_id, "Product created");
        Ok(ProductResponse::from_model(created, false))
    }

    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;
        let enforce = self.enforce_stock;

        let (updated, availability_changed, stock_delta) =
            db::transaction(&self.db_pool, "update_product", move |txn| {
                Box::pin(async move {
                    let existing = find_product(txn, tenant_id, product_id).await?;
                    let was_active = existing.is_active;
                    let stock_delta = match request.stock_quantity {
                        Some(target) => target
                            .checked_sub(existing.stock_quantity)
                            .filter(|delta| *delta != i32::MIN)
                            .ok_or_else(|| {
                                ServiceError::ValidationError(format!(
                                    "Stock count {} is out of range",
                                    target
                                ))
                            })?,
                        None => 0,
                    };

                    let mut active: product::ActiveModel = existing.into();
                    if let Some(name) = request.name {
                        let name = name.trim().to_string();
                        if name.is_empty() {
                            return Err(ServiceError::ValidationError(
                                "Product name cannot be empty".to_string(),
                            ));
                        }
                        active.name = Set(name);
                    }
                    if let Some(description) = request.description {
                        active.description = Set(non_blank(Some(description)));
                    }
                    if let Some(price) = request.price {
                        active.price = Set(price);
                    }
                    if let Some(category_id) = request.category_id {
                        ensure_category(txn, tenant_id, category_id).await?;
                        active.category_id = Set(Some(category_id));
                    }
                    if let Some(prep) = request.prep_time_minutes {
                        active.prep_time_minutes = Set(prep);
                    }
                    if let Some(is_active) = request.is_active {
                        active.is_active = Set(is_active);
                    }
                    let saved = active.update(txn).await?;

                    if stock_delta != 0 {
                        stock::apply_stock_delta(
                            txn,
                            tenant_id,
                            product_id,
                            stock_delta,
                            MovementReason::ManualAdjustment,
                            None,
                            enforce,
                        )
                        .await?;
                    }

                    let saved = find_product(txn, tenant_id, saved.id).await?;
                    Ok((saved.clone(), saved.is_active != was_active, stock_delta))
                })
            })
            .await?;

        if availability_changed {
            self.publish(Event::ProductAvailabilityChanged {
                product_id,
                is_active: updated.is_active,
            })
            .await;
        }
        if stock_delta != 0 {
            self.publish(Event::StockAdjusted {
                product_id,
                delta: stock_delta,
                stock_after: updated.stock_quantity,
            })
            .await;
        }

        info!(%product_id, "Product updated");
        self.get_product(tenant_id, product_id).await
    }

    /// Toggles whether the product can be sold.
    #[instrument(skip(self))]
    pub async fn set_availability(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        is_active: bool,
    ) -> Result<ProductResponse, ServiceError> {
        let db = &*self.db_pool;
        let existing = find_product(db, tenant_id, product_id).await?;
        if existing.is_active != is_active {
            let mut active: product::ActiveModel = existing.into();
            active.is_active = Set(is_active);
            active.update(db).await.map_err(|e| {
                error!(error = %e, %product_id, "Failed to update product availability");
                ServiceError::DatabaseError(e)
            })?;
            self.publish(Event::ProductAvailabilityChanged {
                product_id,
                is_active,
            })
            .await;
        }
        self.get_product(tenant_id, product_id).await
    }

    /// Books a manual stock movement (restock, waste, count correction).
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        delta: i32,
    ) -> Result<ProductResponse, ServiceError> {
        if delta == 0 {
            return Err(ServiceError::ValidationError(
                "Stock adjustment must not be zero".to_string(),
            ));
        }
        let enforce = self.enforce_stock;

        let stock_after = db::transaction(&self.db_pool, "adjust_stock", move |txn| {
            Box::pin(async move {
                find_product(txn, tenant_id, product_id).await?;
                stock::apply_stock_delta(
                    txn,
                    tenant_id,
                    product_id,
                    delta,
                    MovementReason::ManualAdjustment,
                    None,
                    enforce,
                )
                .await
            })
        })
        .await?;

        self.publish(Event::StockAdjusted {
            product_id,
            delta,
            stock_after,
        })
        .await;
        self.get_product(tenant_id, product_id).await
    }

    /// Permanently removes a product.
    ///
    /// Refused while the product sits in an active order, is offered inside a
    /// combo, or appears in any past order (deactivate it instead). A combo
    /// product takes its configuration with it.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, tenant_id: Uuid, product_id: Uuid) -> Result<(), ServiceError> {
        db::transaction(&self.db_pool, "delete_product", move |txn| {
            Box::pin(async move {
                let existing = find_product(txn, tenant_id, product_id).await?;

                let active_lines = order_item::Entity::find()
                    .inner_join(order::Entity)
                    .filter(order::Column::TenantId.eq(tenant_id))
                    .filter(order::Column::Status.is_in(OrderStatus::ACTIVE))
                    .filter(order_item::Column::ProductId.eq(product_id))
                    .count(txn)
                    .await?;
                let active_choices = order_combo_choice::Entity::find()
                    .inner_join(order_item::Entity)
                    .join(JoinType::InnerJoin, order_item::Relation::Order.def())
                    .filter(order::Column::TenantId.eq(tenant_id))
                    .filter(order::Column::Status.is_in(OrderStatus::ACTIVE))
                    .filter(order_combo_choice::Column::ProductId.eq(product_id))
                    .count(txn)
                    .await?;
                if active_lines + active_choices > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "{} is part of {} active order line(s)",
                        existing.name,
                        active_lines + active_choices
                    )));
                }

                let used_in = combo_slot_item::Entity::find()
                    .filter(combo_slot_item::Column::ProductId.eq(product_id))
                    .all(txn)
                    .await?;
                if !used_in.is_empty() {
                    let names = combo_names_for_slot_items(txn, &used_in).await?;
                    return Err(ServiceError::Conflict(format!(
                        "{} is offered in combo(s): {}. Remove it from those combos first",
                        existing.name,
                        names.join(", ")
                    )));
                }

                let history_lines = order_item::Entity::find()
                    .filter(order_item::Column::ProductId.eq(product_id))
                    .count(txn)
                    .await?;
                let history_choices = order_combo_choice::Entity::find()
                    .filter(order_combo_choice::Column::ProductId.eq(product_id))
                    .count(txn)
                    .await?;
                if history_lines + history_choices > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "{} has order history; deactivate it instead",
                        existing.name
                    )));
                }

                if let Some(config) = existing.find_related(combo::Entity).one(txn).await? {
                    warn!(%product_id, combo_id = %config.id, "Deleting combo configuration with product");
                    delete_combo_rows(txn, config.id).await?;
                    config.delete(txn).await?;
                }

                stock_movement::Entity::delete_many()
                    .filter(stock_movement::Column::ProductId.eq(product_id))
                    .exec(txn)
                    .await?;
                existing.delete(txn).await?;
                Ok(())
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, %product_id, "Failed to delete product");
            e
        })?;

        info!(%product_id, %tenant_id, "Product deleted");
        Ok(())
    }
}

async fn ensure_category<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    category_id: Uuid,
) -> Result<(), ServiceError> {
    category::Entity::find_by_id(category_id)
        .filter(category::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| {
            ServiceError::ValidationError(format!("Category {} does not exist", category_id))
        })
}

async fn combo_names_for_slot_items<C: ConnectionTrait>(
    conn: &C,
    items: &[combo_slot_item::Model],
) -> Result<Vec<String>, ServiceError> {
    let slot_ids: Vec<Uuid> = items.iter().map(|i| i.slot_id).collect();
    let combo_ids: Vec<Uuid> = combo_slot::Entity::find()
        .filter(combo_slot::Column::Id.is_in(slot_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| s.combo_id)
        .collect();
    let product_ids: Vec<Uuid> = combo::Entity::find()
        .filter(combo::Column::Id.is_in(combo_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| c.product_id)
        .collect();
    let mut names: Vec<String> = product::Entity::find()
        .filter(product::Column::Id.is_in(product_ids))
        .order_by_asc(product::Column::Name)
        .all(conn)
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();
    names.dedup();
    Ok(names)
}

/// Removes a combo's slots and slot items. Recorded order choices keep their
/// snapshot and lose only the slot link.
pub(crate) async fn delete_combo_rows<C: ConnectionTrait>(
    conn: &C,
    combo_id: Uuid,
) -> Result<(), ServiceError> {
    let slot_ids: Vec<Uuid> = combo_slot::Entity::find()
        .filter(combo_slot::Column::ComboId.eq(combo_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    if slot_ids.is_empty() {
        return Ok(());
    }

    order_combo_choice::Entity::update_many()
        .col_expr(
            order_combo_choice::Column::SlotId,
            Expr::value(Option::<Uuid>::None),
        )
        .filter(order_combo_choice::Column::SlotId.is_in(slot_ids.clone()))
        .exec(conn)
        .await?;
    combo_slot_item::Entity::delete_many()
        .filter(combo_slot_item::Column::SlotId.is_in(slot_ids.clone()))
        .exec(conn)
        .await?;
    combo_slot::Entity::delete_many()
        .filter(combo_slot::Column::Id.is_in(slot_ids))
        .exec(conn)
        .await?;
    Ok(())
}
