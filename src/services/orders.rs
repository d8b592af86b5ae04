//! Order lifecycle: create, edit, delete, status changes and the read models
//! built on top (kitchen board, public tracking).
//!
//! Create, edit and delete each run in a single transaction. Stock is moved
//! through [`stock`], so an order's debits are always exactly what its lines
//! and combo choices record.

use crate::{
    db::{self, DbPool},
    entities::{
        max_money, order, order_combo_choice, order_item, product, tenant, MovementReason,
        OrderStatus, OrderType, PaymentMethod,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        combos::{resolve_choices, ComboChoiceInput},
        ensure_tenant, non_blank,
        products::combo_product_ids,
        stock::{self, StockDebit},
    },
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OrderItemInput {
    /// Existing line to keep (edits only). Omit to add a new line.
    pub id: Option<Uuid>,
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i32,
    pub notes: Option<String>,
    /// One pick per slot; required for combo products
    #[serde(default)]
    pub choices: Vec<ComboChoiceInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 100, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    pub customer_phone: Option<String>,
    pub table_label: Option<String>,
    pub order_type: Option<OrderType>,
    pub notes: Option<String>,
    pub operator_id: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<OrderItemInput>,
}

/// Edit payload. Header fields left out keep their value; when `items` is
/// present it is the complete new list of lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderRequest {
    #[validate(length(min = 1, max = 100, message = "Customer name cannot be empty"))]
    pub customer_name: Option<String>,
    #[validate(length(min = 1, message = "Payment method cannot be empty"))]
    pub payment_method: Option<String>,
    pub customer_phone: Option<String>,
    pub table_label: Option<String>,
    pub order_type: Option<OrderType>,
    pub notes: Option<String>,
    pub items: Option<Vec<OrderItemInput>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderChoiceResponse {
    pub slot_id: Option<Uuid>,
    pub slot_name: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_debited: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub notes: Option<String>,
    pub is_combo: bool,
    pub stock_debited: i32,
    pub choices: Vec<OrderChoiceResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: i32,
    /// Zero-padded number printed on receipts
    pub display_number: String,
    pub tracking_token: Uuid,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub table_label: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub total: Decimal,
    pub operator_id: Option<Uuid>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StatusCounts {
    pub pending: u64,
    pub preparing: u64,
    pub ready: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActiveOrdersBoard {
    pub orders: Vec<OrderResponse>,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackingItem {
    pub name: String,
    pub quantity: i32,
}

/// What a customer sees after scanning the receipt QR code.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackingView {
    pub order_number: String,
    pub status: OrderStatus,
    pub status_label: String,
    pub customer_first_name: String,
    pub items: Vec<TrackingItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Sum of line subtotals. Fails when the sum does not fit a money column.
pub fn order_total<I>(subtotals: I) -> Result<Decimal, ServiceError>
where
    I: IntoIterator<Item = Decimal>,
{
    subtotals
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(s))
        .filter(|total| *total <= max_money())
        .ok_or_else(|| {
            ServiceError::ValidationError(format!("Order total cannot exceed {}", max_money()))
        })
}

/// First word of a customer name, for public display.
pub fn first_name(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

pub fn parse_status(value: &str) -> Result<OrderStatus, ServiceError> {
    OrderStatus::from_str(value.trim())
        .map_err(|_| ServiceError::InvalidStatus(format!("Unknown order status: {}", value)))
}

pub fn parse_payment_method(value: &str) -> Result<PaymentMethod, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationError(
            "Payment method is required".to_string(),
        ));
    }
    PaymentMethod::from_str(trimmed)
        .map_err(|_| ServiceError::ValidationError(format!("Unknown payment method: {}", value)))
}

fn required_name(value: &str) -> Result<String, ServiceError> {
    let name = value.trim();
    if name.is_empty() {
        return Err(ServiceError::ValidationError(
            "Customer name is required".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn check_items(items: &[OrderItemInput]) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "At least one item is required".to_string(),
        ));
    }
    for (index, item) in items.iter().enumerate() {
        item.validate().map_err(|e| {
            ServiceError::ValidationError(format!("items[{}]: {}", index, e))
        })?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct PlannedChoice {
    slot_id: Option<Uuid>,
    slot_name: String,
    product_id: Uuid,
    quantity_debited: i32,
}

/// A line as it will be stored, before anything is written.
#[derive(Debug, Clone)]
struct PlannedLine {
    existing_id: Option<Uuid>,
    product_id: Uuid,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
    notes: Option<String>,
    is_combo: bool,
    stock_debited: i32,
    choices: Vec<PlannedChoice>,
}

impl PlannedLine {
    fn subtotal(&self) -> Result<Decimal, ServiceError> {
        order_item::line_subtotal(self.unit_price, self.quantity).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "{}: line total cannot exceed {}",
                self.product_name,
                max_money()
            ))
        })
    }

    fn debits(&self) -> Vec<StockDebit> {
        let mut debits = Vec::with_capacity(self.choices.len() + 1);
        if self.stock_debited != 0 {
            debits.push(StockDebit::new(self.product_id, self.stock_debited));
        }
        debits.extend(
            self.choices
                .iter()
                .map(|c| StockDebit::new(c.product_id, c.quantity_debited)),
        );
        debits
    }
}

/// Resolves a brand-new line at the product's current price.
async fn plan_new_line<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    index: usize,
    input: &OrderItemInput,
) -> Result<PlannedLine, ServiceError> {
    let product = product::Entity::find_by_id(input.product_id)
        .filter(product::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "items[{}]: product {} does not exist",
                index, input.product_id
            ))
        })?;
    if !product.is_active {
        return Err(ServiceError::ValidationError(format!(
            "items[{}]: {} is currently unavailable",
            index, product.name
        )));
    }

    let is_combo = !combo_product_ids(conn, tenant_id, vec![product.id])
        .await?
        .is_empty();
    let choices = if is_combo {
        resolve_choices(conn, tenant_id, &product, &input.choices, input.quantity, false)
            .await?
            .into_iter()
            .map(|c| PlannedChoice {
                slot_id: Some(c.slot_id),
                slot_name: c.slot_name,
                product_id: c.product_id,
                quantity_debited: c.quantity_debited,
            })
            .collect()
    } else if !input.choices.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "items[{}]: {} is not a combo",
            index, product.name
        )));
    } else {
        Vec::new()
    };

    Ok(PlannedLine {
        existing_id: None,
        product_id: product.id,
        product_name: product.name.clone(),
        quantity: input.quantity,
        unit_price: product.price,
        notes: non_blank(input.notes.clone()),
        is_combo,
        stock_debited: if is_combo { 0 } else { input.quantity },
        choices,
    })
}

/// Re-plans an existing line. The captured price and name are kept; combo
/// picks are re-resolved when new ones are sent, otherwise scaled to the new
/// quantity.
async fn plan_kept_line<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    index: usize,
    input: &OrderItemInput,
    existing: &order_item::Model,
    existing_choices: &[order_combo_choice::Model],
) -> Result<PlannedLine, ServiceError> {
    if input.product_id != existing.product_id {
        return Err(ServiceError::ValidationError(format!(
            "items[{}]: line {} holds a different product; add the new product as a new line",
            index, existing.id
        )));
    }

    let choices = if !existing.is_combo {
        if !input.choices.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "items[{}]: {} is not a combo",
                index, existing.product_name
            )));
        }
        Vec::new()
    } else if !input.choices.is_empty() {
        let combo_product = product::Entity::find_by_id(existing.product_id)
            .filter(product::Column::TenantId.eq(tenant_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", existing.product_id))?;
        resolve_choices(conn, tenant_id, &combo_product, &input.choices, input.quantity, false)
            .await?
            .into_iter()
            .map(|c| PlannedChoice {
                slot_id: Some(c.slot_id),
                slot_name: c.slot_name,
                product_id: c.product_id,
                quantity_debited: c.quantity_debited,
            })
            .collect()
    } else {
        existing_choices
            .iter()
            .map(|c| {
                Ok(PlannedChoice {
                    slot_id: c.slot_id,
                    slot_name: c.slot_name.clone(),
                    product_id: c.product_id,
                    quantity_debited: scale_debit(
                        c.quantity_debited,
                        existing.quantity,
                        input.quantity,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?
    };

    Ok(PlannedLine {
        existing_id: Some(existing.id),
        product_id: existing.product_id,
        product_name: existing.product_name.clone(),
        quantity: input.quantity,
        unit_price: existing.unit_price,
        notes: non_blank(input.notes.clone()),
        is_combo: existing.is_combo,
        stock_debited: if existing.is_combo { 0 } else { input.quantity },
        choices,
    })
}

/// Per-combo debit recovered from a recorded choice, applied to a new quantity.
fn scale_debit(recorded: i32, old_quantity: i32, new_quantity: i32) -> Result<i32, ServiceError> {
    if old_quantity <= 0 {
        return Ok(recorded);
    }
    (recorded / old_quantity)
        .checked_mul(new_quantity)
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Combo debit of {} units per item is too large for quantity {}",
                recorded / old_quantity,
                new_quantity
            ))
        })
}

fn planned_debits(lines: &[PlannedLine]) -> Vec<StockDebit> {
    lines.iter().flat_map(PlannedLine::debits).collect()
}

fn lines_total(lines: &[PlannedLine]) -> Result<Decimal, ServiceError> {
    let subtotals = lines
        .iter()
        .map(PlannedLine::subtotal)
        .collect::<Result<Vec<_>, _>>()?;
    order_total(subtotals)
}

/// Writes planned lines (inserting new ones, updating kept ones) and their choices.
async fn write_lines<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    lines: &[PlannedLine],
) -> Result<(), ServiceError> {
    for (position, line) in lines.iter().enumerate() {
        let item_id = match line.existing_id {
            Some(id) => {
                order_item::ActiveModel {
                    id: Set(id),
                    quantity: Set(line.quantity),
                    subtotal: Set(line.subtotal()?),
                    notes: Set(line.notes.clone()),
                    stock_debited: Set(line.stock_debited),
                    position: Set(position as i32),
                    ..Default::default()
                }
                .update(conn)
                .await?;
                order_combo_choice::Entity::delete_many()
                    .filter(order_combo_choice::Column::OrderItemId.eq(id))
                    .exec(conn)
                    .await?;
                id
            }
            None => {
                let id = Uuid::new_v4();
                order_item::ActiveModel {
                    id: Set(id),
                    order_id: Set(order_id),
                    product_id: Set(line.product_id),
                    product_name: Set(line.product_name.clone()),
                    quantity: Set(line.quantity),
                    unit_price: Set(line.unit_price),
                    subtotal: Set(line.subtotal()?),
                    notes: Set(line.notes.clone()),
                    is_combo: Set(line.is_combo),
                    stock_debited: Set(line.stock_debited),
                    position: Set(position as i32),
                    ..Default::default()
                }
                .insert(conn)
                .await?;
                id
            }
        };

        for choice in &line.choices {
            order_combo_choice::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_item_id: Set(item_id),
                slot_id: Set(choice.slot_id),
                slot_name: Set(choice.slot_name.clone()),
                product_id: Set(choice.product_id),
                quantity_debited: Set(choice.quantity_debited),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }
    }
    Ok(())
}

/// Removes an order's lines and choices.
async fn delete_lines<C: ConnectionTrait>(conn: &C, item_ids: Vec<Uuid>) -> Result<(), ServiceError> {
    if item_ids.is_empty() {
        return Ok(());
    }
    order_combo_choice::Entity::delete_many()
        .filter(order_combo_choice::Column::OrderItemId.is_in(item_ids.clone()))
        .exec(conn)
        .await?;
    order_item::Entity::delete_many()
        .filter(order_item::Column::Id.is_in(item_ids))
        .exec(conn)
        .await?;
    Ok(())
}

/// Hands out the tenant's next order number. The UPDATE takes the tenant row
/// lock, so concurrent creations for one tenant are serialized here.
async fn next_order_number<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
) -> Result<i32, ServiceError> {
    tenant::Entity::update_many()
        .col_expr(
            tenant::Column::LastOrderNumber,
            Expr::col(tenant::Column::LastOrderNumber).add(1),
        )
        .filter(tenant::Column::Id.eq(tenant_id))
        .exec(conn)
        .await?;
    Ok(ensure_tenant(conn, tenant_id).await?.last_order_number)
}

async fn find_order<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    order_id: Uuid,
) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(order_id)
        .filter(order::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Order", order_id))
}

/// Builds full responses (lines and choices) for a batch of orders, keeping their order.
async fn hydrate<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderResponse>, ServiceError> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(orders.iter().map(|o| o.id)))
        .order_by_asc(order_item::Column::Position)
        .all(conn)
        .await?;
    let choices = if items.is_empty() {
        Vec::new()
    } else {
        order_combo_choice::Entity::find()
            .filter(order_combo_choice::Column::OrderItemId.is_in(items.iter().map(|i| i.id)))
            .all(conn)
            .await?
    };
    let product_names: HashMap<Uuid, String> = if choices.is_empty() {
        HashMap::new()
    } else {
        product::Entity::find()
            .filter(product::Column::Id.is_in(choices.iter().map(|c| c.product_id)))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect()
    };

    let mut choices_by_item: HashMap<Uuid, Vec<OrderChoiceResponse>> = HashMap::new();
    for choice in choices {
        choices_by_item
            .entry(choice.order_item_id)
            .or_default()
            .push(OrderChoiceResponse {
                slot_id: choice.slot_id,
                slot_name: choice.slot_name,
                product_id: choice.product_id,
                product_name: product_names
                    .get(&choice.product_id)
                    .cloned()
                    .unwrap_or_default(),
                quantity_debited: choice.quantity_debited,
            });
    }

    let mut items_by_order: HashMap<Uuid, Vec<OrderItemResponse>> = HashMap::new();
    for item in items {
        let choices = choices_by_item.remove(&item.id).unwrap_or_default();
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemResponse {
                id: item.id,
                product_id: item.product_id,
                product_name: item.product_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.subtotal,
                notes: item.notes,
                is_combo: item.is_combo,
                stock_debited: item.stock_debited,
                choices,
            });
    }

    Ok(orders
        .into_iter()
        .map(|o| {
            let items = items_by_order.remove(&o.id).unwrap_or_default();
            OrderResponse {
                id: o.id,
                display_number: o.display_number(),
                order_number: o.order_number,
                tracking_token: o.tracking_token,
                order_type: o.order_type,
                status: o.status,
                customer_name: o.customer_name,
                customer_phone: o.customer_phone,
                table_label: o.table_label,
                payment_method: o.payment_method,
                notes: o.notes,
                total: o.total,
                operator_id: o.operator_id,
                items,
                created_at: o.created_at,
                updated_at: o.updated_at,
            }
        })
        .collect())
}

async fn hydrate_one<C: ConnectionTrait>(
    conn: &C,
    order: order::Model,
) -> Result<OrderResponse, ServiceError> {
    let order_id = order.id;
    hydrate(conn, vec![order])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::not_found("Order", order_id))
}

/// Service for the order lifecycle
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    enforce_stock: bool,
}

impl OrderService {
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

    /// Creates an order, capturing current prices and debiting stock for every
    /// line and combo choice. Any failure rolls the whole order back.
    #[instrument(skip(self, request), fields(%tenant_id, items = request.items.len()))]
    pub async fn create_order(
        &self,
        tenant_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let customer_name = required_name(&request.customer_name)?;
        let payment_method = parse_payment_method(&request.payment_method)?;
        check_items(&request.items)?;
        request.validate()?;
        let enforce = self.enforce_stock;

        let created = db::transaction(&self.db_pool, "create_order", move |txn| {
            Box::pin(async move {
                ensure_tenant(txn, tenant_id).await?;

                let mut lines = Vec::with_capacity(request.items.len());
                for (index, input) in request.items.iter().enumerate() {
                    lines.push(plan_new_line(txn, tenant_id, index, input).await?);
                }
                let total = lines_total(&lines)?;

                let order_number = next_order_number(txn, tenant_id).await?;
                let order_id = Uuid::new_v4();
                let order = order::ActiveModel {
                    id: Set(order_id),
                    tenant_id: Set(tenant_id),
                    order_number: Set(order_number),
                    tracking_token: Set(Uuid::new_v4()),
                    order_type: Set(request.order_type.unwrap_or_default()),
                    status: Set(OrderStatus::Pending),
                    customer_name: Set(customer_name),
                    customer_phone: Set(non_blank(request.customer_phone)),
                    table_label: Set(non_blank(request.table_label)),
                    payment_method: Set(payment_method),
                    notes: Set(non_blank(request.notes)),
                    total: Set(total),
                    operator_id: Set(request.operator_id),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                write_lines(txn, order_id, &lines).await?;

                let deltas = stock::reconcile(&[], &planned_debits(&lines))?;
                stock::apply_deltas(
                    txn,
                    tenant_id,
                    &deltas,
                    MovementReason::OrderCreated,
                    Some(order_id),
                    enforce,
                )
                .await?;

                hydrate_one(txn, order).await
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, %tenant_id, "Failed to create order");
            e
        })?;

        counter!("cantina_orders.created", 1);
        info!(order_id = %created.id, order_number = %created.display_number, total = %created.total, "Order created");
        self.publish(Event::OrderCreated {
            tenant_id,
            order_id: created.id,
            order_number: created.order_number,
            total: created.total,
        })
        .await;
        Ok(created)
    }

    /// Edits an order in place.
    ///
    /// Lines are matched by id: kept lines keep their captured price, new lines
    /// take the current price, and lines left out are removed. Stock moves by the
    /// net difference between what the order held before and after.
    #[instrument(skip(self, request))]
    pub async fn update_order(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        if let Some(items) = &request.items {
            check_items(items)?;
        }
        let customer_name = request.customer_name.as_deref().map(required_name).transpose()?;
        let payment_method = request
            .payment_method
            .as_deref()
            .map(parse_payment_method)
            .transpose()?;
        let enforce = self.enforce_stock;

        let updated = db::transaction(&self.db_pool, "update_order", move |txn| {
            Box::pin(async move {
                let existing = find_order(txn, tenant_id, order_id).await?;
                let mut active: order::ActiveModel = existing.clone().into();

                if let Some(name) = customer_name {
                    active.customer_name = Set(name);
                }
                if let Some(method) = payment_method {
                    active.payment_method = Set(method);
                }
                if let Some(phone) = request.customer_phone {
                    active.customer_phone = Set(non_blank(Some(phone)));
                }
                if let Some(table) = request.table_label {
                    active.table_label = Set(non_blank(Some(table)));
                }
                if let Some(order_type) = request.order_type {
                    active.order_type = Set(order_type);
                }
                if let Some(notes) = request.notes {
                    active.notes = Set(non_blank(Some(notes)));
                }

                if let Some(inputs) = request.items {
                    let current_items = order_item::Entity::find()
                        .filter(order_item::Column::OrderId.eq(order_id))
                        .all(txn)
                        .await?;
                    let current_choices = if current_items.is_empty() {
                        Vec::new()
                    } else {
                        order_combo_choice::Entity::find()
                            .filter(
                                order_combo_choice::Column::OrderItemId
                                    .is_in(current_items.iter().map(|i| i.id)),
                            )
                            .all(txn)
                            .await?
                    };
                    let previous = stock::debits_for_order(txn, order_id).await?;

                    let by_id: HashMap<Uuid, &order_item::Model> =
                        current_items.iter().map(|i| (i.id, i)).collect();
                    let mut lines = Vec::with_capacity(inputs.len());
                    for (index, input) in inputs.iter().enumerate() {
                        let line = match input.id {
                            Some(line_id) => {
                                let existing_line = by_id.get(&line_id).ok_or_else(|| {
                                    ServiceError::ValidationError(format!(
                                        "items[{}]: line {} does not belong to this order",
                                        index, line_id
                                    ))
                                })?;
                                if lines
                                    .iter()
                                    .any(|l: &PlannedLine| l.existing_id == Some(line_id))
                                {
                                    return Err(ServiceError::ValidationError(format!(
                                        "items[{}]: line {} is listed twice",
                                        index, line_id
                                    )));
                                }
                                let line_choices: Vec<order_combo_choice::Model> = current_choices
                                    .iter()
                                    .filter(|c| c.order_item_id == line_id)
                                    .cloned()
                                    .collect();
                                plan_kept_line(
                                    txn,
                                    tenant_id,
                                    index,
                                    input,
                                    existing_line,
                                    &line_choices,
                                )
                                .await?
                            }
                            None => plan_new_line(txn, tenant_id, index, input).await?,
                        };
                        lines.push(line);
                    }

                    let removed: Vec<Uuid> = current_items
                        .iter()
                        .filter(|i| !lines.iter().any(|l| l.existing_id == Some(i.id)))
                        .map(|i| i.id)
                        .collect();
                    delete_lines(txn, removed).await?;
                    write_lines(txn, order_id, &lines).await?;

                    let deltas = stock::reconcile(&previous, &planned_debits(&lines))?;
                    stock::apply_deltas(
                        txn,
                        tenant_id,
                        &deltas,
                        MovementReason::OrderEdited,
                        Some(order_id),
                        enforce,
                    )
                    .await?;

                    active.total = Set(lines_total(&lines)?);
                }

                let saved = active.update(txn).await?;
                hydrate_one(txn, saved).await
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, %order_id, "Failed to update order");
            e
        })?;

        info!(%order_id, total = %updated.total, "Order updated");
        self.publish(Event::OrderUpdated {
            tenant_id,
            order_id,
            total: updated.total,
        })
        .await;
        Ok(updated)
    }

    /// Deletes an order and gives back exactly the stock it recorded.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, tenant_id: Uuid, order_id: Uuid) -> Result<(), ServiceError> {
        let order_number = db::transaction(&self.db_pool, "delete_order", move |txn| {
            Box::pin(async move {
                let existing = find_order(txn, tenant_id, order_id).await?;
                let held = stock::debits_for_order(txn, order_id).await?;
                let deltas = stock::reconcile(&held, &[])?;
                stock::apply_deltas(
                    txn,
                    tenant_id,
                    &deltas,
                    MovementReason::OrderDeleted,
                    Some(order_id),
                    false,
                )
                .await?;

                let item_ids: Vec<Uuid> = order_item::Entity::find()
                    .filter(order_item::Column::OrderId.eq(order_id))
                    .all(txn)
                    .await?
                    .into_iter()
                    .map(|i| i.id)
                    .collect();
                delete_lines(txn, item_ids).await?;
                order::Entity::delete_by_id(order_id).exec(txn).await?;
                Ok(existing.order_number)
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, %order_id, "Failed to delete order");
            e
        })?;

        info!(%order_id, order_number, "Order deleted");
        self.publish(Event::OrderDeleted {
            tenant_id,
            order_id,
            order_number,
        })
        .await;
        Ok(())
    }

    /// Sets the kitchen status. Any status may follow any other.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        status: &str,
    ) -> Result<OrderResponse, ServiceError> {
        let new_status = parse_status(status)?;
        let db = &*self.db_pool;
        let existing = find_order(db, tenant_id, order_id).await?;
        let old_status = existing.status;

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(new_status);
        let saved = active.update(db).await.map_err(|e| {
            error!(error = %e, %order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        if old_status != new_status {
            self.publish(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            })
            .await;
        }
        hydrate_one(db, saved).await
    }

    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;
        let order = find_order(db, tenant_id, order_id).await?;
        hydrate_one(db, order).await
    }

    /// Newest first, optionally filtered by status. Pages start at 1.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        tenant_id: Uuid,
        status: Option<OrderStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<OrderPage, ServiceError> {
        let db = &*self.db_pool;
        ensure_tenant(db, tenant_id).await?;
        let page = page.max(1);
        let per_page = per_page.max(1);
        (page - 1)
            .checked_mul(per_page)
            .filter(|offset| *offset <= i64::MAX as u64)
            .ok_or_else(|| ServiceError::ValidationError(format!("Page {} is out of range", page)))?;

        let mut query = order::Entity::find().filter(order::Column::TenantId.eq(tenant_id));
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::OrderNumber)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count orders");
            ServiceError::DatabaseError(e)
        })?;
        let orders = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page, per_page, "Failed to fetch orders page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(OrderPage {
            orders: hydrate(db, orders).await?,
            total,
            page,
            per_page,
        })
    }

    /// Kitchen board: pending, preparing and ready orders, oldest first.
    #[instrument(skip(self))]
    pub async fn active_orders(&self, tenant_id: Uuid) -> Result<ActiveOrdersBoard, ServiceError> {
        let db = &*self.db_pool;
        ensure_tenant(db, tenant_id).await?;
        let orders = order::Entity::find()
            .filter(order::Column::TenantId.eq(tenant_id))
            .filter(order::Column::Status.is_in(OrderStatus::ACTIVE))
            .order_by_asc(order::Column::CreatedAt)
            .order_by_asc(order::Column::OrderNumber)
            .all(db)
            .await?;

        let mut counts = StatusCounts::default();
        for order in &orders {
            match order.status {
                OrderStatus::Pending => counts.pending += 1,
                OrderStatus::Preparing => counts.preparing += 1,
                OrderStatus::Ready => counts.ready += 1,
                OrderStatus::Delivered | OrderStatus::Cancelled => {}
            }
        }

        Ok(ActiveOrdersBoard {
            orders: hydrate(db, orders).await?,
            counts,
        })
    }

    /// Public, read-only status lookup by the token printed in the QR code.
    #[instrument(skip(self))]
    pub async fn track(&self, tracking_token: Uuid) -> Result<TrackingView, ServiceError> {
        let db = &*self.db_pool;
        let order = order::Entity::find()
            .filter(order::Column::TrackingToken.eq(tracking_token))
            .one(db)
            .await?
            .ok_or_else(|| {
                warn!(%tracking_token, "Unknown tracking token");
                ServiceError::NotFound("Order not found".to_string())
            })?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::Position)
            .all(db)
            .await?
            .into_iter()
            .map(|i| TrackingItem {
                name: i.product_name,
                quantity: i.quantity,
            })
            .collect();

        Ok(TrackingView {
            order_number: order.display_number(),
            status: order.status,
            status_label: order.status.label().to_string(),
            customer_first_name: first_name(&order.customer_name),
            items,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn line(product_id: Uuid, quantity: i32, price: Decimal) -> PlannedLine {
        PlannedLine {
            existing_id: None,
            product_id,
            product_name: "x".into(),
            quantity,
            unit_price: price,
            notes: None,
            is_combo: false,
            stock_debited: quantity,
            choices: Vec::new(),
        }
    }

    #[test]
    fn total_is_sum_of_subtotals() {
        let lines = [
            line(Uuid::new_v4(), 2, dec!(8.50)),
            line(Uuid::new_v4(), 1, dec!(4.00)),
        ];
        assert_eq!(lines_total(&lines).unwrap(), dec!(21.00));
        assert_eq!(order_total(Vec::new()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn totals_past_the_money_column_are_rejected() {
        let lines = [
            line(Uuid::new_v4(), 10_000, dec!(9999.99)),
            line(Uuid::new_v4(), 10_000, dec!(9999.99)),
        ];
        assert!(matches!(
            lines_total(&lines),
            Err(ServiceError::ValidationError(_))
        ));
        let huge = line(Uuid::new_v4(), 10_000, Decimal::MAX);
        assert!(huge.subtotal().is_err());
    }

    #[test]
    fn combo_lines_debit_only_their_choices() {
        let combo_id = Uuid::new_v4();
        let drink = Uuid::new_v4();
        let mut planned = line(combo_id, 2, dec!(20));
        planned.is_combo = true;
        planned.stock_debited = 0;
        planned.choices.push(PlannedChoice {
            slot_id: None,
            slot_name: "Drink".into(),
            product_id: drink,
            quantity_debited: 2,
        });
        assert_eq!(planned.debits(), vec![StockDebit::new(drink, 2)]);
    }

    #[test]
    fn scaled_debits_keep_the_per_combo_amount() {
        assert_eq!(scale_debit(6, 2, 5).unwrap(), 15);
        assert_eq!(scale_debit(2, 2, 1).unwrap(), 1);
        assert_eq!(scale_debit(4, 0, 3).unwrap(), 4);
        assert!(scale_debit(i32::MAX, 1, 2).is_err());
    }

    #[test]
    fn first_name_only_is_exposed() {
        assert_eq!(first_name("Maria da Silva"), "Maria");
        assert_eq!(first_name("  Ana "), "Ana");
        assert_eq!(first_name(""), "");
    }

    #[rstest]
    #[case("pending", OrderStatus::Pending)]
    #[case("PREPARING", OrderStatus::Preparing)]
    #[case(" ready ", OrderStatus::Ready)]
    #[case("delivered", OrderStatus::Delivered)]
    #[case("Cancelled", OrderStatus::Cancelled)]
    fn statuses_parse(#[case] raw: &str, #[case] expected: OrderStatus) {
        assert_eq!(parse_status(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("shipped")]
    #[case("")]
    fn unknown_statuses_are_rejected(#[case] raw: &str) {
        assert!(matches!(
            parse_status(raw),
            Err(ServiceError::InvalidStatus(_))
        ));
    }

    #[test]
    fn payment_method_must_be_present_and_known() {
        assert_eq!(parse_payment_method("PIX").unwrap(), PaymentMethod::Pix);
        assert!(matches!(
            parse_payment_method("  "),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(parse_payment_method("voucher").is_err());
    }

    #[test]
    fn empty_item_lists_are_rejected() {
        assert!(matches!(
            check_items(&[]),
            Err(ServiceError::ValidationError(_))
        ));
        let zero = OrderItemInput {
            id: None,
            product_id: Uuid::new_v4(),
            quantity: 0,
            notes: None,
            choices: Vec::new(),
        };
        assert!(check_items(&[zero]).is_err());
    }
}
