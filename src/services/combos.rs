//! Combo configuration.
//!
//! A combo is a product with ordered slots; each slot offers substitutable
//! products and how many units of each are taken from stock per combo sold.

use crate::{
    db::{self, DbPool},
    entities::{combo, combo_slot, combo_slot_item, product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        non_blank,
        products::{combo_product_ids, delete_combo_rows, find_product},
    },
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_SLOT_EMOJI: &str = "📋";

fn default_debit_quantity() -> i32 {
    1
}

fn default_line_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ComboItemInput {
    pub product_id: Uuid,
    #[serde(default = "default_debit_quantity")]
    #[validate(range(min = 1, max = 1000, message = "Debit quantity must be between 1 and 1000"))]
    pub debit_quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ComboSlotInput {
    pub name: String,
    pub emoji: Option<String>,
    /// Defaults to the slot's index in the request
    pub position: Option<i32>,
    #[serde(default)]
    pub items: Vec<ComboItemInput>,
}

/// Full replacement of a combo's slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SaveComboRequest {
    #[serde(default)]
    pub slots: Vec<ComboSlotInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComboSlotItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub debit_quantity: i32,
    pub stock_quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComboSlotView {
    pub id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
    pub position: i32,
    pub items: Vec<ComboSlotItemView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComboConfig {
    pub combo_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub is_active: bool,
    pub is_valid: bool,
    pub slots: Vec<ComboSlotView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComboOption {
    pub slot_item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: Decimal,
    pub is_active: bool,
    pub stock_quantity: i32,
    pub debit_quantity: i32,
    /// Active and holding at least `debit_quantity` units
    pub has_sufficient_stock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComboOptionSlot {
    pub slot_id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
    pub position: i32,
    pub options: Vec<ComboOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComboOptions {
    pub combo_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub slots: Vec<ComboOptionSlot>,
}

/// One pick for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ComboChoiceInput {
    pub slot_id: Uuid,
    pub product_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ComboSelectionRequest {
    #[serde(default = "default_line_quantity")]
    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i32,
    pub choices: Vec<ComboChoiceInput>,
}

/// A validated pick with the stock it will consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedChoice {
    pub slot_id: Uuid,
    pub slot_name: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub debit_quantity: i32,
    /// debit_quantity × line quantity
    pub quantity_debited: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComboSelection {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub choices: Vec<ResolvedChoice>,
}

/// A combo is sellable once it has a slot and no slot is empty.
pub fn is_valid_structure(item_counts: &[usize]) -> bool {
    !item_counts.is_empty() && item_counts.iter().all(|&count| count > 0)
}

/// Why a combo cannot be sold, if it cannot.
pub fn structure_problem(slots: &[(String, usize)]) -> Option<String> {
    if slots.is_empty() {
        return Some("Combo must have at least one slot".to_string());
    }
    slots
        .iter()
        .find(|(_, count)| *count == 0)
        .map(|(name, _)| format!("Slot '{}' has no items", name))
}

/// Checks a replacement payload on its own, before touching the database.
fn check_request(request: &SaveComboRequest) -> Result<(), ServiceError> {
    let mut positions = HashSet::new();
    for (index, slot) in request.slots.iter().enumerate() {
        if slot.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "slots[{}].name is required",
                index
            )));
        }
        let position = slot.position.unwrap_or(index as i32);
        if !positions.insert(position) {
            return Err(ServiceError::ValidationError(format!(
                "Duplicate slot position {}",
                position
            )));
        }
        for item in &slot.items {
            item.validate().map_err(|e| {
                ServiceError::ValidationError(format!(
                    "Slot '{}', product {}: {}",
                    slot.name.trim(),
                    item.product_id,
                    e
                ))
            })?;
        }
    }
    Ok(())
}

type SlotTree = Vec<(combo_slot::Model, Vec<combo_slot_item::Model>)>;

async fn load_tree<C: ConnectionTrait>(conn: &C, combo_id: Uuid) -> Result<SlotTree, ServiceError> {
    let slots = combo_slot::Entity::find()
        .filter(combo_slot::Column::ComboId.eq(combo_id))
        .order_by_asc(combo_slot::Column::Position)
        .all(conn)
        .await?;
    if slots.is_empty() {
        return Ok(Vec::new());
    }

    let items = combo_slot_item::Entity::find()
        .filter(combo_slot_item::Column::SlotId.is_in(slots.iter().map(|s| s.id)))
        .order_by_asc(combo_slot_item::Column::Position)
        .all(conn)
        .await?;

    let mut by_slot: HashMap<Uuid, Vec<combo_slot_item::Model>> = HashMap::new();
    for item in items {
        by_slot.entry(item.slot_id).or_default().push(item);
    }
    Ok(slots
        .into_iter()
        .map(|slot| {
            let items = by_slot.remove(&slot.id).unwrap_or_default();
            (slot, items)
        })
        .collect())
}

async fn products_by_id<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    ids: HashSet<Uuid>,
) -> Result<HashMap<Uuid, product::Model>, ServiceError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(product::Entity::find()
        .filter(product::Column::TenantId.eq(tenant_id))
        .filter(product::Column::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect())
}

fn tree_problem(tree: &SlotTree) -> Option<String> {
    let shape: Vec<(String, usize)> = tree
        .iter()
        .map(|(slot, items)| (slot.name.clone(), items.len()))
        .collect();
    structure_problem(&shape)
}

async fn find_combo<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    product_id: Uuid,
) -> Result<Option<combo::Model>, ServiceError> {
    Ok(combo::Entity::find()
        .filter(combo::Column::TenantId.eq(tenant_id))
        .filter(combo::Column::ProductId.eq(product_id))
        .one(conn)
        .await?)
}

async fn get_or_create_combo<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    product_id: Uuid,
) -> Result<combo::Model, ServiceError> {
    if let Some(existing) = find_combo(conn, tenant_id, product_id).await? {
        return Ok(existing);
    }
    let created = combo::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        product_id: Set(product_id),
        is_active: Set(false),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    info!(%product_id, combo_id = %created.id, "Combo configuration created");
    Ok(created)
}

async fn build_config<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    owner: &product::Model,
    config: &combo::Model,
) -> Result<ComboConfig, ServiceError> {
    let tree = load_tree(conn, config.id).await?;
    let products = products_by_id(
        conn,
        tenant_id,
        tree.iter()
            .flat_map(|(_, items)| items.iter().map(|i| i.product_id))
            .collect(),
    )
    .await?;

    let is_valid = tree_problem(&tree).is_none();
    let slots = tree
        .into_iter()
        .map(|(slot, items)| ComboSlotView {
            id: slot.id,
            name: slot.name,
            emoji: slot.emoji,
            position: slot.position,
            items: items
                .into_iter()
                .map(|item| {
                    let product = products.get(&item.product_id);
                    ComboSlotItemView {
                        id: item.id,
                        product_id: item.product_id,
                        product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
                        debit_quantity: item.debit_quantity,
                        stock_quantity: product.map(|p| p.stock_quantity).unwrap_or(0),
                    }
                })
                .collect(),
        })
        .collect();

    Ok(ComboConfig {
        combo_id: config.id,
        product_id: owner.id,
        product_name: owner.name.clone(),
        is_active: config.is_active,
        is_valid,
        slots,
    })
}

/// Validates a choice set against the combo configured on `combo_product`.
///
/// Every slot needs exactly one choice; the chosen product must be listed in
/// that slot and be active. With `check_stock`, each choice must also have
/// enough units on hand for `quantity` combos.
pub(crate) async fn resolve_choices<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    combo_product: &product::Model,
    choices: &[ComboChoiceInput],
    quantity: i32,
    check_stock: bool,
) -> Result<Vec<ResolvedChoice>, ServiceError> {
    let config = find_combo(conn, tenant_id, combo_product.id)
        .await?
        .ok_or_else(|| {
            ServiceError::ValidationError(format!("{} is not a combo", combo_product.name))
        })?;
    let tree = load_tree(conn, config.id).await?;
    if let Some(problem) = tree_problem(&tree) {
        return Err(ServiceError::ValidationError(format!(
            "{} cannot be sold: {}",
            combo_product.name, problem
        )));
    }

    let mut picks: HashMap<Uuid, Uuid> = HashMap::new();
    for choice in choices {
        if picks.insert(choice.slot_id, choice.product_id).is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Slot {} was chosen more than once",
                choice.slot_id
            )));
        }
    }
    if let Some(unknown) = picks
        .keys()
        .find(|slot_id| !tree.iter().any(|(slot, _)| slot.id == **slot_id))
    {
        return Err(ServiceError::ValidationError(format!(
            "Slot {} does not belong to {}",
            unknown, combo_product.name
        )));
    }

    let products = products_by_id(conn, tenant_id, picks.values().copied().collect()).await?;
    let mut resolved = Vec::with_capacity(tree.len());
    for (slot, items) in &tree {
        let product_id = picks.get(&slot.id).ok_or_else(|| {
            ServiceError::ValidationError(format!("Slot '{}' needs a choice", slot.name))
        })?;
        let item = items
            .iter()
            .find(|i| i.product_id == *product_id)
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Product {} is not an option for slot '{}'",
                    product_id, slot.name
                ))
            })?;
        let product = products.get(product_id).ok_or_else(|| {
            ServiceError::ValidationError(format!("Product {} does not exist", product_id))
        })?;
        if !product.is_active {
            return Err(ServiceError::ValidationError(format!(
                "{} is currently unavailable",
                product.name
            )));
        }

        let quantity_debited = item.debit_quantity.checked_mul(quantity).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "{} × {} units of {} is out of range",
                quantity, item.debit_quantity, product.name
            ))
        })?;
        if check_stock && product.stock_quantity < quantity_debited {
            return Err(ServiceError::InsufficientStock(format!(
                "{}: {} available, {} requested",
                product.name, product.stock_quantity, quantity_debited
            )));
        }

        resolved.push(ResolvedChoice {
            slot_id: slot.id,
            slot_name: slot.name.clone(),
            product_id: product.id,
            product_name: product.name.clone(),
            debit_quantity: item.debit_quantity,
            quantity_debited,
        });
    }
    Ok(resolved)
}

#[derive(Clone)]
pub struct ComboService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ComboService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Current configuration. The combo row is created, inactive and empty,
    /// the first time a product's configuration is opened.
    #[instrument(skip(self))]
    pub async fn load_config(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<ComboConfig, ServiceError> {
        let db = &*self.db_pool;
        let owner = find_product(db, tenant_id, product_id).await?;
        let config = get_or_create_combo(db, tenant_id, product_id).await?;
        build_config(db, tenant_id, &owner, &config).await
    }

    /// Replaces every slot and slot item of the combo in one transaction.
    #[instrument(skip(self, request), fields(slot_count = request.slots.len()))]
    pub async fn save_config(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        request: SaveComboRequest,
    ) -> Result<ComboConfig, ServiceError> {
        check_request(&request)?;

        let saved = db::transaction(&self.db_pool, "save_combo", move |txn| {
            Box::pin(async move {
                let owner = find_product(txn, tenant_id, product_id).await?;

                let referenced: HashSet<Uuid> = request
                    .slots
                    .iter()
                    .flat_map(|s| s.items.iter().map(|i| i.product_id))
                    .collect();
                if referenced.contains(&product_id) {
                    return Err(ServiceError::ValidationError(format!(
                        "{} cannot be offered inside itself",
                        owner.name
                    )));
                }
                let known = products_by_id(txn, tenant_id, referenced.clone()).await?;
                if let Some(missing) = referenced.iter().find(|id| !known.contains_key(id)) {
                    return Err(ServiceError::ValidationError(format!(
                        "Product {} does not exist",
                        missing
                    )));
                }
                let nested =
                    combo_product_ids(txn, tenant_id, referenced.into_iter().collect()).await?;
                if let Some(nested_id) = nested.iter().next() {
                    let name = known.get(nested_id).map(|p| p.name.as_str()).unwrap_or("");
                    return Err(ServiceError::ValidationError(format!(
                        "{} is a combo and cannot be used inside another combo",
                        name
                    )));
                }

                let config = get_or_create_combo(txn, tenant_id, product_id).await?;
                delete_combo_rows(txn, config.id).await?;

                for (index, slot) in request.slots.into_iter().enumerate() {
                    let slot_id = Uuid::new_v4();
                    combo_slot::ActiveModel {
                        id: Set(slot_id),
                        combo_id: Set(config.id),
                        name: Set(slot.name.trim().to_string()),
                        emoji: Set(Some(
                            non_blank(slot.emoji)
                                .unwrap_or_else(|| DEFAULT_SLOT_EMOJI.to_string()),
                        )),
                        position: Set(slot.position.unwrap_or(index as i32)),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    for (item_index, item) in slot.items.into_iter().enumerate() {
                        combo_slot_item::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            slot_id: Set(slot_id),
                            product_id: Set(item.product_id),
                            debit_quantity: Set(item.debit_quantity),
                            position: Set(item_index as i32),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?;
                    }
                }

                let tree = load_tree(txn, config.id).await?;
                let mut active: combo::ActiveModel = config.into();
                active.is_active = Set(tree_problem(&tree).is_none());
                let config = active.update(txn).await?;

                build_config(txn, tenant_id, &owner, &config).await
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, %product_id, "Failed to save combo configuration");
            e
        })?;

        info!(%product_id, combo_id = %saved.combo_id, valid = saved.is_valid, "Combo configuration saved");
        if let Some(sender) = &self.event_sender {
            sender
                .publish(Event::ComboConfigured {
                    product_id,
                    slot_count: saved.slots.len(),
                })
                .await;
        }
        Ok(saved)
    }

    /// What a cashier may pick for each slot. Only valid combos have options.
    #[instrument(skip(self))]
    pub async fn options(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<ComboOptions, ServiceError> {
        let db = &*self.db_pool;
        let owner = find_product(db, tenant_id, product_id).await?;
        let config = find_combo(db, tenant_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::ValidationError(format!("{} is not a combo", owner.name)))?;
        let tree = load_tree(db, config.id).await?;
        if let Some(problem) = tree_problem(&tree) {
            return Err(ServiceError::ValidationError(problem));
        }

        let products = products_by_id(
            db,
            tenant_id,
            tree.iter()
                .flat_map(|(_, items)| items.iter().map(|i| i.product_id))
                .collect(),
        )
        .await?;

        let slots = tree
            .into_iter()
            .map(|(slot, items)| ComboOptionSlot {
                slot_id: slot.id,
                name: slot.name,
                emoji: slot.emoji,
                position: slot.position,
                options: items
                    .into_iter()
                    .filter_map(|item| {
                        products.get(&item.product_id).map(|p| ComboOption {
                            slot_item_id: item.id,
                            product_id: p.id,
                            product_name: p.name.clone(),
                            price: p.price,
                            is_active: p.is_active,
                            stock_quantity: p.stock_quantity,
                            debit_quantity: item.debit_quantity,
                            has_sufficient_stock: p.is_active
                                && p.stock_quantity >= item.debit_quantity,
                        })
                    })
                    .collect(),
            })
            .collect();

        Ok(ComboOptions {
            combo_id: config.id,
            product_id: owner.id,
            name: owner.name,
            price: owner.price,
            slots,
        })
    }

    /// Checks a cashier's picks before they are added to the cart.
    #[instrument(skip(self, request))]
    pub async fn validate_selection(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        request: ComboSelectionRequest,
    ) -> Result<ComboSelection, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let owner = find_product(db, tenant_id, product_id).await?;
        let choices =
            resolve_choices(db, tenant_id, &owner, &request.choices, request.quantity, true)
                .await?;
        Ok(ComboSelection {
            product_id: owner.id,
            name: owner.name,
            price: owner.price,
            quantity: request.quantity,
            choices,
        })
    }

    /// Products that may be offered inside a combo, combos themselves excluded.
    /// Unavailable products are listed too so they can be linked ahead of time.
    #[instrument(skip(self))]
    pub async fn eligible_products(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<crate::services::products::ProductResponse>, ServiceError> {
        let db = &*self.db_pool;
        crate::services::ensure_tenant(db, tenant_id).await?;
        let products = product::Entity::find()
            .filter(product::Column::TenantId.eq(tenant_id))
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?;
        let combos =
            combo_product_ids(db, tenant_id, products.iter().map(|p| p.id).collect()).await?;
        Ok(products
            .into_iter()
            .filter(|p| !combos.contains(&p.id))
            .map(|p| crate::services::products::ProductResponse::from_model(p, false))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(name: &str, position: Option<i32>, debits: &[i32]) -> ComboSlotInput {
        ComboSlotInput {
            name: name.to_string(),
            emoji: None,
            position,
            items: debits
                .iter()
                .map(|&debit_quantity| ComboItemInput {
                    product_id: Uuid::new_v4(),
                    debit_quantity,
                })
                .collect(),
        }
    }

    #[test]
    fn structure_needs_a_slot_and_no_empty_slots() {
        assert!(!is_valid_structure(&[]));
        assert!(!is_valid_structure(&[2, 0]));
        assert!(is_valid_structure(&[1, 3]));
    }

    #[test]
    fn structure_problem_names_the_empty_slot() {
        let problem = structure_problem(&[("Drink".into(), 2), ("Side".into(), 0)]);
        assert_eq!(problem.as_deref(), Some("Slot 'Side' has no items"));
        assert!(structure_problem(&[]).is_some());
        assert!(structure_problem(&[("Main".into(), 1)]).is_none());
    }

    #[test]
    fn duplicate_positions_are_rejected() {
        let request = SaveComboRequest {
            slots: vec![slot("Main", Some(1), &[1]), slot("Drink", Some(1), &[1])],
        };
        assert!(matches!(
            check_request(&request),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn implicit_positions_follow_request_order() {
        let request = SaveComboRequest {
            slots: vec![slot("Main", None, &[1]), slot("Drink", None, &[2])],
        };
        assert!(check_request(&request).is_ok());
    }

    #[test]
    fn zero_debit_is_rejected() {
        let request = SaveComboRequest {
            slots: vec![slot("Main", None, &[0])],
        };
        assert!(check_request(&request).is_err());
    }

    #[test]
    fn empty_configuration_may_be_saved() {
        assert!(check_request(&SaveComboRequest::default()).is_ok());
    }
}
