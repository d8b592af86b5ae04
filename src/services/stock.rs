//! Stock movements.
//!
//! Every change to `products.stock_quantity` goes through [`apply_stock_delta`],
//! which issues a single relative `UPDATE` (so concurrent orders cannot lose each
//! other's decrements) and appends a row to the `stock_movements` ledger.

use crate::{
    entities::{
        order_combo_choice, order_item, product,
        stock_movement::{self, MovementReason},
    },
    errors::ServiceError,
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    Set,
};
use std::collections::BTreeMap;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Units of one product taken from stock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDebit {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl StockDebit {
    pub fn new(product_id: Uuid, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

fn out_of_range(product_id: Uuid) -> ServiceError {
    ServiceError::ValidationError(format!(
        "Stock quantity for product {} is out of range",
        product_id
    ))
}

/// Sums debits per product.
pub fn totals_by_product(debits: &[StockDebit]) -> Result<BTreeMap<Uuid, i32>, ServiceError> {
    let mut totals: BTreeMap<Uuid, i32> = BTreeMap::new();
    for debit in debits {
        let total = totals.entry(debit.product_id).or_insert(0);
        *total = total
            .checked_add(debit.quantity)
            .ok_or_else(|| out_of_range(debit.product_id))?;
    }
    Ok(totals)
}

/// Net stock change needed to move from the `previous` debits to the `next` ones.
///
/// Positive values give stock back, negative values take more. Products whose
/// debits are unchanged are omitted. Keys come out sorted, so row updates are
/// always issued in the same order.
pub fn reconcile(
    previous: &[StockDebit],
    next: &[StockDebit],
) -> Result<BTreeMap<Uuid, i32>, ServiceError> {
    let mut deltas = totals_by_product(previous)?;
    for (product_id, quantity) in totals_by_product(next)? {
        let delta = deltas.entry(product_id).or_insert(0);
        *delta = delta
            .checked_sub(quantity)
            .filter(|d| *d != i32::MIN)
            .ok_or_else(|| out_of_range(product_id))?;
    }
    deltas.retain(|_, delta| *delta != 0);
    Ok(deltas)
}

/// Everything an order currently holds: plain lines plus combo choices.
pub async fn debits_for_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<StockDebit>, ServiceError> {
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;

    let item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    let mut debits: Vec<StockDebit> = items
        .iter()
        .filter(|i| i.stock_debited != 0)
        .map(|i| StockDebit::new(i.product_id, i.stock_debited))
        .collect();

    if !item_ids.is_empty() {
        let choices = order_combo_choice::Entity::find()
            .filter(order_combo_choice::Column::OrderItemId.is_in(item_ids))
            .all(conn)
            .await?;
        debits.extend(
            choices
                .into_iter()
                .map(|c| StockDebit::new(c.product_id, c.quantity_debited)),
        );
    }

    Ok(debits)
}

/// Moves a product's stock by `delta` and records the movement.
///
/// With `enforce` set, a negative delta that would leave the product below zero
/// fails with `InsufficientStock` and nothing is written.
pub async fn apply_stock_delta<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    product_id: Uuid,
    delta: i32,
    reason: MovementReason,
    order_id: Option<Uuid>,
    enforce: bool,
) -> Result<i32, ServiceError> {
    let requested = delta
        .checked_neg()
        .ok_or_else(|| out_of_range(product_id))?;
    let mut update = product::Entity::update_many()
        .col_expr(
            product::Column::StockQuantity,
            Expr::col(product::Column::StockQuantity).add(delta),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::TenantId.eq(tenant_id))
        .filter(product::Column::Id.eq(product_id));
    if delta > 0 {
        update = update.filter(product::Column::StockQuantity.lte(i32::MAX - delta));
    } else if enforce {
        update = update.filter(product::Column::StockQuantity.gte(requested));
    } else {
        update = update.filter(product::Column::StockQuantity.gte(i32::MIN + requested));
    }

    let result = update.exec(conn).await.map_err(|e| {
        error!(error = %e, %product_id, delta, "Failed to update product stock");
        ServiceError::DatabaseError(e)
    })?;

    let current = product::Entity::find_by_id(product_id)
        .filter(product::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?;

    let current = match (result.rows_affected, current) {
        (_, None) => {
            return Err(ServiceError::ValidationError(format!(
                "Product {} does not exist",
                product_id
            )))
        }
        (0, Some(p)) if enforce && delta < 0 && p.stock_quantity < requested => {
            warn!(%product_id, available = p.stock_quantity, requested, "Stock check failed");
            return Err(ServiceError::InsufficientStock(format!(
                "{}: {} available, {} requested",
                p.name, p.stock_quantity, requested
            )));
        }
        (0, Some(_)) => {
            warn!(%product_id, delta, "Stock change out of range");
            return Err(out_of_range(product_id));
        }
        (_, Some(p)) => p,
    };

    stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        product_id: Set(product_id),
        order_id: Set(order_id),
        delta: Set(delta),
        reason: Set(reason),
        stock_after: Set(current.stock_quantity),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;

    counter!("cantina_stock.movements", 1);
    debug!(%product_id, delta, stock_after = current.stock_quantity, reason = ?reason, "Stock moved");

    Ok(current.stock_quantity)
}

/// Applies a set of per-product deltas (see [`reconcile`]).
pub async fn apply_deltas<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    deltas: &BTreeMap<Uuid, i32>,
    reason: MovementReason,
    order_id: Option<Uuid>,
    enforce: bool,
) -> Result<(), ServiceError> {
    for (&product_id, &delta) in deltas {
        apply_stock_delta(conn, tenant_id, product_id, delta, reason, order_id, enforce).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (Uuid, Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn totals_merge_repeated_products() {
        let (a, b, _) = ids();
        let totals = totals_by_product(&[
            StockDebit::new(a, 2),
            StockDebit::new(b, 1),
            StockDebit::new(a, 3),
        ])
        .unwrap();
        assert_eq!(totals[&a], 5);
        assert_eq!(totals[&b], 1);
    }

    #[test]
    fn reconcile_returns_only_net_changes() {
        let (burger, soda, fries) = ids();
        let previous = [StockDebit::new(burger, 2), StockDebit::new(soda, 2)];
        let next = [
            StockDebit::new(burger, 2),
            StockDebit::new(soda, 1),
            StockDebit::new(fries, 3),
        ];

        let deltas = reconcile(&previous, &next).unwrap();
        assert_eq!(deltas.get(&burger), None);
        assert_eq!(deltas[&soda], 1);
        assert_eq!(deltas[&fries], -3);
    }

    #[test]
    fn reconcile_against_nothing_restores_everything() {
        let (a, b, _) = ids();
        let previous = [StockDebit::new(a, 4), StockDebit::new(b, 1)];
        let deltas = reconcile(&previous, &[]).unwrap();
        assert_eq!(deltas[&a], 4);
        assert_eq!(deltas[&b], 1);
    }

    #[test]
    fn reconcile_is_sorted_by_product() {
        let (a, b, c) = ids();
        let deltas = reconcile(
            &[],
            &[
                StockDebit::new(c, 1),
                StockDebit::new(a, 1),
                StockDebit::new(b, 1),
            ],
        )
        .unwrap();
        let keys: Vec<_> = deltas.keys().copied().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn merged_lines_past_the_integer_range_are_rejected() {
        let (pastel, _, _) = ids();
        let debits = [
            StockDebit::new(pastel, 1_500_000_000),
            StockDebit::new(pastel, 1_500_000_000),
        ];
        assert!(matches!(
            totals_by_product(&debits),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(reconcile(&[], &debits).is_err());
        assert!(reconcile(&debits, &[]).is_err());
    }

    #[test]
    fn deltas_stay_negatable() {
        let (a, _, _) = ids();
        let previous = [StockDebit::new(a, -1)];
        let next = [StockDebit::new(a, i32::MAX)];
        assert!(reconcile(&previous, &next).is_err());
    }
}
