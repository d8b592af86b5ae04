//! Property-based tests for order totals and stock bookkeeping.
//!
//! Most properties run against the pure helpers; the order round trip at the
//! bottom drives the real services over a throwaway database.

mod common;

use std::collections::BTreeMap;

use cantina_api::entities::order::format_order_number;
use cantina_api::services::combos::{
    is_valid_structure, ComboChoiceInput, ComboItemInput, ComboSlotInput, SaveComboRequest,
};
use cantina_api::services::orders::{first_name, order_total, CreateOrderRequest, OrderItemInput};
use cantina_api::services::stock::{reconcile, totals_by_product, StockDebit};
use common::TestApp;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

/// (unit price in cents, quantity)
fn line_strategy() -> impl Strategy<Value = (i64, i32)> {
    (0i64..100_000, 1i32..50)
}

const POOL: u128 = 5;

fn product(index: u128) -> Uuid {
    Uuid::from_u128(index + 1)
}

/// Debits drawn from a small product pool so products repeat across lines.
fn debits_strategy() -> impl Strategy<Value = Vec<StockDebit>> {
    prop::collection::vec((0..POOL, 1i32..20), 0..12).prop_map(|picks| {
        picks
            .into_iter()
            .map(|(index, quantity)| StockDebit::new(product(index), quantity))
            .collect()
    })
}

fn apply(stock: &mut BTreeMap<Uuid, i32>, deltas: &BTreeMap<Uuid, i32>) {
    for (product, delta) in deltas {
        *stock.entry(*product).or_insert(0) += delta;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn total_matches_integer_cents(lines in prop::collection::vec(line_strategy(), 0..20)) {
        let subtotals: Vec<Decimal> = lines
            .iter()
            .map(|(cents, quantity)| Decimal::new(*cents, 2) * Decimal::from(*quantity))
            .collect();
        let cents: i64 = lines.iter().map(|(c, q)| c * i64::from(*q)).sum();

        let total = order_total(subtotals).unwrap();
        prop_assert_eq!(total, Decimal::new(cents, 2));
        prop_assert!(total.scale() <= 2);
    }

    #[test]
    fn edits_compose_like_a_single_change(first in debits_strategy(), second in debits_strategy()) {
        // first -> second, then second -> deleted == first -> deleted
        let mut stepwise = reconcile(&first, &second).unwrap();
        for (product, delta) in reconcile(&second, &[]).unwrap() {
            *stepwise.entry(product).or_insert(0) += delta;
        }
        stepwise.retain(|_, delta| *delta != 0);

        prop_assert_eq!(stepwise, reconcile(&first, &[]).unwrap());
    }

    #[test]
    fn deleting_an_order_restores_opening_stock(
        opening in prop::collection::vec(0i32..500, POOL as usize),
        debits in debits_strategy(),
    ) {
        let mut stock: BTreeMap<Uuid, i32> = opening
            .iter()
            .enumerate()
            .map(|(index, units)| (product(index as u128), *units))
            .collect();
        let before = stock.clone();

        // Creating the order is reconcile(nothing -> debits)
        apply(&mut stock, &reconcile(&[], &debits).unwrap());
        let held: i32 = totals_by_product(&debits).unwrap().values().sum();
        prop_assert_eq!(before.values().sum::<i32>() - stock.values().sum::<i32>(), held);

        apply(&mut stock, &reconcile(&debits, &[]).unwrap());
        prop_assert_eq!(stock, before);
    }

    #[test]
    fn reconcile_never_reports_zero_deltas(a in debits_strategy(), b in debits_strategy()) {
        prop_assert!(reconcile(&a, &b).unwrap().values().all(|delta| *delta != 0));
        prop_assert!(reconcile(&a, &a).unwrap().is_empty());
    }

    #[test]
    fn combos_need_slots_and_no_empty_slot(counts in prop::collection::vec(0usize..4, 0..6)) {
        let expected = !counts.is_empty() && !counts.contains(&0);
        prop_assert_eq!(is_valid_structure(&counts), expected);
    }

    #[test]
    fn order_numbers_are_zero_padded(number in 1i32..100_000) {
        let shown = format_order_number(number);
        prop_assert!(shown.len() >= 4);
        prop_assert_eq!(shown.parse::<i32>().unwrap(), number);
    }

    #[test]
    fn first_name_is_the_leading_word(first in "[A-Za-z]{1,12}", rest in "( [A-Za-z]{1,12}){0,3}") {
        let full = format!("  {}{}  ", first, rest);
        prop_assert_eq!(first_name(&full), first);
    }
}

const OPENING_STOCK: i32 = 1_000;
/// Prices in cents
const PLAIN_CENTS: [i64; 3] = [450, 725, 310];
const COMBO_CENTS: i64 = 1_590;
/// Units taken per combo for each "Main" option; the "Side" always takes 1 of product 2
const MAIN_DEBITS: [i32; 2] = [1, 2];

#[derive(Debug, Clone)]
enum Pick {
    Plain { product: usize, quantity: i32 },
    Combo { main: usize, quantity: i32 },
}

fn pick_strategy() -> impl Strategy<Value = Pick> {
    prop_oneof![
        (0usize..3, 1i32..6).prop_map(|(product, quantity)| Pick::Plain { product, quantity }),
        (0usize..2, 1i32..4).prop_map(|(main, quantity)| Pick::Combo { main, quantity }),
    ]
}

/// Creates the payload's order, checks the persisted total and stock, deletes
/// it and checks the opening stock is back.
async fn order_round_trip(picks: Vec<Pick>) -> Result<(), TestCaseError> {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("Property Cantina").await;
    let mut plain = Vec::new();
    for (index, cents) in PLAIN_CENTS.iter().enumerate() {
        let product = app
            .create_product(tenant, &format!("Item {index}"), Decimal::new(*cents, 2), OPENING_STOCK)
            .await;
        plain.push(product.id);
    }
    let combo = app
        .create_product(tenant, "Combo", Decimal::new(COMBO_CENTS, 2), 0)
        .await;
    let config = app
        .state
        .services
        .combos
        .save_config(
            tenant,
            combo.id,
            SaveComboRequest {
                slots: vec![
                    ComboSlotInput {
                        name: "Main".into(),
                        emoji: None,
                        position: None,
                        items: vec![
                            ComboItemInput {
                                product_id: plain[0],
                                debit_quantity: MAIN_DEBITS[0],
                            },
                            ComboItemInput {
                                product_id: plain[1],
                                debit_quantity: MAIN_DEBITS[1],
                            },
                        ],
                    },
                    ComboSlotInput {
                        name: "Side".into(),
                        emoji: None,
                        position: None,
                        items: vec![ComboItemInput {
                            product_id: plain[2],
                            debit_quantity: 1,
                        }],
                    },
                ],
            },
        )
        .await
        .unwrap();
    let (main_slot, side_slot) = (config.slots[0].id, config.slots[1].id);

    let mut expected_cents = 0i64;
    let mut expected_stock = [OPENING_STOCK; 3];
    let items: Vec<OrderItemInput> = picks
        .iter()
        .map(|pick| match *pick {
            Pick::Plain { product, quantity } => {
                expected_cents += PLAIN_CENTS[product] * i64::from(quantity);
                expected_stock[product] -= quantity;
                OrderItemInput {
                    id: None,
                    product_id: plain[product],
                    quantity,
                    notes: None,
                    choices: Vec::new(),
                }
            }
            Pick::Combo { main, quantity } => {
                expected_cents += COMBO_CENTS * i64::from(quantity);
                expected_stock[main] -= MAIN_DEBITS[main] * quantity;
                expected_stock[2] -= quantity;
                OrderItemInput {
                    id: None,
                    product_id: combo.id,
                    quantity,
                    notes: None,
                    choices: vec![
                        ComboChoiceInput {
                            slot_id: main_slot,
                            product_id: plain[main],
                        },
                        ComboChoiceInput {
                            slot_id: side_slot,
                            product_id: plain[2],
                        },
                    ],
                }
            }
        })
        .collect();

    let orders = &app.state.services.orders;
    let created = orders
        .create_order(
            tenant,
            CreateOrderRequest {
                customer_name: "Prop Tester".into(),
                payment_method: "cash".into(),
                customer_phone: None,
                table_label: None,
                order_type: None,
                notes: None,
                operator_id: None,
                items,
            },
        )
        .await
        .unwrap();

    let stored = orders.get_order(tenant, created.id).await.unwrap();
    let line_sum: Decimal = stored.items.iter().map(|i| i.subtotal).sum();
    prop_assert_eq!(stored.total, line_sum);
    prop_assert_eq!(stored.total, Decimal::new(expected_cents, 2));
    for (index, product_id) in plain.iter().enumerate() {
        prop_assert_eq!(app.stock_of(tenant, *product_id).await, expected_stock[index]);
    }

    orders.delete_order(tenant, created.id).await.unwrap();
    for product_id in &plain {
        prop_assert_eq!(app.stock_of(tenant, *product_id).await, OPENING_STOCK);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn orders_total_their_lines_and_delete_restores_stock(
        picks in prop::collection::vec(pick_strategy(), 1..8),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(order_round_trip(picks))?;
    }
}
