mod common;

use assert_matches::assert_matches;
use cantina_api::{
    errors::ServiceError,
    services::{
        combos::{
            ComboChoiceInput, ComboItemInput, ComboSelectionRequest, ComboSlotInput,
            SaveComboRequest,
        },
        orders::{CreateOrderRequest, OrderItemInput},
    },
};
use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn slot(name: &str, position: i32, items: &[(Uuid, i32)]) -> ComboSlotInput {
    ComboSlotInput {
        name: name.to_string(),
        emoji: None,
        position: Some(position),
        items: items
            .iter()
            .map(|&(product_id, debit_quantity)| ComboItemInput {
                product_id,
                debit_quantity,
            })
            .collect(),
    }
}

fn combo_order(combo_id: Uuid, choices: Vec<ComboChoiceInput>) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_name: "Tiago".into(),
        payment_method: "debit".into(),
        customer_phone: None,
        table_label: None,
        order_type: None,
        notes: None,
        operator_id: None,
        items: vec![OrderItemInput {
            id: None,
            product_id: combo_id,
            quantity: 1,
            notes: None,
            choices,
        }],
    }
}

#[tokio::test]
async fn opening_a_product_creates_an_empty_inactive_combo() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("Fresh").await;
    let combo = app.create_product(tenant, "Lunch Combo", dec!(25), 0).await;

    let config = app.state.services.combos.load_config(tenant, combo.id).await.unwrap();
    assert_eq!(config.product_id, combo.id);
    assert!(config.slots.is_empty());
    assert!(!config.is_active);
    assert!(!config.is_valid);

    // Loading twice reuses the same row
    let again = app.state.services.combos.load_config(tenant, combo.id).await.unwrap();
    assert_eq!(again.combo_id, config.combo_id);
}

#[tokio::test]
async fn saved_configuration_loads_back_identically() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("Round trip").await;
    let burger = app.create_product(tenant, "Burger", dec!(18), 10).await;
    let cola = app.create_product(tenant, "Cola", dec!(6), 10).await;
    let juice = app.create_product(tenant, "Juice", dec!(8), 10).await;
    let combo = app.create_product(tenant, "Big Combo", dec!(30), 0).await;
    let combos = &app.state.services.combos;

    let saved = combos
        .save_config(
            tenant,
            combo.id,
            SaveComboRequest {
                slots: vec![
                    slot("Drink", 1, &[(cola.id, 1), (juice.id, 2)]),
                    slot("Main", 0, &[(burger.id, 1)]),
                ],
            },
        )
        .await
        .unwrap();
    assert!(saved.is_active);
    assert!(saved.is_valid);

    let loaded = combos.load_config(tenant, combo.id).await.unwrap();
    assert_eq!(loaded, saved);

    let names: Vec<&str> = loaded.slots.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Main", "Drink"]);
    let drink = &loaded.slots[1];
    assert_eq!(drink.items.len(), 2);
    assert_eq!(drink.items[0].product_id, cola.id);
    assert_eq!(drink.items[1].product_id, juice.id);
    assert_eq!(drink.items[1].debit_quantity, 2);

    let product = app.state.services.products.get_product(tenant, combo.id).await.unwrap();
    assert!(product.is_combo);
}

#[tokio::test]
async fn empty_slots_leave_the_combo_unsellable() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("Empty slot").await;
    let cola = app.create_product(tenant, "Cola", dec!(6), 10).await;
    let combo = app.create_product(tenant, "Half Combo", dec!(12), 0).await;
    let combos = &app.state.services.combos;

    let saved = combos
        .save_config(
            tenant,
            combo.id,
            SaveComboRequest {
                slots: vec![slot("Drink", 0, &[(cola.id, 1)]), slot("Side", 1, &[])],
            },
        )
        .await
        .unwrap();
    assert!(!saved.is_active);
    assert!(!saved.is_valid);
    assert_eq!(saved.slots.len(), 2);

    assert_matches!(
        combos.options(tenant, combo.id).await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("Side")
    );

    let drink_slot = saved.slots[0].id;
    let err = app
        .state
        .services
        .orders
        .create_order(
            tenant,
            combo_order(
                combo.id,
                vec![ComboChoiceInput {
                    slot_id: drink_slot,
                    product_id: cola.id,
                }],
            ),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("cannot be sold"));
    assert_eq!(app.stock_of(tenant, cola.id).await, 10);

    // No slots at all is just as unsellable
    let cleared = combos
        .save_config(tenant, combo.id, SaveComboRequest::default())
        .await
        .unwrap();
    assert!(cleared.slots.is_empty());
    assert!(!cleared.is_valid);
}

#[tokio::test]
async fn combos_cannot_contain_themselves_or_other_combos() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("Nesting").await;
    let cola = app.create_product(tenant, "Cola", dec!(6), 10).await;
    let inner = app.create_product(tenant, "Inner Combo", dec!(10), 0).await;
    let outer = app.create_product(tenant, "Outer Combo", dec!(20), 0).await;
    app.configure_combo(tenant, inner.id, &[("Drink", &[cola.id])]).await;
    let combos = &app.state.services.combos;

    let itself = combos
        .save_config(
            tenant,
            outer.id,
            SaveComboRequest {
                slots: vec![slot("Loop", 0, &[(outer.id, 1)])],
            },
        )
        .await;
    assert_matches!(itself, Err(ServiceError::ValidationError(msg)) if msg.contains("inside itself"));

    let nested = combos
        .save_config(
            tenant,
            outer.id,
            SaveComboRequest {
                slots: vec![slot("Combo", 0, &[(inner.id, 1)])],
            },
        )
        .await;
    assert_matches!(nested, Err(ServiceError::ValidationError(msg)) if msg.contains("Inner Combo"));

    let unknown = combos
        .save_config(
            tenant,
            outer.id,
            SaveComboRequest {
                slots: vec![slot("Ghost", 0, &[(Uuid::new_v4(), 1)])],
            },
        )
        .await;
    assert_matches!(unknown, Err(ServiceError::ValidationError(_)));

    let zero_debit = combos
        .save_config(
            tenant,
            outer.id,
            SaveComboRequest {
                slots: vec![slot("Drink", 0, &[(cola.id, 0)])],
            },
        )
        .await;
    assert_matches!(zero_debit, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn resaving_keeps_order_history_readable() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("History").await;
    let cola = app.create_product(tenant, "Cola", dec!(6), 10).await;
    let juice = app.create_product(tenant, "Juice", dec!(8), 10).await;
    let combo = app.create_product(tenant, "Drink Combo", dec!(9), 0).await;
    app.configure_combo(tenant, combo.id, &[("Drink", &[cola.id])]).await;
    let config = app.state.services.combos.load_config(tenant, combo.id).await.unwrap();

    let placed = app
        .state
        .services
        .orders
        .create_order(
            tenant,
            combo_order(
                combo.id,
                vec![ComboChoiceInput {
                    slot_id: config.slots[0].id,
                    product_id: cola.id,
                }],
            ),
        )
        .await
        .unwrap();
    assert_eq!(placed.items[0].choices[0].slot_id, Some(config.slots[0].id));

    // Destructive replace: the old slot disappears
    app.configure_combo(tenant, combo.id, &[("Beverage", &[juice.id])]).await;

    let reloaded = app.state.services.orders.get_order(tenant, placed.id).await.unwrap();
    let choice = &reloaded.items[0].choices[0];
    assert_eq!(choice.slot_id, None);
    assert_eq!(choice.slot_name, "Drink");
    assert_eq!(choice.product_id, cola.id);

    // Removing the order still gives the cola back
    app.state.services.orders.delete_order(tenant, placed.id).await.unwrap();
    assert_eq!(app.stock_of(tenant, cola.id).await, 10);
}

#[tokio::test]
async fn selection_check_reports_the_first_problem() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("Selection").await;
    let burger = app.create_product(tenant, "Burger", dec!(18), 1).await;
    let cola = app.create_product(tenant, "Cola", dec!(6), 10).await;
    let plain = app.create_product(tenant, "Water", dec!(3), 10).await;
    let combo = app.create_product(tenant, "Duo", dec!(22), 0).await;
    app.configure_combo(tenant, combo.id, &[("Main", &[burger.id]), ("Drink", &[cola.id])])
        .await;
    let combos = &app.state.services.combos;
    let config = combos.load_config(tenant, combo.id).await.unwrap();
    let (main, drink) = (config.slots[0].id, config.slots[1].id);

    let picks = vec![
        ComboChoiceInput {
            slot_id: main,
            product_id: burger.id,
        },
        ComboChoiceInput {
            slot_id: drink,
            product_id: cola.id,
        },
    ];

    let ok = combos
        .validate_selection(
            tenant,
            combo.id,
            ComboSelectionRequest {
                quantity: 1,
                choices: picks.clone(),
            },
        )
        .await
        .unwrap();
    assert_eq!(ok.choices.len(), 2);
    assert_eq!(ok.price, dec!(22));

    // Only one burger on hand
    let short = combos
        .validate_selection(
            tenant,
            combo.id,
            ComboSelectionRequest {
                quantity: 2,
                choices: picks.clone(),
            },
        )
        .await;
    assert_matches!(short, Err(ServiceError::InsufficientStock(_)));

    let missing = combos
        .validate_selection(
            tenant,
            combo.id,
            ComboSelectionRequest {
                quantity: 1,
                choices: picks[..1].to_vec(),
            },
        )
        .await;
    assert_matches!(missing, Err(ServiceError::ValidationError(msg)) if msg.contains("Drink"));

    let not_combo = combos
        .validate_selection(
            tenant,
            plain.id,
            ComboSelectionRequest {
                quantity: 1,
                choices: Vec::new(),
            },
        )
        .await;
    assert_matches!(not_combo, Err(ServiceError::ValidationError(msg)) if msg.contains("is not a combo"));

    let options = combos.options(tenant, combo.id).await.unwrap();
    assert_eq!(options.slots.len(), 2);
    assert_eq!(options.slots[0].options[0].product_id, burger.id);
    assert!(options.slots[0].options[0].has_sufficient_stock);
}

#[tokio::test]
async fn eligible_products_exclude_combos_but_keep_unavailable_ones() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("Eligible").await;
    let cola = app.create_product(tenant, "Cola", dec!(6), 10).await;
    let hidden = app.create_product(tenant, "Seasonal", dec!(6), 10).await;
    let combo = app.create_product(tenant, "Combo", dec!(9), 0).await;
    app.configure_combo(tenant, combo.id, &[("Drink", &[cola.id])]).await;
    app.state
        .services
        .products
        .set_availability(tenant, hidden.id, false)
        .await
        .unwrap();

    let eligible = app.state.services.combos.eligible_products(tenant).await.unwrap();
    let ids: Vec<Uuid> = eligible.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![cola.id, hidden.id]);
    assert!(eligible[0].is_active);
    assert!(!eligible[1].is_active);

    // Unavailable products can still be linked into a slot
    app.configure_combo(tenant, combo.id, &[("Drink", &[cola.id, hidden.id])])
        .await;
    let loaded = app.state.services.combos.load_config(tenant, combo.id).await.unwrap();
    assert_eq!(loaded.slots[0].items.len(), 2);
}

#[tokio::test]
async fn product_delete_is_guarded_by_orders_and_combos() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("Guards").await;
    let cola = app.create_product(tenant, "Cola", dec!(6), 10).await;
    let cake = app.create_product(tenant, "Cake", dec!(12), 10).await;
    let spare = app.create_product(tenant, "Spare", dec!(1), 10).await;
    let combo = app.create_product(tenant, "Combo", dec!(9), 0).await;
    app.configure_combo(tenant, combo.id, &[("Drink", &[cola.id])]).await;
    let products = &app.state.services.products;
    let orders = &app.state.services.orders;

    assert_matches!(
        products.delete_product(tenant, cola.id).await,
        Err(ServiceError::Conflict(msg)) if msg.contains("Combo")
    );

    let order = orders
        .create_order(
            tenant,
            CreateOrderRequest {
                items: vec![OrderItemInput {
                    id: None,
                    product_id: cake.id,
                    quantity: 1,
                    notes: None,
                    choices: Vec::new(),
                }],
                ..combo_order(combo.id, Vec::new())
            },
        )
        .await
        .unwrap();
    assert_matches!(
        products.delete_product(tenant, cake.id).await,
        Err(ServiceError::Conflict(msg)) if msg.contains("active order")
    );

    orders.update_status(tenant, order.id, "delivered").await.unwrap();
    assert_matches!(
        products.delete_product(tenant, cake.id).await,
        Err(ServiceError::Conflict(msg)) if msg.contains("order history")
    );

    products.delete_product(tenant, spare.id).await.unwrap();
    assert_matches!(
        products.get_product(tenant, spare.id).await,
        Err(ServiceError::NotFound(_))
    );

    // A combo product with no sales takes its configuration along
    products.delete_product(tenant, combo.id).await.unwrap();
    products.delete_product(tenant, cola.id).await.unwrap();
}
