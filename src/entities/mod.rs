pub mod category;
pub mod combo;
pub mod combo_slot;
pub mod combo_slot_item;
pub mod order;
pub mod order_combo_choice;
pub mod order_item;
pub mod product;
pub mod stock_movement;
pub mod tenant;

pub use order::{OrderStatus, OrderType, PaymentMethod};
pub use stock_movement::MovementReason;

use rust_decimal::Decimal;

/// Largest amount a money column (`DECIMAL(10, 2)`) can hold.
pub fn max_money() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}
