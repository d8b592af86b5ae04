pub mod categories;
pub mod combos;
pub mod common;
pub mod orders;
pub mod products;
pub mod tenants;
pub mod tracking;

use crate::events::EventSender;
use crate::{config::AppConfig, db::DbPool};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub tenants: Arc<crate::services::tenants::TenantService>,
    pub categories: Arc<crate::services::categories::CategoryService>,
    pub products: Arc<crate::services::products::ProductService>,
    pub combos: Arc<crate::services::combos::ComboService>,
    pub orders: Arc<crate::services::orders::OrderService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let tenants = Arc::new(crate::services::tenants::TenantService::new(db_pool.clone()));
        let categories = Arc::new(crate::services::categories::CategoryService::new(
            db_pool.clone(),
        ));
        let products = Arc::new(crate::services::products::ProductService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
            config.enforce_stock,
        ));
        let combos = Arc::new(crate::services::combos::ComboService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let orders = Arc::new(crate::services::orders::OrderService::new(
            db_pool,
            Some(event_sender),
            config.enforce_stock,
        ));

        Self {
            tenants,
            categories,
            products,
            combos,
            orders,
        }
    }
}
