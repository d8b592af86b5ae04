#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use cantina_api::{
    config::AppConfig,
    db,
    events::{self, EventSender},
    services::{
        combos::{ComboItemInput, ComboSlotInput, SaveComboRequest},
        products::{CreateProductRequest, ProductResponse},
        tenants::CreateTenantRequest,
    },
    AppState,
};

/// Helper harness for spinning up an application backed by a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Construct a test application after letting the caller tweak the config.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("cantina_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;
        tweak(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(event_tx));

        let router = Router::new()
            .nest("/api/v1", cantina_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _dir: dir,
        }
    }

    /// Send a request against the router and decode the JSON body (Null when empty).
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn create_tenant(&self, name: &str) -> Uuid {
        self.state
            .services
            .tenants
            .create_tenant(CreateTenantRequest {
                name: name.to_string(),
                document: None,
                phone: None,
                address: None,
            })
            .await
            .expect("create tenant")
            .id
    }

    pub async fn create_product(
        &self,
        tenant_id: Uuid,
        name: &str,
        price: Decimal,
        stock: i32,
    ) -> ProductResponse {
        self.state
            .services
            .products
            .create_product(
                tenant_id,
                CreateProductRequest {
                    name: name.to_string(),
                    description: None,
                    price,
                    category_id: None,
                    prep_time_minutes: Some(5),
                    stock_quantity: stock,
                    is_active: Some(true),
                },
            )
            .await
            .expect("create product")
    }

    pub async fn stock_of(&self, tenant_id: Uuid, product_id: Uuid) -> i32 {
        self.state
            .services
            .products
            .get_product(tenant_id, product_id)
            .await
            .expect("load product")
            .stock_quantity
    }

    /// Configures `combo_id` with one slot per entry, each listing the given products at debit 1.
    pub async fn configure_combo(&self, tenant_id: Uuid, combo_id: Uuid, slots: &[(&str, &[Uuid])]) {
        let request = SaveComboRequest {
            slots: slots
                .iter()
                .enumerate()
                .map(|(index, (name, products))| ComboSlotInput {
                    name: name.to_string(),
                    emoji: None,
                    position: Some(index as i32),
                    items: products
                        .iter()
                        .map(|id| ComboItemInput {
                            product_id: *id,
                            debit_quantity: 1,
                        })
                        .collect(),
                })
                .collect(),
        };
        self.state
            .services
            .combos
            .save_config(tenant_id, combo_id, request)
            .await
            .expect("save combo");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
