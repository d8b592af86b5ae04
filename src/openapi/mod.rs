use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cantina API",
        version = "0.1.0",
        description = r#"
# Cantina API

Point-of-sale and kitchen order backend for cantinas and small food-service counters.

## Features

- **Catalog**: categories and products with prices, preparation time and availability
- **Stock**: every change is recorded in a per-product ledger
- **Combos**: products built from slots, one pick per slot at order time
- **Orders**: creation, in-place editing and deletion with exact stock reconciliation
- **Kitchen board**: pending, preparing and ready orders, oldest first
- **Tracking**: read-only order status behind the token in the receipt QR code

## Tenancy

Every resource except tenants and tracking lives under `/tenants/{tenant_id}`.

## Errors

Failures return a JSON body with `error`, `message`, `request_id` and `timestamp`.
Request validation failures return the standard envelope with `success = false`
and one `field: message` entry per problem.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "tenants", description = "Cantina registration"),
        (name = "categories", description = "Product categories"),
        (name = "products", description = "Catalog and stock"),
        (name = "combos", description = "Combo configuration and selection"),
        (name = "orders", description = "Order lifecycle and kitchen board"),
        (name = "tracking", description = "Public order tracking")
    ),
    paths(
        crate::handlers::tenants::create_tenant,
        crate::handlers::tenants::get_tenant,
        crate::handlers::tenants::update_tenant,

        crate::handlers::categories::list_categories,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        crate::handlers::products::list_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::set_availability,
        crate::handlers::products::adjust_stock,

        crate::handlers::combos::get_combo,
        crate::handlers::combos::save_combo,
        crate::handlers::combos::combo_options,
        crate::handlers::combos::validate_selection,
        crate::handlers::combos::eligible_products,

        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::active_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::delete_order,
        crate::handlers::orders::update_order_status,

        crate::handlers::tracking::track_order,
    ),
    components(
        schemas(
            crate::services::tenants::CreateTenantRequest,
            crate::services::tenants::UpdateTenantRequest,
            crate::services::tenants::TenantResponse,
            crate::services::categories::CreateCategoryRequest,
            crate::services::categories::UpdateCategoryRequest,
            crate::services::categories::CategoryResponse,
            crate::services::products::CreateProductRequest,
            crate::services::products::UpdateProductRequest,
            crate::services::products::SetAvailabilityRequest,
            crate::services::products::StockAdjustmentRequest,
            crate::services::products::ProductResponse,
            crate::services::combos::SaveComboRequest,
            crate::services::combos::ComboConfig,
            crate::services::combos::ComboOptions,
            crate::services::combos::ComboSelectionRequest,
            crate::services::combos::ComboSelection,
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::UpdateOrderRequest,
            crate::services::orders::UpdateOrderStatusRequest,
            crate::services::orders::OrderResponse,
            crate::services::orders::ActiveOrdersBoard,
            crate::services::orders::TrackingView,
            crate::entities::OrderStatus,
            crate::entities::OrderType,
            crate::entities::PaymentMethod,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_tenant_scoped_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Cantina API"));
        assert!(json.contains("/api/v1/tenants/{tenant_id}/orders"));
        assert!(json.contains("/api/v1/track/{tracking_token}"));
    }
}
