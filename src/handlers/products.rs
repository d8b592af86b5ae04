use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::handlers::common;
use crate::services::products::{
    CreateProductRequest, ProductFilter, ProductResponse, SetAvailabilityRequest,
    StockAdjustmentRequest, UpdateProductRequest,
};
use crate::{errors::ServiceError, ApiResponse, AppState};

pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/combo-eligible", get(super::combos::eligible_products))
        .route(
            "/:product_id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:product_id/availability", put(set_availability))
        .route("/:product_id/stock-adjustments", post(adjust_stock))
        .merge(super::combos::combo_routes())
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    /// Only products currently for sale
    #[serde(default)]
    pub active_only: bool,
    pub category_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/products",
    summary = "List products",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ProductListParams,
    ),
    responses(
        (status = 200, description = "Products retrieved", body = ApiResponse<Vec<ProductResponse>>),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Query(params): Query<ProductListParams>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, ServiceError> {
    let filter = ProductFilter {
        active_only: params.active_only,
        category_id: params.category_id,
    };
    let products = state
        .services
        .products
        .list_products(tenant_id, filter)
        .await?;
    Ok(Json(ApiResponse::success(products)))
}

#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/products",
    summary = "Create product",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ServiceError> {
    if let Err(rejection) = common::check(&request) {
        return Ok(rejection);
    }
    let product = state
        .services
        .products
        .create_product(tenant_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/products/{product_id}",
    summary = "Get product",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("product_id" = Uuid, Path, description = "Product ID"),
    ),
    responses(
        (status = 200, description = "Product retrieved", body = ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path((tenant_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let product = state
        .services
        .products
        .get_product(tenant_id, product_id)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    put,
    path = "/api/v1/tenants/{tenant_id}/products/{product_id}",
    summary = "Update product",
    description = "Partial update. A stock_quantity value sets the absolute count and is booked as a manual adjustment.",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("product_id" = Uuid, Path, description = "Product ID"),
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path((tenant_id, product_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ServiceError> {
    if let Err(rejection) = common::check(&request) {
        return Ok(rejection);
    }
    let product = state
        .services
        .products
        .update_product(tenant_id, product_id, request)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(product))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{tenant_id}/products/{product_id}",
    summary = "Delete product",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("product_id" = Uuid, Path, description = "Product ID"),
    ),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product is referenced by orders or combos", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path((tenant_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .products
        .delete_product(tenant_id, product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/v1/tenants/{tenant_id}/products/{product_id}/availability",
    summary = "Toggle availability",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("product_id" = Uuid, Path, description = "Product ID"),
    ),
    request_body = SetAvailabilityRequest,
    responses(
        (status = 200, description = "Availability updated", body = ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn set_availability(
    State(state): State<AppState>,
    Path((tenant_id, product_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let product = state
        .services
        .products
        .set_availability(tenant_id, product_id, request.is_active)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/products/{product_id}/stock-adjustments",
    summary = "Adjust stock",
    description = "Apply a signed stock change and record it in the stock ledger",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("product_id" = Uuid, Path, description = "Product ID"),
    ),
    request_body = StockAdjustmentRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<ProductResponse>),
        (status = 400, description = "Zero delta", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path((tenant_id, product_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<StockAdjustmentRequest>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let product = state
        .services
        .products
        .adjust_stock(tenant_id, product_id, request.delta)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}
