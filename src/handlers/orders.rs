use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::handlers::common::{self, total_pages};
use crate::services::orders::{
    parse_status, ActiveOrdersBoard, CreateOrderRequest, OrderResponse, UpdateOrderRequest,
    UpdateOrderStatusRequest,
};
use crate::{errors::ServiceError, ApiResponse, AppState, PaginatedResponse};

pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/active", get(active_orders))
        .route(
            "/:order_id",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/:order_id/status", put(update_order_status))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListParams {
    /// Filter by status (pending, preparing, ready, delivered, cancelled)
    pub status: Option<String>,
    /// Page number (default: 1)
    pub page: Option<u64>,
    /// Items per page
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/orders",
    summary = "List orders",
    description = "Newest first, optionally filtered by status",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        OrderListParams,
    ),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<PaginatedResponse<OrderResponse>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Query(params): Query<OrderListParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<OrderResponse>>>, ServiceError> {
    let status = params.status.as_deref().map(parse_status).transpose()?;
    let page = params.page.unwrap_or(1).max(1);
    let limit = state.config.clamp_page_size(params.limit);

    let result = state
        .services
        .orders
        .list_orders(tenant_id, status, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        total_pages: total_pages(result.total, result.per_page),
        items: result.orders,
        total: result.total,
        page: result.page,
        limit: result.per_page,
    })))
}

/// Create an order, debiting stock for each line and combo choice
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/orders",
    summary = "Create order",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    if let Err(rejection) = common::check(&request) {
        return Ok(rejection);
    }
    let order = state
        .services
        .orders
        .create_order(tenant_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/orders/active",
    summary = "Kitchen board",
    description = "Pending, preparing and ready orders, oldest first, with per-status counts",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Active orders", body = ApiResponse<ActiveOrdersBoard>),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn active_orders(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ActiveOrdersBoard>>, ServiceError> {
    let board = state.services.orders.active_orders(tenant_id).await?;
    Ok(Json(ApiResponse::success(board)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/orders/{order_id}",
    summary = "Get order",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("order_id" = Uuid, Path, description = "Order ID"),
    ),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path((tenant_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.get_order(tenant_id, order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Edit an order; stock moves by the net difference
#[utoipa::path(
    put,
    path = "/api/v1/tenants/{tenant_id}/orders/{order_id}",
    summary = "Update order",
    description = "Lines with an id are kept at their captured price, lines without one are added, missing lines are removed",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("order_id" = Uuid, Path, description = "Order ID"),
    ),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path((tenant_id, order_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    if let Err(rejection) = common::check(&request) {
        return Ok(rejection);
    }
    let order = state
        .services
        .orders
        .update_order(tenant_id, order_id, request)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(order))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{tenant_id}/orders/{order_id}",
    summary = "Delete order",
    description = "Deletes the order and restores the stock it debited",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("order_id" = Uuid, Path, description = "Order ID"),
    ),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path((tenant_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .orders
        .delete_order(tenant_id, order_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/v1/tenants/{tenant_id}/orders/{order_id}/status",
    summary = "Update order status",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("order_id" = Uuid, Path, description = "Order ID"),
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path((tenant_id, order_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state
        .services
        .orders
        .update_status(tenant_id, order_id, &request.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
