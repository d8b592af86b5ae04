use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::handlers::common;
use crate::services::combos::{
    ComboConfig, ComboOptions, ComboSelection, ComboSelectionRequest, SaveComboRequest,
};
use crate::services::products::ProductResponse;
use crate::{errors::ServiceError, ApiResponse, AppState};

/// Combo routes, merged under `/products`.
pub fn combo_routes() -> Router<AppState> {
    Router::new()
        .route("/:product_id/combo", get(get_combo).put(save_combo))
        .route("/:product_id/combo/options", get(combo_options))
        .route("/:product_id/combo/selection", post(validate_selection))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/products/{product_id}/combo",
    summary = "Load combo configuration",
    description = "Returns the product's slots. A combo record is created on first load.",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("product_id" = Uuid, Path, description = "Combo product ID"),
    ),
    responses(
        (status = 200, description = "Combo configuration", body = ApiResponse<ComboConfig>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "combos"
)]
pub async fn get_combo(
    State(state): State<AppState>,
    Path((tenant_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<ComboConfig>>, ServiceError> {
    let config = state
        .services
        .combos
        .load_config(tenant_id, product_id)
        .await?;
    Ok(Json(ApiResponse::success(config)))
}

#[utoipa::path(
    put,
    path = "/api/v1/tenants/{tenant_id}/products/{product_id}/combo",
    summary = "Replace combo configuration",
    description = "Destructively replaces every slot. The combo is sellable only when each slot lists at least one product.",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("product_id" = Uuid, Path, description = "Combo product ID"),
    ),
    request_body = SaveComboRequest,
    responses(
        (status = 200, description = "Combo saved", body = ApiResponse<ComboConfig>),
        (status = 400, description = "Invalid slot or product", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "combos"
)]
pub async fn save_combo(
    State(state): State<AppState>,
    Path((tenant_id, product_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SaveComboRequest>,
) -> Result<Json<ApiResponse<ComboConfig>>, ServiceError> {
    let config = state
        .services
        .combos
        .save_config(tenant_id, product_id, request)
        .await?;
    Ok(Json(ApiResponse::success(config)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/products/{product_id}/combo/options",
    summary = "Combo options for the POS",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("product_id" = Uuid, Path, description = "Combo product ID"),
    ),
    responses(
        (status = 200, description = "Slots with selectable products", body = ApiResponse<ComboOptions>),
        (status = 400, description = "Product is not a sellable combo", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "combos"
)]
pub async fn combo_options(
    State(state): State<AppState>,
    Path((tenant_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<ComboOptions>>, ServiceError> {
    let options = state.services.combos.options(tenant_id, product_id).await?;
    Ok(Json(ApiResponse::success(options)))
}

#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/products/{product_id}/combo/selection",
    summary = "Validate a combo selection",
    description = "Checks one pick per slot against the configuration and current stock",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("product_id" = Uuid, Path, description = "Combo product ID"),
    ),
    request_body = ComboSelectionRequest,
    responses(
        (status = 200, description = "Selection is valid", body = ApiResponse<ComboSelection>),
        (status = 400, description = "Invalid selection", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse),
    ),
    tag = "combos"
)]
pub async fn validate_selection(
    State(state): State<AppState>,
    Path((tenant_id, product_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ComboSelectionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ComboSelection>>), ServiceError> {
    if let Err(rejection) = common::check(&request) {
        return Ok(rejection);
    }
    let selection = state
        .services
        .combos
        .validate_selection(tenant_id, product_id, request)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(selection))))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/products/combo-eligible",
    summary = "Products that can fill combo slots",
    description = "Products that are not combos themselves, unavailable ones included (see `is_active`)",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Eligible products", body = ApiResponse<Vec<ProductResponse>>),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse),
    ),
    tag = "combos"
)]
pub async fn eligible_products(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, ServiceError> {
    let products = state.services.combos.eligible_products(tenant_id).await?;
    Ok(Json(ApiResponse::success(products)))
}
