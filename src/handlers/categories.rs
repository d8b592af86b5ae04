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

use crate::handlers::common;
use crate::services::categories::{CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest};
use crate::{errors::ServiceError, ApiResponse, AppState};

pub fn categories_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:category_id", put(update_category).delete(delete_category))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryListParams {
    /// Include deactivated categories
    #[serde(default)]
    pub include_inactive: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/categories",
    summary = "List categories",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        CategoryListParams,
    ),
    responses(
        (status = 200, description = "Categories retrieved", body = ApiResponse<Vec<CategoryResponse>>),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Query(params): Query<CategoryListParams>,
) -> Result<Json<ApiResponse<Vec<CategoryResponse>>>, ServiceError> {
    let categories = state
        .services
        .categories
        .list_categories(tenant_id, params.include_inactive)
        .await?;
    Ok(Json(ApiResponse::success(categories)))
}

#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/categories",
    summary = "Create category",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already used", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponse>>), ServiceError> {
    if let Err(rejection) = common::check(&request) {
        return Ok(rejection);
    }
    let category = state
        .services
        .categories
        .create_category(tenant_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(category))))
}

#[utoipa::path(
    put,
    path = "/api/v1/tenants/{tenant_id}/categories/{category_id}",
    summary = "Update category",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("category_id" = Uuid, Path, description = "Category ID"),
    ),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Invalid request or system category", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path((tenant_id, category_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponse>>), ServiceError> {
    if let Err(rejection) = common::check(&request) {
        return Ok(rejection);
    }
    let category = state
        .services
        .categories
        .update_category(tenant_id, category_id, request)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(category))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{tenant_id}/categories/{category_id}",
    summary = "Delete category",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("category_id" = Uuid, Path, description = "Category ID"),
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 400, description = "System category", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Category still has products", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path((tenant_id, category_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .categories
        .delete_category(tenant_id, category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
