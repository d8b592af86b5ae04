use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::handlers::common;
use crate::services::tenants::{CreateTenantRequest, TenantResponse, UpdateTenantRequest};
use crate::{errors::ServiceError, ApiResponse, AppState};

pub fn tenants_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tenant))
        .route("/:tenant_id", get(get_tenant).put(update_tenant))
}

/// Register a tenant (cantina)
#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    summary = "Create tenant",
    description = "Register a cantina. Its system Combo category is created alongside.",
    request_body = CreateTenantRequest,
    responses(
        (status = 201, description = "Tenant created", body = ApiResponse<TenantResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 409, description = "Document already registered", body = crate::errors::ErrorResponse),
    ),
    tag = "tenants"
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    Json(request): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TenantResponse>>), ServiceError> {
    if let Err(rejection) = common::check(&request) {
        return Ok(rejection);
    }
    let tenant = state.services.tenants.create_tenant(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(tenant))))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}",
    summary = "Get tenant",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant retrieved", body = ApiResponse<TenantResponse>),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse),
    ),
    tag = "tenants"
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<TenantResponse>>, ServiceError> {
    let tenant = state.services.tenants.get_tenant(tenant_id).await?;
    Ok(Json(ApiResponse::success(tenant)))
}

#[utoipa::path(
    put,
    path = "/api/v1/tenants/{tenant_id}",
    summary = "Update tenant",
    description = "Rename the cantina or change its document and contact details.",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    request_body = UpdateTenantRequest,
    responses(
        (status = 200, description = "Tenant updated", body = ApiResponse<TenantResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Document already registered", body = crate::errors::ErrorResponse),
    ),
    tag = "tenants"
)]
pub async fn update_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<UpdateTenantRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TenantResponse>>), ServiceError> {
    if let Err(rejection) = common::check(&request) {
        return Ok(rejection);
    }
    let tenant = state.services.tenants.update_tenant(tenant_id, request).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(tenant))))
}
