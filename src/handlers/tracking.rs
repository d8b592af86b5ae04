use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::services::orders::TrackingView;
use crate::{errors::ServiceError, ApiResponse, AppState};

/// Public routes; the token is the only credential.
pub fn tracking_routes() -> Router<AppState> {
    Router::new().route("/:tracking_token", get(track_order))
}

#[utoipa::path(
    get,
    path = "/api/v1/track/{tracking_token}",
    summary = "Track an order",
    description = "Read-only order status for the customer's QR code. Only the first name is exposed.",
    params(("tracking_token" = Uuid, Path, description = "Token encoded in the receipt QR code")),
    responses(
        (status = 200, description = "Order status", body = ApiResponse<TrackingView>),
        (status = 404, description = "Unknown token", body = crate::errors::ErrorResponse),
    ),
    tag = "tracking"
)]
pub async fn track_order(
    State(state): State<AppState>,
    Path(tracking_token): Path<Uuid>,
) -> Result<Json<ApiResponse<TrackingView>>, ServiceError> {
    let view = state.services.orders.track(tracking_token).await?;
    Ok(Json(ApiResponse::success(view)))
}
