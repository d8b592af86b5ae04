use crate::ApiResponse;
use axum::{http::StatusCode, Json};
use validator::{Validate, ValidationErrors};

/// Flattens validator output into `field: message` strings.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            let field = field.to_string();
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect();
    messages.sort();
    messages
}

/// Runs the derive validator and, on failure, builds the 400 response handlers return as-is.
pub fn check<T: Validate, R>(request: &T) -> Result<(), (StatusCode, Json<ApiResponse<R>>)> {
    request.validate().map_err(|errors| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::validation_errors(validation_messages(&errors))),
        )
    })
}

pub fn total_pages(total: u64, limit: u64) -> u64 {
    if total == 0 || limit == 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}
