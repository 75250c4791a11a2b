use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payment", post(handle_payment_webhook))
}

/// Raw body on purpose: the signature covers the exact bytes the provider
/// sent, so the payload must not be deserialized before verification.
async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::ValidationError("Invalid webhook signature".to_string()))?;

    state.webhooks.handle(&body, signature).await?;

    Ok(Json(json!({ "received": true })))
}
