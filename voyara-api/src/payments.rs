use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::CustomerClaims;
use crate::state::AppState;
use voyara_booking::PaymentIntentOutcome;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/payments/intent", post(create_payment_intent))
}

/// The body carries the booking id and nothing else: the chargeable amount is
/// server-side authority, never accepted from the client.
#[derive(Debug, Deserialize)]
struct CreateIntentRequest {
    booking_id: Uuid,
}

async fn create_payment_intent(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<CreateIntentRequest>,
) -> Result<(StatusCode, Json<PaymentIntentOutcome>), AppError> {
    let outcome = state
        .payments
        .create_payment_intent(req.booking_id, &claims.sub)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
