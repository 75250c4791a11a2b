use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::CustomerClaims;
use crate::state::AppState;
use voyara_booking::CreateBooking;
use voyara_core::booking::{Booking, BookingFilter, BookingPatch, BookingStatus, BookingView};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route(
            "/v1/bookings/{id}",
            get(get_booking).patch(patch_booking).delete(cancel_booking),
        )
}

#[derive(Debug, Deserialize)]
struct ListBookingsQuery {
    status: Option<BookingStatus>,
    flight_id: Option<Uuid>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CancelBookingRequest {
    reason: Option<String>,
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<CreateBooking>,
) -> Result<(StatusCode, Json<BookingView>), AppError> {
    let view = state.lifecycle.create(req, &claims.sub).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    let view = state.lifecycle.get(id, &claims.sub).await?;
    Ok(Json(view))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let filter = BookingFilter {
        status: query.status,
        flight_id: query.flight_id,
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(0),
    };
    let bookings = state.lifecycle.list(&claims.sub, &filter).await?;
    Ok(Json(bookings))
}

async fn patch_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(id): Path<Uuid>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.lifecycle.update(id, patch, &claims.sub).await?;
    Ok(Json(booking))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelBookingRequest>>,
) -> Result<Json<Booking>, AppError> {
    let reason = body.and_then(|Json(req)| req.reason);
    let booking = state
        .lifecycle
        .cancel(id, &claims.sub, reason.as_deref())
        .await?;
    Ok(Json(booking))
}
