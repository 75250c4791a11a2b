use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use voyara_core::booking::{
    Booking, BookingFilter, BookingPatch, BookingStatus, BookingView, NewPassenger,
};
use voyara_core::flights::FlightLookup;
use voyara_core::passenger::{PassengerValidator, ValidationRules};
use voyara_core::repository::BookingStore;
use voyara_core::{BookingError, BookingResult};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBooking {
    pub flight_id: Uuid,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub passengers: Vec<NewPassenger>,
    pub payment_preference: Option<String>,
}

/// Owns the booking state machine. Bookings are created here, move only along
/// the legal transition graph, and are never hard-deleted.
pub struct BookingLifecycleManager {
    store: Arc<dyn BookingStore>,
    flights: Arc<dyn FlightLookup>,
    validator: PassengerValidator,
}

impl BookingLifecycleManager {
    pub fn new(
        store: Arc<dyn BookingStore>,
        flights: Arc<dyn FlightLookup>,
        rules: ValidationRules,
    ) -> Self {
        Self {
            store,
            flights,
            validator: PassengerValidator::new(rules),
        }
    }

    /// Validate, persist in PENDING, then move to AWAITING_PAYMENT. Both
    /// writes are durable: PENDING stays observable as a pre-validation
    /// checkpoint in the booking's history even though nothing reads it
    /// between the two writes today.
    pub async fn create(&self, req: CreateBooking, owner: &str) -> BookingResult<BookingView> {
        self.validator.validate(&req.passengers)?;
        if req.total_amount <= BigDecimal::zero() {
            return Err(BookingError::Validation(
                "total amount must be greater than zero".to_string(),
            ));
        }

        self.flights
            .get_flight(req.flight_id)
            .await
            .map_err(BookingError::store)?
            .ok_or(BookingError::NotFound)?;

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            customer_id: owner.to_string(),
            flight_id: req.flight_id,
            total_amount: req.total_amount,
            currency: req.currency,
            status: BookingStatus::Pending,
            notes: String::new(),
            payment_preference: req.payment_preference,
            created_at: now,
            updated_at: now,
        };
        let passengers: Vec<_> = req
            .passengers
            .into_iter()
            .map(|p| p.into_passenger(booking.id))
            .collect();

        self.store
            .create_booking(&booking, &passengers)
            .await
            .map_err(BookingError::store)?;

        let booking = self.transition(booking, BookingStatus::AwaitingPayment).await?;
        info!("Booking {} created for customer {}", booking.id, owner);

        Ok(BookingView {
            booking,
            passengers,
        })
    }

    pub async fn get(&self, id: Uuid, owner: &str) -> BookingResult<BookingView> {
        let booking = self
            .store
            .get_booking(id, owner)
            .await
            .map_err(BookingError::store)?
            .ok_or(BookingError::NotFound)?;
        let passengers = self
            .store
            .list_passengers(id)
            .await
            .map_err(BookingError::store)?;
        Ok(BookingView {
            booking,
            passengers,
        })
    }

    pub async fn list(&self, owner: &str, filter: &BookingFilter) -> BookingResult<Vec<Booking>> {
        self.store
            .list_bookings(owner, filter)
            .await
            .map_err(BookingError::store)
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        owner: &str,
        reason: Option<&str>,
    ) -> BookingResult<Booking> {
        let booking = self
            .store
            .get_booking(id, owner)
            .await
            .map_err(BookingError::store)?
            .ok_or(BookingError::NotFound)?;
        self.cancel_booking(booking, reason).await
    }

    /// Cancellation driven by the gateway (payment-canceled webhook), keyed by
    /// id alone. Re-cancelling an already cancelled booking is a no-op.
    pub async fn cancel_after_gateway(&self, id: Uuid, note: &str) -> BookingResult<Booking> {
        let booking = self
            .store
            .get_booking_by_id(id)
            .await
            .map_err(BookingError::store)?
            .ok_or(BookingError::NotFound)?;
        if booking.status == BookingStatus::Cancelled {
            return Ok(booking);
        }
        self.cancel_booking(booking, Some(note)).await
    }

    /// Finalize a booking after the gateway reports a successful charge.
    /// Only legal from AWAITING_PAYMENT.
    pub async fn confirm_payment(&self, id: Uuid) -> BookingResult<Booking> {
        let booking = self
            .store
            .get_booking_by_id(id)
            .await
            .map_err(BookingError::store)?
            .ok_or(BookingError::NotFound)?;
        self.transition(booking, BookingStatus::Paid).await
    }

    /// Used by the payment coordinator when an intent is created for a booking
    /// still sitting in PENDING.
    pub async fn mark_awaiting_payment(&self, id: Uuid) -> BookingResult<Booking> {
        let booking = self
            .store
            .get_booking_by_id(id)
            .await
            .map_err(BookingError::store)?
            .ok_or(BookingError::NotFound)?;
        if booking.status == BookingStatus::AwaitingPayment {
            return Ok(booking);
        }
        self.transition(booking, BookingStatus::AwaitingPayment).await
    }

    /// Generic field patch. A status in the patch goes through the transition
    /// table before any other field applies.
    pub async fn update(
        &self,
        id: Uuid,
        patch: BookingPatch,
        owner: &str,
    ) -> BookingResult<Booking> {
        let mut booking = self
            .store
            .get_booking(id, owner)
            .await
            .map_err(BookingError::store)?
            .ok_or(BookingError::NotFound)?;

        let from = booking.status;
        if let Some(next) = patch.status {
            if !from.can_transition_to(next) {
                return Err(BookingError::InvalidTransition { from, to: next });
            }
            booking.status = next;
        }
        if let Some(notes) = patch.notes {
            booking.notes = notes;
        }
        if let Some(pref) = patch.payment_preference {
            booking.payment_preference = Some(pref);
        }

        self.write_guarded(booking, from).await
    }

    async fn cancel_booking(
        &self,
        mut booking: Booking,
        reason: Option<&str>,
    ) -> BookingResult<Booking> {
        if booking.status.is_terminal() {
            return Err(BookingError::AlreadyFinal(booking.status));
        }
        if let Some(reason) = reason {
            if !booking.notes.is_empty() {
                booking.notes.push('\n');
            }
            booking.notes.push_str("Cancelled: ");
            booking.notes.push_str(reason);
        }
        let booking = self.transition(booking, BookingStatus::Cancelled).await?;
        info!("Booking {} cancelled", booking.id);
        Ok(booking)
    }

    async fn transition(&self, mut booking: Booking, next: BookingStatus) -> BookingResult<Booking> {
        let from = booking.status;
        if !from.can_transition_to(next) {
            return Err(BookingError::InvalidTransition { from, to: next });
        }
        booking.status = next;
        self.write_guarded(booking, from).await
    }

    async fn write_guarded(
        &self,
        booking: Booking,
        expected: BookingStatus,
    ) -> BookingResult<Booking> {
        let updated = self
            .store
            .update_booking(&booking, expected)
            .await
            .map_err(BookingError::store)?;
        if !updated {
            // Lost a race: report the transition against the fresh status.
            let fresh = self
                .store
                .get_booking_by_id(booking.id)
                .await
                .map_err(BookingError::store)?
                .ok_or(BookingError::NotFound)?;
            return Err(BookingError::InvalidTransition {
                from: fresh.status,
                to: booking.status,
            });
        }
        Ok(booking)
    }
}
