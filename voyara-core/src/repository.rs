use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{Booking, BookingFilter, BookingStatus, Passenger};
use crate::payment::{Payment, PaymentStatus};
use crate::StoreError;

/// Persistence abstraction over booking, passenger and payment records.
///
/// Bookings are never hard-deleted: cancellation is a terminal status, not a
/// row removal. Owner-scoped reads filter by `(id, owner)` so a booking owned
/// by someone else is indistinguishable from a missing one.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persist a booking and its passengers atomically.
    async fn create_booking(
        &self,
        booking: &Booking,
        passengers: &[Passenger],
    ) -> Result<(), StoreError>;

    async fn get_booking(&self, id: Uuid, owner: &str) -> Result<Option<Booking>, StoreError>;

    /// Lookup without the owner filter. Reserved for webhook reconciliation,
    /// which resolves bookings by the gateway's reference, not a user request.
    async fn get_booking_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn list_bookings(
        &self,
        owner: &str,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn list_passengers(&self, booking_id: Uuid) -> Result<Vec<Passenger>, StoreError>;

    /// Persist mutated booking fields (status, notes, payment preference).
    /// The write only lands if the stored status still equals `expected`;
    /// returns false when a concurrent writer got there first.
    async fn update_booking(
        &self,
        booking: &Booking,
        expected: BookingStatus,
    ) -> Result<bool, StoreError>;

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError>;

    async fn find_payment_by_status(
        &self,
        booking_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, StoreError>;

    async fn find_payment_by_intent(&self, intent_id: &str)
        -> Result<Option<Payment>, StoreError>;

    async fn update_payment_status(
        &self,
        intent_id: &str,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;
}
