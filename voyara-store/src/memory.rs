use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use voyara_core::booking::{Booking, BookingFilter, BookingStatus, Passenger};
use voyara_core::payment::{Payment, PaymentStatus};
use voyara_core::repository::BookingStore;
use voyara_core::StoreError;

/// In-memory store used by tests and gateway-less local runs. Mirrors the
/// Postgres implementation's semantics, including the compare-and-set on
/// booking updates and the one-pending-payment-per-booking constraint.
#[derive(Default)]
pub struct MemoryBookingStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    bookings: HashMap<Uuid, Booking>,
    passengers: HashMap<Uuid, Vec<Passenger>>,
    payments: Vec<Payment>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn create_booking(
        &self,
        booking: &Booking,
        passengers: &[Passenger],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.bookings.contains_key(&booking.id) {
            return Err(format!("duplicate booking id {}", booking.id).into());
        }
        inner.bookings.insert(booking.id, booking.clone());
        inner.passengers.insert(booking.id, passengers.to_vec());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid, owner: &str) -> Result<Option<Booking>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .bookings
            .get(&id)
            .filter(|b| b.customer_id == owner)
            .cloned())
    }

    async fn get_booking_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.bookings.get(&id).cloned())
    }

    async fn list_bookings(
        &self,
        owner: &str,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.customer_id == owner)
            .filter(|b| filter.status.is_none_or(|s| b.status == s))
            .filter(|b| filter.flight_id.is_none_or(|f| b.flight_id == f))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = filter.offset() as usize;
        let limit = filter.limit_or_default() as usize;
        Ok(bookings.into_iter().skip(offset).take(limit).collect())
    }

    async fn list_passengers(&self, booking_id: Uuid) -> Result<Vec<Passenger>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.passengers.get(&booking_id).cloned().unwrap_or_default())
    }

    async fn update_booking(
        &self,
        booking: &Booking,
        expected: BookingStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.bookings.get_mut(&booking.id) {
            Some(stored) if stored.status == expected => {
                let mut updated = booking.clone();
                updated.updated_at = Utc::now();
                *stored = updated;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if payment.status == PaymentStatus::Pending
            && inner
                .payments
                .iter()
                .any(|p| p.booking_id == payment.booking_id && p.status == PaymentStatus::Pending)
        {
            return Err(format!(
                "booking {} already has a pending payment",
                payment.booking_id
            )
            .into());
        }
        inner.payments.push(payment.clone());
        Ok(())
    }

    async fn find_payment_by_status(
        &self,
        booking_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .iter()
            .filter(|p| p.booking_id == booking_id && p.status == status)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn find_payment_by_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .iter()
            .find(|p| p.intent_id.as_deref() == Some(intent_id))
            .cloned())
    }

    async fn update_payment_status(
        &self,
        intent_id: &str,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for payment in inner
            .payments
            .iter_mut()
            .filter(|p| p.intent_id.as_deref() == Some(intent_id))
        {
            payment.status = status;
            if paid_at.is_some() {
                payment.paid_at = paid_at;
            }
        }
        Ok(())
    }
}
