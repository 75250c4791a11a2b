use async_trait::async_trait;

use crate::booking::Booking;
use crate::StoreError;

/// Outbound confirmation mail collaborator. Fire-and-forget: callers must not
/// roll back booking or payment state when a notification fails.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_booking_confirmation(&self, booking: &Booking) -> Result<(), StoreError>;
}

/// Notifier that only logs. Stands in for the mail service in tests and
/// local runs.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_booking_confirmation(&self, booking: &Booking) -> Result<(), StoreError> {
        tracing::info!(
            "Booking confirmation for {} ({} {}) would be mailed to customer {}",
            booking.id,
            booking.total_amount,
            booking.currency,
            booking.customer_id
        );
        Ok(())
    }
}
