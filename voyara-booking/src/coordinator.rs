use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::lifecycle::BookingLifecycleManager;
use voyara_core::booking::BookingStatus;
use voyara_core::lock::LockManager;
use voyara_core::payment::{
    to_minor_units, GatewayIntent, IntentMetadata, Payment, PaymentGatewayClient, PaymentStatus,
};
use voyara_core::repository::BookingStore;
use voyara_core::{BookingError, BookingResult};

/// What the client gets back: an opaque secret to complete the charge, plus
/// the server-authoritative amount for display. The client never supplies or
/// overrides the amount at any step.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentOutcome {
    pub client_secret: String,
    pub amount: BigDecimal,
    pub currency: String,
}

/// Idempotent creation of gateway payment intents, at most one active per
/// booking. The check-then-create sequence runs under a per-booking lock;
/// the store's partial unique index is the backstop.
pub struct PaymentIntentCoordinator {
    store: Arc<dyn BookingStore>,
    gateway: Arc<dyn PaymentGatewayClient>,
    locks: Arc<dyn LockManager>,
    lifecycle: Arc<BookingLifecycleManager>,
    gateway_timeout: Duration,
}

impl PaymentIntentCoordinator {
    pub fn new(
        store: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGatewayClient>,
        locks: Arc<dyn LockManager>,
        lifecycle: Arc<BookingLifecycleManager>,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            locks,
            lifecycle,
            gateway_timeout,
        }
    }

    pub async fn create_payment_intent(
        &self,
        booking_id: Uuid,
        requester: &str,
    ) -> BookingResult<PaymentIntentOutcome> {
        let lease = self
            .locks
            .acquire(&format!("payment:{}", booking_id))
            .await
            .map_err(BookingError::store)?;

        let result = self.create_intent_locked(booking_id, requester).await;

        if let Err(err) = lease.release().await {
            warn!("Failed to release payment lock for {}: {}", booking_id, err);
        }
        result
    }

    async fn create_intent_locked(
        &self,
        booking_id: Uuid,
        requester: &str,
    ) -> BookingResult<PaymentIntentOutcome> {
        // 1. Ownership-filtered lookup: a foreign booking reads as missing.
        let booking = self
            .store
            .get_booking(booking_id, requester)
            .await
            .map_err(BookingError::store)?
            .ok_or(BookingError::NotFound)?;

        // 2. AWAITING_PAYMENT stays payable so the user can re-open the
        //    payment form after an abandoned attempt.
        if !matches!(
            booking.status,
            BookingStatus::Pending | BookingStatus::AwaitingPayment
        ) {
            return Err(BookingError::InvalidState(booking.status));
        }

        // 3. A completed payment is a hard stop.
        if self
            .store
            .find_payment_by_status(booking_id, PaymentStatus::Succeeded)
            .await
            .map_err(BookingError::store)?
            .is_some()
        {
            return Err(BookingError::Conflict);
        }

        // 4. Defensive re-checks, before any write. Creation already
        //    guarantees these, but the coordinator does not trust another
        //    code path's invariants.
        if booking.total_amount <= BigDecimal::zero() {
            return Err(BookingError::InvalidAmount);
        }
        let passengers = self
            .store
            .list_passengers(booking_id)
            .await
            .map_err(BookingError::store)?;
        if passengers.is_empty() {
            return Err(BookingError::NoPassengers);
        }

        // 5. Reuse a still-resumable pending intent rather than creating a
        //    second one.
        if let Some(pending) = self
            .store
            .find_payment_by_status(booking_id, PaymentStatus::Pending)
            .await
            .map_err(BookingError::store)?
        {
            let Some(intent_id) = pending.intent_id.clone() else {
                // Rows are only written after the gateway returns an id.
                return Err(BookingError::Store(format!(
                    "pending payment {} has no gateway intent id",
                    pending.id
                )));
            };

            let intent = self.retrieve_with_timeout(&intent_id).await?;
            if intent.status.is_resumable() {
                if let Some(client_secret) = intent.client_secret {
                    info!(
                        "Reusing pending intent {} for booking {}",
                        intent_id, booking_id
                    );
                    return Ok(PaymentIntentOutcome {
                        client_secret,
                        amount: pending.amount,
                        currency: pending.currency,
                    });
                }
            }

            // No longer resumable: retire the row so the one-pending-payment
            // constraint admits a fresh attempt.
            self.store
                .update_payment_status(&intent_id, PaymentStatus::Canceled, None)
                .await
                .map_err(BookingError::store)?;
        }

        // 6. Deterministic minor-unit conversion (half-even).
        let amount_minor =
            to_minor_units(&booking.total_amount).ok_or(BookingError::InvalidAmount)?;

        // 7. One outbound gateway call, tagged for reconciliation.
        let metadata = IntentMetadata {
            booking_id,
            customer_id: requester.to_string(),
            passenger_count: passengers.len(),
        };
        let intent = self
            .create_with_timeout(amount_minor, &booking.currency, &metadata)
            .await?;

        // 8. Snapshot the amount; it is immutable from here on.
        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id,
            intent_id: Some(intent.id.clone()),
            amount: booking.total_amount.clone(),
            currency: booking.currency.clone(),
            status: PaymentStatus::Pending,
            provider: self.gateway.provider().to_string(),
            created_at: Utc::now(),
            paid_at: None,
        };
        self.store
            .insert_payment(&payment)
            .await
            .map_err(BookingError::store)?;

        // 9. First intent for a PENDING booking moves it to AWAITING_PAYMENT.
        if booking.status == BookingStatus::Pending {
            self.lifecycle.mark_awaiting_payment(booking_id).await?;
        }

        info!(
            "Created intent {} for booking {} ({} minor units)",
            intent.id, booking_id, amount_minor
        );

        let client_secret = intent
            .client_secret
            .ok_or_else(|| BookingError::Gateway("gateway returned no client secret".to_string()))?;
        Ok(PaymentIntentOutcome {
            client_secret,
            amount: payment.amount,
            currency: payment.currency,
        })
    }

    async fn create_with_timeout(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> BookingResult<GatewayIntent> {
        match tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.create_intent(amount_minor, currency, metadata),
        )
        .await
        {
            Ok(Ok(intent)) => Ok(intent),
            Ok(Err(err)) => Err(BookingError::gateway(err)),
            // The intent may still have been created gateway-side; the next
            // call re-checks pending rows instead of blindly retrying.
            Err(_) => Err(BookingError::Gateway(
                "gateway request timed out".to_string(),
            )),
        }
    }

    async fn retrieve_with_timeout(&self, intent_id: &str) -> BookingResult<GatewayIntent> {
        match tokio::time::timeout(self.gateway_timeout, self.gateway.retrieve_intent(intent_id))
            .await
        {
            Ok(Ok(intent)) => Ok(intent),
            Ok(Err(err)) => Err(BookingError::gateway(err)),
            Err(_) => Err(BookingError::Gateway(
                "gateway request timed out".to_string(),
            )),
        }
    }
}
