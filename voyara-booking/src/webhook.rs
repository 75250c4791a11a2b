use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, warn};

use crate::lifecycle::BookingLifecycleManager;
use voyara_core::booking::BookingStatus;
use voyara_core::notify::Notifier;
use voyara_core::payment::PaymentStatus;
use voyara_core::repository::BookingStore;
use voyara_core::{BookingError, BookingResult};

type HmacSha256 = Hmac<Sha256>;

/// Provider event envelope, Stripe-style.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: IntentObject,
}

#[derive(Debug, Deserialize)]
pub struct IntentObject {
    pub id: String,
    pub status: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// HMAC-SHA256 of the raw body, hex-encoded. This is the signature the
/// provider is expected to put in the webhook header.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Asynchronous reconciliation of gateway-reported payment outcomes. The
/// gateway delivers at least once; every path here is safe to repeat because
/// updates are keyed by the gateway intent id and transitions to an
/// already-reached state are no-ops.
pub struct PaymentWebhookProcessor {
    store: Arc<dyn BookingStore>,
    lifecycle: Arc<BookingLifecycleManager>,
    notifier: Arc<dyn Notifier>,
    webhook_secret: String,
}

impl PaymentWebhookProcessor {
    pub fn new(
        store: Arc<dyn BookingStore>,
        lifecycle: Arc<BookingLifecycleManager>,
        notifier: Arc<dyn Notifier>,
        webhook_secret: String,
    ) -> Self {
        Self {
            store,
            lifecycle,
            notifier,
            webhook_secret,
        }
    }

    pub async fn handle(&self, raw_body: &[u8], signature: &str) -> BookingResult<()> {
        if !self.verify(raw_body, signature) {
            return Err(BookingError::Signature);
        }

        let event: WebhookEvent = serde_json::from_slice(raw_body)
            .map_err(|_| BookingError::Validation("malformed webhook payload".to_string()))?;
        let intent_id = event.data.object.id.as_str();
        info!("Received webhook {} ({})", event.id, event.event_type);

        match event.event_type.as_str() {
            "payment_intent.succeeded" => self.apply(intent_id, PaymentStatus::Succeeded).await,
            "payment_intent.payment_failed" => self.apply(intent_id, PaymentStatus::Failed).await,
            "payment_intent.canceled" => self.apply(intent_id, PaymentStatus::Canceled).await,
            other => {
                // Acknowledge so the gateway does not retry events we ignore.
                info!("Ignoring webhook event type {}", other);
                Ok(())
            }
        }
    }

    fn verify(&self, body: &[u8], signature: &str) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(self.webhook_secret.as_bytes()) else {
            return false;
        };
        mac.update(body);
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        mac.verify_slice(&expected).is_ok()
    }

    async fn apply(&self, intent_id: &str, target: PaymentStatus) -> BookingResult<()> {
        let Some(payment) = self
            .store
            .find_payment_by_intent(intent_id)
            .await
            .map_err(BookingError::store)?
        else {
            warn!("Webhook for unknown intent {}, acknowledging", intent_id);
            return Ok(());
        };

        if payment.status == target {
            info!("Intent {} already {}, redelivery no-op", intent_id, target);
            return Ok(());
        }
        if payment.status != PaymentStatus::Pending {
            warn!(
                "Intent {} is {} but gateway reported {}, ignoring",
                intent_id, payment.status, target
            );
            return Ok(());
        }

        match target {
            PaymentStatus::Succeeded => {
                self.store
                    .update_payment_status(intent_id, PaymentStatus::Succeeded, Some(Utc::now()))
                    .await
                    .map_err(BookingError::store)?;
                match self.lifecycle.confirm_payment(payment.booking_id).await {
                    Ok(booking) => {
                        // Best effort: a failed mail never rolls back payment state.
                        if let Err(err) = self.notifier.send_booking_confirmation(&booking).await {
                            warn!(
                                "Confirmation mail for booking {} failed: {}",
                                booking.id, err
                            );
                        }
                    }
                    Err(BookingError::InvalidTransition {
                        from: BookingStatus::Paid,
                        ..
                    }) => {
                        // Already reconciled by an earlier delivery.
                    }
                    Err(err) => return Err(err),
                }
            }
            PaymentStatus::Failed => {
                // Booking stays AWAITING_PAYMENT so the customer can retry
                // through the coordinator's reuse/new-intent path.
                self.store
                    .update_payment_status(intent_id, PaymentStatus::Failed, None)
                    .await
                    .map_err(BookingError::store)?;
            }
            PaymentStatus::Canceled => {
                self.store
                    .update_payment_status(intent_id, PaymentStatus::Canceled, None)
                    .await
                    .map_err(BookingError::store)?;
                match self
                    .lifecycle
                    .cancel_after_gateway(payment.booking_id, "payment canceled by gateway")
                    .await
                {
                    Ok(_) => {}
                    Err(BookingError::AlreadyFinal(status)) => {
                        warn!(
                            "Cancel webhook for booking {} in terminal status {}, ignoring",
                            payment.booking_id, status
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
            PaymentStatus::Pending => {
                // Gateways never report back to pending.
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use uuid::Uuid;
    use voyara_core::booking::{Booking, NewPassenger};
    use voyara_core::flights::OpenFlightLookup;
    use voyara_core::passenger::ValidationRules;
    use voyara_core::payment::Payment;
    use voyara_core::StoreError;
    use voyara_store::MemoryBookingStore;

    const SECRET: &str = "whsec_test";

    struct CollectingNotifier {
        sent: AtomicUsize,
        fail: AtomicBool,
    }

    impl CollectingNotifier {
        fn new() -> Self {
            Self {
                sent: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Notifier for CollectingNotifier {
        async fn send_booking_confirmation(&self, _booking: &Booking) -> Result<(), StoreError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err("smtp down".into());
            }
            Ok(())
        }
    }

    struct Harness {
        store: Arc<MemoryBookingStore>,
        notifier: Arc<CollectingNotifier>,
        processor: PaymentWebhookProcessor,
        booking_id: Uuid,
    }

    async fn harness() -> Harness {
        let store = Arc::new(MemoryBookingStore::new());
        let lifecycle = Arc::new(BookingLifecycleManager::new(
            store.clone(),
            Arc::new(OpenFlightLookup),
            ValidationRules::default(),
        ));
        let notifier = Arc::new(CollectingNotifier::new());
        let processor = PaymentWebhookProcessor::new(
            store.clone(),
            lifecycle.clone(),
            notifier.clone(),
            SECRET.to_string(),
        );

        let view = lifecycle
            .create(
                crate::lifecycle::CreateBooking {
                    flight_id: Uuid::new_v4(),
                    total_amount: BigDecimal::from_str("1234.56").unwrap(),
                    currency: "BRL".to_string(),
                    passengers: vec![NewPassenger {
                        first_name: "Ana".to_string(),
                        last_name: "Souza".to_string(),
                        email: "ana@example.com".to_string(),
                        phone: "+55 11 91234-5678".to_string(),
                        document: "123.456.789-09".to_string(),
                        birth_date: NaiveDate::from_ymd_opt(1990, 5, 10).unwrap(),
                    }],
                    payment_preference: None,
                },
                "customer-a",
            )
            .await
            .unwrap();
        let booking_id = view.booking.id;

        store
            .insert_payment(&Payment {
                id: Uuid::new_v4(),
                booking_id,
                intent_id: Some("pi_1".to_string()),
                amount: BigDecimal::from_str("1234.56").unwrap(),
                currency: "BRL".to_string(),
                status: PaymentStatus::Pending,
                provider: "mockpay".to_string(),
                created_at: Utc::now(),
                paid_at: None,
            })
            .await
            .unwrap();

        Harness {
            store,
            notifier,
            processor,
            booking_id,
        }
    }

    fn event(event_type: &str, intent_id: &str) -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": event_type,
            "data": { "object": { "id": intent_id, "status": "reported" } }
        })
        .to_string()
        .into_bytes()
    }

    async fn deliver(h: &Harness, event_type: &str, intent_id: &str) -> BookingResult<()> {
        let body = event(event_type, intent_id);
        let signature = sign(SECRET, &body);
        h.processor.handle(&body, &signature).await
    }

    #[tokio::test]
    async fn rejects_bad_signature_without_state_change() {
        let h = harness().await;
        let body = event("payment_intent.succeeded", "pi_1");

        let err = h.processor.handle(&body, "deadbeef").await.unwrap_err();
        assert!(matches!(err, BookingError::Signature));

        let payment = h.store.find_payment_by_intent("pi_1").await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn rejects_malformed_payload() {
        let h = harness().await;
        let body = b"not json".to_vec();
        let signature = sign(SECRET, &body);
        let err = h.processor.handle(&body, &signature).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    #[tokio::test]
    async fn succeeded_pays_booking_and_notifies_once() {
        let h = harness().await;
        deliver(&h, "payment_intent.succeeded", "pi_1").await.unwrap();

        let payment = h.store.find_payment_by_intent("pi_1").await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert!(payment.paid_at.is_some());

        let booking = h
            .store
            .get_booking_by_id(h.booking_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Paid);
        assert_eq!(h.notifier.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn redelivered_success_is_idempotent() {
        let h = harness().await;
        deliver(&h, "payment_intent.succeeded", "pi_1").await.unwrap();
        deliver(&h, "payment_intent.succeeded", "pi_1").await.unwrap();

        let booking = h
            .store
            .get_booking_by_id(h.booking_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Paid);
        // Exactly one notification attempt across both deliveries.
        assert_eq!(h.notifier.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_leaves_booking_open_for_retry() {
        let h = harness().await;
        deliver(&h, "payment_intent.payment_failed", "pi_1")
            .await
            .unwrap();

        let payment = h.store.find_payment_by_intent("pi_1").await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);

        let booking = h
            .store
            .get_booking_by_id(h.booking_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(booking.status, BookingStatus::AwaitingPayment);
        assert_eq!(h.notifier.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn canceled_cancels_booking() {
        let h = harness().await;
        deliver(&h, "payment_intent.canceled", "pi_1").await.unwrap();

        let payment = h.store.find_payment_by_intent("pi_1").await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Canceled);

        let booking = h
            .store
            .get_booking_by_id(h.booking_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn unknown_event_and_intent_are_acknowledged() {
        let h = harness().await;
        deliver(&h, "charge.refund.updated", "pi_1").await.unwrap();
        deliver(&h, "payment_intent.succeeded", "pi_unknown")
            .await
            .unwrap();

        let booking = h
            .store
            .get_booking_by_id(h.booking_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(booking.status, BookingStatus::AwaitingPayment);
    }

    #[tokio::test]
    async fn mail_failure_does_not_roll_back_payment() {
        let h = harness().await;
        h.notifier.fail.store(true, Ordering::SeqCst);

        deliver(&h, "payment_intent.succeeded", "pi_1").await.unwrap();

        let booking = h
            .store
            .get_booking_by_id(h.booking_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Paid);
        let payment = h.store.find_payment_by_intent("pi_1").await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
    }
}
