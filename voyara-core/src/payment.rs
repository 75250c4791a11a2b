use async_trait::async_trait;
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::StoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Succeeded => "SUCCEEDED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUCCEEDED" => Ok(PaymentStatus::Succeeded),
            "FAILED" => Ok(PaymentStatus::Failed),
            "CANCELED" => Ok(PaymentStatus::Canceled),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// One payment-intent attempt against the gateway. The amount is snapshotted
/// from the booking total when the intent is created and never changes
/// afterwards; it is the authoritative value sent to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub intent_id: Option<String>,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Gateway-side intent status, as reported by the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GatewayIntentStatus {
    RequiresPaymentMethod,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
    Failed,
}

impl GatewayIntentStatus {
    /// A resumable intent can still be completed by the client with the
    /// original secret, so a pending local row may be reused instead of
    /// creating a second intent.
    pub fn is_resumable(self) -> bool {
        matches!(
            self,
            GatewayIntentStatus::RequiresPaymentMethod
                | GatewayIntentStatus::RequiresAction
                | GatewayIntentStatus::Processing
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayIntent {
    pub id: String,
    pub status: GatewayIntentStatus,
    pub client_secret: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
}

/// Opaque audit tags attached to every intent for reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct IntentMetadata {
    pub booking_id: Uuid,
    pub customer_id: String,
    pub passenger_count: usize,
}

#[async_trait]
pub trait PaymentGatewayClient: Send + Sync {
    /// Create a payment intent with the provider.
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> Result<GatewayIntent, StoreError>;

    /// Retrieve the current state of an intent.
    async fn retrieve_intent(&self, intent_id: &str) -> Result<GatewayIntent, StoreError>;

    fn provider(&self) -> &str;
}

/// Convert a decimal amount to the gateway's minor unit (cents), rounding
/// half-even. The conversion must be deterministic: 1234.56 maps to exactly
/// 123456. Returns None when the result does not fit an i64.
pub fn to_minor_units(amount: &BigDecimal) -> Option<i64> {
    (amount * BigDecimal::from(100))
        .with_scale_round(0, RoundingMode::HalfEven)
        .to_i64()
}

pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGatewayClient for MockPaymentGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> Result<GatewayIntent, StoreError> {
        // Encode the booking id in the intent id so the mock can "remember" it
        let id = format!("mock_pi_{}", metadata.booking_id.simple());
        tracing::info!(
            "Mock gateway: created intent {} for booking {}",
            id,
            metadata.booking_id
        );
        Ok(GatewayIntent {
            client_secret: Some(format!("{}_secret_{}", id, Uuid::new_v4().simple())),
            id,
            status: GatewayIntentStatus::RequiresPaymentMethod,
            amount_minor,
            currency: currency.to_string(),
        })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<GatewayIntent, StoreError> {
        Ok(GatewayIntent {
            id: intent_id.to_string(),
            status: GatewayIntentStatus::RequiresPaymentMethod,
            client_secret: Some(format!("{}_secret_resumed", intent_id)),
            amount_minor: 0,
            currency: "BRL".to_string(),
        })
    }

    fn provider(&self) -> &str {
        "mockpay"
    }
}
