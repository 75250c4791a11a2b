use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub fare: BigDecimal,
    pub currency: String,
}

/// Read-only flight lookup by internal id. Search, availability and pricing
/// live elsewhere; the booking subsystem only needs existence checks.
#[async_trait]
pub trait FlightLookup: Send + Sync {
    async fn get_flight(&self, id: Uuid) -> Result<Option<Flight>, StoreError>;
}

/// Lookup that accepts every flight id. Used by tests and gateway-less local
/// runs where the flight catalog is not wired up.
pub struct OpenFlightLookup;

#[async_trait]
impl FlightLookup for OpenFlightLookup {
    async fn get_flight(&self, id: Uuid) -> Result<Option<Flight>, StoreError> {
        Ok(Some(Flight {
            id,
            origin: "GRU".to_string(),
            destination: "GIG".to_string(),
            departure: Utc::now(),
            fare: BigDecimal::from(0),
            currency: "BRL".to_string(),
        }))
    }
}
