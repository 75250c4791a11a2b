use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use voyara_core::flights::{Flight, FlightLookup};
use voyara_core::StoreError;

pub struct PgFlightLookup {
    pool: PgPool,
}

impl PgFlightLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    origin: String,
    destination: String,
    departure: DateTime<Utc>,
    fare: BigDecimal,
    currency: String,
}

#[async_trait]
impl FlightLookup for PgFlightLookup {
    async fn get_flight(&self, id: Uuid) -> Result<Option<Flight>, StoreError> {
        let row = sqlx::query_as::<_, FlightRow>(
            "SELECT id, origin, destination, departure, fare, currency FROM flights WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Flight {
            id: r.id,
            origin: r.origin,
            destination: r.destination,
            departure: r.departure,
            fare: r.fare,
            currency: r.currency,
        }))
    }
}
