use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use voyara_core::booking::{Booking, BookingFilter, BookingStatus, Passenger};
use voyara_core::payment::{Payment, PaymentStatus};
use voyara_core::repository::BookingStore;
use voyara_core::StoreError;

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    customer_id: String,
    flight_id: Uuid,
    total_amount: BigDecimal,
    currency: String,
    status: String,
    notes: String,
    payment_preference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_domain(self) -> Result<Booking, StoreError> {
        Ok(Booking {
            id: self.id,
            customer_id: self.customer_id,
            flight_id: self.flight_id,
            total_amount: self.total_amount,
            currency: self.currency,
            status: self.status.parse::<BookingStatus>()?,
            notes: self.notes,
            payment_preference: self.payment_preference,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PassengerRow {
    id: Uuid,
    booking_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    document: String,
    birth_date: NaiveDate,
}

impl From<PassengerRow> for Passenger {
    fn from(row: PassengerRow) -> Self {
        Passenger {
            id: row.id,
            booking_id: row.booking_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            document: row.document,
            birth_date: row.birth_date,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    intent_id: Option<String>,
    amount: BigDecimal,
    currency: String,
    status: String,
    provider: String,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    fn into_domain(self) -> Result<Payment, StoreError> {
        Ok(Payment {
            id: self.id,
            booking_id: self.booking_id,
            intent_id: self.intent_id,
            amount: self.amount,
            currency: self.currency,
            status: self.status.parse::<PaymentStatus>()?,
            provider: self.provider,
            created_at: self.created_at,
            paid_at: self.paid_at,
        })
    }
}

const SELECT_BOOKING: &str = "SELECT id, customer_id, flight_id, total_amount, currency, status, \
     notes, payment_preference, created_at, updated_at FROM bookings";

const SELECT_PAYMENT: &str = "SELECT id, booking_id, intent_id, amount, currency, status, \
     provider, created_at, paid_at FROM payments";

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn create_booking(
        &self,
        booking: &Booking,
        passengers: &[Passenger],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bookings (id, customer_id, flight_id, total_amount, currency, status, notes, payment_preference, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.customer_id)
        .bind(booking.flight_id)
        .bind(&booking.total_amount)
        .bind(&booking.currency)
        .bind(booking.status.as_str())
        .bind(&booking.notes)
        .bind(&booking.payment_preference)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await?;

        for passenger in passengers {
            sqlx::query(
                r#"
                INSERT INTO passengers (id, booking_id, first_name, last_name, email, phone, document, birth_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(passenger.id)
            .bind(passenger.booking_id)
            .bind(&passenger.first_name)
            .bind(&passenger.last_name)
            .bind(&passenger.email)
            .bind(&passenger.phone)
            .bind(&passenger.document)
            .bind(passenger.birth_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_booking(&self, id: Uuid, owner: &str) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "{} WHERE id = $1 AND customer_id = $2",
            SELECT_BOOKING
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        row.map(BookingRow::into_domain).transpose()
    }

    async fn get_booking_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("{} WHERE id = $1", SELECT_BOOKING))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(BookingRow::into_domain).transpose()
    }

    async fn list_bookings(
        &self,
        owner: &str,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            {} WHERE customer_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR flight_id = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            SELECT_BOOKING
        ))
        .bind(owner)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.flight_id)
        .bind(i64::from(filter.limit_or_default()))
        .bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookingRow::into_domain).collect()
    }

    async fn list_passengers(&self, booking_id: Uuid) -> Result<Vec<Passenger>, StoreError> {
        let rows = sqlx::query_as::<_, PassengerRow>(
            "SELECT id, booking_id, first_name, last_name, email, phone, document, birth_date \
             FROM passengers WHERE booking_id = $1 ORDER BY id",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Passenger::from).collect())
    }

    async fn update_booking(
        &self,
        booking: &Booking,
        expected: BookingStatus,
    ) -> Result<bool, StoreError> {
        // Compare-and-set on the status column: the transition check in the
        // lifecycle manager was made against a read, and this guard rejects
        // the write if another request moved the booking in between.
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $2, notes = $3, payment_preference = $4, updated_at = $5
            WHERE id = $1 AND status = $6
            "#,
        )
        .bind(booking.id)
        .bind(booking.status.as_str())
        .bind(&booking.notes)
        .bind(&booking.payment_preference)
        .bind(Utc::now())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        // A partial unique index on (booking_id) WHERE status = 'PENDING'
        // backstops the coordinator's lock: a second pending row for the same
        // booking fails here instead of reaching the gateway twice.
        sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, intent_id, amount, currency, status, provider, created_at, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(&payment.intent_id)
        .bind(&payment.amount)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.provider)
        .bind(payment.created_at)
        .bind(payment.paid_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_payment_by_status(
        &self,
        booking_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "{} WHERE booking_id = $1 AND status = $2 ORDER BY created_at DESC LIMIT 1",
            SELECT_PAYMENT
        ))
        .bind(booking_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRow::into_domain).transpose()
    }

    async fn find_payment_by_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "{} WHERE intent_id = $1",
            SELECT_PAYMENT
        ))
        .bind(intent_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRow::into_domain).transpose()
    }

    async fn update_payment_status(
        &self,
        intent_id: &str,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE payments SET status = $2, paid_at = COALESCE($3, paid_at) WHERE intent_id = $1",
        )
        .bind(intent_id)
        .bind(status.as_str())
        .bind(paid_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
