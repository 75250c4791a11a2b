use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    AwaitingPayment,
    Paid,
    Cancelled,
}

impl BookingStatus {
    /// The legal transition graph. Adding a variant forces this match and
    /// every other site switching on the status to be revisited.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        match (self, next) {
            (BookingStatus::Pending, BookingStatus::AwaitingPayment) => true,
            (BookingStatus::Pending, BookingStatus::Cancelled) => true,
            (BookingStatus::AwaitingPayment, BookingStatus::Paid) => true,
            (BookingStatus::AwaitingPayment, BookingStatus::Cancelled) => true,
            (BookingStatus::Pending, _) => false,
            (BookingStatus::AwaitingPayment, _) => false,
            // Terminal states have no outgoing edges.
            (BookingStatus::Paid, _) => false,
            (BookingStatus::Cancelled, _) => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Paid | BookingStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::AwaitingPayment => "AWAITING_PAYMENT",
            BookingStatus::Paid => "PAID",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "AWAITING_PAYMENT" => Ok(BookingStatus::AwaitingPayment),
            "PAID" => Ok(BookingStatus::Paid),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: String,
    pub flight_id: Uuid,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub status: BookingStatus,
    pub notes: String,
    pub payment_preference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub document: String,
    pub birth_date: NaiveDate,
}

/// Passenger data as submitted by the client, before it is attached to a
/// booking. Validated by `PassengerValidator` prior to any persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPassenger {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub document: String,
    pub birth_date: NaiveDate,
}

impl NewPassenger {
    pub fn into_passenger(self, booking_id: Uuid) -> Passenger {
        Passenger {
            id: Uuid::new_v4(),
            booking_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            document: self.document,
            birth_date: self.birth_date,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPatch {
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
    pub payment_preference: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub flight_id: Option<Uuid>,
    pub page: u32,
    pub limit: u32,
}

impl BookingFilter {
    pub fn limit_or_default(&self) -> u32 {
        if self.limit == 0 {
            20
        } else {
            self.limit.min(100)
        }
    }

    /// Widened to u64 before multiplying: both factors are client-controlled
    /// and their product can exceed u32.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit_or_default())
    }
}

/// Booking plus its passengers, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub passengers: Vec<Passenger>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_edges_only() {
        use BookingStatus::*;
        let legal = [
            (Pending, AwaitingPayment),
            (Pending, Cancelled),
            (AwaitingPayment, Paid),
            (AwaitingPayment, Cancelled),
        ];
        let all = [Pending, AwaitingPayment, Paid, Cancelled];
        for from in all {
            for to in all {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn offset_survives_extreme_page_numbers() {
        let filter = BookingFilter {
            page: u32::MAX,
            limit: 100,
            ..Default::default()
        };
        assert_eq!(filter.offset(), (u64::from(u32::MAX) - 1) * 100);

        let filter = BookingFilter::default();
        assert_eq!(filter.offset(), 0);
        assert_eq!(filter.limit_or_default(), 20);
    }

    #[test]
    fn terminal_statuses() {
        assert!(BookingStatus::Paid.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::AwaitingPayment.is_terminal());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::AwaitingPayment,
            BookingStatus::Paid,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("CONFIRMED".parse::<BookingStatus>().is_err());
    }
}
