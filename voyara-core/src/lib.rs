pub mod booking;
pub mod flights;
pub mod lock;
pub mod notify;
pub mod passenger;
pub mod payment;
pub mod repository;

use booking::BookingStatus;

/// Boxed error used at the edges of infrastructure traits (stores, gateways,
/// notifiers), so implementations can surface driver errors unchanged.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Booking not found")]
    NotFound,
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("Booking is already in terminal status {0}")]
    AlreadyFinal(BookingStatus),
    #[error("Payment not allowed while booking status is {0}")]
    InvalidState(BookingStatus),
    #[error("Payment already completed for this booking")]
    Conflict,
    #[error("Booking total must be greater than zero")]
    InvalidAmount,
    #[error("Booking has no passengers")]
    NoPassengers,
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    #[error("Invalid webhook signature")]
    Signature,
    #[error("Storage error: {0}")]
    Store(String),
}

impl BookingError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }

    pub fn gateway(err: impl std::fmt::Display) -> Self {
        Self::Gateway(err.to_string())
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
