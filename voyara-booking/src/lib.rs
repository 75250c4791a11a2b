pub mod coordinator;
pub mod lifecycle;
pub mod webhook;

pub use coordinator::{PaymentIntentCoordinator, PaymentIntentOutcome};
pub use lifecycle::{BookingLifecycleManager, CreateBooking};
pub use webhook::PaymentWebhookProcessor;
