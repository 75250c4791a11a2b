use std::sync::Arc;
use voyara_booking::{BookingLifecycleManager, PaymentIntentCoordinator, PaymentWebhookProcessor};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<BookingLifecycleManager>,
    pub payments: Arc<PaymentIntentCoordinator>,
    pub webhooks: Arc<PaymentWebhookProcessor>,
    pub auth: AuthConfig,
}
