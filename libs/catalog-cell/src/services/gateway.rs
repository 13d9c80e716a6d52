// libs/catalog-cell/src/services/gateway.rs
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use shared_config::AppConfig;

use booking_cell::models::{
    Booking, BookingDocument, BookingReceipt, BookingStatus, BookingSubmission, CardDetails,
    NotificationAck, PaymentMethod, PaymentReceipt, PaymentStatus,
};
use booking_cell::services::collaborators::{BookingGateway, RemoteError};

/// Test card that is always declined by the mocked authorizer.
pub const DECLINED_TEST_CARD: &str = "4000000000000002";

/// Addresses under this local part always bounce, for driving the
/// partial-failure path.
fn is_bounce_address(email: &str) -> bool {
    email.starts_with("bounce@")
}

/// Mocked booking backend: card authorization, booking persistence,
/// notifications, and document links.
pub struct InMemoryBookingGateway {
    bookings: RwLock<Vec<BookingSubmission>>,
    latency: Duration,
}

impl InMemoryBookingGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            bookings: RwLock::new(Vec::new()),
            latency: Duration::from_millis(config.remote_latency_ms),
        }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    pub async fn submitted_codes(&self) -> Vec<String> {
        self.bookings
            .read()
            .await
            .iter()
            .map(|b| b.code.clone())
            .collect()
    }
}

fn transaction_id() -> String {
    let mut rng = rand::thread_rng();
    format!("TXN-{:08}", rng.gen_range(0..100_000_000u32))
}

#[async_trait]
impl BookingGateway for InMemoryBookingGateway {
    async fn submit_payment(
        &self,
        method: PaymentMethod,
        amount: f64,
        card: Option<CardDetails>,
    ) -> Result<PaymentReceipt, RemoteError> {
        self.simulate_latency().await;
        if method != PaymentMethod::Card {
            return Err(RemoteError::Unavailable(
                "only card payments are authorized remotely".to_string(),
            ));
        }
        let card = card.ok_or_else(|| {
            RemoteError::Unavailable("card details are required for card payments".to_string())
        })?;

        if card.number == DECLINED_TEST_CARD {
            debug!("Declining test card for amount {:.2}", amount);
            return Ok(PaymentReceipt {
                transaction_id: transaction_id(),
                status: PaymentStatus::Declined,
            });
        }

        debug!("Authorizing card payment of {:.2}", amount);
        Ok(PaymentReceipt {
            transaction_id: transaction_id(),
            status: PaymentStatus::Approved,
        })
    }

    async fn submit_booking(
        &self,
        submission: &BookingSubmission,
    ) -> Result<BookingReceipt, RemoteError> {
        self.simulate_latency().await;
        let receipt = BookingReceipt {
            code: submission.code.clone(),
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
        };
        self.bookings.write().await.push(submission.clone());
        info!(
            "Persisted booking {} for patient {}",
            submission.code, submission.patient.identity_number
        );
        Ok(receipt)
    }

    async fn send_confirmation_notification(
        &self,
        email: &str,
        booking: &Booking,
    ) -> Result<NotificationAck, RemoteError> {
        self.simulate_latency().await;
        if is_bounce_address(email) {
            return Err(RemoteError::NotificationRejected(email.to_string()));
        }
        debug!("Confirmation for booking {} sent to {}", booking.code, email);
        Ok(NotificationAck {
            accepted_at: Utc::now(),
        })
    }

    async fn generate_booking_document(
        &self,
        booking: &Booking,
    ) -> Result<BookingDocument, RemoteError> {
        self.simulate_latency().await;
        Ok(BookingDocument {
            document_url: format!(
                "https://files.sanavida.pe/bookings/{}.pdf",
                booking.code
            ),
            filename: format!("reserva-{}.pdf", booking.code),
        })
    }
}
