// libs/booking-cell/src/services/collaborators.rs
//
// Contracts the orchestrator consumes. The reference deployment wires the
// in-memory mocked remotes from catalog-cell; a real backend implements the
// same traits.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    BookingDocument, BookingReceipt, BookingSubmission, CardDetails, Location, NotificationAck,
    Patient, PatientRegistration, PaymentMethod, PaymentReceipt, Service, SlotHold, TimeSlot,
};

#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("slot is already held by another client")]
    SlotUnavailable,

    #[error("notification rejected for {0}")]
    NotificationRejected(String),
}

#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn search_patient(&self, identity_number: &str)
        -> Result<Option<Patient>, RemoteError>;

    /// Assumes the registration fields were already validated upstream.
    async fn register_patient(
        &self,
        registration: &PatientRegistration,
    ) -> Result<Patient, RemoteError>;
}

#[async_trait]
pub trait CareCatalog: Send + Sync {
    async fn list_locations(&self) -> Result<Vec<Location>, RemoteError>;

    async fn list_services(&self, location_id: Uuid) -> Result<Vec<Service>, RemoteError>;

    /// Always fetched fresh; availability is time-sensitive and never cached
    /// across location/service/date changes.
    async fn list_time_slots(
        &self,
        location_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, RemoteError>;

    /// Advisory, time-bounded claim. The grant (or rejection) is
    /// authoritative; there is no explicit release, holds simply expire.
    async fn acquire_hold(&self, slot_id: Uuid, ttl_minutes: i64)
        -> Result<SlotHold, RemoteError>;
}

#[async_trait]
pub trait BookingGateway: Send + Sync {
    /// Card authorization. Declines come back as a non-error receipt with
    /// `PaymentStatus::Declined`; transport failures are `RemoteError`.
    async fn submit_payment(
        &self,
        method: PaymentMethod,
        amount: f64,
        card: Option<CardDetails>,
    ) -> Result<PaymentReceipt, RemoteError>;

    async fn submit_booking(
        &self,
        submission: &BookingSubmission,
    ) -> Result<BookingReceipt, RemoteError>;

    async fn send_confirmation_notification(
        &self,
        email: &str,
        booking: &crate::models::Booking,
    ) -> Result<NotificationAck, RemoteError>;

    async fn generate_booking_document(
        &self,
        booking: &crate::models::Booking,
    ) -> Result<BookingDocument, RemoteError>;
}
