// libs/booking-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::steps::BookingStep;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub identity_number: String,
    pub given_names: String,
    pub family_names: String,
    pub phone: String,
    pub email: String,
    pub birth_date: NaiveDate,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_names, self.family_names)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    GeneralMedicine,
    Dentistry,
    Dermatology,
    Ophthalmology,
    Laboratory,
    Physiotherapy,
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceCategory::GeneralMedicine => write!(f, "general_medicine"),
            ServiceCategory::Dentistry => write!(f, "dentistry"),
            ServiceCategory::Dermatology => write!(f, "dermatology"),
            ServiceCategory::Ophthalmology => write!(f, "ophthalmology"),
            ServiceCategory::Laboratory => write!(f, "laboratory"),
            ServiceCategory::Physiotherapy => write!(f, "physiotherapy"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub category: ServiceCategory,
    pub duration_minutes: i32,
    pub price: f64,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub location_id: Uuid,
    pub provider_name: Option<String>,
    pub available: bool,
    pub reserved: bool,
    pub reserved_until: Option<DateTime<Utc>>,
}

impl TimeSlot {
    /// An elapsed `reserved_until` reverts the slot to free no matter what the
    /// cached `reserved`/`available` flags still claim.
    pub fn is_free(&self, now: DateTime<Utc>) -> bool {
        match self.reserved_until {
            Some(until) if until <= now => true,
            Some(_) => false,
            None => self.available && !self.reserved,
        }
    }
}

/// A time-bounded advisory claim on a slot, granted by the slot catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotHold {
    pub slot_id: Uuid,
    pub reserved_until: DateTime<Utc>,
}

/// The patient-facing binding of a date, a held slot, and its provider.
///
/// Only constructible through [`Appointment::from_hold`]; there is no way to
/// back an appointment with a slot that was never held.
#[derive(Debug, Clone, Serialize)]
pub struct Appointment {
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub provider_name: Option<String>,
    pub reserved_until: DateTime<Utc>,
    #[serde(skip)]
    _held: (),
}

impl Appointment {
    pub fn from_hold(
        slot: TimeSlot,
        hold: &SlotHold,
        now: DateTime<Utc>,
    ) -> Result<Self, BookingError> {
        if hold.slot_id != slot.id {
            return Err(BookingError::HoldMismatch(slot.id));
        }
        if hold.reserved_until <= now {
            return Err(BookingError::HoldExpired(slot.id));
        }
        Ok(Self {
            date: slot.date,
            provider_name: slot.provider_name.clone(),
            reserved_until: hold.reserved_until,
            slot,
            _held: (),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Transfer,
    Cash,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Transfer => write!(f, "transfer"),
            PaymentMethod::Cash => write!(f, "cash"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Approved,
    Pending,
    Declined,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Approved => write!(f, "approved"),
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Declined => write!(f, "declined"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Pricing::zero()
    }
}

impl Pricing {
    pub fn zero() -> Self {
        Self {
            subtotal: 0.0,
            tax: 0.0,
            discount: 0.0,
            total: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    pub label: String,
    pub kind: DiscountKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountKind {
    /// Percentage of the subtotal, expressed as 0..=100.
    Percentage(f64),
    FlatAmount(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Pending,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Pending => write!(f, "pending"),
        }
    }
}

/// Final aggregate, created exactly once at confirmation and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub patient: Patient,
    pub location: Location,
    pub service: Service,
    pub appointment: Appointment,
    pub payment: Payment,
    pub pricing: Pricing,
    pub code: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRegistration {
    pub identity_number: String,
    pub given_names: String,
    pub family_names: String,
    pub phone: String,
    pub email: String,
    pub birth_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: String,
    pub holder_name: String,
    pub expiry: String,
    pub cvv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub transaction_id: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingReceipt {
    pub code: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// Aggregate handed to the remote booking service at confirmation time.
#[derive(Debug, Clone, Serialize)]
pub struct BookingSubmission {
    pub code: String,
    pub patient: Patient,
    pub location: Location,
    pub service: Service,
    pub appointment: Appointment,
    pub payment: Payment,
    pub pricing: Pricing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationAck {
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDocument {
    pub document_url: String,
    pub filename: String,
}

// ==============================================================================
// VALIDATION MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("validation failed on {} field(s)", .issues.len())]
    ValidationFailed { issues: Vec<FieldIssue> },

    #[error("{concern} service unavailable: {message}")]
    RemoteUnavailable {
        concern: crate::state::Concern,
        message: String,
    },

    #[error("Selected slot is no longer available, please pick another one")]
    SlotConflict,

    #[error("Hold does not match slot {0}")]
    HoldMismatch(Uuid),

    #[error("Hold on slot {0} has expired")]
    HoldExpired(Uuid),

    #[error("Payment was declined: {0}")]
    PaymentDeclined(String),

    #[error("A {0} operation is already in flight")]
    OperationInFlight(crate::state::Concern),

    #[error("Missing selection: {0}")]
    MissingSelection(&'static str),

    #[error("Location {0} is not open for booking")]
    LocationUnavailable(Uuid),

    #[error("Service {0} is not open for booking")]
    ServiceUnavailable(Uuid),

    #[error("No location {0} in the current listing")]
    UnknownLocation(Uuid),

    #[error("No service {0} in the current listing")]
    UnknownService(Uuid),

    #[error("No slot {0} in the current listing")]
    UnknownSlot(Uuid),

    #[error("Booking submission failed: {0}")]
    BookingFailed(String),

    #[error("Booking is already confirmed")]
    AlreadyConfirmed,

    #[error("Cannot jump to step {0}: it has not been completed yet")]
    StepNotCompleted(BookingStep),
}
