// libs/booking-cell/src/steps.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::SessionDraft;

/// The six booking steps, in their only legal order. Linear, no skipping;
/// `Confirmation` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    PatientIdentification,
    LocationSelection,
    ServiceSelection,
    AppointmentScheduling,
    PaymentProcessing,
    Confirmation,
}

impl BookingStep {
    pub const FIRST: BookingStep = BookingStep::PatientIdentification;
    pub const LAST: BookingStep = BookingStep::Confirmation;

    pub fn ordinal(&self) -> u8 {
        match self {
            BookingStep::PatientIdentification => 1,
            BookingStep::LocationSelection => 2,
            BookingStep::ServiceSelection => 3,
            BookingStep::AppointmentScheduling => 4,
            BookingStep::PaymentProcessing => 5,
            BookingStep::Confirmation => 6,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            1 => Some(BookingStep::PatientIdentification),
            2 => Some(BookingStep::LocationSelection),
            3 => Some(BookingStep::ServiceSelection),
            4 => Some(BookingStep::AppointmentScheduling),
            5 => Some(BookingStep::PaymentProcessing),
            6 => Some(BookingStep::Confirmation),
            _ => None,
        }
    }

    pub fn next(&self) -> Option<Self> {
        Self::from_ordinal(self.ordinal() + 1)
    }

    pub fn prev(&self) -> Option<Self> {
        self.ordinal().checked_sub(1).and_then(Self::from_ordinal)
    }

    pub fn is_terminal(&self) -> bool {
        *self == BookingStep::Confirmation
    }

    /// Whether the entity this step is responsible for has been collected,
    /// i.e. whether `advance()` may leave it.
    pub fn guard_satisfied(&self, draft: &SessionDraft) -> bool {
        match self {
            BookingStep::PatientIdentification => draft.patient.is_some(),
            BookingStep::LocationSelection => draft.location.is_some(),
            BookingStep::ServiceSelection => draft.service.is_some(),
            BookingStep::AppointmentScheduling => draft.appointment.is_some(),
            BookingStep::PaymentProcessing => draft.payment.is_some(),
            BookingStep::Confirmation => false,
        }
    }
}

impl fmt::Display for BookingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStep::PatientIdentification => write!(f, "patient_identification"),
            BookingStep::LocationSelection => write!(f, "location_selection"),
            BookingStep::ServiceSelection => write!(f, "service_selection"),
            BookingStep::AppointmentScheduling => write!(f, "appointment_scheduling"),
            BookingStep::PaymentProcessing => write!(f, "payment_processing"),
            BookingStep::Confirmation => write!(f, "confirmation"),
        }
    }
}
