// libs/booking-cell/src/state.rs
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::warn;

use crate::models::{
    Appointment, Booking, Discount, Location, Patient, Payment, Pricing, Service,
};
use crate::services::pricing::compute_pricing;
use crate::steps::BookingStep;

// ==============================================================================
// OPERATIONAL STATUS
// ==============================================================================

/// Named category of asynchronous operation. Loading and error flags are
/// keyed by concern and fully independent of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concern {
    Patient,
    Locations,
    Services,
    Slots,
    Hold,
    Payment,
    Booking,
    Notification,
    Document,
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concern::Patient => write!(f, "patient"),
            Concern::Locations => write!(f, "locations"),
            Concern::Services => write!(f, "services"),
            Concern::Slots => write!(f, "slots"),
            Concern::Hold => write!(f, "hold"),
            Concern::Payment => write!(f, "payment"),
            Concern::Booking => write!(f, "booking"),
            Concern::Notification => write!(f, "notification"),
            Concern::Document => write!(f, "document"),
        }
    }
}

/// Per-concern loading flags and advisory error banners, kept apart from the
/// domain draft so each side stays independently testable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationStatus {
    loading: HashSet<Concern>,
    errors: HashMap<Concern, String>,
}

impl OperationStatus {
    /// Starting an operation always clears the concern's previous error and
    /// any flag a superseded request left behind.
    pub fn begin(&mut self, concern: Concern) {
        self.errors.remove(&concern);
        self.loading.insert(concern);
    }

    pub fn finish(&mut self, concern: Concern) {
        self.loading.remove(&concern);
    }

    pub fn fail(&mut self, concern: Concern, message: String) {
        self.loading.remove(&concern);
        self.errors.insert(concern, message);
    }

    pub fn is_loading(&self, concern: Concern) -> bool {
        self.loading.contains(&concern)
    }

    pub fn error(&self, concern: Concern) -> Option<&str> {
        self.errors.get(&concern).map(String::as_str)
    }

    pub fn clear_error(&mut self, concern: Concern) {
        self.errors.remove(&concern);
    }
}

// ==============================================================================
// SESSION STATE
// ==============================================================================

/// The domain half of the session: every entity collected so far.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionDraft {
    pub patient: Option<Patient>,
    pub location: Option<Location>,
    pub service: Option<Service>,
    pub appointment: Option<Appointment>,
    pub payment: Option<Payment>,
    pub pricing: Pricing,
    pub discounts: Vec<Discount>,
}

/// Single source of truth for the in-progress booking session.
#[derive(Debug, Clone, Serialize)]
pub struct BookingState {
    pub current_step: BookingStep,
    pub max_step: BookingStep,
    pub draft: SessionDraft,
    pub status: OperationStatus,
    pub booking: Option<Booking>,
}

impl Default for BookingState {
    fn default() -> Self {
        Self {
            current_step: BookingStep::FIRST,
            max_step: BookingStep::LAST,
            draft: SessionDraft::default(),
            status: OperationStatus::default(),
            booking: None,
        }
    }
}

// ==============================================================================
// TRANSITION COMMANDS
// ==============================================================================

/// Closed set of state transitions. Every mutation of [`BookingState`] goes
/// through exactly one of these, applied atomically by [`BookingState::apply`].
#[derive(Debug, Clone)]
pub enum BookingAction {
    SetPatient(Patient),
    SetLocation(Location),
    SetService(Service),
    ClearService,
    SetAppointment(Appointment),
    ClearAppointment,
    SetPayment(Payment),
    SetDiscounts(Vec<Discount>),
    RecomputePricing,
    StartOperation(Concern),
    FinishOperation(Concern),
    FailOperation(Concern, String),
    ClearError(Concern),
    Advance,
    Retreat,
    JumpTo(BookingStep),
    CompleteBooking(Booking),
    Reset,
}

impl BookingState {
    /// Apply one transition synchronously and atomically. Cascades (location
    /// change wiping the service, service change wiping the appointment and
    /// re-deriving the pricing) happen inside the same action, never split.
    pub fn apply(&mut self, action: BookingAction) {
        match action {
            BookingAction::SetPatient(patient) => {
                if self.draft.patient.is_some() {
                    warn!("patient is immutable for the session, ignoring re-identification");
                    return;
                }
                self.draft.patient = Some(patient);
            }
            BookingAction::SetLocation(location) => {
                let changed = self
                    .draft
                    .location
                    .as_ref()
                    .map(|current| current.id != location.id)
                    .unwrap_or(true);
                if changed {
                    self.clear_downstream_of_location();
                }
                self.draft.location = Some(location);
            }
            BookingAction::SetService(service) => {
                self.draft.appointment = None;
                self.draft.payment = None;
                self.draft.pricing = compute_pricing(&service, &self.draft.discounts);
                self.draft.service = Some(service);
            }
            BookingAction::ClearService => {
                self.draft.service = None;
                self.draft.appointment = None;
                self.draft.payment = None;
                self.draft.pricing = Pricing::zero();
            }
            BookingAction::SetAppointment(appointment) => {
                self.draft.appointment = Some(appointment);
            }
            BookingAction::ClearAppointment => {
                self.draft.appointment = None;
            }
            BookingAction::SetPayment(payment) => {
                self.draft.payment = Some(payment);
            }
            BookingAction::SetDiscounts(discounts) => {
                self.draft.discounts = discounts;
                self.apply(BookingAction::RecomputePricing);
            }
            BookingAction::RecomputePricing => {
                self.draft.pricing = match &self.draft.service {
                    Some(service) => compute_pricing(service, &self.draft.discounts),
                    None => Pricing::zero(),
                };
            }
            BookingAction::StartOperation(concern) => self.status.begin(concern),
            BookingAction::FinishOperation(concern) => self.status.finish(concern),
            BookingAction::FailOperation(concern, message) => self.status.fail(concern, message),
            BookingAction::ClearError(concern) => self.status.clear_error(concern),
            BookingAction::Advance => {
                if self.current_step.guard_satisfied(&self.draft) {
                    if let Some(next) = self.current_step.next() {
                        if next <= self.max_step {
                            self.current_step = next;
                        }
                    }
                }
            }
            BookingAction::Retreat => {
                if let Some(prev) = self.current_step.prev() {
                    self.current_step = prev;
                }
            }
            BookingAction::JumpTo(step) => {
                if step >= self.current_step {
                    warn!("jump_to({}) ignored: step not completed yet", step);
                    return;
                }
                if step == BookingStep::LocationSelection {
                    // Editing the location makes everything priced and
                    // scheduled downstream stale.
                    self.clear_downstream_of_location();
                }
                self.current_step = step;
            }
            BookingAction::CompleteBooking(booking) => {
                self.booking = Some(booking);
                self.current_step = BookingStep::Confirmation;
            }
            BookingAction::Reset => {
                *self = BookingState::default();
            }
        }
    }

    fn clear_downstream_of_location(&mut self) {
        self.draft.service = None;
        self.draft.appointment = None;
        self.draft.payment = None;
        self.draft.pricing = Pricing::zero();
    }
}
