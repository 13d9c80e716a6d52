// libs/booking-cell/src/services/orchestrator.rs
use chrono::{NaiveDate, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    Appointment, Booking, BookingDocument, BookingError, BookingSubmission, CardDetails,
    Discount, Location, Patient, PatientRegistration, Payment, PaymentMethod, PaymentStatus,
    Service, TimeSlot,
};
use crate::services::collaborators::{
    BookingGateway, CareCatalog, PatientDirectory, RemoteError,
};
use crate::services::validation::ValidationService;
use crate::state::{BookingAction, BookingState, Concern};
use crate::steps::BookingStep;

const BOOKING_CODE_CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Inputs a slot listing was requested with; a response only lands if these
/// still describe the current selection when it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotQuery {
    location_id: Uuid,
    service_id: Uuid,
    date: NaiveDate,
}

/// Sequences the six booking steps over an owned [`BookingState`], drives the
/// slot catalog for holds, and talks to the booking gateway at confirmation.
/// Transitions are synchronous and run-to-completion; collaborator calls are
/// one outstanding per concern.
pub struct BookingOrchestrator {
    state: BookingState,
    validation: ValidationService,
    locations: Vec<Location>,
    services: Vec<Service>,
    slots: Vec<TimeSlot>,
    slots_seq: u64,
    hold_ttl_minutes: i64,
    directory: Arc<dyn PatientDirectory>,
    catalog: Arc<dyn CareCatalog>,
    gateway: Arc<dyn BookingGateway>,
}

impl BookingOrchestrator {
    pub fn new(
        directory: Arc<dyn PatientDirectory>,
        catalog: Arc<dyn CareCatalog>,
        gateway: Arc<dyn BookingGateway>,
        hold_ttl_minutes: i64,
    ) -> Self {
        Self {
            state: BookingState::default(),
            validation: ValidationService::new(),
            locations: Vec::new(),
            services: Vec::new(),
            slots: Vec::new(),
            slots_seq: 0,
            hold_ttl_minutes,
            directory,
            catalog,
            gateway,
        }
    }

    pub fn state(&self) -> &BookingState {
        &self.state
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    // ==============================================================================
    // STEP 1: PATIENT IDENTIFICATION
    // ==============================================================================

    /// Search-or-register entry point. `Ok(None)` means "not registered yet";
    /// the caller pre-fills the registration form with the same id number.
    pub async fn search_patient(
        &mut self,
        identity_number: &str,
    ) -> Result<Option<Patient>, BookingError> {
        self.ensure_not_confirmed()?;
        let issues = self.validation.validate_patient_search(identity_number);
        if !issues.is_empty() {
            return Err(BookingError::ValidationFailed { issues });
        }
        self.gate(Concern::Patient)?;

        info!("Searching patient by identity number {}", identity_number);
        self.state.apply(BookingAction::StartOperation(Concern::Patient));
        match self.directory.search_patient(identity_number).await {
            Ok(Some(patient)) => {
                self.state.apply(BookingAction::FinishOperation(Concern::Patient));
                self.state.apply(BookingAction::SetPatient(patient.clone()));
                Ok(Some(patient))
            }
            Ok(None) => {
                self.state.apply(BookingAction::FinishOperation(Concern::Patient));
                debug!("No patient registered under {}", identity_number);
                Ok(None)
            }
            Err(err) => Err(self.remote_failure(Concern::Patient, err)),
        }
    }

    pub async fn register_patient(
        &mut self,
        registration: PatientRegistration,
    ) -> Result<Patient, BookingError> {
        self.ensure_not_confirmed()?;
        let issues = self
            .validation
            .validate_patient_registration(&registration, Utc::now().date_naive());
        if !issues.is_empty() {
            return Err(BookingError::ValidationFailed { issues });
        }
        self.gate(Concern::Patient)?;

        info!("Registering new patient {}", registration.identity_number);
        self.state.apply(BookingAction::StartOperation(Concern::Patient));
        match self.directory.register_patient(&registration).await {
            Ok(patient) => {
                self.state.apply(BookingAction::FinishOperation(Concern::Patient));
                self.state.apply(BookingAction::SetPatient(patient.clone()));
                Ok(patient)
            }
            Err(err) => Err(self.remote_failure(Concern::Patient, err)),
        }
    }

    // ==============================================================================
    // STEPS 2-3: LOCATION AND SERVICE SELECTION
    // ==============================================================================

    pub async fn load_locations(&mut self) -> Result<Vec<Location>, BookingError> {
        self.gate(Concern::Locations)?;
        self.state.apply(BookingAction::StartOperation(Concern::Locations));
        match self.catalog.list_locations().await {
            Ok(locations) => {
                self.state.apply(BookingAction::FinishOperation(Concern::Locations));
                self.locations = locations.clone();
                Ok(locations)
            }
            Err(err) => Err(self.remote_failure(Concern::Locations, err)),
        }
    }

    pub fn select_location(&mut self, location_id: Uuid) -> Result<Location, BookingError> {
        self.ensure_not_confirmed()?;
        let location = self
            .locations
            .iter()
            .find(|l| l.id == location_id)
            .cloned()
            .ok_or(BookingError::UnknownLocation(location_id))?;
        if !location.available {
            return Err(BookingError::LocationUnavailable(location_id));
        }

        info!("Location selected: {}", location.name);
        self.state.apply(BookingAction::SetLocation(location.clone()));
        self.invalidate_listings();
        Ok(location)
    }

    pub async fn load_services(&mut self) -> Result<Vec<Service>, BookingError> {
        let location_id = self
            .state
            .draft
            .location
            .as_ref()
            .ok_or(BookingError::MissingSelection("location"))?
            .id;
        self.gate(Concern::Services)?;
        self.state.apply(BookingAction::StartOperation(Concern::Services));
        match self.catalog.list_services(location_id).await {
            Ok(services) => {
                self.state.apply(BookingAction::FinishOperation(Concern::Services));
                self.services = services.clone();
                Ok(services)
            }
            Err(err) => Err(self.remote_failure(Concern::Services, err)),
        }
    }

    pub fn select_service(&mut self, service_id: Uuid) -> Result<Service, BookingError> {
        self.ensure_not_confirmed()?;
        let service = self
            .services
            .iter()
            .find(|s| s.id == service_id)
            .cloned()
            .ok_or(BookingError::UnknownService(service_id))?;
        if !service.available {
            return Err(BookingError::ServiceUnavailable(service_id));
        }

        self.state.apply(BookingAction::SetService(service.clone()));
        self.slots.clear();
        self.slots_seq += 1;
        info!(
            "Service selected: {} ({:.2}, total {:.2})",
            service.name, service.price, self.state.draft.pricing.total
        );
        Ok(service)
    }

    pub fn apply_discounts(&mut self, discounts: Vec<Discount>) {
        self.state.apply(BookingAction::SetDiscounts(discounts));
    }

    // ==============================================================================
    // STEP 4: APPOINTMENT SCHEDULING (SLOT HOLD PROTOCOL)
    // ==============================================================================

    /// Fetch the slot snapshot for a date. `Ok(None)` means the response was
    /// superseded while in flight and has been discarded.
    pub async fn load_slots(
        &mut self,
        date: NaiveDate,
    ) -> Result<Option<Vec<TimeSlot>>, BookingError> {
        self.ensure_not_confirmed()?;
        let location_id = self
            .state
            .draft
            .location
            .as_ref()
            .ok_or(BookingError::MissingSelection("location"))?
            .id;
        let service_id = self
            .state
            .draft
            .service
            .as_ref()
            .ok_or(BookingError::MissingSelection("service"))?
            .id;
        self.gate(Concern::Slots)?;

        // Picking a different date abandons whatever hold backed the old one.
        let stale_appointment = self
            .state
            .draft
            .appointment
            .as_ref()
            .map(|a| a.date != date)
            .unwrap_or(false);
        if stale_appointment {
            self.state.apply(BookingAction::ClearAppointment);
        }

        let query = SlotQuery {
            location_id,
            service_id,
            date,
        };
        self.slots_seq += 1;
        let token = self.slots_seq;

        self.state.apply(BookingAction::StartOperation(Concern::Slots));
        match self
            .catalog
            .list_time_slots(location_id, service_id, date)
            .await
        {
            Ok(listing) => {
                self.state.apply(BookingAction::FinishOperation(Concern::Slots));
                if !self.listing_is_current(token, &query) {
                    debug!("Discarding stale slot listing for {}", date);
                    return Ok(None);
                }
                debug!("Loaded {} slots for {}", listing.len(), date);
                self.slots = listing.clone();
                Ok(Some(listing))
            }
            Err(err) => Err(self.remote_failure(Concern::Slots, err)),
        }
    }

    /// Last-request-wins: a listing lands only if no newer request was issued
    /// and the selection it was fetched for is still the current one.
    fn listing_is_current(&self, token: u64, query: &SlotQuery) -> bool {
        if token != self.slots_seq {
            return false;
        }
        let location_ok = self
            .state
            .draft
            .location
            .as_ref()
            .map(|l| l.id == query.location_id)
            .unwrap_or(false);
        let service_ok = self
            .state
            .draft
            .service
            .as_ref()
            .map(|s| s.id == query.service_id)
            .unwrap_or(false);
        location_ok && service_ok
    }

    /// Acquire a hold on a listed slot and bind the appointment to it. The
    /// remote grant is authoritative; a rejection surfaces as a retryable
    /// [`BookingError::SlotConflict`] and never creates an appointment.
    pub async fn select_slot(&mut self, slot_id: Uuid) -> Result<Appointment, BookingError> {
        self.ensure_not_confirmed()?;
        let slot = self
            .slots
            .iter()
            .find(|s| s.id == slot_id)
            .cloned()
            .ok_or(BookingError::UnknownSlot(slot_id))?;
        let now = Utc::now();
        if !slot.is_free(now) {
            return Err(BookingError::SlotConflict);
        }
        self.gate(Concern::Hold)?;

        // Only the most recent successful hold is meaningful; any previously
        // held slot is abandoned to its TTL.
        if self.state.draft.appointment.is_some() {
            self.state.apply(BookingAction::ClearAppointment);
        }

        info!(
            "Acquiring {} minute hold on slot {}",
            self.hold_ttl_minutes, slot_id
        );
        self.state.apply(BookingAction::StartOperation(Concern::Hold));
        match self.catalog.acquire_hold(slot_id, self.hold_ttl_minutes).await {
            Ok(hold) => {
                self.state.apply(BookingAction::FinishOperation(Concern::Hold));
                let appointment = Appointment::from_hold(slot, &hold, now)?;
                self.state
                    .apply(BookingAction::SetAppointment(appointment.clone()));
                Ok(appointment)
            }
            Err(RemoteError::SlotUnavailable) => {
                warn!("Hold rejected for slot {}", slot_id);
                self.state.apply(BookingAction::FailOperation(
                    Concern::Hold,
                    BookingError::SlotConflict.to_string(),
                ));
                Err(BookingError::SlotConflict)
            }
            Err(err) => Err(self.remote_failure(Concern::Hold, err)),
        }
    }

    // ==============================================================================
    // STEP 5: PAYMENT
    // ==============================================================================

    pub async fn submit_payment(
        &mut self,
        method: PaymentMethod,
        card: Option<CardDetails>,
    ) -> Result<Payment, BookingError> {
        self.ensure_not_confirmed()?;
        if self.state.draft.service.is_none() {
            return Err(BookingError::MissingSelection("service"));
        }
        if self.state.draft.appointment.is_none() {
            return Err(BookingError::MissingSelection("appointment"));
        }

        // Re-derive the charge from the current selection; idempotent while
        // the service is unchanged.
        self.state.apply(BookingAction::RecomputePricing);
        let amount = self.state.draft.pricing.total;

        match method {
            PaymentMethod::Card => {
                let card = card.ok_or(BookingError::MissingSelection("card details"))?;
                let issues = self.validation.validate_card(&card);
                if !issues.is_empty() {
                    return Err(BookingError::ValidationFailed { issues });
                }
                self.gate(Concern::Payment)?;

                info!("Submitting card payment of {:.2}", amount);
                self.state.apply(BookingAction::StartOperation(Concern::Payment));
                match self.gateway.submit_payment(method, amount, Some(card)).await {
                    Ok(receipt) if receipt.status == PaymentStatus::Declined => {
                        // The appointment and its hold stay untouched; the
                        // user retries from the payment step.
                        let message = "card was declined by the issuer".to_string();
                        self.state.apply(BookingAction::FailOperation(
                            Concern::Payment,
                            message.clone(),
                        ));
                        Err(BookingError::PaymentDeclined(message))
                    }
                    Ok(receipt) => {
                        self.state.apply(BookingAction::FinishOperation(Concern::Payment));
                        let payment = Payment {
                            method,
                            status: receipt.status,
                            transaction_id: Some(receipt.transaction_id),
                            amount,
                        };
                        self.state.apply(BookingAction::SetPayment(payment.clone()));
                        info!("Payment of {:.2} authorized", amount);
                        Ok(payment)
                    }
                    Err(err) => Err(self.remote_failure(Concern::Payment, err)),
                }
            }
            PaymentMethod::Transfer | PaymentMethod::Cash => {
                // Settled at the clinic; no remote authorization involved.
                self.state.apply(BookingAction::ClearError(Concern::Payment));
                let payment = Payment {
                    method,
                    status: PaymentStatus::Pending,
                    transaction_id: None,
                    amount,
                };
                self.state.apply(BookingAction::SetPayment(payment.clone()));
                info!("{} payment of {:.2} recorded as pending", method, amount);
                Ok(payment)
            }
        }
    }

    // ==============================================================================
    // STEP NAVIGATION AND CONFIRMATION
    // ==============================================================================

    /// Move one step forward. `Ok(false)` is the "not ready" no-op: the
    /// current step's entity has not been collected yet. Advancing out of the
    /// payment step runs the whole confirmation protocol.
    pub async fn advance(&mut self) -> Result<bool, BookingError> {
        let step = self.state.current_step;
        if !step.guard_satisfied(&self.state.draft) {
            debug!("advance() not ready at {}", step);
            return Ok(false);
        }

        if step == BookingStep::PaymentProcessing {
            let booking = self.confirm_booking().await?;
            info!("Booking {} confirmed", booking.code);
            return Ok(true);
        }

        self.state.apply(BookingAction::Advance);
        if self.state.current_step == BookingStep::PaymentProcessing {
            // Pricing must be current before the payment step reads it.
            self.state.apply(BookingAction::RecomputePricing);
        }
        Ok(true)
    }

    pub fn retreat(&mut self) -> bool {
        let before = self.state.current_step;
        self.state.apply(BookingAction::Retreat);
        self.state.current_step != before
    }

    /// Jump back to an already-completed step to edit a prior answer.
    pub fn jump_to(&mut self, step: BookingStep) -> Result<(), BookingError> {
        self.ensure_not_confirmed()?;
        if step >= self.state.current_step {
            return Err(BookingError::StepNotCompleted(step));
        }
        self.state.apply(BookingAction::JumpTo(step));
        Ok(())
    }

    /// Entering confirmation, in order: generate the booking code, submit the
    /// aggregate, store the confirmed booking, then best-effort notify. A
    /// submission failure leaves the session on the payment step with a
    /// terminal failure banner; it is never retried silently.
    async fn confirm_booking(&mut self) -> Result<Booking, BookingError> {
        self.ensure_not_confirmed()?;
        let draft = &self.state.draft;
        let patient = draft
            .patient
            .clone()
            .ok_or(BookingError::MissingSelection("patient"))?;
        let location = draft
            .location
            .clone()
            .ok_or(BookingError::MissingSelection("location"))?;
        let service = draft
            .service
            .clone()
            .ok_or(BookingError::MissingSelection("service"))?;
        let appointment = draft
            .appointment
            .clone()
            .ok_or(BookingError::MissingSelection("appointment"))?;
        let payment = draft
            .payment
            .clone()
            .ok_or(BookingError::MissingSelection("payment"))?;
        let pricing = draft.pricing;

        if (payment.amount - pricing.total).abs() >= 0.005 {
            return Err(BookingError::BookingFailed(
                "payment amount no longer matches the computed total".to_string(),
            ));
        }
        self.gate(Concern::Booking)?;

        let code = generate_booking_code();
        let submission = BookingSubmission {
            code: code.clone(),
            patient,
            location,
            service,
            appointment,
            payment,
            pricing,
        };

        info!("Submitting booking {}", code);
        self.state.apply(BookingAction::StartOperation(Concern::Booking));
        let receipt = match self.gateway.submit_booking(&submission).await {
            Ok(receipt) => receipt,
            Err(err) => {
                let message = err.to_string();
                self.state
                    .apply(BookingAction::FailOperation(Concern::Booking, message.clone()));
                return Err(BookingError::BookingFailed(message));
            }
        };
        self.state.apply(BookingAction::FinishOperation(Concern::Booking));

        let booking = Booking {
            patient: submission.patient,
            location: submission.location,
            service: submission.service,
            appointment: submission.appointment,
            payment: submission.payment,
            pricing: submission.pricing,
            code: receipt.code,
            status: receipt.status,
            created_at: receipt.created_at,
        };
        self.state
            .apply(BookingAction::CompleteBooking(booking.clone()));

        self.notify_confirmation(&booking).await;
        Ok(booking)
    }

    async fn notify_confirmation(&mut self, booking: &Booking) {
        self.state
            .apply(BookingAction::StartOperation(Concern::Notification));
        match self
            .gateway
            .send_confirmation_notification(&booking.patient.email, booking)
            .await
        {
            Ok(_) => {
                self.state
                    .apply(BookingAction::FinishOperation(Concern::Notification));
            }
            Err(err) => {
                // The booking is already confirmed; a lost email is not fatal.
                warn!("Confirmation notification failed: {}", err);
                self.state.apply(BookingAction::FailOperation(
                    Concern::Notification,
                    err.to_string(),
                ));
            }
        }
    }

    pub async fn fetch_document(&mut self) -> Result<BookingDocument, BookingError> {
        let booking = self
            .state
            .booking
            .clone()
            .ok_or(BookingError::MissingSelection("confirmed booking"))?;
        self.gate(Concern::Document)?;
        self.state.apply(BookingAction::StartOperation(Concern::Document));
        match self.gateway.generate_booking_document(&booking).await {
            Ok(document) => {
                self.state.apply(BookingAction::FinishOperation(Concern::Document));
                Ok(document)
            }
            Err(err) => Err(self.remote_failure(Concern::Document, err)),
        }
    }

    pub fn reset(&mut self) {
        info!("Resetting booking session");
        self.state.apply(BookingAction::Reset);
        self.locations.clear();
        self.services.clear();
        self.slots.clear();
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    /// A location change orphans the cached service menu and slot snapshot;
    /// bumping the sequence also invalidates any listing still in flight.
    fn invalidate_listings(&mut self) {
        self.services.clear();
        self.slots.clear();
        self.slots_seq += 1;
    }

    fn gate(&self, concern: Concern) -> Result<(), BookingError> {
        if self.state.status.is_loading(concern) {
            return Err(BookingError::OperationInFlight(concern));
        }
        Ok(())
    }

    fn ensure_not_confirmed(&self) -> Result<(), BookingError> {
        if self.state.booking.is_some() {
            return Err(BookingError::AlreadyConfirmed);
        }
        Ok(())
    }

    fn remote_failure(&mut self, concern: Concern, err: RemoteError) -> BookingError {
        let message = err.to_string();
        self.state
            .apply(BookingAction::FailOperation(concern, message.clone()));
        BookingError::RemoteUnavailable { concern, message }
    }
}

fn generate_booking_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| {
            let idx = rng.gen_range(0..BOOKING_CODE_CHARSET.len());
            BOOKING_CODE_CHARSET[idx] as char
        })
        .collect();
    format!("SV-{}", suffix)
}
