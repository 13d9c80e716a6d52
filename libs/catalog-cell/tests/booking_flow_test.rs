//! End-to-end booking flows over the real in-memory collaborators.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};

use booking_cell::models::{
    BookingError, BookingStatus, PatientRegistration, PaymentMethod, PaymentStatus,
};
use booking_cell::services::orchestrator::BookingOrchestrator;
use booking_cell::steps::BookingStep;
use catalog_cell::seed::default_seed;
use catalog_cell::{InMemoryBookingGateway, InMemoryCareCatalog, InMemoryPatientDirectory};
use shared_config::AppConfig;

struct Fixture {
    gateway: Arc<InMemoryBookingGateway>,
    catalog: Arc<InMemoryCareCatalog>,
    directory: Arc<InMemoryPatientDirectory>,
}

impl Fixture {
    fn new() -> Self {
        let config = AppConfig::for_tests();
        let seed = default_seed();
        Self {
            gateway: Arc::new(InMemoryBookingGateway::new(&config)),
            catalog: Arc::new(InMemoryCareCatalog::new(&config, &seed)),
            directory: Arc::new(InMemoryPatientDirectory::new(&config, &seed)),
        }
    }

    fn orchestrator(&self) -> BookingOrchestrator {
        BookingOrchestrator::new(
            self.directory.clone(),
            self.catalog.clone(),
            self.gateway.clone(),
            10,
        )
    }
}

fn booking_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

fn ten_oclock() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).unwrap()
}

/// Walk a session up to the scheduling step at Sede San Isidro with the
/// 80.00 general-medicine consultation selected.
async fn walk_to_scheduling(orch: &mut BookingOrchestrator) {
    let patient = orch.search_patient("12345678").await.unwrap().unwrap();
    assert_eq!(patient.given_names, "María");
    assert!(orch.advance().await.unwrap());

    let locations = orch.load_locations().await.unwrap();
    let sede = locations
        .iter()
        .find(|l| l.name == "Sede San Isidro")
        .unwrap()
        .clone();
    orch.select_location(sede.id).unwrap();
    assert!(orch.advance().await.unwrap());

    let services = orch.load_services().await.unwrap();
    let consultation = services.iter().find(|s| s.price == 80.0).unwrap().clone();
    orch.select_service(consultation.id).unwrap();
    assert!(orch.advance().await.unwrap());
    assert_eq!(orch.state().current_step, BookingStep::AppointmentScheduling);
}

#[tokio::test]
async fn test_scenario_a_full_cash_booking() {
    let fixture = Fixture::new();
    let mut orch = fixture.orchestrator();

    walk_to_scheduling(&mut orch).await;

    // Pricing derives from the 80.00 service: 18% tax, no discounts.
    let pricing = orch.state().draft.pricing;
    assert_eq!(pricing.subtotal, 80.0);
    assert_eq!(pricing.tax, 14.4);
    assert_eq!(pricing.discount, 0.0);
    assert_eq!(pricing.total, 94.4);

    let slots = orch.load_slots(booking_date()).await.unwrap().unwrap();
    let slot = slots.iter().find(|s| s.time == ten_oclock()).unwrap().clone();
    let appointment = orch.select_slot(slot.id).await.unwrap();
    assert_eq!(appointment.date, booking_date());
    assert!(orch.advance().await.unwrap());

    let payment = orch.submit_payment(PaymentMethod::Cash, None).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, 94.4);

    assert!(orch.advance().await.unwrap());
    assert_eq!(orch.state().current_step, BookingStep::Confirmation);

    let booking = orch.state().booking.clone().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment.status, PaymentStatus::Pending);
    assert_eq!(booking.payment.amount, booking.pricing.total);
    assert_eq!(booking.appointment.slot.time, ten_oclock());
    assert_eq!(booking.patient.identity_number, "12345678");

    // The aggregate reached the remote booking service.
    let codes = fixture.gateway.submitted_codes().await;
    assert_eq!(codes, vec![booking.code.clone()]);

    // And the confirmation document can be generated from it.
    let document = orch.fetch_document().await.unwrap();
    assert!(document.filename.contains(&booking.code));
}

#[tokio::test]
async fn test_scenario_b_unknown_patient_registers_then_advances() {
    let fixture = Fixture::new();
    let mut orch = fixture.orchestrator();

    let lookup = orch.search_patient("99999999").await.unwrap();
    assert!(lookup.is_none());

    // Still unidentified: advancing is a no-op, twice over.
    assert!(!orch.advance().await.unwrap());
    assert!(!orch.advance().await.unwrap());
    assert_eq!(orch.state().current_step, BookingStep::PatientIdentification);

    // The registration form is pre-filled with the searched id.
    let registration = PatientRegistration {
        identity_number: "99999999".to_string(),
        given_names: "Jorge".to_string(),
        family_names: "Salas Vega".to_string(),
        phone: "912345678".to_string(),
        email: "jorge.salas@example.com".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1985, 11, 2).unwrap(),
    };
    let patient = orch.register_patient(registration).await.unwrap();
    assert_eq!(patient.identity_number, "99999999");

    assert!(orch.advance().await.unwrap());
    assert_eq!(orch.state().current_step, BookingStep::LocationSelection);
}

#[tokio::test]
async fn test_scenario_d_second_service_selection_wins_outright() {
    let fixture = Fixture::new();
    let mut orch = fixture.orchestrator();

    orch.search_patient("12345678").await.unwrap();
    orch.advance().await.unwrap();
    let locations = orch.load_locations().await.unwrap();
    let sede = locations
        .iter()
        .find(|l| l.name == "Sede Miraflores")
        .unwrap()
        .clone();
    orch.select_location(sede.id).unwrap();
    orch.advance().await.unwrap();

    let services = orch.load_services().await.unwrap();
    let a = services.iter().find(|s| s.price == 80.0).unwrap().clone();
    let b = services.iter().find(|s| s.price == 120.0).unwrap().clone();

    orch.select_service(a.id).unwrap();
    orch.select_service(b.id).unwrap();

    let state = orch.state();
    assert_eq!(state.draft.service.as_ref().unwrap().id, b.id);
    assert!(state.draft.appointment.is_none());
    assert_eq!(state.draft.pricing.subtotal, 120.0);
    assert_eq!(state.draft.pricing.tax, 21.6);
    assert_eq!(state.draft.pricing.total, 141.6);
}

#[tokio::test]
async fn test_slot_held_by_one_session_conflicts_for_another() {
    let fixture = Fixture::new();
    let mut first = fixture.orchestrator();
    let mut second = fixture.orchestrator();

    walk_to_scheduling(&mut first).await;
    walk_to_scheduling(&mut second).await;

    let slots = first.load_slots(booking_date()).await.unwrap().unwrap();
    let target = slots.iter().find(|s| s.time == ten_oclock()).unwrap().clone();
    first.select_slot(target.id).await.unwrap();

    // The second session re-lists and sees the hold.
    let listed = second.load_slots(booking_date()).await.unwrap().unwrap();
    let contested = listed.iter().find(|s| s.id == target.id).unwrap();
    assert!(contested.reserved);

    let result = second.select_slot(target.id).await;
    assert_matches!(result, Err(BookingError::SlotConflict));
    assert!(second.state().draft.appointment.is_none());

    // Another slot works fine.
    let free = listed
        .iter()
        .find(|s| s.id != target.id && s.is_free(chrono::Utc::now()))
        .unwrap()
        .clone();
    let appointment = second.select_slot(free.id).await.unwrap();
    assert_eq!(appointment.slot.id, free.id);
}

#[tokio::test]
async fn test_unavailable_location_and_service_are_not_selectable() {
    let fixture = Fixture::new();
    let mut orch = fixture.orchestrator();

    orch.search_patient("12345678").await.unwrap();
    orch.advance().await.unwrap();

    let locations = orch.load_locations().await.unwrap();
    let closed = locations
        .iter()
        .find(|l| l.name == "Sede Callao")
        .unwrap()
        .clone();
    assert_matches!(
        orch.select_location(closed.id),
        Err(BookingError::LocationUnavailable(_))
    );

    let open = locations
        .iter()
        .find(|l| l.name == "Sede Surco")
        .unwrap()
        .clone();
    orch.select_location(open.id).unwrap();
    orch.advance().await.unwrap();

    let services = orch.load_services().await.unwrap();
    let disabled = services.iter().find(|s| !s.available).unwrap().clone();
    assert_matches!(
        orch.select_service(disabled.id),
        Err(BookingError::ServiceUnavailable(_))
    );
}

#[tokio::test]
async fn test_bounced_notification_leaves_booking_confirmed() {
    let fixture = Fixture::new();
    let mut orch = fixture.orchestrator();

    // Register a patient whose address always bounces.
    orch.search_patient("40404040").await.unwrap();
    let registration = PatientRegistration {
        identity_number: "40404040".to_string(),
        given_names: "Rosa".to_string(),
        family_names: "Paredes Luna".to_string(),
        phone: "955555555".to_string(),
        email: "bounce@example.com".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1992, 3, 8).unwrap(),
    };
    orch.register_patient(registration).await.unwrap();
    orch.advance().await.unwrap();

    let locations = orch.load_locations().await.unwrap();
    let sede = locations
        .iter()
        .find(|l| l.name == "Sede San Isidro")
        .unwrap()
        .clone();
    orch.select_location(sede.id).unwrap();
    orch.advance().await.unwrap();
    let services = orch.load_services().await.unwrap();
    let svc = services.iter().find(|s| s.price == 80.0).unwrap().clone();
    orch.select_service(svc.id).unwrap();
    orch.advance().await.unwrap();
    let slots = orch.load_slots(booking_date()).await.unwrap().unwrap();
    let slot = slots.iter().find(|s| s.time == ten_oclock()).unwrap().clone();
    orch.select_slot(slot.id).await.unwrap();
    orch.advance().await.unwrap();
    orch.submit_payment(PaymentMethod::Transfer, None).await.unwrap();

    assert!(orch.advance().await.unwrap());

    let state = orch.state();
    assert_eq!(state.current_step, BookingStep::Confirmation);
    assert_eq!(
        state.booking.as_ref().unwrap().status,
        BookingStatus::Confirmed
    );
    // Only the notification concern carries the failure.
    assert!(state
        .status
        .error(booking_cell::state::Concern::Notification)
        .is_some());
    assert!(state
        .status
        .error(booking_cell::state::Concern::Booking)
        .is_none());
}
