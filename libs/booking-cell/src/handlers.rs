// libs/booking-cell/src/handlers.rs
use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{BookingError, CardDetails, Discount, PatientRegistration, PaymentMethod};
use crate::services::collaborators::{BookingGateway, CareCatalog, PatientDirectory};
use crate::services::orchestrator::BookingOrchestrator;
use crate::steps::BookingStep;

// ==============================================================================
// SHARED STATE
// ==============================================================================

/// One orchestrator per booking session, each behind its own lock so a
/// session's transitions stay run-to-completion.
pub struct AppState {
    directory: Arc<dyn PatientDirectory>,
    catalog: Arc<dyn CareCatalog>,
    gateway: Arc<dyn BookingGateway>,
    hold_ttl_minutes: i64,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<BookingOrchestrator>>>>,
}

impl AppState {
    pub fn new(
        directory: Arc<dyn PatientDirectory>,
        catalog: Arc<dyn CareCatalog>,
        gateway: Arc<dyn BookingGateway>,
        hold_ttl_minutes: i64,
    ) -> Self {
        Self {
            directory,
            catalog,
            gateway,
            hold_ttl_minutes,
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match &err {
            BookingError::ValidationFailed { issues } => {
                let detail = issues
                    .iter()
                    .map(|i| format!("{}: {}", i.field, i.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                AppError::ValidationError(detail)
            }
            BookingError::RemoteUnavailable { .. } => AppError::ExternalService(err.to_string()),
            BookingError::SlotConflict
            | BookingError::HoldMismatch(_)
            | BookingError::HoldExpired(_)
            | BookingError::OperationInFlight(_)
            | BookingError::AlreadyConfirmed => AppError::Conflict(err.to_string()),
            BookingError::PaymentDeclined(message) => AppError::PaymentDeclined(message.clone()),
            BookingError::MissingSelection(_)
            | BookingError::LocationUnavailable(_)
            | BookingError::ServiceUnavailable(_)
            | BookingError::StepNotCompleted(_) => AppError::BadRequest(err.to_string()),
            BookingError::UnknownLocation(_)
            | BookingError::UnknownService(_)
            | BookingError::UnknownSlot(_) => AppError::NotFound(err.to_string()),
            BookingError::BookingFailed(_) => AppError::ExternalService(err.to_string()),
        }
    }
}

async fn session(
    state: &AppState,
    id: Uuid,
) -> Result<Arc<Mutex<BookingOrchestrator>>, AppError> {
    state
        .sessions
        .read()
        .await
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("No booking session {}", id)))
}

fn step_view(step: BookingStep) -> Value {
    json!({ "name": step, "ordinal": step.ordinal() })
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchPatientRequest {
    pub identity_number: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectLocationRequest {
    pub location_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SelectServiceRequest {
    pub service_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct SelectSlotRequest {
    pub slot_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub card: Option<CardDetails>,
}

#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    pub step: BookingStep,
}

#[derive(Debug, Deserialize)]
pub struct DiscountsRequest {
    pub discounts: Vec<Discount>,
}

// ==============================================================================
// SESSION LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn create_session(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let id = Uuid::new_v4();
    let orchestrator = BookingOrchestrator::new(
        Arc::clone(&state.directory),
        Arc::clone(&state.catalog),
        Arc::clone(&state.gateway),
        state.hold_ttl_minutes,
    );
    state
        .sessions
        .write()
        .await
        .insert(id, Arc::new(Mutex::new(orchestrator)));

    info!("Created booking session {}", id);
    Ok(Json(json!({ "session_id": id })))
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let orchestrator = orchestrator.lock().await;
    let snapshot = orchestrator.state();

    Ok(Json(json!({
        "session_id": id,
        "current_step": step_view(snapshot.current_step),
        "max_step": step_view(snapshot.max_step),
        "draft": snapshot.draft,
        "status": snapshot.status,
        "booking": snapshot.booking,
    })))
}

#[axum::debug_handler]
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    orchestrator.lock().await.reset();
    Ok(Json(json!({ "session_id": id, "reset": true })))
}

// ==============================================================================
// STEP 1: PATIENT
// ==============================================================================

#[axum::debug_handler]
pub async fn search_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SearchPatientRequest>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let mut orchestrator = orchestrator.lock().await;

    match orchestrator.search_patient(&request.identity_number).await? {
        Some(patient) => Ok(Json(json!({ "found": true, "patient": patient }))),
        None => Ok(Json(json!({
            "found": false,
            // Pre-fill for the registration form.
            "identity_number": request.identity_number,
        }))),
    }
}

#[axum::debug_handler]
pub async fn register_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(registration): Json<PatientRegistration>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let patient = orchestrator
        .lock()
        .await
        .register_patient(registration)
        .await?;
    Ok(Json(json!({ "patient": patient })))
}

// ==============================================================================
// STEPS 2-3: LOCATION AND SERVICE
// ==============================================================================

#[axum::debug_handler]
pub async fn list_locations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let locations = orchestrator.lock().await.load_locations().await?;
    let total = locations.len();
    Ok(Json(json!({ "locations": locations, "total": total })))
}

#[axum::debug_handler]
pub async fn select_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectLocationRequest>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let location = orchestrator
        .lock()
        .await
        .select_location(request.location_id)?;
    Ok(Json(json!({ "location": location })))
}

#[axum::debug_handler]
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let services = orchestrator.lock().await.load_services().await?;
    let total = services.len();
    Ok(Json(json!({ "services": services, "total": total })))
}

#[axum::debug_handler]
pub async fn select_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectServiceRequest>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let mut orchestrator = orchestrator.lock().await;
    let service = orchestrator.select_service(request.service_id)?;
    Ok(Json(json!({
        "service": service,
        "pricing": orchestrator.state().draft.pricing,
    })))
}

#[axum::debug_handler]
pub async fn apply_discounts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<DiscountsRequest>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let mut orchestrator = orchestrator.lock().await;
    orchestrator.apply_discounts(request.discounts);
    Ok(Json(json!({ "pricing": orchestrator.state().draft.pricing })))
}

// ==============================================================================
// STEP 4: SLOTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let mut orchestrator = orchestrator.lock().await;

    match orchestrator.load_slots(query.date).await? {
        Some(slots) => {
            let total = slots.len();
            Ok(Json(json!({ "slots": slots, "total": total })))
        }
        // Superseded while in flight; the previous snapshot still stands.
        None => Ok(Json(json!({
            "slots": orchestrator.slots(),
            "superseded": true,
        }))),
    }
}

#[axum::debug_handler]
pub async fn select_slot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let appointment = orchestrator
        .lock()
        .await
        .select_slot(request.slot_id)
        .await?;
    Ok(Json(json!({ "appointment": appointment })))
}

// ==============================================================================
// STEP 5: PAYMENT
// ==============================================================================

#[axum::debug_handler]
pub async fn submit_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let payment = orchestrator
        .lock()
        .await
        .submit_payment(request.method, request.card)
        .await?;
    Ok(Json(json!({ "payment": payment })))
}

// ==============================================================================
// NAVIGATION AND CONFIRMATION
// ==============================================================================

#[axum::debug_handler]
pub async fn advance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let mut orchestrator = orchestrator.lock().await;
    let advanced = orchestrator.advance().await?;
    let snapshot = orchestrator.state();

    Ok(Json(json!({
        "advanced": advanced,
        "current_step": step_view(snapshot.current_step),
        "booking": snapshot.booking,
    })))
}

#[axum::debug_handler]
pub async fn retreat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let mut orchestrator = orchestrator.lock().await;
    let retreated = orchestrator.retreat();
    Ok(Json(json!({
        "retreated": retreated,
        "current_step": step_view(orchestrator.state().current_step),
    })))
}

#[axum::debug_handler]
pub async fn jump_to(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<JumpRequest>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let mut orchestrator = orchestrator.lock().await;
    orchestrator.jump_to(request.step)?;
    Ok(Json(json!({
        "current_step": step_view(orchestrator.state().current_step),
    })))
}

#[axum::debug_handler]
pub async fn booking_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let orchestrator = session(&state, id).await?;
    let document = orchestrator.lock().await.fetch_document().await?;
    Ok(Json(json!({ "document": document })))
}
