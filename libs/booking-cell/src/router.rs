use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;

pub fn booking_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(reset_session))
        .route("/sessions/{id}/patient/search", post(search_patient))
        .route("/sessions/{id}/patient/register", post(register_patient))
        .route("/sessions/{id}/locations", get(list_locations))
        .route("/sessions/{id}/location", post(select_location))
        .route("/sessions/{id}/services", get(list_services))
        .route("/sessions/{id}/service", post(select_service))
        .route("/sessions/{id}/discounts", post(apply_discounts))
        .route("/sessions/{id}/slots", get(list_slots))
        .route("/sessions/{id}/slot", post(select_slot))
        .route("/sessions/{id}/payment", post(submit_payment))
        .route("/sessions/{id}/advance", post(advance))
        .route("/sessions/{id}/retreat", post(retreat))
        .route("/sessions/{id}/jump", post(jump_to))
        .route("/sessions/{id}/document", get(booking_document))
        .with_state(state)
}
