use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};

use booking_cell::handlers::AppState;
use booking_cell::router::booking_routes;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "SanaVida booking API is running!" }))
        .nest("/booking", booking_routes(state))
}
