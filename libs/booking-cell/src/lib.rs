pub mod models;
pub mod state;
pub mod steps;
pub mod handlers;
pub mod router;
pub mod services;

pub use models::*;
pub use state::{BookingAction, BookingState, Concern};
pub use steps::BookingStep;
