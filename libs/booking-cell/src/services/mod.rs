pub mod collaborators;
pub mod orchestrator;
pub mod pricing;
pub mod validation;

pub use collaborators::{BookingGateway, CareCatalog, PatientDirectory, RemoteError};
pub use orchestrator::BookingOrchestrator;
