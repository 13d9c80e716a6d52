pub mod seed;
pub mod services;

pub use seed::CatalogSeed;
pub use services::catalog::InMemoryCareCatalog;
pub use services::directory::InMemoryPatientDirectory;
pub use services::gateway::InMemoryBookingGateway;
