// VitalCare Domain
// Business logic for appointments, health records and notifications

// Services that implement business logic
pub mod services;

// Authentication
pub mod auth;

// Domain entities
pub mod entities;

// Health checks and system status
pub mod health;

// Re-export the database module from the data crate for convenience
pub use vital_care_data::database;

// Testing utilities - compiled for unit tests and with the mock feature
#[cfg(any(test, feature = "mock"))]
pub mod testing;
