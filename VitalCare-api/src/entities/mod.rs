// Public request and response shapes of the HTTP API.
// Domain entities are serialized directly; this module adds what only the wire needs.

// Errors, pagination
pub mod common;

// Appointment list filters
pub mod appointment;

// Token carried by the real-time upgrade request
pub mod realtime;

pub use common::{ErrorResponse, PaginatedResponse, PaginationQuery};
