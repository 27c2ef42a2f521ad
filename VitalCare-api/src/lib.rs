// VitalCare API
//
// HTTP surface of the VitalCare backend: routing, handlers, the real-time
// notification socket and the OpenAPI document.

// Public modules
pub mod api;
pub mod entities;
pub mod openapi;
