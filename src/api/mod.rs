/// CORS policy built from the configured origin list
pub mod cors;
/// API error types and handling
pub mod errors;
/// HTTP handlers and their request/response payloads
pub mod handlers;
/// Routes configuration and setup
pub mod routes;
/// HTTP server implementation
pub mod server;
