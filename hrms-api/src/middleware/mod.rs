/// Middleware for the API server
///
/// - `security`: response security headers
/// - `auth`: bearer token authentication for `/v1` routes

pub mod auth;
pub mod security;
