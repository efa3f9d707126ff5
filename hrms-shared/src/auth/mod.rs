/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: access token issuance and validation
/// - [`refresh_token`]: opaque refresh token generation and hashing
/// - [`middleware`]: request authentication context
/// - [`authorization`]: roles, permissions and company scope

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod refresh_token;
