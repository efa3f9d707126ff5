/// Bearer token authentication
///
/// Validates the access token of every `/v1` request outside the public auth
/// routes and stores the [`AuthContext`] in the request extensions.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use hrms_shared::auth::middleware::{authenticate_request, AuthContext};

use crate::{app::AppState, error::ApiError};

pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth: AuthContext = authenticate_request(req.headers(), state.jwt_secret())?;

    tracing::debug!(user_id = %auth.user_id, role = auth.role.as_str(), "Authenticated request");
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
