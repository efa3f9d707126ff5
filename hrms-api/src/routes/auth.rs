/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/login` - Exchange credentials for tokens
/// - `POST /v1/auth/refresh` - Rotate a refresh token
/// - `POST /v1/auth/logout` - Revoke a refresh token (authenticated)
/// - `GET /v1/auth/me` - Caller profile, companies and permissions (authenticated)
/// - `POST /v1/auth/change-password` - Change password, revoking every session (authenticated)
///
/// Access tokens are HS256 JWTs. Refresh tokens are opaque `rt_` strings; only
/// their SHA-256 hash is stored, and each one can be exchanged once.

use crate::{
    app::AppState,
    error::{validate_request, ApiError, ApiResult},
    response::ApiResponse,
};
use axum::{extract::State, Extension, Json};
use chrono::Utc;
use hrms_shared::{
    auth::{
        jwt::{self, Claims},
        middleware::AuthContext,
        password,
        refresh_token::{generate_refresh_token, hash_refresh_token, validate_refresh_token_format},
    },
    models::{
        permission::Permission, refresh_token::RefreshToken, user::User,
        user_company::UserCompany,
    },
};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh and logout request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Change password request
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    pub new_password: String,
}

/// Token pair returned by login and refresh
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,

    /// Always "Bearer"
    pub token_type: &'static str,

    /// Seconds until the access token expires
    pub expires_in: i64,

    pub user: User,
}

/// Caller profile
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,

    /// Primary company plus every assigned company
    pub company_ids: Vec<Uuid>,

    /// Permission codes held by the caller's role
    pub permissions: Vec<String>,
}

/// Issues an access token and stores a fresh refresh token
///
/// Returns the response and the id of the stored refresh token.
async fn issue_tokens(
    conn: &mut PgConnection,
    state: &AppState,
    user: User,
) -> ApiResult<(TokenResponse, Uuid)> {
    let claims = Claims::new(user.id, user.role, user.company_id, state.config.access_token_ttl());
    let access_token = jwt::create_token(&claims, state.jwt_secret())?;

    let (refresh_token, refresh_hash) = generate_refresh_token();
    let expires_at = Utc::now() + state.config.refresh_token_ttl();
    let stored = RefreshToken::create(&mut *conn, user.id, &refresh_hash, expires_at).await?;

    Ok((
        TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: claims.expires_in(),
            user,
        },
        stored.id,
    ))
}

/// Login
///
/// ```text
/// POST /v1/auth/login
/// { "email": "hr@example.com", "password": "Secur3P@ss!" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email, wrong password or inactive user (same message)
/// - `422 Unprocessable Entity`: validation failed
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<ApiResponse<TokenResponse>> {
    validate_request(&req)?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !user.is_active {
        tracing::debug!(user_id = %user.id, "Login rejected: inactive user");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let mut tx = state.db.begin().await?;
    let (response, _) = issue_tokens(&mut tx, &state, user).await?;
    tx.commit().await?;

    tracing::info!(user_id = %response.user.id, "User logged in");

    Ok(ApiResponse::ok("Login successful", response))
}

/// Refresh-token rotation
///
/// The presented token is revoked and replaced in the same transaction.
/// Presenting a token that was already revoked is treated as theft: every
/// outstanding token of the user is revoked.
///
/// # Errors
///
/// - `401 Unauthorized`: unknown, revoked or expired token, or inactive user
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<ApiResponse<TokenResponse>> {
    validate_request(&req)?;

    if !validate_refresh_token_format(&req.refresh_token) {
        return Err(ApiError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()));
    }

    let token_hash = hash_refresh_token(&req.refresh_token);
    let mut tx = state.db.begin().await?;

    let stored = RefreshToken::find_by_hash_for_update(&mut *tx, &token_hash)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()))?;

    if stored.is_revoked() {
        let revoked = RefreshToken::revoke_all_for_user(&mut *tx, stored.user_id).await?;
        tx.commit().await?;

        tracing::warn!(
            user_id = %stored.user_id,
            revoked,
            "Refresh token reuse detected, revoked all sessions"
        );
        return Err(ApiError::Unauthorized("Refresh token has been revoked".to_string()));
    }

    if stored.is_expired(Utc::now()) {
        return Err(ApiError::Unauthorized("Refresh token has expired".to_string()));
    }

    let user = User::find_by_id(&state.db, stored.user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()))?;

    let (response, replacement_id) = issue_tokens(&mut tx, &state, user).await?;

    if !RefreshToken::revoke(&mut *tx, stored.id, Some(replacement_id)).await? {
        return Err(ApiError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()));
    }

    tx.commit().await?;

    tracing::debug!(user_id = %response.user.id, "Refresh token rotated");

    Ok(ApiResponse::ok("Token refreshed", response))
}

/// Revokes one of the caller's refresh tokens
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<ApiResponse<()>> {
    validate_request(&req)?;

    let token_hash = hash_refresh_token(&req.refresh_token);
    let revoked = RefreshToken::revoke_by_hash(&state.db, auth.user_id, &token_hash).await?;

    tracing::info!(user_id = %auth.user_id, revoked, "User logged out");

    Ok(ApiResponse::empty("Logged out"))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<MeResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let company_ids = UserCompany::accessible_company_ids(&state.db, user.id).await?;
    let permissions = Permission::codes_for_role(&state.db, user.role).await?;

    Ok(ApiResponse::ok(
        "Profile retrieved",
        MeResponse {
            user,
            company_ids,
            permissions,
        },
    ))
}

/// Changes the caller's password and revokes every refresh token
///
/// # Errors
///
/// - `400 Bad Request`: current password is wrong
/// - `422 Unprocessable Entity`: new password too weak or unchanged
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<()>> {
    validate_request(&req)?;
    password::validate_password_strength(&req.new_password)
        .map_err(|msg| ApiError::field("new_password", msg))?;

    if req.new_password == req.current_password {
        return Err(ApiError::field(
            "new_password",
            "New password must differ from the current password",
        ));
    }

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !password::verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::BadRequest("Current password is incorrect".to_string()));
    }

    let new_hash = password::hash_password(&req.new_password)?;

    let mut tx = state.db.begin().await?;
    User::update_password(&mut *tx, user.id, &new_hash).await?;
    let revoked = RefreshToken::revoke_all_for_user(&mut *tx, user.id).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, revoked, "Password changed");

    Ok(ApiResponse::empty("Password changed"))
}
