/// Permission and role-grant endpoints
///
/// # Endpoints
///
/// - `GET /v1/permissions`, `POST /v1/permissions`
/// - `GET /v1/roles`
/// - `GET|PUT /v1/roles/:role/permissions`
///
/// Permission codes have the `<resource>.<action>` shape. `super_admin`
/// bypasses every check, so its grants are not editable.

use crate::{
    app::AppState,
    error::{validate_request, ApiError, ApiResult},
    response::ApiResponse,
    routes::non_empty,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use hrms_shared::{
    auth::{
        authorization::{is_known_permission_code, require_permission, Action, Resource},
        middleware::AuthContext,
    },
    models::{
        permission::{Permission, RolePermissions},
        user::UserRole,
    },
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct PermissionRequest {
    #[validate(length(min = 3, max = 100, message = "Code must be 3 to 100 characters"))]
    pub code: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RolePermissionsRequest {
    pub codes: Vec<String>,
}

/// `resource.action` in lower-case snake case
fn is_code_shape(code: &str) -> bool {
    let part = |s: &str| {
        !s.is_empty()
            && !s.starts_with('_')
            && s.chars().all(|c| c.is_ascii_lowercase() || c == '_')
    };

    match code.split_once('.') {
        Some((resource, action)) => part(resource) && part(action),
        None => false,
    }
}

fn parse_role(role: &str) -> ApiResult<UserRole> {
    role.parse()
        .map_err(|_| ApiError::NotFound(format!("Role '{}' not found", role)))
}

pub async fn list_permissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<Permission>>> {
    require_permission(&state.db, &auth, Resource::Permissions, Action::Read).await?;

    Ok(ApiResponse::ok(
        "Permissions retrieved",
        Permission::list(&state.db).await?,
    ))
}

/// Defines a new permission code
///
/// # Errors
///
/// - `409 Conflict`: code already defined
/// - `422 Unprocessable Entity`: code not of the `resource.action` shape
pub async fn create_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<PermissionRequest>,
) -> ApiResult<ApiResponse<Permission>> {
    require_permission(&state.db, &auth, Resource::Permissions, Action::Write).await?;
    validate_request(&req)?;

    let code = req.code.trim().to_lowercase();
    if !is_code_shape(&code) {
        return Err(ApiError::field(
            "code",
            "Code must look like 'resource.action'",
        ));
    }

    if !is_known_permission_code(&code) {
        tracing::debug!(%code, "Defining permission outside the built-in set");
    }

    let permission =
        Permission::create(&state.db, &code, non_empty(req.description).as_deref()).await?;

    tracing::info!(code = %permission.code, created_by = %auth.user_id, "Permission created");

    Ok(ApiResponse::created("Permission created", permission))
}

pub async fn list_roles(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<RolePermissions>>> {
    require_permission(&state.db, &auth, Resource::Permissions, Action::Read).await?;

    Ok(ApiResponse::ok(
        "Roles retrieved",
        Permission::all_role_permissions(&state.db).await?,
    ))
}

pub async fn get_role_permissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(role): Path<String>,
) -> ApiResult<ApiResponse<RolePermissions>> {
    require_permission(&state.db, &auth, Resource::Permissions, Action::Read).await?;
    let role = parse_role(&role)?;

    Ok(ApiResponse::ok(
        "Role permissions retrieved",
        RolePermissions {
            role,
            permissions: Permission::codes_for_role(&state.db, role).await?,
        },
    ))
}

/// Replaces every grant of a role in one transaction
///
/// # Errors
///
/// - `400 Bad Request`: the role is `super_admin`
/// - `404 Not Found`: unknown role
/// - `422 Unprocessable Entity`: one or more codes are not defined
pub async fn replace_role_permissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(role): Path<String>,
    Json(req): Json<RolePermissionsRequest>,
) -> ApiResult<ApiResponse<RolePermissions>> {
    require_permission(&state.db, &auth, Resource::Permissions, Action::Write).await?;
    let role = parse_role(&role)?;

    if role == UserRole::SuperAdmin {
        return Err(ApiError::BadRequest(
            "The super_admin role always holds every permission".to_string(),
        ));
    }

    let mut codes: Vec<String> = req.codes.iter().map(|c| c.trim().to_lowercase()).collect();
    codes.sort();
    codes.dedup();

    let found = Permission::find_by_codes(&state.db, &codes).await?;
    let unknown: Vec<&str> = codes
        .iter()
        .filter(|code| !found.iter().any(|p| &p.code == *code))
        .map(String::as_str)
        .collect();

    if !unknown.is_empty() {
        return Err(ApiError::field(
            "codes",
            format!("Unknown permission codes: {}", unknown.join(", ")),
        ));
    }

    let ids: Vec<_> = found.iter().map(|p| p.id).collect();

    let mut tx = state.db.begin().await?;
    Permission::replace_role_permissions(&mut tx, role, &ids).await?;
    tx.commit().await?;

    tracing::info!(
        role = role.as_str(),
        permissions = ids.len(),
        updated_by = %auth.user_id,
        "Role permissions replaced"
    );

    Ok(ApiResponse::ok(
        "Role permissions updated",
        RolePermissions {
            role,
            permissions: codes,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        assert!(is_code_shape("employees.read"));
        assert!(is_code_shape("payroll.approve"));
        assert!(is_code_shape("leave_requests.write"));

        assert!(!is_code_shape("employees"));
        assert!(!is_code_shape("employees."));
        assert!(!is_code_shape(".read"));
        assert!(!is_code_shape("Employees.Read"));
        assert!(!is_code_shape("employees.read.all"));
        assert!(!is_code_shape("_x.read"));
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("hr_manager").unwrap(), UserRole::HrManager);
        assert!(matches!(parse_role("owner"), Err(ApiError::NotFound(_))));
    }
}
