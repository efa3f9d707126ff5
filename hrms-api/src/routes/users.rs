/// User administration endpoints
///
/// Users are scoped by their primary company: non-admin callers see and
/// manage only users whose `company_id` is in their scope. Admin accounts
/// without a primary company are visible to admins only.

use crate::{
    app::AppState,
    error::{validate_request, ApiError, ApiResult},
    response::ApiResponse,
    routes::{authorize, default_true, visible},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use hrms_shared::{
    auth::{
        authorization::{Action, CompanyScope, Resource},
        middleware::AuthContext,
        password,
    },
    models::{
        company::Company,
        user::{CreateUser, UpdateUser, User, UserFilter, UserRole},
        user_company::UserCompany,
        Page, PageRequest,
    },
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 200, message = "Full name must be 1 to 200 characters"))]
    pub full_name: String,

    pub role: UserRole,

    /// Primary company, required for non-admin roles
    pub company_id: Option<Uuid>,

    /// Additional companies
    #[serde(default)]
    pub company_ids: Vec<Uuid>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 200, message = "Full name must be 1 to 200 characters"))]
    pub full_name: String,

    pub role: UserRole,
    pub company_id: Option<Uuid>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CompaniesRequest {
    pub company_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub company_id: Option<Uuid>,
    pub role: Option<UserRole>,
    pub search: Option<String>,
}

/// User with the companies assigned on top of the primary one
#[derive(Debug, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,

    pub company_ids: Vec<Uuid>,
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

fn require_assignable(auth: &AuthContext, role: UserRole) -> ApiResult<()> {
    if auth.role.can_assign(role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "Only a super admin can manage '{}' users",
            role
        )))
    }
}

/// Non-admin users always belong to a company
fn primary_company(role: UserRole, company_id: Option<Uuid>) -> ApiResult<Option<Uuid>> {
    match company_id {
        None if !role.is_admin() => Err(ApiError::field(
            "company_id",
            "Company is required for this role",
        )),
        other => Ok(other),
    }
}

/// Every company must be in scope (403) and exist (422)
async fn check_companies(state: &AppState, scope: &CompanyScope, ids: &[Uuid]) -> ApiResult<()> {
    for id in ids {
        scope.ensure(*id)?;
    }

    let missing = Company::missing_ids(&state.db, ids).await?;
    if !missing.is_empty() {
        let missing: Vec<String> = missing.iter().map(Uuid::to_string).collect();
        return Err(ApiError::field(
            "company_ids",
            format!("Unknown companies: {}", missing.join(", ")),
        ));
    }

    Ok(())
}

/// Rejects changes that would leave the system without an active super admin
async fn keep_super_admin(state: &AppState, current: &User) -> ApiResult<()> {
    if current.role == UserRole::SuperAdmin
        && current.is_active
        && User::count_active_by_role(&state.db, UserRole::SuperAdmin).await? <= 1
    {
        return Err(ApiError::BadRequest(
            "The last super admin cannot be removed or demoted".to_string(),
        ));
    }
    Ok(())
}

async fn load_user(state: &AppState, scope: &CompanyScope, id: Uuid) -> ApiResult<User> {
    visible(User::find_by_id(&state.db, id).await?, scope, "User not found")
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<UserQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<ApiResponse<Page<User>>> {
    let scope = authorize(&state, &auth, Resource::Users, Action::Read).await?;

    let filter = UserFilter {
        company_ids: scope.company_filter(query.company_id)?,
        role: query.role,
        search: query.search,
    };

    Ok(ApiResponse::ok(
        "Users retrieved",
        User::list(&state.db, &filter, &page).await?,
    ))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<UserDetail>> {
    let scope = authorize(&state, &auth, Resource::Users, Action::Read).await?;
    let user = load_user(&state, &scope, id).await?;
    let company_ids = UserCompany::list_for_user(&state.db, user.id).await?;

    Ok(ApiResponse::ok("User retrieved", UserDetail { user, company_ids }))
}

/// Creates a user with its company assignments
///
/// ```text
/// POST /v1/users
/// {
///   "email": "supervisor@example.com",
///   "password": "Secur3P@ss!",
///   "full_name": "Line Supervisor",
///   "role": "manager",
///   "company_id": "…",
///   "company_ids": ["…"]
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: admin role requested by a non super admin, or a
///   company outside the caller's scope
/// - `409 Conflict`: email already registered
/// - `422 Unprocessable Entity`: validation failed, weak password, unknown
///   company
pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<ApiResponse<UserDetail>> {
    let scope = authorize(&state, &auth, Resource::Users, Action::Write).await?;
    validate_request(&req)?;
    password::validate_password_strength(&req.password)
        .map_err(|msg| ApiError::field("password", msg))?;

    require_assignable(&auth, req.role)?;
    let company_id = primary_company(req.role, req.company_id)?;

    let extra = dedup(&req.company_ids);
    let mut all: Vec<Uuid> = extra.clone();
    all.extend(company_id);
    check_companies(&state, &scope, &dedup(&all)).await?;

    let password_hash = password::hash_password(&req.password)?;

    let mut tx = state.db.begin().await?;
    let user = User::create(
        &mut *tx,
        CreateUser {
            email: req.email,
            password_hash,
            full_name: req.full_name.trim().to_string(),
            role: req.role,
            company_id,
            is_active: req.is_active,
        },
    )
    .await?;
    UserCompany::replace_for_user(&mut tx, user.id, &extra).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %user.id,
        role = user.role.as_str(),
        created_by = %auth.user_id,
        "User created"
    );

    Ok(ApiResponse::created(
        "User created",
        UserDetail {
            user,
            company_ids: extra,
        },
    ))
}

/// Replaces name, role, primary company and active flag
///
/// Callers cannot change their own role or deactivate themselves.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    let scope = authorize(&state, &auth, Resource::Users, Action::Write).await?;
    let current = load_user(&state, &scope, id).await?;
    validate_request(&req)?;

    require_assignable(&auth, current.role)?;
    require_assignable(&auth, req.role)?;

    if id == auth.user_id && (req.role != current.role || !req.is_active) {
        return Err(ApiError::BadRequest(
            "You cannot change your own role or deactivate yourself".to_string(),
        ));
    }

    if req.role != UserRole::SuperAdmin || !req.is_active {
        keep_super_admin(&state, &current).await?;
    }

    let company_id = primary_company(req.role, req.company_id)?;
    if let Some(company_id) = company_id {
        if Some(company_id) != current.company_id {
            check_companies(&state, &scope, &[company_id]).await?;
        }
    }

    let user = User::update(
        &state.db,
        id,
        UpdateUser {
            full_name: req.full_name.trim().to_string(),
            role: req.role,
            company_id,
            is_active: req.is_active,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %id, updated_by = %auth.user_id, "User updated");

    Ok(ApiResponse::ok("User updated", user))
}

/// Replaces the additional company assignments of a user
pub async fn replace_user_companies(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompaniesRequest>,
) -> ApiResult<ApiResponse<UserDetail>> {
    let scope = authorize(&state, &auth, Resource::Users, Action::Write).await?;
    let user = load_user(&state, &scope, id).await?;
    require_assignable(&auth, user.role)?;

    let company_ids = dedup(&req.company_ids);
    check_companies(&state, &scope, &company_ids).await?;

    let mut tx = state.db.begin().await?;
    UserCompany::replace_for_user(&mut tx, user.id, &company_ids).await?;
    tx.commit().await?;

    tracing::info!(user_id = %id, companies = company_ids.len(), "User companies replaced");

    Ok(ApiResponse::ok(
        "User companies updated",
        UserDetail { user, company_ids },
    ))
}

/// # Errors
///
/// - `400 Bad Request`: deleting yourself or the last super admin
/// - `403 Forbidden`: target holds a role the caller cannot manage
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let scope = authorize(&state, &auth, Resource::Users, Action::Delete).await?;

    if id == auth.user_id {
        return Err(ApiError::BadRequest("You cannot delete your own account".to_string()));
    }

    let user = load_user(&state, &scope, id).await?;
    require_assignable(&auth, user.role)?;
    keep_super_admin(&state, &user).await?;

    User::delete(&state.db, id).await?;

    tracing::info!(user_id = %id, deleted_by = %auth.user_id, "User deleted");

    Ok(ApiResponse::empty("User deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_company_required_for_staff() {
        assert!(primary_company(UserRole::Manager, None).is_err());
        assert!(primary_company(UserRole::Employee, None).is_err());
        assert_eq!(primary_company(UserRole::Admin, None).unwrap(), None);

        let company = Uuid::new_v4();
        assert_eq!(
            primary_company(UserRole::HrManager, Some(company)).unwrap(),
            Some(company)
        );
    }

    #[test]
    fn test_dedup_sorts_and_removes_duplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let ids = dedup(&[a, b, a, b]);
        assert_eq!(ids.len(), 2);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "email": "clerk@example.com",
            "password": "Secur3P@ss!",
            "full_name": "Clerk",
            "role": "employee",
            "company_id": Uuid::new_v4(),
        }))
        .unwrap();

        assert!(req.is_active);
        assert!(req.company_ids.is_empty());
        assert!(validate_request(&req).is_ok());
    }
}
