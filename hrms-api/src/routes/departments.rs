/// Department endpoints
///
/// - `GET /v1/departments?company_id&is_active&search&page&page_size`
/// - `GET /v1/departments/:id`
/// - `POST /v1/departments`
/// - `PUT /v1/departments/:id`
/// - `DELETE /v1/departments/:id`

use crate::{
    app::AppState,
    error::{validate_request, ApiError, ApiResult},
    response::ApiResponse,
    routes::{authorize, default_true, non_empty, same_company, target_company, visible},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use hrms_shared::{
    auth::{
        authorization::{Action, Resource},
        middleware::AuthContext,
    },
    models::{
        department::{Department, DepartmentData, DepartmentFilter},
        Page, PageRequest,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct DepartmentRequest {
    /// Required on create; must not change on update
    pub company_id: Option<Uuid>,

    #[validate(length(min = 1, max = 150, message = "Name must be 1 to 150 characters"))]
    pub name: String,

    #[validate(length(max = 20, message = "Code must be at most 20 characters"))]
    pub code: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl DepartmentRequest {
    fn into_data(self, company_id: Uuid) -> DepartmentData {
        DepartmentData {
            company_id,
            name: self.name,
            code: non_empty(self.code),
            description: non_empty(self.description),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DepartmentQuery {
    pub company_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

pub async fn list_departments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<DepartmentQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<ApiResponse<Page<Department>>> {
    let scope = authorize(&state, &auth, Resource::Departments, Action::Read).await?;

    let filter = DepartmentFilter {
        company_ids: scope.company_filter(query.company_id)?,
        is_active: query.is_active,
        search: query.search,
    };

    Ok(ApiResponse::ok(
        "Departments retrieved",
        Department::list(&state.db, &filter, &page).await?,
    ))
}

pub async fn get_department(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Department>> {
    let scope = authorize(&state, &auth, Resource::Departments, Action::Read).await?;
    let department = visible(
        Department::find_by_id(&state.db, id).await?,
        &scope,
        "Department not found",
    )?;

    Ok(ApiResponse::ok("Department retrieved", department))
}

/// Creates a department
///
/// # Errors
///
/// - `403 Forbidden`: company outside the caller's scope
/// - `409 Conflict`: name already used in the company
pub async fn create_department(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<DepartmentRequest>,
) -> ApiResult<ApiResponse<Department>> {
    let scope = authorize(&state, &auth, Resource::Departments, Action::Write).await?;
    validate_request(&req)?;
    let company_id = target_company(req.company_id, &scope)?;

    let department = Department::create(&state.db, req.into_data(company_id)).await?;
    tracing::info!(department_id = %department.id, %company_id, "Department created");

    Ok(ApiResponse::created("Department created", department))
}

pub async fn update_department(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<DepartmentRequest>,
) -> ApiResult<ApiResponse<Department>> {
    let scope = authorize(&state, &auth, Resource::Departments, Action::Write).await?;
    let current = visible(
        Department::find_by_id(&state.db, id).await?,
        &scope,
        "Department not found",
    )?;
    validate_request(&req)?;
    same_company(req.company_id, current.company_id)?;

    let department = Department::update(&state.db, id, req.into_data(current.company_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Department not found".to_string()))?;

    Ok(ApiResponse::ok("Department updated", department))
}

/// Deletes a department; 409 while sections or employees reference it
pub async fn delete_department(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let scope = authorize(&state, &auth, Resource::Departments, Action::Delete).await?;
    visible(
        Department::find_by_id(&state.db, id).await?,
        &scope,
        "Department not found",
    )?;

    Department::delete(&state.db, id).await?;
    tracing::info!(department_id = %id, "Department deleted");

    Ok(ApiResponse::empty("Department deleted"))
}
