/// Company endpoints
///
/// Companies are the tenants. Non-admin callers see the companies they are
/// assigned to; creating and deleting companies is reserved for admin roles
/// regardless of granted permissions.

use crate::{
    app::AppState,
    error::{validate_request, ApiError, ApiResult},
    response::ApiResponse,
    routes::{authorize, default_true, non_empty, visible},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use hrms_shared::{
    auth::{
        authorization::{require_admin, Action, Resource},
        middleware::AuthContext,
    },
    models::{
        company::{Company, CompanyData, CompanyFilter},
        Page, PageRequest,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create/replace body
#[derive(Debug, Deserialize, Validate)]
pub struct CompanyRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: String,

    /// Stored upper-case
    #[validate(length(min = 2, max = 20, message = "Code must be 2 to 20 characters"))]
    pub code: String,

    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<CompanyRequest> for CompanyData {
    fn from(req: CompanyRequest) -> Self {
        CompanyData {
            name: req.name,
            code: req.code,
            address: non_empty(req.address),
            phone: non_empty(req.phone),
            email: non_empty(req.email),
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CompanyQuery {
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

pub async fn list_companies(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<CompanyQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<ApiResponse<Page<Company>>> {
    let scope = authorize(&state, &auth, Resource::Companies, Action::Read).await?;

    let filter = CompanyFilter {
        company_ids: scope.company_filter(None)?,
        is_active: query.is_active,
        search: query.search,
    };
    let companies = Company::list(&state.db, &filter, &page).await?;

    Ok(ApiResponse::ok("Companies retrieved", companies))
}

pub async fn get_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Company>> {
    let scope = authorize(&state, &auth, Resource::Companies, Action::Read).await?;
    let company = visible(Company::find_by_id(&state.db, id).await?, &scope, "Company not found")?;

    Ok(ApiResponse::ok("Company retrieved", company))
}

/// Creates a company
///
/// # Errors
///
/// - `403 Forbidden`: caller is not an admin
/// - `409 Conflict`: name or code already taken
pub async fn create_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CompanyRequest>,
) -> ApiResult<ApiResponse<Company>> {
    authorize(&state, &auth, Resource::Companies, Action::Write).await?;
    require_admin(&auth)?;
    validate_request(&req)?;

    let company = Company::create(&state.db, req.into()).await?;
    tracing::info!(company_id = %company.id, code = %company.code, "Company created");

    Ok(ApiResponse::created("Company created", company))
}

pub async fn update_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompanyRequest>,
) -> ApiResult<ApiResponse<Company>> {
    let scope = authorize(&state, &auth, Resource::Companies, Action::Write).await?;
    visible(Company::find_by_id(&state.db, id).await?, &scope, "Company not found")?;
    validate_request(&req)?;

    let company = Company::update(&state.db, id, req.into())
        .await?
        .ok_or_else(|| ApiError::NotFound("Company not found".to_string()))?;

    Ok(ApiResponse::ok("Company updated", company))
}

/// Deletes a company
///
/// # Errors
///
/// - `403 Forbidden`: caller is not an admin
/// - `409 Conflict`: departments, employees or other rows still reference it
pub async fn delete_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    authorize(&state, &auth, Resource::Companies, Action::Delete).await?;
    require_admin(&auth)?;

    if !Company::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Company not found".to_string()));
    }
    tracing::info!(company_id = %id, "Company deleted");

    Ok(ApiResponse::empty("Company deleted"))
}
