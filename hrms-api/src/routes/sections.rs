/// Section endpoints
///
/// A section belongs to a department and inherits its company from it. Moving
/// a section is allowed only between departments of the same company.

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
        authorization::{Action, CompanyScope, Resource},
        middleware::AuthContext,
    },
    models::{
        department::Department,
        section::{Section, SectionData, SectionFilter},
        Page, PageRequest,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SectionRequest {
    pub department_id: Uuid,

    #[validate(length(min = 1, max = 150, message = "Name must be 1 to 150 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SectionQuery {
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub search: Option<String>,
}

/// Loads the parent department; unknown or invisible departments are a 422
async fn parent_department(
    state: &AppState,
    scope: &CompanyScope,
    department_id: Uuid,
) -> ApiResult<Department> {
    Department::find_by_id(&state.db, department_id)
        .await?
        .filter(|department| scope.allows(department.company_id))
        .ok_or_else(|| ApiError::field("department_id", "Department not found"))
}

pub async fn list_sections(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<SectionQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<ApiResponse<Page<Section>>> {
    let scope = authorize(&state, &auth, Resource::Sections, Action::Read).await?;

    let filter = SectionFilter {
        company_ids: scope.company_filter(query.company_id)?,
        department_id: query.department_id,
        search: query.search,
    };

    Ok(ApiResponse::ok(
        "Sections retrieved",
        Section::list(&state.db, &filter, &page).await?,
    ))
}

pub async fn get_section(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Section>> {
    let scope = authorize(&state, &auth, Resource::Sections, Action::Read).await?;
    let section = visible(Section::find_by_id(&state.db, id).await?, &scope, "Section not found")?;

    Ok(ApiResponse::ok("Section retrieved", section))
}

pub async fn create_section(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SectionRequest>,
) -> ApiResult<ApiResponse<Section>> {
    let scope = authorize(&state, &auth, Resource::Sections, Action::Write).await?;
    validate_request(&req)?;
    let department = parent_department(&state, &scope, req.department_id).await?;

    let section = Section::create(
        &state.db,
        SectionData {
            company_id: department.company_id,
            department_id: department.id,
            name: req.name,
            description: non_empty(req.description),
            is_active: req.is_active,
        },
    )
    .await?;

    Ok(ApiResponse::created("Section created", section))
}

pub async fn update_section(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SectionRequest>,
) -> ApiResult<ApiResponse<Section>> {
    let scope = authorize(&state, &auth, Resource::Sections, Action::Write).await?;
    let current = visible(Section::find_by_id(&state.db, id).await?, &scope, "Section not found")?;
    validate_request(&req)?;

    let department = parent_department(&state, &scope, req.department_id).await?;
    if department.company_id != current.company_id {
        return Err(ApiError::field(
            "department_id",
            "Department belongs to another company",
        ));
    }

    let section = Section::update(
        &state.db,
        id,
        SectionData {
            company_id: current.company_id,
            department_id: department.id,
            name: req.name,
            description: non_empty(req.description),
            is_active: req.is_active,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Section not found".to_string()))?;

    Ok(ApiResponse::ok("Section updated", section))
}

pub async fn delete_section(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let scope = authorize(&state, &auth, Resource::Sections, Action::Delete).await?;
    visible(Section::find_by_id(&state.db, id).await?, &scope, "Section not found")?;

    Section::delete(&state.db, id).await?;

    Ok(ApiResponse::empty("Section deleted"))
}
