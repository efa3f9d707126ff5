/// Designation endpoints (job titles with an optional grade)

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
        designation::{Designation, DesignationData, DesignationFilter},
        Page, PageRequest,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct DesignationRequest {
    pub company_id: Option<Uuid>,

    #[validate(length(min = 1, max = 150, message = "Name must be 1 to 150 characters"))]
    pub name: String,

    #[validate(length(max = 50, message = "Grade must be at most 50 characters"))]
    pub grade: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl DesignationRequest {
    fn into_data(self, company_id: Uuid) -> DesignationData {
        DesignationData {
            company_id,
            name: self.name,
            grade: non_empty(self.grade),
            description: non_empty(self.description),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DesignationQuery {
    pub company_id: Option<Uuid>,
    pub grade: Option<String>,
    pub search: Option<String>,
}

pub async fn list_designations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<DesignationQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<ApiResponse<Page<Designation>>> {
    let scope = authorize(&state, &auth, Resource::Designations, Action::Read).await?;

    let filter = DesignationFilter {
        company_ids: scope.company_filter(query.company_id)?,
        grade: non_empty(query.grade),
        search: query.search,
    };

    Ok(ApiResponse::ok(
        "Designations retrieved",
        Designation::list(&state.db, &filter, &page).await?,
    ))
}

pub async fn get_designation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Designation>> {
    let scope = authorize(&state, &auth, Resource::Designations, Action::Read).await?;
    let designation = visible(
        Designation::find_by_id(&state.db, id).await?,
        &scope,
        "Designation not found",
    )?;

    Ok(ApiResponse::ok("Designation retrieved", designation))
}

pub async fn create_designation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<DesignationRequest>,
) -> ApiResult<ApiResponse<Designation>> {
    let scope = authorize(&state, &auth, Resource::Designations, Action::Write).await?;
    validate_request(&req)?;
    let company_id = target_company(req.company_id, &scope)?;

    let designation = Designation::create(&state.db, req.into_data(company_id)).await?;

    Ok(ApiResponse::created("Designation created", designation))
}

pub async fn update_designation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<DesignationRequest>,
) -> ApiResult<ApiResponse<Designation>> {
    let scope = authorize(&state, &auth, Resource::Designations, Action::Write).await?;
    let current = visible(
        Designation::find_by_id(&state.db, id).await?,
        &scope,
        "Designation not found",
    )?;
    validate_request(&req)?;
    same_company(req.company_id, current.company_id)?;

    let designation = Designation::update(&state.db, id, req.into_data(current.company_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Designation not found".to_string()))?;

    Ok(ApiResponse::ok("Designation updated", designation))
}

pub async fn delete_designation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let scope = authorize(&state, &auth, Resource::Designations, Action::Delete).await?;
    visible(
        Designation::find_by_id(&state.db, id).await?,
        &scope,
        "Designation not found",
    )?;

    Designation::delete(&state.db, id).await?;

    Ok(ApiResponse::empty("Designation deleted"))
}
