/// Degree endpoints (academic qualifications referenced by employees)

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
        degree::{Degree, DegreeData, DegreeFilter},
        Page, PageRequest,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct DegreeRequest {
    pub company_id: Option<Uuid>,

    #[validate(length(min = 1, max = 150, message = "Name must be 1 to 150 characters"))]
    pub name: String,

    #[validate(length(max = 50, message = "Level must be at most 50 characters"))]
    pub level: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl DegreeRequest {
    fn into_data(self, company_id: Uuid) -> DegreeData {
        DegreeData {
            company_id,
            name: self.name,
            level: non_empty(self.level),
            description: non_empty(self.description),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DegreeQuery {
    pub company_id: Option<Uuid>,
    pub level: Option<String>,
    pub search: Option<String>,
}

pub async fn list_degrees(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<DegreeQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<ApiResponse<Page<Degree>>> {
    let scope = authorize(&state, &auth, Resource::Degrees, Action::Read).await?;

    let filter = DegreeFilter {
        company_ids: scope.company_filter(query.company_id)?,
        level: non_empty(query.level),
        search: query.search,
    };

    Ok(ApiResponse::ok(
        "Degrees retrieved",
        Degree::list(&state.db, &filter, &page).await?,
    ))
}

pub async fn get_degree(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Degree>> {
    let scope = authorize(&state, &auth, Resource::Degrees, Action::Read).await?;
    let degree = visible(
        Degree::find_by_id(&state.db, id).await?,
        &scope,
        "Degree not found",
    )?;

    Ok(ApiResponse::ok("Degree retrieved", degree))
}

pub async fn create_degree(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<DegreeRequest>,
) -> ApiResult<ApiResponse<Degree>> {
    let scope = authorize(&state, &auth, Resource::Degrees, Action::Write).await?;
    validate_request(&req)?;
    let company_id = target_company(req.company_id, &scope)?;

    let degree = Degree::create(&state.db, req.into_data(company_id)).await?;

    Ok(ApiResponse::created("Degree created", degree))
}

pub async fn update_degree(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<DegreeRequest>,
) -> ApiResult<ApiResponse<Degree>> {
    let scope = authorize(&state, &auth, Resource::Degrees, Action::Write).await?;
    let current = visible(
        Degree::find_by_id(&state.db, id).await?,
        &scope,
        "Degree not found",
    )?;
    validate_request(&req)?;
    same_company(req.company_id, current.company_id)?;

    let degree = Degree::update(&state.db, id, req.into_data(current.company_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Degree not found".to_string()))?;

    Ok(ApiResponse::ok("Degree updated", degree))
}

/// Deletes a degree; 409 while employees reference it
pub async fn delete_degree(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let scope = authorize(&state, &auth, Resource::Degrees, Action::Delete).await?;
    visible(
        Degree::find_by_id(&state.db, id).await?,
        &scope,
        "Degree not found",
    )?;

    Degree::delete(&state.db, id).await?;

    Ok(ApiResponse::empty("Degree deleted"))
}
