/// Production line endpoints
///
/// A line may be attached to a section of the same company.

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
        line::{Line, LineData, LineFilter},
        section::Section,
        Page, PageRequest,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LineRequest {
    pub company_id: Option<Uuid>,

    pub section_id: Option<Uuid>,

    #[validate(length(min = 1, max = 150, message = "Name must be 1 to 150 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LineQuery {
    pub company_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub search: Option<String>,
}

/// Section must exist and belong to `company_id`
async fn check_section(state: &AppState, section_id: Option<Uuid>, company_id: Uuid) -> ApiResult<()> {
    let Some(section_id) = section_id else {
        return Ok(());
    };

    match Section::find_by_id(&state.db, section_id).await? {
        Some(section) if section.company_id == company_id => Ok(()),
        Some(_) => Err(ApiError::field("section_id", "Section belongs to another company")),
        None => Err(ApiError::field("section_id", "Section not found")),
    }
}

impl LineRequest {
    fn into_data(self, company_id: Uuid) -> LineData {
        LineData {
            company_id,
            section_id: self.section_id,
            name: self.name,
            description: non_empty(self.description),
            is_active: self.is_active,
        }
    }
}

pub async fn list_lines(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<LineQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<ApiResponse<Page<Line>>> {
    let scope = authorize(&state, &auth, Resource::Lines, Action::Read).await?;

    let filter = LineFilter {
        company_ids: scope.company_filter(query.company_id)?,
        section_id: query.section_id,
        search: query.search,
    };

    Ok(ApiResponse::ok("Lines retrieved", Line::list(&state.db, &filter, &page).await?))
}

pub async fn get_line(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Line>> {
    let scope = authorize(&state, &auth, Resource::Lines, Action::Read).await?;
    let line = visible(Line::find_by_id(&state.db, id).await?, &scope, "Line not found")?;

    Ok(ApiResponse::ok("Line retrieved", line))
}

pub async fn create_line(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<LineRequest>,
) -> ApiResult<ApiResponse<Line>> {
    let scope = authorize(&state, &auth, Resource::Lines, Action::Write).await?;
    validate_request(&req)?;
    let company_id = target_company(req.company_id, &scope)?;
    check_section(&state, req.section_id, company_id).await?;

    let line = Line::create(&state.db, req.into_data(company_id)).await?;

    Ok(ApiResponse::created("Line created", line))
}

pub async fn update_line(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<LineRequest>,
) -> ApiResult<ApiResponse<Line>> {
    let scope = authorize(&state, &auth, Resource::Lines, Action::Write).await?;
    let current = visible(Line::find_by_id(&state.db, id).await?, &scope, "Line not found")?;
    validate_request(&req)?;
    same_company(req.company_id, current.company_id)?;
    check_section(&state, req.section_id, current.company_id).await?;

    let line = Line::update(&state.db, id, req.into_data(current.company_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Line not found".to_string()))?;

    Ok(ApiResponse::ok("Line updated", line))
}

pub async fn delete_line(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let scope = authorize(&state, &auth, Resource::Lines, Action::Delete).await?;
    visible(Line::find_by_id(&state.db, id).await?, &scope, "Line not found")?;

    Line::delete(&state.db, id).await?;

    Ok(ApiResponse::empty("Line deleted"))
}
