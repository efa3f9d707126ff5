/// Shift endpoints
///
/// Times are `HH:MM` or `HH:MM:SS` local times. A shift whose end is not
/// after its start runs overnight, so equal times mean a 24 hour shift.
/// Responses carry the derived `planned_minutes` and `overnight` fields.

use crate::{
    app::AppState,
    error::{validate_request, ApiError, ApiResult},
    response::ApiResponse,
    routes::{authorize, default_true, same_company, target_company, visible},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use hrms_shared::{
    attendance,
    auth::{
        authorization::{Action, Resource},
        middleware::AuthContext,
    },
    models::{
        shift::{Shift, ShiftData, ShiftFilter},
        Page, PageRequest,
    },
    transfer::parse_time,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ShiftRequest {
    pub company_id: Option<Uuid>,

    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    pub start_time: String,

    pub end_time: String,

    #[serde(default)]
    #[validate(range(min = 0, max = 240, message = "Grace minutes must be between 0 and 240"))]
    pub grace_minutes: i32,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl ShiftRequest {
    fn into_data(self, company_id: Uuid) -> ApiResult<ShiftData> {
        let start_time = parse_time(self.start_time.trim(), "start_time")
            .map_err(|msg| ApiError::field("start_time", msg))?;
        let end_time = parse_time(self.end_time.trim(), "end_time")
            .map_err(|msg| ApiError::field("end_time", msg))?;

        Ok(ShiftData {
            company_id,
            name: self.name,
            start_time,
            end_time,
            grace_minutes: self.grace_minutes,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ShiftResponse {
    #[serde(flatten)]
    pub shift: Shift,
    pub planned_minutes: i32,
    pub overnight: bool,
}

impl From<Shift> for ShiftResponse {
    fn from(shift: Shift) -> Self {
        Self {
            planned_minutes: shift.planned_minutes(),
            overnight: attendance::is_overnight(shift.start_time, shift.end_time),
            shift,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ShiftQuery {
    pub company_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

pub async fn list_shifts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ShiftQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<ApiResponse<Page<ShiftResponse>>> {
    let scope = authorize(&state, &auth, Resource::Shifts, Action::Read).await?;

    let filter = ShiftFilter {
        company_ids: scope.company_filter(query.company_id)?,
        is_active: query.is_active,
        search: query.search,
    };
    let shifts = Shift::list(&state.db, &filter, &page).await?;

    Ok(ApiResponse::ok("Shifts retrieved", shifts.map(ShiftResponse::from)))
}

pub async fn get_shift(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<ShiftResponse>> {
    let scope = authorize(&state, &auth, Resource::Shifts, Action::Read).await?;
    let shift = visible(Shift::find_by_id(&state.db, id).await?, &scope, "Shift not found")?;

    Ok(ApiResponse::ok("Shift retrieved", shift.into()))
}

/// Creates a shift
///
/// ```text
/// POST /v1/shifts
/// { "company_id": "...", "name": "Night", "start_time": "22:00", "end_time": "06:00", "grace_minutes": 10 }
/// ```
pub async fn create_shift(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ShiftRequest>,
) -> ApiResult<ApiResponse<ShiftResponse>> {
    let scope = authorize(&state, &auth, Resource::Shifts, Action::Write).await?;
    validate_request(&req)?;
    let company_id = target_company(req.company_id, &scope)?;

    let shift = Shift::create(&state.db, req.into_data(company_id)?).await?;
    tracing::info!(shift_id = %shift.id, %company_id, "Shift created");

    Ok(ApiResponse::created("Shift created", shift.into()))
}

pub async fn update_shift(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ShiftRequest>,
) -> ApiResult<ApiResponse<ShiftResponse>> {
    let scope = authorize(&state, &auth, Resource::Shifts, Action::Write).await?;
    let current = visible(Shift::find_by_id(&state.db, id).await?, &scope, "Shift not found")?;
    validate_request(&req)?;
    same_company(req.company_id, current.company_id)?;

    let shift = Shift::update(&state.db, id, req.into_data(current.company_id)?)
        .await?
        .ok_or_else(|| ApiError::NotFound("Shift not found".to_string()))?;

    Ok(ApiResponse::ok("Shift updated", shift.into()))
}

/// Deletes a shift; 409 while rosters reference it
pub async fn delete_shift(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let scope = authorize(&state, &auth, Resource::Shifts, Action::Delete).await?;
    visible(Shift::find_by_id(&state.db, id).await?, &scope, "Shift not found")?;

    Shift::delete(&state.db, id).await?;

    Ok(ApiResponse::empty("Shift deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: &str, end: &str) -> ShiftRequest {
        ShiftRequest {
            company_id: None,
            name: "Night".to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            grace_minutes: 10,
            is_active: true,
        }
    }

    #[test]
    fn test_into_data_parses_times() {
        let data = request("22:00", "06:00:00").into_data(Uuid::new_v4()).unwrap();
        assert_eq!(data.start_time.to_string(), "22:00:00");
        assert_eq!(data.end_time.to_string(), "06:00:00");
    }

    #[test]
    fn test_into_data_rejects_bad_times() {
        assert!(matches!(
            request("25:00", "06:00").into_data(Uuid::new_v4()),
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            request("08:00", "noon").into_data(Uuid::new_v4()),
            Err(ApiError::ValidationError(_))
        ));
    }

    #[test]
    fn test_grace_range_validated() {
        let mut req = request("08:00", "17:00");
        req.grace_minutes = 241;
        assert!(validate_request(&req).is_err());
    }
}
