/// Roster and attendance endpoints
///
/// # Endpoints
///
/// - `GET /v1/rosters` - Scoped, filterable list
/// - `GET /v1/rosters/summary` - Status counts and minute totals over a range
/// - `POST /v1/rosters` - Schedule one employee for one date
/// - `POST /v1/rosters/bulk` - Schedule many employees over a date range
/// - `GET|PUT|DELETE /v1/rosters/:id`
/// - `POST /v1/rosters/:id/check-in`, `POST /v1/rosters/:id/check-out`
///
/// Check-in and check-out take an optional `at` timestamp for manual
/// corrections and default to the current time. The rules themselves live in
/// [`hrms_shared::attendance`].

use crate::{
    app::AppState,
    error::{validate_request, ApiError, ApiResult},
    response::ApiResponse,
    routes::{authorize, non_empty, visible},
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use hrms_shared::{
    attendance::{self, AttendanceError},
    auth::{
        authorization::{Action, CompanyScope, Resource},
        middleware::AuthContext,
    },
    models::{
        employee::Employee,
        roster::{CreateRoster, RosterFilter, RosterSchedule, RosterStatus, RosterSummary, UpdateRoster},
        shift::Shift,
        Page, PageRequest,
    },
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRosterRequest {
    pub employee_id: Uuid,
    pub shift_id: Uuid,
    pub roster_date: NaiveDate,

    /// Defaults to `scheduled`
    pub status: Option<RosterStatus>,

    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkRosterRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 employees are required"))]
    pub employee_ids: Vec<Uuid>,

    pub shift_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,

    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkRosterResponse {
    pub employees: u64,
    pub days: u64,
    pub created: u64,

    /// Employee/date pairs that already had an entry
    pub skipped: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRosterRequest {
    pub shift_id: Uuid,
    pub status: RosterStatus,

    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

/// Optional body of check-in and check-out
#[derive(Debug, Default, Deserialize)]
pub struct AttendanceRequest {
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RosterQuery {
    pub company_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub shift_id: Option<Uuid>,
    pub status: Option<RosterStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub company_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,

    #[serde(flatten)]
    pub summary: RosterSummary,
}

fn check_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ApiResult<()> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(ApiError::field(
            "from",
            "'from' must not be after 'to'",
        )),
        _ => Ok(()),
    }
}

/// Time from the attendance body; a missing or empty body means now
fn requested_at(body: &[u8]) -> ApiResult<DateTime<Utc>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Utc::now());
    }

    let req: AttendanceRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::field("at", format!("Invalid attendance body: {}", e)))?;
    Ok(req.at.unwrap_or_else(Utc::now))
}

/// Shift for a roster of `company_id`
async fn roster_shift(state: &AppState, shift_id: Uuid, company_id: Uuid) -> ApiResult<Shift> {
    match Shift::find_by_id(&state.db, shift_id).await? {
        Some(shift) if shift.company_id == company_id => Ok(shift),
        Some(_) => Err(ApiError::field("shift_id", "Shift belongs to another company")),
        None => Err(ApiError::field("shift_id", "Shift not found")),
    }
}

async fn load_roster(state: &AppState, scope: &CompanyScope, id: Uuid) -> ApiResult<RosterSchedule> {
    visible(
        RosterSchedule::find_by_id(&state.db, id).await?,
        scope,
        "Roster entry not found",
    )
}

pub async fn list_rosters(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<RosterQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<ApiResponse<Page<RosterSchedule>>> {
    let scope = authorize(&state, &auth, Resource::Rosters, Action::Read).await?;
    check_range(query.from, query.to)?;

    let filter = RosterFilter {
        company_ids: scope.company_filter(query.company_id)?,
        employee_id: query.employee_id,
        shift_id: query.shift_id,
        status: query.status,
        from: query.from,
        to: query.to,
    };

    Ok(ApiResponse::ok(
        "Roster entries retrieved",
        RosterSchedule::list(&state.db, &filter, &page).await?,
    ))
}

pub async fn get_roster(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<RosterSchedule>> {
    let scope = authorize(&state, &auth, Resource::Rosters, Action::Read).await?;
    let roster = load_roster(&state, &scope, id).await?;

    Ok(ApiResponse::ok("Roster entry retrieved", roster))
}

/// Schedules one employee for one date
///
/// # Errors
///
/// - `403 Forbidden`: the employee's company is outside the caller's scope
/// - `409 Conflict`: the employee already has an entry for the date
/// - `422 Unprocessable Entity`: unknown employee or shift, shift of another
///   company, or `present`/`late` without a check-in
pub async fn create_roster(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateRosterRequest>,
) -> ApiResult<ApiResponse<RosterSchedule>> {
    let scope = authorize(&state, &auth, Resource::Rosters, Action::Write).await?;
    validate_request(&req)?;

    let employee = Employee::find_by_id(&state.db, req.employee_id)
        .await?
        .ok_or_else(|| ApiError::field("employee_id", "Employee not found"))?;
    scope.ensure(employee.company_id)?;

    let shift = roster_shift(&state, req.shift_id, employee.company_id).await?;

    let status = req.status.unwrap_or(RosterStatus::Scheduled);
    attendance::validate_status_change(status, None)?;

    let roster = RosterSchedule::create(
        &state.db,
        CreateRoster {
            company_id: employee.company_id,
            employee_id: employee.id,
            shift_id: shift.id,
            roster_date: req.roster_date,
            status,
            note: non_empty(req.note),
        },
    )
    .await?;

    Ok(ApiResponse::created("Roster entry created", roster))
}

/// Schedules every listed employee for every date in `from..=to`
///
/// Existing employee/date pairs are skipped. All employees must belong to the
/// shift's company.
pub async fn bulk_create_rosters(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<BulkRosterRequest>,
) -> ApiResult<ApiResponse<BulkRosterResponse>> {
    let scope = authorize(&state, &auth, Resource::Rosters, Action::Write).await?;
    validate_request(&req)?;

    let shift = Shift::find_by_id(&state.db, req.shift_id)
        .await?
        .ok_or_else(|| ApiError::field("shift_id", "Shift not found"))?;
    scope.ensure(shift.company_id)?;

    let dates = attendance::date_range(req.from, req.to)?;

    let employee_ids: Vec<Uuid> = req
        .employee_ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let owners = Employee::companies_of(&state.db, &employee_ids).await?;
    let mismatched: Vec<String> = employee_ids
        .iter()
        .filter(|id| {
            !owners
                .iter()
                .any(|(employee_id, company_id)| employee_id == *id && *company_id == shift.company_id)
        })
        .map(Uuid::to_string)
        .collect();

    if !mismatched.is_empty() {
        return Err(ApiError::field(
            "employee_ids",
            format!(
                "Not employees of the shift's company: {}",
                mismatched.join(", ")
            ),
        ));
    }

    let created = RosterSchedule::bulk_create(
        &state.db,
        shift.company_id,
        &employee_ids,
        shift.id,
        &dates,
        non_empty(req.note).as_deref(),
    )
    .await?;

    let employees = employee_ids.len() as u64;
    let days = dates.len() as u64;

    tracing::info!(
        shift_id = %shift.id,
        employees,
        days,
        created,
        "Bulk roster created"
    );

    Ok(ApiResponse::created(
        "Roster entries created",
        BulkRosterResponse {
            employees,
            days,
            created,
            skipped: (employees * days).saturating_sub(created),
        },
    ))
}

/// Replaces shift, status and note of a roster entry
pub async fn update_roster(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRosterRequest>,
) -> ApiResult<ApiResponse<RosterSchedule>> {
    let scope = authorize(&state, &auth, Resource::Rosters, Action::Write).await?;
    let current = load_roster(&state, &scope, id).await?;
    validate_request(&req)?;

    let shift = roster_shift(&state, req.shift_id, current.company_id).await?;
    attendance::validate_status_change(req.status, current.check_in)?;

    let roster = RosterSchedule::update(
        &state.db,
        id,
        UpdateRoster {
            shift_id: shift.id,
            status: req.status,
            note: non_empty(req.note),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Roster entry not found".to_string()))?;

    Ok(ApiResponse::ok("Roster entry updated", roster))
}

pub async fn delete_roster(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let scope = authorize(&state, &auth, Resource::Rosters, Action::Delete).await?;
    load_roster(&state, &scope, id).await?;

    RosterSchedule::delete(&state.db, id).await?;

    Ok(ApiResponse::empty("Roster entry deleted"))
}

/// Records a check-in
///
/// ```text
/// POST /v1/rosters/:id/check-in
/// { "at": "2025-03-01T02:05:00Z" }
/// ```
///
/// The entry becomes `late` when `at` is after the shift start plus grace,
/// `present` otherwise.
///
/// # Errors
///
/// - `409 Conflict`: already checked in, or the entry is absent/on leave
/// - `422 Unprocessable Entity`: body is present but not valid JSON
pub async fn check_in(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<ApiResponse<RosterSchedule>> {
    let at = requested_at(&body)?;
    let scope = authorize(&state, &auth, Resource::Rosters, Action::Write).await?;
    let roster = load_roster(&state, &scope, id).await?;
    let shift = roster_shift(&state, roster.shift_id, roster.company_id).await?;

    let status = attendance::check_in(
        roster.status,
        roster.check_in,
        at,
        &shift.window(),
        roster.roster_date,
        state.attendance_offset(),
    )?;

    let roster = RosterSchedule::record_check_in(&state.db, id, at, status)
        .await?
        .ok_or(AttendanceError::AlreadyCheckedIn)?;

    tracing::info!(roster_id = %id, employee_id = %roster.employee_id, status = status.as_str(), "Checked in");

    Ok(ApiResponse::ok("Checked in", roster))
}

/// Records a check-out with worked and overtime minutes
///
/// # Errors
///
/// - `409 Conflict`: not checked in, or already checked out
/// - `422 Unprocessable Entity`: `at` is not after the check-in
pub async fn check_out(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<ApiResponse<RosterSchedule>> {
    let at = requested_at(&body)?;
    let scope = authorize(&state, &auth, Resource::Rosters, Action::Write).await?;
    let roster = load_roster(&state, &scope, id).await?;
    let shift = roster_shift(&state, roster.shift_id, roster.company_id).await?;

    let outcome = attendance::check_out(roster.check_in, roster.check_out, at, &shift.window())?;

    let roster = RosterSchedule::record_check_out(
        &state.db,
        id,
        at,
        outcome.worked_minutes,
        outcome.overtime_minutes,
    )
    .await?
    .ok_or(AttendanceError::AlreadyCheckedOut)?;

    tracing::info!(
        roster_id = %id,
        worked_minutes = outcome.worked_minutes,
        overtime_minutes = outcome.overtime_minutes,
        "Checked out"
    );

    Ok(ApiResponse::ok("Checked out", roster))
}

pub async fn roster_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<ApiResponse<SummaryResponse>> {
    let scope = authorize(&state, &auth, Resource::Rosters, Action::Read).await?;
    check_range(query.from, query.to)?;

    let summary = RosterSchedule::summary(
        &state.db,
        scope.company_filter(query.company_id)?,
        query.from,
        query.to,
    )
    .await?;

    Ok(ApiResponse::ok(
        "Roster summary retrieved",
        SummaryResponse {
            from: query.from,
            to: query.to,
            summary,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_requested_at_prefers_body() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 2, 5, 0).unwrap();
        assert_eq!(
            requested_at(br#"{"at":"2025-03-01T02:05:00Z"}"#).unwrap(),
            at
        );
    }

    #[test]
    fn test_requested_at_defaults_to_now() {
        let before = Utc::now();
        assert!(requested_at(b"").unwrap() >= before);
        assert!(requested_at(b"  \n").unwrap() >= before);
        assert!(requested_at(b"{}").unwrap() >= before);
        assert!(requested_at(br#"{"at":null}"#).unwrap() >= before);
    }

    #[test]
    fn test_requested_at_rejects_unparseable_time() {
        match requested_at(br#"{"at":"yesterday at nine"}"#) {
            Err(ApiError::ValidationError(details)) => assert_eq!(details[0].field, "at"),
            other => panic!("unexpected: {:?}", other.map(|at| at.to_rfc3339())),
        }
        assert!(requested_at(b"not json").is_err());
    }

    #[test]
    fn test_check_range() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();

        assert!(check_range(Some(day(1)), Some(day(31))).is_ok());
        assert!(check_range(Some(day(1)), None).is_ok());
        assert!(check_range(Some(day(2)), Some(day(1))).is_err());
    }

    #[test]
    fn test_bulk_request_limits() {
        let req = BulkRosterRequest {
            employee_ids: vec![],
            shift_id: Uuid::new_v4(),
            from: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(),
            note: None,
        };
        assert!(validate_request(&req).is_err());
    }
}
