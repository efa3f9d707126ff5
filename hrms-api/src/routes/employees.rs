/// Employee endpoints
///
/// Every organisation row an employee points at (department, section,
/// designation, degree, line, shift) must belong to the employee's company.
/// Violations are reported per field with 422.

use crate::{
    app::AppState,
    error::{validate_request, ApiError, ApiResult, ValidationErrorDetail},
    response::ApiResponse,
    routes::{authorize, non_empty, same_company, target_company, visible},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use hrms_shared::{
    auth::{
        authorization::{Action, Resource},
        middleware::AuthContext,
    },
    models::{
        employee::{Employee, EmployeeData, EmployeeFilter, EmployeeStatus, Gender},
        Page, PageRequest,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct EmployeeRequest {
    pub company_id: Option<Uuid>,

    #[validate(length(min = 1, max = 50, message = "Employee code must be 1 to 50 characters"))]
    pub employee_code: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1 to 100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1 to 100 characters"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub joining_date: NaiveDate,

    pub department_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub degree_id: Option<Uuid>,
    pub line_id: Option<Uuid>,
    pub shift_id: Option<Uuid>,
    pub address_id: Option<Uuid>,

    #[validate(length(max = 500, message = "Address line must be at most 500 characters"))]
    pub address_line: Option<String>,

    /// Defaults to `active`
    pub status: Option<EmployeeStatus>,
}

impl EmployeeRequest {
    fn into_data(self, company_id: Uuid) -> ApiResult<EmployeeData> {
        if let Some(date_of_birth) = self.date_of_birth {
            if date_of_birth >= self.joining_date {
                return Err(ApiError::field(
                    "date_of_birth",
                    "Date of birth must be before the joining date",
                ));
            }
        }

        Ok(EmployeeData {
            company_id,
            employee_code: self.employee_code.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: non_empty(self.email).map(|email| email.to_lowercase()),
            phone: non_empty(self.phone),
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            joining_date: self.joining_date,
            department_id: self.department_id,
            section_id: self.section_id,
            designation_id: self.designation_id,
            degree_id: self.degree_id,
            line_id: self.line_id,
            shift_id: self.shift_id,
            address_id: self.address_id,
            address_line: non_empty(self.address_line),
            status: self.status.unwrap_or(EmployeeStatus::Active),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EmployeeQuery {
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub status: Option<EmployeeStatus>,
    pub search: Option<String>,
}

/// Rejects references outside the employee's company
async fn check_references(state: &AppState, data: &EmployeeData) -> ApiResult<()> {
    let invalid = Employee::foreign_references(&state.db, data).await?;
    if invalid.is_empty() {
        return Ok(());
    }

    Err(ApiError::ValidationError(
        invalid
            .into_iter()
            .map(|field| ValidationErrorDetail {
                message: format!("{} does not exist in the employee's company", field),
                field,
            })
            .collect(),
    ))
}

pub async fn list_employees(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<EmployeeQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<ApiResponse<Page<Employee>>> {
    let scope = authorize(&state, &auth, Resource::Employees, Action::Read).await?;

    let filter = EmployeeFilter {
        company_ids: scope.company_filter(query.company_id)?,
        department_id: query.department_id,
        section_id: query.section_id,
        designation_id: query.designation_id,
        status: query.status,
        search: query.search,
    };

    Ok(ApiResponse::ok(
        "Employees retrieved",
        Employee::list(&state.db, &filter, &page).await?,
    ))
}

pub async fn get_employee(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Employee>> {
    let scope = authorize(&state, &auth, Resource::Employees, Action::Read).await?;
    let employee = visible(Employee::find_by_id(&state.db, id).await?, &scope, "Employee not found")?;

    Ok(ApiResponse::ok("Employee retrieved", employee))
}

/// Creates an employee
///
/// # Errors
///
/// - `403 Forbidden`: company outside the caller's scope
/// - `409 Conflict`: employee code already used in the company
/// - `422 Unprocessable Entity`: validation failed or a reference belongs to another company
pub async fn create_employee(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<EmployeeRequest>,
) -> ApiResult<ApiResponse<Employee>> {
    let scope = authorize(&state, &auth, Resource::Employees, Action::Write).await?;
    validate_request(&req)?;
    let company_id = target_company(req.company_id, &scope)?;

    let data = req.into_data(company_id)?;
    check_references(&state, &data).await?;

    let employee = Employee::create(&state.db, data).await?;
    tracing::info!(employee_id = %employee.id, %company_id, code = %employee.employee_code, "Employee created");

    Ok(ApiResponse::created("Employee created", employee))
}

pub async fn update_employee(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<EmployeeRequest>,
) -> ApiResult<ApiResponse<Employee>> {
    let scope = authorize(&state, &auth, Resource::Employees, Action::Write).await?;
    let current = visible(Employee::find_by_id(&state.db, id).await?, &scope, "Employee not found")?;
    validate_request(&req)?;
    same_company(req.company_id, current.company_id)?;

    let data = req.into_data(current.company_id)?;
    check_references(&state, &data).await?;

    let employee = Employee::update(&state.db, id, data)
        .await?
        .ok_or_else(|| ApiError::NotFound("Employee not found".to_string()))?;

    Ok(ApiResponse::ok("Employee updated", employee))
}

/// Deletes an employee together with their roster entries
pub async fn delete_employee(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let scope = authorize(&state, &auth, Resource::Employees, Action::Delete).await?;
    visible(Employee::find_by_id(&state.db, id).await?, &scope, "Employee not found")?;

    Employee::delete(&state.db, id).await?;
    tracing::info!(employee_id = %id, "Employee deleted");

    Ok(ApiResponse::empty("Employee deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EmployeeRequest {
        EmployeeRequest {
            company_id: None,
            employee_code: " E-001 ".to_string(),
            first_name: "Rahim".to_string(),
            last_name: "Uddin".to_string(),
            email: Some("Rahim@Example.com".to_string()),
            phone: Some("".to_string()),
            gender: Some(Gender::Male),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 1),
            joining_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            department_id: None,
            section_id: None,
            designation_id: None,
            degree_id: None,
            line_id: None,
            shift_id: None,
            address_id: None,
            address_line: None,
            status: None,
        }
    }

    #[test]
    fn test_into_data_normalizes() {
        let data = request().into_data(Uuid::new_v4()).unwrap();

        assert_eq!(data.employee_code, "E-001");
        assert_eq!(data.email.as_deref(), Some("rahim@example.com"));
        assert_eq!(data.phone, None);
        assert_eq!(data.status, EmployeeStatus::Active);
    }

    #[test]
    fn test_birth_after_joining_rejected() {
        let mut req = request();
        req.date_of_birth = NaiveDate::from_ymd_opt(2021, 1, 1);

        match req.into_data(Uuid::new_v4()) {
            Err(ApiError::ValidationError(details)) => assert_eq!(details[0].field, "date_of_birth"),
            other => panic!("unexpected: {:?}", other.map(|d| d.employee_code)),
        }
    }

    #[test]
    fn test_request_validation() {
        let mut req = request();
        req.email = Some("not-an-email".to_string());
        req.first_name = String::new();

        match validate_request(&req) {
            Err(ApiError::ValidationError(details)) => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "first_name"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
