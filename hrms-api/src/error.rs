/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; every failure is rendered as the error
/// envelope
///
/// ```json
/// { "success": false, "error": "not_found", "message": "Employee not found", "details": null }
/// ```
///
/// `details` carries per-field messages for validation failures only.
///
/// # Example
///
/// ```
/// use hrms_api::error::{ApiError, ApiResult};
///
/// fn find(found: bool) -> ApiResult<&'static str> {
///     if found {
///         Ok("record")
///     } else {
///         Err(ApiError::NotFound("Department not found".to_string()))
///     }
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hrms_shared::{
    attendance::AttendanceError,
    auth::{
        authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError,
    },
    transfer::TransferError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate name or a row still referenced
    Conflict(String),

    /// Unprocessable entity (422) with a single message
    Unprocessable(String),

    /// Unprocessable entity (422) with per-field details
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500); the message is logged, never returned
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,

    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Validation errors, `null` otherwise
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Validation failure on a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable(_) | ApiError::ValidationError(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Unprocessable(_) | ApiError::ValidationError(_) => "validation_error",
            ApiError::InternalError(_) => "internal_error",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Unprocessable(msg) => write!(f, "Unprocessable: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.code().to_string();

        let (message, details) = match self {
            ApiError::ValidationError(errors) => {
                ("Request validation failed".to_string(), Some(errors))
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (msg, None)
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unprocessable(msg) => (msg, None),
        };

        let body = Json(ErrorResponse {
            success: false,
            error,
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Runs `validator` rules and converts failures into a 422 with field details
pub fn validate_request<T: Validate>(req: &T) -> ApiResult<()> {
    req.validate().map_err(|e| {
        let mut errors: Vec<ValidationErrorDetail> = e
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(errors)
    })
}

/// Client-facing message for a violated constraint
fn constraint_message(constraint: &str) -> String {
    match constraint {
        "users_email_key" => "Email already exists".to_string(),
        "companies_name_key" => "A company with this name already exists".to_string(),
        "companies_code_key" => "A company with this code already exists".to_string(),
        "sections_department_name_key" => {
            "A section with this name already exists in the department".to_string()
        }
        "employees_company_code_key" => {
            "An employee with this code already exists in the company".to_string()
        }
        "roster_schedules_employee_date_key" => {
            "The employee already has a roster entry for this date".to_string()
        }
        "permissions_code_key" => "Permission code already exists".to_string(),
        "bangladesh_addresses_key" => "This address already exists".to_string(),
        other if other.ends_with("_company_name_key") => {
            "A record with this name already exists in the company".to_string()
        }
        other => format!("Constraint violation: {}", other),
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::PoolTimedOut => {
                ApiError::ServiceUnavailable("Database is unavailable".to_string())
            }
            sqlx::Error::Database(db_err) => {
                use sqlx::error::ErrorKind;

                match db_err.kind() {
                    ErrorKind::UniqueViolation => ApiError::Conflict(
                        db_err
                            .constraint()
                            .map(constraint_message)
                            .unwrap_or_else(|| "Record already exists".to_string()),
                    ),
                    ErrorKind::ForeignKeyViolation => {
                        // Deleting a parent vs. inserting a dangling reference
                        if db_err.message().starts_with("update or delete") {
                            ApiError::Conflict(
                                "Record is still referenced by other records".to_string(),
                            )
                        } else {
                            ApiError::BadRequest("Referenced record does not exist".to_string())
                        }
                    }
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        ApiError::Unprocessable(format!("Invalid value: {}", db_err.message()))
                    }
                    _ => ApiError::InternalError(format!("Database error: {}", db_err)),
                }
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing authorization header".to_string())
            }
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => {
                ApiError::Unauthorized(msg)
            }
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::MissingPermission(code) => {
                ApiError::Forbidden(format!("Missing permission: {}", code))
            }
            AuthzError::CompanyOutOfScope(_) => {
                ApiError::Forbidden("Company is outside your assigned companies".to_string())
            }
            AuthzError::InactiveAccount => {
                ApiError::Unauthorized("Account is inactive".to_string())
            }
            AuthzError::AdminRequired => {
                ApiError::Forbidden("This operation requires an administrator".to_string())
            }
            AuthzError::DatabaseError(err) => err.into(),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => {
                ApiError::InternalError(format!("Token creation failed: {}", msg))
            }
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            JwtError::ValidationError(msg) => ApiError::Unauthorized(format!("Invalid token: {}", msg)),
        }
    }
}

impl From<AttendanceError> for ApiError {
    fn from(err: AttendanceError) -> Self {
        if err.is_conflict() {
            ApiError::Conflict(err.to_string())
        } else {
            ApiError::Unprocessable(err.to_string())
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::UnknownEntity(_) | TransferError::NotImportable(_) => {
                ApiError::NotFound(err.to_string())
            }
            TransferError::InvalidHeader(_) | TransferError::Csv(_) => {
                ApiError::Unprocessable(err.to_string())
            }
            TransferError::Database(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Conflict(String::new()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Unprocessable(String::new()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::field("email", "bad").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::ServiceUnavailable(String::new()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let response = ApiError::NotFound("Department not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "not_found");
        assert_eq!(json["message"], "Department not found");
        assert!(json["details"].is_null());
    }

    #[tokio::test]
    async fn test_internal_error_is_hidden() {
        let response = ApiError::InternalError("connection reset by peer".to_string()).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["message"], "An internal error occurred");
        assert!(!body.windows(5).any(|w| w == b"reset"));
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(email(message = "Invalid email format"))]
        email: String,
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    #[test]
    fn test_validate_request_details() {
        let sample = Sample {
            email: "nope".to_string(),
            name: String::new(),
        };

        match validate_request(&sample) {
            Err(ApiError::ValidationError(details)) => {
                assert_eq!(details.len(), 2);
                assert_eq!(details[0].field, "email");
                assert_eq!(details[0].message, "Invalid email format");
                assert_eq!(details[1].field, "name");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_library_error_mapping() {
        assert!(matches!(
            ApiError::from(AttendanceError::AlreadyCheckedIn),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(AttendanceError::CheckOutBeforeCheckIn),
            ApiError::Unprocessable(_)
        ));
        assert!(matches!(
            ApiError::from(TransferError::UnknownEntity("payroll".to_string())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(TransferError::InvalidHeader("missing".to_string())),
            ApiError::Unprocessable(_)
        ));
        assert!(matches!(
            ApiError::from(AuthzError::MissingPermission("employees.write".to_string())),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(ApiError::from(AuthzError::InactiveAccount), ApiError::Unauthorized(_)));
        assert!(matches!(ApiError::from(AuthError::MissingCredentials), ApiError::Unauthorized(_)));
        assert!(matches!(ApiError::from(sqlx::Error::RowNotFound), ApiError::NotFound(_)));
        assert!(matches!(
            ApiError::from(sqlx::Error::PoolTimedOut),
            ApiError::ServiceUnavailable(_)
        ));
    }

    #[test]
    fn test_constraint_messages() {
        assert_eq!(constraint_message("users_email_key"), "Email already exists");
        assert_eq!(
            constraint_message("shifts_company_name_key"),
            "A record with this name already exists in the company"
        );
        assert!(constraint_message("mystery").contains("mystery"));
    }
}
