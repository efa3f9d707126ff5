/// API route handlers
///
/// One module per resource. Protected handlers follow the same sequence:
/// check the permission, resolve the caller's company scope, run the query
/// with the scope bound, and wrap the result in [`ApiResponse`].
///
/// [`ApiResponse`]: crate::response::ApiResponse

pub mod addresses;
pub mod auth;
pub mod companies;
pub mod degrees;
pub mod departments;
pub mod designations;
pub mod employees;
pub mod health;
pub mod lines;
pub mod permissions;
pub mod rosters;
pub mod sections;
pub mod shifts;
pub mod system;
pub mod transfer;
pub mod users;

use hrms_shared::{
    auth::{
        authorization::{require_permission, resolve_scope, Action, CompanyScope, Resource},
        middleware::AuthContext,
    },
    models::{
        company::Company, degree::Degree, department::Department, designation::Designation,
        employee::Employee, line::Line, roster::RosterSchedule, section::Section, shift::Shift,
        user::User,
    },
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Checks `<resource>.<action>` and returns the caller's company scope
pub(crate) async fn authorize(
    state: &AppState,
    auth: &AuthContext,
    resource: Resource,
    action: Action,
) -> ApiResult<CompanyScope> {
    require_permission(&state.db, auth, resource, action).await?;
    Ok(resolve_scope(&state.db, auth).await?)
}

/// Rows that belong to exactly one company
pub(crate) trait CompanyOwned {
    fn owner(&self) -> Option<Uuid>;
}

macro_rules! company_owned {
    ($($model:ty),* $(,)?) => {
        $(
            impl CompanyOwned for $model {
                fn owner(&self) -> Option<Uuid> {
                    Some(self.company_id)
                }
            }
        )*
    };
}

company_owned!(Department, Section, Designation, Degree, Line, Shift, Employee, RosterSchedule);

impl CompanyOwned for Company {
    fn owner(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl CompanyOwned for User {
    fn owner(&self) -> Option<Uuid> {
        self.company_id
    }
}

/// Returns the row when the caller may see it
///
/// Missing rows and rows outside the scope both become 404. Rows without an
/// owner are visible to unrestricted callers only.
pub(crate) fn visible<T: CompanyOwned>(
    row: Option<T>,
    scope: &CompanyScope,
    not_found: &str,
) -> ApiResult<T> {
    match row {
        Some(row) => match (row.owner(), scope) {
            (_, CompanyScope::All) => Ok(row),
            (Some(company_id), scope) if scope.allows(company_id) => Ok(row),
            _ => Err(ApiError::NotFound(not_found.to_string())),
        },
        None => Err(ApiError::NotFound(not_found.to_string())),
    }
}

/// Company a new row is created for
///
/// # Errors
///
/// - `422`: no company given
/// - `403`: company outside the caller's scope
pub(crate) fn target_company(requested: Option<Uuid>, scope: &CompanyScope) -> ApiResult<Uuid> {
    let company_id =
        requested.ok_or_else(|| ApiError::field("company_id", "Company is required"))?;
    scope.ensure(company_id)?;
    Ok(company_id)
}

/// Updates never move a row to another company
pub(crate) fn same_company(requested: Option<Uuid>, current: Uuid) -> ApiResult<()> {
    match requested {
        Some(company_id) if company_id != current => Err(ApiError::field(
            "company_id",
            "Company cannot be changed",
        )),
        _ => Ok(()),
    }
}

pub(crate) fn default_true() -> bool {
    true
}

/// Turns an empty string into `None`
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hrms_shared::models::user::UserRole;

    fn department(company_id: Uuid) -> Department {
        Department {
            id: Uuid::new_v4(),
            company_id,
            name: "Finance".to_string(),
            code: None,
            description: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_visible_in_scope() {
        let company = Uuid::new_v4();
        let scope = CompanyScope::Only(vec![company]);

        assert!(visible(Some(department(company)), &scope, "Department not found").is_ok());
    }

    #[test]
    fn test_out_of_scope_is_not_found() {
        let scope = CompanyScope::Only(vec![Uuid::new_v4()]);

        match visible(Some(department(Uuid::new_v4())), &scope, "Department not found") {
            Err(ApiError::NotFound(msg)) => assert_eq!(msg, "Department not found"),
            other => panic!("unexpected: {:?}", other.map(|d| d.id)),
        }
    }

    #[test]
    fn test_admin_scope_sees_everything() {
        assert!(visible(Some(department(Uuid::new_v4())), &CompanyScope::All, "x").is_ok());
        assert!(visible::<Department>(None, &CompanyScope::All, "x").is_err());
    }

    #[test]
    fn test_user_without_company_hidden_from_restricted_scope() {
        let user = User {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            password_hash: String::new(),
            full_name: "Someone".to_string(),
            role: UserRole::Employee,
            company_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        };

        assert!(visible(Some(user.clone()), &CompanyScope::Only(vec![]), "x").is_err());
        assert!(visible(Some(user), &CompanyScope::All, "x").is_ok());
    }

    #[test]
    fn test_target_company() {
        let company = Uuid::new_v4();
        let scope = CompanyScope::Only(vec![company]);

        assert_eq!(target_company(Some(company), &scope).unwrap(), company);
        assert!(matches!(
            target_company(None, &scope),
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            target_company(Some(Uuid::new_v4()), &scope),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_same_company() {
        let company = Uuid::new_v4();
        assert!(same_company(None, company).is_ok());
        assert!(same_company(Some(company), company).is_ok());
        assert!(same_company(Some(Uuid::new_v4()), company).is_err());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" a ".to_string())), Some("a".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
