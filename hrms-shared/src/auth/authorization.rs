/// Authorization: permissions and company scope
///
/// Two independent checks guard every protected operation:
///
/// 1. **Permission**: the caller's role must hold `<resource>.<action>` in
///    `role_permissions`. `super_admin` holds everything implicitly.
/// 2. **Company scope**: admin roles see every company. Other roles see the
///    companies they are assigned to through their primary `company_id` and
///    the `user_companies` join.
///
/// # Example
///
/// ```no_run
/// use hrms_shared::auth::authorization::{require_permission, resolve_scope, Action, Resource};
/// use hrms_shared::auth::middleware::AuthContext;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, auth: AuthContext) -> Result<(), Box<dyn std::error::Error>> {
/// require_permission(&pool, &auth, Resource::Employees, Action::Read).await?;
/// let scope = resolve_scope(&pool, &auth).await?;
/// let filter = scope.company_filter(None)?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::{
    permission::Permission,
    user::{User, UserRole},
    user_company::UserCompany,
};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Role lacks a permission code
    #[error("Missing permission: {0}")]
    MissingPermission(String),

    /// Company is outside the caller's scope
    #[error("Company {0} is outside your assigned companies")]
    CompanyOutOfScope(Uuid),

    /// Token belongs to a deactivated or deleted user
    #[error("Account is inactive")]
    InactiveAccount,

    /// Operation restricted to admin roles
    #[error("This operation requires an administrator")]
    AdminRequired,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Protected resource families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Companies,
    Departments,
    Sections,
    Designations,
    Degrees,
    Lines,
    Employees,
    Shifts,
    Rosters,
    Users,
    Permissions,
    Addresses,
    Transfer,
    System,
}

impl Resource {
    pub const ALL: [Resource; 14] = [
        Resource::Companies,
        Resource::Departments,
        Resource::Sections,
        Resource::Designations,
        Resource::Degrees,
        Resource::Lines,
        Resource::Employees,
        Resource::Shifts,
        Resource::Rosters,
        Resource::Users,
        Resource::Permissions,
        Resource::Addresses,
        Resource::Transfer,
        Resource::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Companies => "companies",
            Resource::Departments => "departments",
            Resource::Sections => "sections",
            Resource::Designations => "designations",
            Resource::Degrees => "degrees",
            Resource::Lines => "lines",
            Resource::Employees => "employees",
            Resource::Shifts => "shifts",
            Resource::Rosters => "rosters",
            Resource::Users => "users",
            Resource::Permissions => "permissions",
            Resource::Addresses => "addresses",
            Resource::Transfer => "transfer",
            Resource::System => "system",
        }
    }
}

/// What the caller wants to do with a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Write,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
        }
    }
}

/// Permission code in `<resource>.<action>` form
pub fn permission_code(resource: Resource, action: Action) -> String {
    format!("{}.{}", resource.as_str(), action.as_str())
}

/// Checks whether a code has the `<resource>.<action>` shape with known parts
pub fn is_known_permission_code(code: &str) -> bool {
    Resource::ALL.iter().any(|resource| {
        [Action::Read, Action::Write, Action::Delete]
            .iter()
            .any(|action| permission_code(*resource, *action) == code)
    })
}

/// Companies visible to a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyScope {
    /// Every company (admin roles)
    All,

    /// Only these companies
    Only(Vec<Uuid>),
}

impl CompanyScope {
    /// Builds the scope from a role and the user's assigned companies
    pub fn for_role(role: UserRole, assigned: Vec<Uuid>) -> Self {
        if role.is_admin() {
            CompanyScope::All
        } else {
            let mut ids = assigned;
            ids.sort_unstable();
            ids.dedup();
            CompanyScope::Only(ids)
        }
    }

    pub fn allows(&self, company_id: Uuid) -> bool {
        match self {
            CompanyScope::All => true,
            CompanyScope::Only(ids) => ids.contains(&company_id),
        }
    }

    /// Fails with `CompanyOutOfScope` unless the company is visible
    pub fn ensure(&self, company_id: Uuid) -> Result<(), AuthzError> {
        if self.allows(company_id) {
            Ok(())
        } else {
            Err(AuthzError::CompanyOutOfScope(company_id))
        }
    }

    /// Company-id array to bind into list queries
    ///
    /// `None` means unrestricted. An explicit `requested` company narrows the
    /// result to that company and must itself be in scope.
    pub fn company_filter(&self, requested: Option<Uuid>) -> Result<Option<Vec<Uuid>>, AuthzError> {
        match (requested, self) {
            (Some(company_id), _) => {
                self.ensure(company_id)?;
                Ok(Some(vec![company_id]))
            }
            (None, CompanyScope::All) => Ok(None),
            (None, CompanyScope::Only(ids)) => Ok(Some(ids.clone())),
        }
    }

    /// Assigned company ids, `None` for unrestricted callers
    pub fn company_ids(&self) -> Option<&[Uuid]> {
        match self {
            CompanyScope::All => None,
            CompanyScope::Only(ids) => Some(ids),
        }
    }
}

impl fmt::Display for CompanyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompanyScope::All => write!(f, "all companies"),
            CompanyScope::Only(ids) => write!(f, "{} companies", ids.len()),
        }
    }
}

/// Resolves the caller's company scope
pub async fn resolve_scope(pool: &PgPool, auth: &AuthContext) -> Result<CompanyScope, AuthzError> {
    if auth.is_admin() {
        return Ok(CompanyScope::All);
    }

    let assigned = UserCompany::accessible_company_ids(pool, auth.user_id).await?;
    Ok(CompanyScope::for_role(auth.role, assigned))
}

/// Rejects access tokens of users deactivated after the token was issued
pub async fn require_active(pool: &PgPool, auth: &AuthContext) -> Result<(), AuthzError> {
    if User::is_active(pool, auth.user_id).await? {
        Ok(())
    } else {
        tracing::debug!(user_id = %auth.user_id, "Rejected token of inactive user");
        Err(AuthzError::InactiveAccount)
    }
}

/// Requires an active caller whose role holds `<resource>.<action>`
pub async fn require_permission(
    pool: &PgPool,
    auth: &AuthContext,
    resource: Resource,
    action: Action,
) -> Result<(), AuthzError> {
    require_active(pool, auth).await?;

    if auth.role == UserRole::SuperAdmin {
        return Ok(());
    }

    let code = permission_code(resource, action);
    if !Permission::role_has(pool, auth.role, &code).await? {
        tracing::debug!(user_id = %auth.user_id, role = auth.role.as_str(), %code, "Permission denied");
        return Err(AuthzError::MissingPermission(code));
    }

    Ok(())
}

/// Requires an admin role
pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_code() {
        assert_eq!(permission_code(Resource::Employees, Action::Read), "employees.read");
        assert_eq!(permission_code(Resource::Transfer, Action::Write), "transfer.write");
        assert_eq!(permission_code(Resource::System, Action::Delete), "system.delete");
    }

    #[test]
    fn test_known_permission_codes() {
        assert!(is_known_permission_code("rosters.write"));
        assert!(is_known_permission_code("addresses.delete"));
        assert!(!is_known_permission_code("rosters.approve"));
        assert!(!is_known_permission_code("payroll.read"));
        assert!(!is_known_permission_code("rosters"));
    }

    #[test]
    fn test_admin_roles_see_everything() {
        let scope = CompanyScope::for_role(UserRole::Admin, vec![]);
        assert_eq!(scope, CompanyScope::All);
        assert!(scope.allows(Uuid::new_v4()));
        assert_eq!(scope.company_filter(None).unwrap(), None);

        let super_scope = CompanyScope::for_role(UserRole::SuperAdmin, vec![Uuid::new_v4()]);
        assert_eq!(super_scope, CompanyScope::All);
    }

    #[test]
    fn test_non_admin_scope_is_assignment_set() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let scope = CompanyScope::for_role(UserRole::HrManager, vec![a, b, a]);

        assert!(scope.allows(a));
        assert!(scope.allows(b));
        assert!(!scope.allows(Uuid::new_v4()));
        assert_eq!(scope.company_ids().map(|ids| ids.len()), Some(2));
    }

    #[test]
    fn test_company_filter_narrows_to_requested() {
        let a = Uuid::new_v4();
        let outside = Uuid::new_v4();
        let scope = CompanyScope::for_role(UserRole::Manager, vec![a]);

        assert_eq!(scope.company_filter(Some(a)).unwrap(), Some(vec![a]));
        assert!(matches!(
            scope.company_filter(Some(outside)),
            Err(AuthzError::CompanyOutOfScope(id)) if id == outside
        ));
        assert_eq!(scope.company_filter(None).unwrap(), Some(vec![a]));

        let admin = CompanyScope::All;
        assert_eq!(admin.company_filter(Some(outside)).unwrap(), Some(vec![outside]));
    }

    #[test]
    fn test_unassigned_user_sees_nothing() {
        let scope = CompanyScope::for_role(UserRole::Employee, vec![]);
        assert_eq!(scope.company_filter(None).unwrap(), Some(vec![]));
        assert!(!scope.allows(Uuid::new_v4()));
    }

    #[test]
    fn test_require_admin() {
        let admin = AuthContext {
            user_id: Uuid::new_v4(),
            role: UserRole::Admin,
            company_id: None,
        };
        let manager = AuthContext {
            role: UserRole::Manager,
            ..admin.clone()
        };

        assert!(require_admin(&admin).is_ok());
        assert!(matches!(require_admin(&manager), Err(AuthzError::AdminRequired)));
    }
}
