/// User accounts and roles
///
/// A user has exactly one [`UserRole`]. Non-admin users may carry a primary
/// `company_id`; additional company assignments live in `user_companies`
/// (see [`crate::models::user_company`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,           -- unique on LOWER(email)
///     password_hash VARCHAR(255) NOT NULL,
///     full_name VARCHAR(200) NOT NULL,
///     role user_role NOT NULL DEFAULT 'employee',
///     company_id UUID REFERENCES companies(id) ON DELETE RESTRICT,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use hrms_shared::models::user::{CreateUser, User, UserRole};
/// use hrms_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "Nadia@Example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     full_name: "Nadia Rahman".to_string(),
///     role: UserRole::HrManager,
///     company_id: None,
///     is_active: true,
/// }).await?;
///
/// // Lookups are case-insensitive
/// let found = User::find_by_email(&pool, "nadia@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::{normalize_search, Page, PageRequest};

/// Role assigned to a user
///
/// Stored as the PostgreSQL enum `user_role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    Admin,
    HrManager,
    Manager,
    Employee,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        UserRole::SuperAdmin,
        UserRole::Admin,
        UserRole::HrManager,
        UserRole::Manager,
        UserRole::Employee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::Admin => "admin",
            UserRole::HrManager => "hr_manager",
            UserRole::Manager => "manager",
            UserRole::Employee => "employee",
        }
    }

    /// Admin roles see every company
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::SuperAdmin | UserRole::Admin)
    }

    /// Whether a user holding `self` may create or promote a user to `target`
    ///
    /// Only super admins hand out admin roles.
    pub fn can_assign(&self, target: UserRole) -> bool {
        match target {
            UserRole::SuperAdmin | UserRole::Admin => *self == UserRole::SuperAdmin,
            _ => true,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// User account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Stored lowercase
    pub email: String,

    /// Argon2id PHC string, never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub full_name: String,
    pub role: UserRole,

    /// Primary company, `None` for admins
    pub company_id: Option<Uuid>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    /// Argon2id hash (NOT the plaintext password)
    pub password_hash: String,
    pub full_name: String,
    pub role: UserRole,
    pub company_id: Option<Uuid>,
    pub is_active: bool,
}

/// Full replacement of the mutable profile fields
#[derive(Debug, Clone)]
pub struct UpdateUser {
    pub full_name: String,
    pub role: UserRole,
    pub company_id: Option<Uuid>,
    pub is_active: bool,
}

/// List filters
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Restrict to users whose primary company is in this set
    pub company_ids: Option<Vec<Uuid>>,
    pub role: Option<UserRole>,
    /// Matches email or full name
    pub search: Option<String>,
}

const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, company_id, is_active, \
                            created_at, updated_at, last_login_at";

impl User {
    /// Creates a user; the email is lowercased before storage
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `users_email_key` if the email is taken.
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "INSERT INTO users (email, password_hash, full_name, role, company_id, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(data.email.trim().to_lowercase())
            .bind(data.password_hash)
            .bind(data.full_name)
            .bind(data.role)
            .bind(data.company_id)
            .bind(data.is_active)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive lookup
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(email.trim())
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &UserFilter,
        page: &PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let search = normalize_search(filter.search.as_deref());
        let predicate = "($1::uuid[] IS NULL OR company_id = ANY($1)) \
                         AND ($2::user_role IS NULL OR role = $2) \
                         AND ($3::text IS NULL OR email ILIKE '%' || $3 || '%' \
                              OR full_name ILIKE '%' || $3 || '%')";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {}", predicate))
            .bind(filter.company_ids.clone())
            .bind(filter.role)
            .bind(search.clone())
            .fetch_one(pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM users WHERE {} ORDER BY full_name, email LIMIT $4 OFFSET $5",
            USER_COLUMNS, predicate
        );
        let items = sqlx::query_as::<_, User>(&sql)
            .bind(filter.company_ids.clone())
            .bind(filter.role)
            .bind(search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    /// Replaces the profile fields, returning `None` if the user doesn't exist
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "UPDATE users SET full_name = $2, role = $3, company_id = $4, is_active = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(data.full_name)
            .bind(data.role)
            .bind(data.company_id)
            .bind(data.is_active)
            .fetch_optional(executor)
            .await
    }

    pub async fn update_password<'e, E>(
        executor: E,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of users holding `role`, used to decide whether to bootstrap
    pub async fn count_by_role(pool: &PgPool, role: UserRole) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role)
            .fetch_one(pool)
            .await
    }

    /// Number of active users holding `role`
    pub async fn count_active_by_role(pool: &PgPool, role: UserRole) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1 AND is_active")
            .bind(role)
            .fetch_one(pool)
            .await
    }

    /// False for deactivated and deleted users
    pub async fn is_active(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(active.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_string_forms() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
            assert_eq!(
                serde_json::to_value(role).unwrap(),
                serde_json::Value::String(role.as_str().to_string())
            );
        }
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_admin_roles() {
        assert!(UserRole::SuperAdmin.is_admin());
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::HrManager.is_admin());
        assert!(!UserRole::Employee.is_admin());
    }

    #[test]
    fn test_role_assignment() {
        assert!(UserRole::SuperAdmin.can_assign(UserRole::Admin));
        assert!(UserRole::SuperAdmin.can_assign(UserRole::SuperAdmin));
        assert!(!UserRole::Admin.can_assign(UserRole::Admin));
        assert!(!UserRole::HrManager.can_assign(UserRole::SuperAdmin));
        assert!(UserRole::Admin.can_assign(UserRole::HrManager));
        assert!(UserRole::HrManager.can_assign(UserRole::Employee));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            full_name: "A B".to_string(),
            role: UserRole::Employee,
            company_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "employee");
    }
}
