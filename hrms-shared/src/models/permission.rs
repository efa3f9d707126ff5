/// Permission catalogue and per-role grants
///
/// Permission codes have the form `<resource>.<action>` (for example
/// `employees.write`). Grants are stored per role in `role_permissions`;
/// super admins bypass the table entirely.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE permissions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     code VARCHAR(100) NOT NULL UNIQUE,
///     description VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE role_permissions (
///     role user_role NOT NULL,
///     permission_id UUID NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
///     PRIMARY KEY (role, permission_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::user::UserRole;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Codes granted to one role
#[derive(Debug, Clone, Serialize)]
pub struct RolePermissions {
    pub role: UserRole,
    pub permissions: Vec<String>,
}

impl Permission {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Permission>(
            "SELECT id, code, description, created_at FROM permissions ORDER BY code",
        )
        .fetch_all(pool)
        .await
    }

    /// # Errors
    ///
    /// Fails with a unique violation on `permissions_code_key` for duplicate codes.
    pub async fn create(
        pool: &PgPool,
        code: &str,
        description: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (code, description)
            VALUES ($1, $2)
            RETURNING id, code, description, created_at
            "#,
        )
        .bind(code)
        .bind(description)
        .fetch_one(pool)
        .await
    }

    /// Returns the permissions matching `codes`; unknown codes are simply absent
    pub async fn find_by_codes(pool: &PgPool, codes: &[String]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Permission>(
            "SELECT id, code, description, created_at FROM permissions WHERE code = ANY($1) ORDER BY code",
        )
        .bind(codes)
        .fetch_all(pool)
        .await
    }

    pub async fn role_has(pool: &PgPool, role: UserRole, code: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM role_permissions rp
                JOIN permissions p ON p.id = rp.permission_id
                WHERE rp.role = $1 AND p.code = $2
            )
            "#,
        )
        .bind(role)
        .bind(code)
        .fetch_one(pool)
        .await
    }

    /// Effective codes for a role; super admins hold every code in the catalogue
    pub async fn codes_for_role(pool: &PgPool, role: UserRole) -> Result<Vec<String>, sqlx::Error> {
        if role == UserRole::SuperAdmin {
            return sqlx::query_scalar::<_, String>("SELECT code FROM permissions ORDER BY code")
                .fetch_all(pool)
                .await;
        }

        sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.code
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role = $1
            ORDER BY p.code
            "#,
        )
        .bind(role)
        .fetch_all(pool)
        .await
    }

    /// Grants for every role, in role order
    pub async fn all_role_permissions(pool: &PgPool) -> Result<Vec<RolePermissions>, sqlx::Error> {
        let mut roles = Vec::with_capacity(UserRole::ALL.len());
        for role in UserRole::ALL {
            roles.push(RolePermissions {
                role,
                permissions: Self::codes_for_role(pool, role).await?,
            });
        }
        Ok(roles)
    }

    /// Replaces the grants of `role` with `permission_ids`
    ///
    /// Meant to run inside a transaction.
    pub async fn replace_role_permissions(
        conn: &mut PgConnection,
        role: UserRole,
        permission_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM role_permissions WHERE role = $1")
            .bind(role)
            .execute(&mut *conn)
            .await?;

        if permission_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO role_permissions (role, permission_id)
            SELECT $1, permission_id FROM UNNEST($2::uuid[]) AS t(permission_id)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role)
        .bind(permission_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
