/// Company assignments for non-admin users
///
/// A user's accessible companies are the union of their primary
/// `users.company_id` and every row in `user_companies`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_companies (
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (user_id, company_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Assignment of a user to a company
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserCompany {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl UserCompany {
    /// Primary company plus explicit assignments, deduplicated
    pub async fn accessible_company_ids(pool: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT company_id FROM users WHERE id = $1 AND company_id IS NOT NULL
            UNION
            SELECT company_id FROM user_companies WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Explicit assignments only
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT company_id FROM user_companies WHERE user_id = $1 ORDER BY created_at, company_id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Replaces every assignment of `user_id` with `company_ids`
    ///
    /// Meant to run inside a transaction together with the user write.
    pub async fn replace_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
        company_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM user_companies WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        if company_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO user_companies (user_id, company_id)
            SELECT $1, company_id FROM UNNEST($2::uuid[]) AS t(company_id)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(company_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
