/// Departments
///
/// Names are unique within a company.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE departments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE RESTRICT,
///     name VARCHAR(150) NOT NULL,
///     code VARCHAR(20),
///     description VARCHAR(500),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (company_id, name)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{normalize_search, Page, PageRequest};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Department {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DepartmentData {
    pub company_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DepartmentFilter {
    pub company_ids: Option<Vec<Uuid>>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

const DEPARTMENT_COLUMNS: &str =
    "id, company_id, name, code, description, is_active, created_at, updated_at";

impl Department {
    /// # Errors
    ///
    /// Unique violation on `departments_company_name_key` for a duplicate name.
    pub async fn create(pool: &PgPool, data: DepartmentData) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO departments (company_id, name, code, description, is_active) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            DEPARTMENT_COLUMNS
        );

        sqlx::query_as::<_, Department>(&sql)
            .bind(data.company_id)
            .bind(data.name.trim())
            .bind(data.code)
            .bind(data.description)
            .bind(data.is_active)
            .fetch_one(pool)
            .await
    }

    /// Inserts unless the company already has a row with the same name
    ///
    /// Returns whether a row was written. Used by CSV import inside a transaction.
    pub async fn insert_if_absent(conn: &mut PgConnection, data: &DepartmentData) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO departments (company_id, name, code, description, is_active) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT ON CONSTRAINT departments_company_name_key DO NOTHING",
        )
        .bind(data.company_id)
        .bind(data.name.trim())
        .bind(data.code.as_deref())
        .bind(data.description.as_deref())
        .bind(data.is_active)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM departments WHERE id = $1", DEPARTMENT_COLUMNS);
        sqlx::query_as::<_, Department>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_name(
        pool: &PgPool,
        company_id: Uuid,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM departments WHERE company_id = $1 AND LOWER(name) = LOWER($2)",
            DEPARTMENT_COLUMNS
        );
        sqlx::query_as::<_, Department>(&sql)
            .bind(company_id)
            .bind(name.trim())
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &DepartmentFilter,
        page: &PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let search = normalize_search(filter.search.as_deref());
        let predicate = "($1::uuid[] IS NULL OR company_id = ANY($1)) \
                         AND ($2::boolean IS NULL OR is_active = $2) \
                         AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%' OR code ILIKE '%' || $3 || '%')";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM departments WHERE {}", predicate))
                .bind(filter.company_ids.clone())
                .bind(filter.is_active)
                .bind(search.clone())
                .fetch_one(pool)
                .await?;

        let sql = format!(
            "SELECT {} FROM departments WHERE {} ORDER BY name LIMIT $4 OFFSET $5",
            DEPARTMENT_COLUMNS, predicate
        );
        let items = sqlx::query_as::<_, Department>(&sql)
            .bind(filter.company_ids.clone())
            .bind(filter.is_active)
            .bind(search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    /// All departments in scope, for export
    pub async fn list_all(pool: &PgPool, company_ids: Option<Vec<Uuid>>) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM departments WHERE ($1::uuid[] IS NULL OR company_id = ANY($1)) \
             ORDER BY company_id, name",
            DEPARTMENT_COLUMNS
        );
        sqlx::query_as::<_, Department>(&sql)
            .bind(company_ids)
            .fetch_all(pool)
            .await
    }

    /// Full replacement; the owning company never changes
    pub async fn update(pool: &PgPool, id: Uuid, data: DepartmentData) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE departments SET name = $2, code = $3, description = $4, is_active = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            DEPARTMENT_COLUMNS
        );

        sqlx::query_as::<_, Department>(&sql)
            .bind(id)
            .bind(data.name.trim())
            .bind(data.code)
            .bind(data.description)
            .bind(data.is_active)
            .fetch_optional(pool)
            .await
    }

    /// # Errors
    ///
    /// Foreign key violation while sections still reference the department.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
