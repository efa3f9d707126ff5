/// Job designations (titles), optionally graded

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{normalize_search, Page, PageRequest};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Designation {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub grade: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DesignationData {
    pub company_id: Uuid,
    pub name: String,
    pub grade: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DesignationFilter {
    pub company_ids: Option<Vec<Uuid>>,
    pub grade: Option<String>,
    pub search: Option<String>,
}

const DESIGNATION_COLUMNS: &str =
    "id, company_id, name, grade, description, is_active, created_at, updated_at";

impl Designation {
    pub async fn create(pool: &PgPool, data: DesignationData) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO designations (company_id, name, grade, description, is_active) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            DESIGNATION_COLUMNS
        );

        sqlx::query_as::<_, Designation>(&sql)
            .bind(data.company_id)
            .bind(data.name.trim())
            .bind(data.grade)
            .bind(data.description)
            .bind(data.is_active)
            .fetch_one(pool)
            .await
    }

    /// Inserts unless the company already has a row with the same name
    ///
    /// Returns whether a row was written. Used by CSV import inside a transaction.
    pub async fn insert_if_absent(conn: &mut PgConnection, data: &DesignationData) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO designations (company_id, name, grade, description, is_active) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT ON CONSTRAINT designations_company_name_key DO NOTHING",
        )
        .bind(data.company_id)
        .bind(data.name.trim())
        .bind(data.grade.as_deref())
        .bind(data.description.as_deref())
        .bind(data.is_active)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM designations WHERE id = $1", DESIGNATION_COLUMNS);
        sqlx::query_as::<_, Designation>(&sql)
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
            "SELECT {} FROM designations WHERE company_id = $1 AND LOWER(name) = LOWER($2)",
            DESIGNATION_COLUMNS
        );
        sqlx::query_as::<_, Designation>(&sql)
            .bind(company_id)
            .bind(name.trim())
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &DesignationFilter,
        page: &PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let search = normalize_search(filter.search.as_deref());
        let predicate = "($1::uuid[] IS NULL OR company_id = ANY($1)) \
                         AND ($2::text IS NULL OR grade = $2) \
                         AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%')";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM designations WHERE {}", predicate))
                .bind(filter.company_ids.clone())
                .bind(filter.grade.clone())
                .bind(search.clone())
                .fetch_one(pool)
                .await?;

        let sql = format!(
            "SELECT {} FROM designations WHERE {} ORDER BY name LIMIT $4 OFFSET $5",
            DESIGNATION_COLUMNS, predicate
        );
        let items = sqlx::query_as::<_, Designation>(&sql)
            .bind(filter.company_ids.clone())
            .bind(filter.grade.clone())
            .bind(search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn list_all(pool: &PgPool, company_ids: Option<Vec<Uuid>>) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM designations WHERE ($1::uuid[] IS NULL OR company_id = ANY($1)) \
             ORDER BY company_id, name",
            DESIGNATION_COLUMNS
        );
        sqlx::query_as::<_, Designation>(&sql)
            .bind(company_ids)
            .fetch_all(pool)
            .await
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: DesignationData) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE designations SET name = $2, grade = $3, description = $4, is_active = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            DESIGNATION_COLUMNS
        );

        sqlx::query_as::<_, Designation>(&sql)
            .bind(id)
            .bind(data.name.trim())
            .bind(data.grade)
            .bind(data.description)
            .bind(data.is_active)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM designations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
