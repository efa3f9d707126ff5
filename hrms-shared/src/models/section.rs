/// Sections within a department
///
/// A section's company is always its department's company.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{normalize_search, Page, PageRequest};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Section {
    pub id: Uuid,
    pub company_id: Uuid,
    pub department_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SectionData {
    pub company_id: Uuid,
    pub department_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SectionFilter {
    pub company_ids: Option<Vec<Uuid>>,
    pub department_id: Option<Uuid>,
    pub search: Option<String>,
}

const SECTION_COLUMNS: &str =
    "id, company_id, department_id, name, description, is_active, created_at, updated_at";

impl Section {
    /// # Errors
    ///
    /// Unique violation on `sections_department_name_key`.
    pub async fn create(pool: &PgPool, data: SectionData) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO sections (company_id, department_id, name, description, is_active) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            SECTION_COLUMNS
        );

        sqlx::query_as::<_, Section>(&sql)
            .bind(data.company_id)
            .bind(data.department_id)
            .bind(data.name.trim())
            .bind(data.description)
            .bind(data.is_active)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM sections WHERE id = $1", SECTION_COLUMNS);
        sqlx::query_as::<_, Section>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &SectionFilter,
        page: &PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let search = normalize_search(filter.search.as_deref());
        let predicate = "($1::uuid[] IS NULL OR company_id = ANY($1)) \
                         AND ($2::uuid IS NULL OR department_id = $2) \
                         AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%')";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM sections WHERE {}", predicate))
                .bind(filter.company_ids.clone())
                .bind(filter.department_id)
                .bind(search.clone())
                .fetch_one(pool)
                .await?;

        let sql = format!(
            "SELECT {} FROM sections WHERE {} ORDER BY name LIMIT $4 OFFSET $5",
            SECTION_COLUMNS, predicate
        );
        let items = sqlx::query_as::<_, Section>(&sql)
            .bind(filter.company_ids.clone())
            .bind(filter.department_id)
            .bind(search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn list_all(pool: &PgPool, company_ids: Option<Vec<Uuid>>) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM sections WHERE ($1::uuid[] IS NULL OR company_id = ANY($1)) \
             ORDER BY company_id, department_id, name",
            SECTION_COLUMNS
        );
        sqlx::query_as::<_, Section>(&sql)
            .bind(company_ids)
            .fetch_all(pool)
            .await
    }

    /// Full replacement; callers keep the department inside the same company
    pub async fn update(pool: &PgPool, id: Uuid, data: SectionData) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE sections SET department_id = $2, name = $3, description = $4, is_active = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            SECTION_COLUMNS
        );

        sqlx::query_as::<_, Section>(&sql)
            .bind(id)
            .bind(data.department_id)
            .bind(data.name.trim())
            .bind(data.description)
            .bind(data.is_active)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sections WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
