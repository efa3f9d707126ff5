/// Production lines, optionally attached to a section

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{normalize_search, Page, PageRequest};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Line {
    pub id: Uuid,
    pub company_id: Uuid,
    pub section_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LineData {
    pub company_id: Uuid,
    pub section_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LineFilter {
    pub company_ids: Option<Vec<Uuid>>,
    pub section_id: Option<Uuid>,
    pub search: Option<String>,
}

const LINE_COLUMNS: &str =
    "id, company_id, section_id, name, description, is_active, created_at, updated_at";

impl Line {
    pub async fn create(pool: &PgPool, data: LineData) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO lines (company_id, section_id, name, description, is_active) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            LINE_COLUMNS
        );

        sqlx::query_as::<_, Line>(&sql)
            .bind(data.company_id)
            .bind(data.section_id)
            .bind(data.name.trim())
            .bind(data.description)
            .bind(data.is_active)
            .fetch_one(pool)
            .await
    }

    /// Inserts unless the company already has a row with the same name
    ///
    /// Returns whether a row was written. Used by CSV import inside a transaction.
    pub async fn insert_if_absent(conn: &mut PgConnection, data: &LineData) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO lines (company_id, section_id, name, description, is_active) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT ON CONSTRAINT lines_company_name_key DO NOTHING",
        )
        .bind(data.company_id)
        .bind(data.section_id)
        .bind(data.name.trim())
        .bind(data.description.as_deref())
        .bind(data.is_active)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM lines WHERE id = $1", LINE_COLUMNS);
        sqlx::query_as::<_, Line>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &LineFilter,
        page: &PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let search = normalize_search(filter.search.as_deref());
        let predicate = "($1::uuid[] IS NULL OR company_id = ANY($1)) \
                         AND ($2::uuid IS NULL OR section_id = $2) \
                         AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%')";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM lines WHERE {}", predicate))
            .bind(filter.company_ids.clone())
            .bind(filter.section_id)
            .bind(search.clone())
            .fetch_one(pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM lines WHERE {} ORDER BY name LIMIT $4 OFFSET $5",
            LINE_COLUMNS, predicate
        );
        let items = sqlx::query_as::<_, Line>(&sql)
            .bind(filter.company_ids.clone())
            .bind(filter.section_id)
            .bind(search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn list_all(pool: &PgPool, company_ids: Option<Vec<Uuid>>) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM lines WHERE ($1::uuid[] IS NULL OR company_id = ANY($1)) \
             ORDER BY company_id, name",
            LINE_COLUMNS
        );
        sqlx::query_as::<_, Line>(&sql)
            .bind(company_ids)
            .fetch_all(pool)
            .await
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: LineData) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE lines SET section_id = $2, name = $3, description = $4, is_active = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            LINE_COLUMNS
        );

        sqlx::query_as::<_, Line>(&sql)
            .bind(id)
            .bind(data.section_id)
            .bind(data.name.trim())
            .bind(data.description)
            .bind(data.is_active)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM lines WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
