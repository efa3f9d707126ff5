/// Companies (tenants)
///
/// Every organisational record belongs to exactly one company. Codes are
/// stored upper-case and are unique across the system, as are names.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE companies (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(200) NOT NULL UNIQUE,
///     code VARCHAR(20) NOT NULL UNIQUE,
///     address VARCHAR(500),
///     phone VARCHAR(30),
///     email VARCHAR(255),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{normalize_search, Page, PageRequest};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable fields, used for both create and full-replacement update
#[derive(Debug, Clone)]
pub struct CompanyData {
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CompanyFilter {
    pub company_ids: Option<Vec<Uuid>>,
    pub is_active: Option<bool>,
    /// Matches name or code
    pub search: Option<String>,
}

const COMPANY_COLUMNS: &str =
    "id, name, code, address, phone, email, is_active, created_at, updated_at";

impl Company {
    /// # Errors
    ///
    /// Unique violations on `companies_name_key` / `companies_code_key`.
    pub async fn create(pool: &PgPool, data: CompanyData) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO companies (name, code, address, phone, email, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            COMPANY_COLUMNS
        );

        sqlx::query_as::<_, Company>(&sql)
            .bind(data.name.trim())
            .bind(data.code.trim().to_uppercase())
            .bind(data.address)
            .bind(data.phone)
            .bind(data.email)
            .bind(data.is_active)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM companies WHERE id = $1", COMPANY_COLUMNS);
        sqlx::query_as::<_, Company>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &CompanyFilter,
        page: &PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let search = normalize_search(filter.search.as_deref());
        let predicate = "($1::uuid[] IS NULL OR id = ANY($1)) \
                         AND ($2::boolean IS NULL OR is_active = $2) \
                         AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%' OR code ILIKE '%' || $3 || '%')";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM companies WHERE {}", predicate))
                .bind(filter.company_ids.clone())
                .bind(filter.is_active)
                .bind(search.clone())
                .fetch_one(pool)
                .await?;

        let sql = format!(
            "SELECT {} FROM companies WHERE {} ORDER BY name LIMIT $4 OFFSET $5",
            COMPANY_COLUMNS, predicate
        );
        let items = sqlx::query_as::<_, Company>(&sql)
            .bind(filter.company_ids.clone())
            .bind(filter.is_active)
            .bind(search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: CompanyData) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE companies SET name = $2, code = $3, address = $4, phone = $5, email = $6, \
             is_active = $7, updated_at = NOW() WHERE id = $1 RETURNING {}",
            COMPANY_COLUMNS
        );

        sqlx::query_as::<_, Company>(&sql)
            .bind(id)
            .bind(data.name.trim())
            .bind(data.code.trim().to_uppercase())
            .bind(data.address)
            .bind(data.phone)
            .bind(data.email)
            .bind(data.is_active)
            .fetch_optional(pool)
            .await
    }

    /// # Errors
    ///
    /// Fails with a foreign key violation while departments, employees or
    /// other company-owned rows still reference the company.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM companies WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Returns the subset of `ids` that do not exist
    pub async fn missing_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT t.id FROM UNNEST($1::uuid[]) AS t(id)
            WHERE NOT EXISTS (SELECT 1 FROM companies c WHERE c.id = t.id)
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }
}
