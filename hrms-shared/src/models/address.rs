/// Bangladesh administrative addresses (division / district / upazila)
///
/// Global reference data, not company scoped. Seeded by migration.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{normalize_search, Page, PageRequest};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BangladeshAddress {
    pub id: Uuid,
    pub division: String,
    pub district: String,
    pub upazila: String,
    pub post_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AddressData {
    pub division: String,
    pub district: String,
    pub upazila: String,
    pub post_code: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AddressFilter {
    pub division: Option<String>,
    pub district: Option<String>,
    /// Matches any of division, district, upazila or post code
    pub search: Option<String>,
}

impl BangladeshAddress {
    /// # Errors
    ///
    /// Unique violation on `bangladesh_addresses_key` for a duplicate triple.
    pub async fn create(pool: &PgPool, data: AddressData) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BangladeshAddress>(
            r#"
            INSERT INTO bangladesh_addresses (division, district, upazila, post_code)
            VALUES ($1, $2, $3, $4)
            RETURNING id, division, district, upazila, post_code
            "#,
        )
        .bind(data.division.trim())
        .bind(data.district.trim())
        .bind(data.upazila.trim())
        .bind(data.post_code)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BangladeshAddress>(
            "SELECT id, division, district, upazila, post_code FROM bangladesh_addresses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &AddressFilter,
        page: &PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let search = normalize_search(filter.search.as_deref());
        let predicate = "($1::text IS NULL OR LOWER(division) = LOWER($1)) \
                         AND ($2::text IS NULL OR LOWER(district) = LOWER($2)) \
                         AND ($3::text IS NULL OR division ILIKE '%' || $3 || '%' \
                              OR district ILIKE '%' || $3 || '%' \
                              OR upazila ILIKE '%' || $3 || '%' \
                              OR post_code ILIKE '%' || $3 || '%')";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM bangladesh_addresses WHERE {}",
            predicate
        ))
        .bind(filter.division.clone())
        .bind(filter.district.clone())
        .bind(search.clone())
        .fetch_one(pool)
        .await?;

        let sql = format!(
            "SELECT id, division, district, upazila, post_code FROM bangladesh_addresses \
             WHERE {} ORDER BY division, district, upazila LIMIT $4 OFFSET $5",
            predicate
        );
        let items = sqlx::query_as::<_, BangladeshAddress>(&sql)
            .bind(filter.division.clone())
            .bind(filter.district.clone())
            .bind(search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn divisions(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT DISTINCT division FROM bangladesh_addresses ORDER BY division")
            .fetch_all(pool)
            .await
    }

    pub async fn districts(pool: &PgPool, division: Option<&str>) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT DISTINCT district FROM bangladesh_addresses
            WHERE ($1::text IS NULL OR LOWER(division) = LOWER($1))
            ORDER BY district
            "#,
        )
        .bind(division)
        .fetch_all(pool)
        .await
    }

    pub async fn upazilas(
        pool: &PgPool,
        division: Option<&str>,
        district: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BangladeshAddress>(
            r#"
            SELECT id, division, district, upazila, post_code FROM bangladesh_addresses
            WHERE ($1::text IS NULL OR LOWER(division) = LOWER($1))
              AND ($2::text IS NULL OR LOWER(district) = LOWER($2))
            ORDER BY district, upazila
            "#,
        )
        .bind(division)
        .bind(district)
        .fetch_all(pool)
        .await
    }

    /// Employees referencing the address keep their row with the reference cleared
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bangladesh_addresses WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
