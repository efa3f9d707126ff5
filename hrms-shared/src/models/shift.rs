/// Work shifts
///
/// `start_time`/`end_time` are wall-clock times in the attendance offset
/// configured for the deployment. A shift whose end is not after its start
/// runs overnight into the next day.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE shifts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE RESTRICT,
///     name VARCHAR(100) NOT NULL,
///     start_time TIME NOT NULL,
///     end_time TIME NOT NULL,
///     grace_minutes INTEGER NOT NULL DEFAULT 0 CHECK (grace_minutes BETWEEN 0 AND 240),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (company_id, name)
/// );
/// ```

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{normalize_search, Page, PageRequest};
use crate::attendance::{self, ShiftWindow};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shift {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub grace_minutes: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ShiftData {
    pub company_id: Uuid,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub grace_minutes: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ShiftFilter {
    pub company_ids: Option<Vec<Uuid>>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

const SHIFT_COLUMNS: &str =
    "id, company_id, name, start_time, end_time, grace_minutes, is_active, created_at, updated_at";

impl Shift {
    /// Scheduled length in minutes, accounting for overnight shifts
    pub fn planned_minutes(&self) -> i32 {
        attendance::planned_minutes(self.start_time, self.end_time)
    }

    pub fn window(&self) -> ShiftWindow {
        ShiftWindow {
            start: self.start_time,
            end: self.end_time,
            grace_minutes: self.grace_minutes,
        }
    }

    pub async fn create(pool: &PgPool, data: ShiftData) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO shifts (company_id, name, start_time, end_time, grace_minutes, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            SHIFT_COLUMNS
        );

        sqlx::query_as::<_, Shift>(&sql)
            .bind(data.company_id)
            .bind(data.name.trim())
            .bind(data.start_time)
            .bind(data.end_time)
            .bind(data.grace_minutes)
            .bind(data.is_active)
            .fetch_one(pool)
            .await
    }

    /// Inserts unless the company already has a row with the same name
    ///
    /// Returns whether a row was written. Used by CSV import inside a transaction.
    pub async fn insert_if_absent(conn: &mut PgConnection, data: &ShiftData) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO shifts (company_id, name, start_time, end_time, grace_minutes, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT ON CONSTRAINT shifts_company_name_key DO NOTHING",
        )
        .bind(data.company_id)
        .bind(data.name.trim())
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.grace_minutes)
        .bind(data.is_active)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM shifts WHERE id = $1", SHIFT_COLUMNS);
        sqlx::query_as::<_, Shift>(&sql)
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
            "SELECT {} FROM shifts WHERE company_id = $1 AND LOWER(name) = LOWER($2)",
            SHIFT_COLUMNS
        );
        sqlx::query_as::<_, Shift>(&sql)
            .bind(company_id)
            .bind(name.trim())
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &ShiftFilter,
        page: &PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let search = normalize_search(filter.search.as_deref());
        let predicate = "($1::uuid[] IS NULL OR company_id = ANY($1)) \
                         AND ($2::boolean IS NULL OR is_active = $2) \
                         AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%')";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM shifts WHERE {}", predicate))
            .bind(filter.company_ids.clone())
            .bind(filter.is_active)
            .bind(search.clone())
            .fetch_one(pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM shifts WHERE {} ORDER BY start_time, name LIMIT $4 OFFSET $5",
            SHIFT_COLUMNS, predicate
        );
        let items = sqlx::query_as::<_, Shift>(&sql)
            .bind(filter.company_ids.clone())
            .bind(filter.is_active)
            .bind(search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn list_all(pool: &PgPool, company_ids: Option<Vec<Uuid>>) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM shifts WHERE ($1::uuid[] IS NULL OR company_id = ANY($1)) \
             ORDER BY company_id, start_time, name",
            SHIFT_COLUMNS
        );
        sqlx::query_as::<_, Shift>(&sql)
            .bind(company_ids)
            .fetch_all(pool)
            .await
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: ShiftData) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE shifts SET name = $2, start_time = $3, end_time = $4, grace_minutes = $5, \
             is_active = $6, updated_at = NOW() WHERE id = $1 RETURNING {}",
            SHIFT_COLUMNS
        );

        sqlx::query_as::<_, Shift>(&sql)
            .bind(id)
            .bind(data.name.trim())
            .bind(data.start_time)
            .bind(data.end_time)
            .bind(data.grace_minutes)
            .bind(data.is_active)
            .fetch_optional(pool)
            .await
    }

    /// # Errors
    ///
    /// Foreign key violation while roster entries still use the shift.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM shifts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(start: (u32, u32), end: (u32, u32)) -> Shift {
        Shift {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "General".to_string(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            grace_minutes: 10,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_planned_minutes() {
        assert_eq!(shift((9, 0), (17, 0)).planned_minutes(), 480);
        assert_eq!(shift((22, 0), (6, 0)).planned_minutes(), 480);
        assert_eq!(shift((8, 0), (8, 0)).planned_minutes(), 1440);
    }

    #[test]
    fn test_window_carries_grace() {
        let window = shift((9, 0), (17, 0)).window();
        assert_eq!(window.grace_minutes, 10);
        assert_eq!(window.start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }
}
