/// Roster schedules and attendance records
///
/// One row per employee per date. Check-in and check-out timestamps are
/// written through [`RosterSchedule::record_check_in`] and
/// [`RosterSchedule::record_check_out`] once the rules in
/// [`crate::attendance`] have accepted them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE roster_schedules (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE RESTRICT,
///     employee_id UUID NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
///     shift_id UUID NOT NULL REFERENCES shifts(id) ON DELETE RESTRICT,
///     roster_date DATE NOT NULL,
///     check_in TIMESTAMPTZ,
///     check_out TIMESTAMPTZ,
///     status roster_status NOT NULL DEFAULT 'scheduled',
///     worked_minutes INTEGER,
///     overtime_minutes INTEGER,
///     note VARCHAR(500),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (employee_id, roster_date)
/// );
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Page, PageRequest};

/// Attendance state of a roster entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "roster_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RosterStatus {
    Scheduled,
    Present,
    Late,
    Absent,
    OnLeave,
}

impl RosterStatus {
    pub const ALL: [RosterStatus; 5] = [
        RosterStatus::Scheduled,
        RosterStatus::Present,
        RosterStatus::Late,
        RosterStatus::Absent,
        RosterStatus::OnLeave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RosterStatus::Scheduled => "scheduled",
            RosterStatus::Present => "present",
            RosterStatus::Late => "late",
            RosterStatus::Absent => "absent",
            RosterStatus::OnLeave => "on_leave",
        }
    }
}

impl fmt::Display for RosterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RosterStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RosterStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown roster status '{}'", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RosterSchedule {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub shift_id: Uuid,
    pub roster_date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: RosterStatus,
    pub worked_minutes: Option<i32>,
    pub overtime_minutes: Option<i32>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateRoster {
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub shift_id: Uuid,
    pub roster_date: NaiveDate,
    pub status: RosterStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateRoster {
    pub shift_id: Uuid,
    pub status: RosterStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RosterFilter {
    pub company_ids: Option<Vec<Uuid>>,
    pub employee_id: Option<Uuid>,
    pub shift_id: Option<Uuid>,
    pub status: Option<RosterStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Aggregated attendance over a date range
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RosterSummary {
    pub total: i64,
    pub scheduled: i64,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub on_leave: i64,
    pub worked_minutes: i64,
    pub overtime_minutes: i64,
}

const ROSTER_COLUMNS: &str = "id, company_id, employee_id, shift_id, roster_date, check_in, check_out, \
                              status, worked_minutes, overtime_minutes, note, created_at, updated_at";

impl RosterSchedule {
    /// # Errors
    ///
    /// Unique violation on `roster_schedules_employee_date_key` when the
    /// employee already has an entry for the date.
    pub async fn create(pool: &PgPool, data: CreateRoster) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO roster_schedules (company_id, employee_id, shift_id, roster_date, status, note) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            ROSTER_COLUMNS
        );

        sqlx::query_as::<_, RosterSchedule>(&sql)
            .bind(data.company_id)
            .bind(data.employee_id)
            .bind(data.shift_id)
            .bind(data.roster_date)
            .bind(data.status)
            .bind(data.note)
            .fetch_one(pool)
            .await
    }

    /// Creates one `scheduled` entry per employee per date, skipping pairs
    /// that already exist. Returns the number of rows inserted.
    pub async fn bulk_create(
        pool: &PgPool,
        company_id: Uuid,
        employee_ids: &[Uuid],
        shift_id: Uuid,
        dates: &[NaiveDate],
        note: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO roster_schedules (company_id, employee_id, shift_id, roster_date, note)
            SELECT $1, e.employee_id, $3, d.roster_date, $5
            FROM UNNEST($2::uuid[]) AS e(employee_id)
            CROSS JOIN UNNEST($4::date[]) AS d(roster_date)
            ON CONFLICT (employee_id, roster_date) DO NOTHING
            "#,
        )
        .bind(company_id)
        .bind(employee_ids)
        .bind(shift_id)
        .bind(dates)
        .bind(note)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM roster_schedules WHERE id = $1", ROSTER_COLUMNS);
        sqlx::query_as::<_, RosterSchedule>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &RosterFilter,
        page: &PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let predicate = "($1::uuid[] IS NULL OR company_id = ANY($1)) \
                         AND ($2::uuid IS NULL OR employee_id = $2) \
                         AND ($3::uuid IS NULL OR shift_id = $3) \
                         AND ($4::roster_status IS NULL OR status = $4) \
                         AND ($5::date IS NULL OR roster_date >= $5) \
                         AND ($6::date IS NULL OR roster_date <= $6)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM roster_schedules WHERE {}", predicate))
                .bind(filter.company_ids.clone())
                .bind(filter.employee_id)
                .bind(filter.shift_id)
                .bind(filter.status)
                .bind(filter.from)
                .bind(filter.to)
                .fetch_one(pool)
                .await?;

        let sql = format!(
            "SELECT {} FROM roster_schedules WHERE {} \
             ORDER BY roster_date DESC, employee_id LIMIT $7 OFFSET $8",
            ROSTER_COLUMNS, predicate
        );
        let items = sqlx::query_as::<_, RosterSchedule>(&sql)
            .bind(filter.company_ids.clone())
            .bind(filter.employee_id)
            .bind(filter.shift_id)
            .bind(filter.status)
            .bind(filter.from)
            .bind(filter.to)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateRoster) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE roster_schedules SET shift_id = $2, status = $3, note = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            ROSTER_COLUMNS
        );

        sqlx::query_as::<_, RosterSchedule>(&sql)
            .bind(id)
            .bind(data.shift_id)
            .bind(data.status)
            .bind(data.note)
            .fetch_optional(pool)
            .await
    }

    /// Stores a check-in unless one was recorded concurrently
    ///
    /// Returns `None` if the entry no longer accepts a check-in.
    pub async fn record_check_in(
        pool: &PgPool,
        id: Uuid,
        at: DateTime<Utc>,
        status: RosterStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE roster_schedules SET check_in = $2, status = $3, updated_at = NOW() \
             WHERE id = $1 AND check_in IS NULL AND status = 'scheduled' RETURNING {}",
            ROSTER_COLUMNS
        );

        sqlx::query_as::<_, RosterSchedule>(&sql)
            .bind(id)
            .bind(at)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Stores a check-out and the computed minutes unless one was recorded concurrently
    pub async fn record_check_out(
        pool: &PgPool,
        id: Uuid,
        at: DateTime<Utc>,
        worked_minutes: i32,
        overtime_minutes: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE roster_schedules SET check_out = $2, worked_minutes = $3, overtime_minutes = $4, \
             updated_at = NOW() WHERE id = $1 AND check_in IS NOT NULL AND check_out IS NULL \
             RETURNING {}",
            ROSTER_COLUMNS
        );

        sqlx::query_as::<_, RosterSchedule>(&sql)
            .bind(id)
            .bind(at)
            .bind(worked_minutes)
            .bind(overtime_minutes)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM roster_schedules WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn summary(
        pool: &PgPool,
        company_ids: Option<Vec<Uuid>>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<RosterSummary, sqlx::Error> {
        sqlx::query_as::<_, RosterSummary>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'scheduled') AS scheduled,
                COUNT(*) FILTER (WHERE status = 'present') AS present,
                COUNT(*) FILTER (WHERE status = 'late') AS late,
                COUNT(*) FILTER (WHERE status = 'absent') AS absent,
                COUNT(*) FILTER (WHERE status = 'on_leave') AS on_leave,
                COALESCE(SUM(worked_minutes), 0)::BIGINT AS worked_minutes,
                COALESCE(SUM(overtime_minutes), 0)::BIGINT AS overtime_minutes
            FROM roster_schedules
            WHERE ($1::uuid[] IS NULL OR company_id = ANY($1))
              AND ($2::date IS NULL OR roster_date >= $2)
              AND ($3::date IS NULL OR roster_date <= $3)
            "#,
        )
        .bind(company_ids)
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        for status in RosterStatus::ALL {
            assert_eq!(status.as_str().parse::<RosterStatus>().unwrap(), status);
        }
        assert_eq!(serde_json::to_value(RosterStatus::OnLeave).unwrap(), "on_leave");
        assert!("holiday".parse::<RosterStatus>().is_err());
    }
}
