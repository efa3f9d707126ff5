/// Employees
///
/// Employee codes are unique within a company. Every organisation reference
/// (department, section, designation, degree, line, shift) must point at a
/// row of the employee's own company; [`Employee::foreign_references`]
/// reports the ones that don't.
///
/// # Schema
///
/// See `migrations/20250101000002_organisation.sql` for the full table.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{normalize_search, Page, PageRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gender", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("unknown gender '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "employee_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    Inactive,
    Terminated,
}

impl EmployeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Inactive => "inactive",
            EmployeeStatus::Terminated => "terminated",
        }
    }
}

impl fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmployeeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(EmployeeStatus::Active),
            "inactive" => Ok(EmployeeStatus::Inactive),
            "terminated" => Ok(EmployeeStatus::Terminated),
            other => Err(format!("unknown employee status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub joining_date: NaiveDate,
    pub department_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub degree_id: Option<Uuid>,
    pub line_id: Option<Uuid>,
    pub shift_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    pub address_line: Option<String>,
    pub status: EmployeeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable fields, used for both create and full-replacement update
#[derive(Debug, Clone)]
pub struct EmployeeData {
    pub company_id: Uuid,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub joining_date: NaiveDate,
    pub department_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub degree_id: Option<Uuid>,
    pub line_id: Option<Uuid>,
    pub shift_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    pub address_line: Option<String>,
    pub status: EmployeeStatus,
}

impl EmployeeData {
    /// A record with only the scalar columns set, as produced by CSV import
    pub fn scalar(
        company_id: Uuid,
        employee_code: String,
        first_name: String,
        last_name: String,
        joining_date: NaiveDate,
    ) -> Self {
        Self {
            company_id,
            employee_code,
            first_name,
            last_name,
            email: None,
            phone: None,
            gender: None,
            date_of_birth: None,
            joining_date,
            department_id: None,
            section_id: None,
            designation_id: None,
            degree_id: None,
            line_id: None,
            shift_id: None,
            address_id: None,
            address_line: None,
            status: EmployeeStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    pub company_ids: Option<Vec<Uuid>>,
    pub department_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub status: Option<EmployeeStatus>,
    /// Matches employee code, first name or last name
    pub search: Option<String>,
}

const EMPLOYEE_COLUMNS: &str = "id, company_id, employee_code, first_name, last_name, email, phone, \
                                gender, date_of_birth, joining_date, department_id, section_id, \
                                designation_id, degree_id, line_id, shift_id, address_id, \
                                address_line, status, created_at, updated_at";

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// # Errors
    ///
    /// Unique violation on `employees_company_code_key` for a duplicate code.
    pub async fn create(pool: &PgPool, data: EmployeeData) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO employees (company_id, employee_code, first_name, last_name, email, phone, \
             gender, date_of_birth, joining_date, department_id, section_id, designation_id, \
             degree_id, line_id, shift_id, address_id, address_line, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {}",
            EMPLOYEE_COLUMNS
        );

        sqlx::query_as::<_, Employee>(&sql)
            .bind(data.company_id)
            .bind(data.employee_code.trim())
            .bind(data.first_name.trim())
            .bind(data.last_name.trim())
            .bind(data.email.map(|e| e.trim().to_lowercase()))
            .bind(data.phone)
            .bind(data.gender)
            .bind(data.date_of_birth)
            .bind(data.joining_date)
            .bind(data.department_id)
            .bind(data.section_id)
            .bind(data.designation_id)
            .bind(data.degree_id)
            .bind(data.line_id)
            .bind(data.shift_id)
            .bind(data.address_id)
            .bind(data.address_line)
            .bind(data.status)
            .fetch_one(pool)
            .await
    }

    /// Inserts unless the company already has a row with the same employee code
    ///
    /// Returns whether a row was written. Reference columns are left empty.
    /// Used by CSV import inside a transaction.
    pub async fn insert_if_absent(conn: &mut PgConnection, data: &EmployeeData) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO employees (company_id, employee_code, first_name, last_name, email, phone, \
             gender, date_of_birth, joining_date, address_line, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT ON CONSTRAINT employees_company_code_key DO NOTHING",
        )
        .bind(data.company_id)
        .bind(data.employee_code.trim())
        .bind(data.first_name.trim())
        .bind(data.last_name.trim())
        .bind(data.email.as_deref().map(|e| e.trim().to_lowercase()))
        .bind(data.phone.as_deref())
        .bind(data.gender)
        .bind(data.date_of_birth)
        .bind(data.joining_date)
        .bind(data.address_line.as_deref())
        .bind(data.status)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM employees WHERE id = $1", EMPLOYEE_COLUMNS);
        sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &EmployeeFilter,
        page: &PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let search = normalize_search(filter.search.as_deref());
        let predicate = "($1::uuid[] IS NULL OR company_id = ANY($1)) \
                         AND ($2::uuid IS NULL OR department_id = $2) \
                         AND ($3::uuid IS NULL OR section_id = $3) \
                         AND ($4::uuid IS NULL OR designation_id = $4) \
                         AND ($5::employee_status IS NULL OR status = $5) \
                         AND ($6::text IS NULL OR employee_code ILIKE '%' || $6 || '%' \
                              OR first_name ILIKE '%' || $6 || '%' \
                              OR last_name ILIKE '%' || $6 || '%')";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM employees WHERE {}", predicate))
                .bind(filter.company_ids.clone())
                .bind(filter.department_id)
                .bind(filter.section_id)
                .bind(filter.designation_id)
                .bind(filter.status)
                .bind(search.clone())
                .fetch_one(pool)
                .await?;

        let sql = format!(
            "SELECT {} FROM employees WHERE {} ORDER BY employee_code LIMIT $7 OFFSET $8",
            EMPLOYEE_COLUMNS, predicate
        );
        let items = sqlx::query_as::<_, Employee>(&sql)
            .bind(filter.company_ids.clone())
            .bind(filter.department_id)
            .bind(filter.section_id)
            .bind(filter.designation_id)
            .bind(filter.status)
            .bind(search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn list_all(pool: &PgPool, company_ids: Option<Vec<Uuid>>) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM employees WHERE ($1::uuid[] IS NULL OR company_id = ANY($1)) \
             ORDER BY company_id, employee_code",
            EMPLOYEE_COLUMNS
        );
        sqlx::query_as::<_, Employee>(&sql)
            .bind(company_ids)
            .fetch_all(pool)
            .await
    }

    /// Company and employee ids for the given employees, used by bulk rostering
    pub async fn companies_of(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<(Uuid, Uuid)>, sqlx::Error> {
        sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT id, company_id FROM employees WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: EmployeeData) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE employees SET employee_code = $2, first_name = $3, last_name = $4, email = $5, \
             phone = $6, gender = $7, date_of_birth = $8, joining_date = $9, department_id = $10, \
             section_id = $11, designation_id = $12, degree_id = $13, line_id = $14, shift_id = $15, \
             address_id = $16, address_line = $17, status = $18, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            EMPLOYEE_COLUMNS
        );

        sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .bind(data.employee_code.trim())
            .bind(data.first_name.trim())
            .bind(data.last_name.trim())
            .bind(data.email.map(|e| e.trim().to_lowercase()))
            .bind(data.phone)
            .bind(data.gender)
            .bind(data.date_of_birth)
            .bind(data.joining_date)
            .bind(data.department_id)
            .bind(data.section_id)
            .bind(data.designation_id)
            .bind(data.degree_id)
            .bind(data.line_id)
            .bind(data.shift_id)
            .bind(data.address_id)
            .bind(data.address_line)
            .bind(data.status)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Names of the references in `data` that are missing or belong to
    /// another company (for example `["designation_id"]`)
    pub async fn foreign_references(pool: &PgPool, data: &EmployeeData) -> Result<Vec<String>, sqlx::Error> {
        let checks: [(&str, &str, Option<Uuid>); 6] = [
            ("department_id", "departments", data.department_id),
            ("section_id", "sections", data.section_id),
            ("designation_id", "designations", data.designation_id),
            ("degree_id", "degrees", data.degree_id),
            ("line_id", "lines", data.line_id),
            ("shift_id", "shifts", data.shift_id),
        ];

        let mut invalid = Vec::new();
        for (field, table, id) in checks {
            let Some(id) = id else { continue };

            let sql = format!(
                "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND company_id = $2)",
                table
            );
            let ok: bool = sqlx::query_scalar(&sql)
                .bind(id)
                .bind(data.company_id)
                .fetch_one(pool)
                .await?;

            if !ok {
                invalid.push(field.to_string());
            }
        }

        if let Some(address_id) = data.address_id {
            let ok: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bangladesh_addresses WHERE id = $1)")
                    .bind(address_id)
                    .fetch_one(pool)
                    .await?;
            if !ok {
                invalid.push("address_id".to_string());
            }
        }

        Ok(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert!("unknown".parse::<Gender>().is_err());
        assert_eq!(" terminated ".parse::<EmployeeStatus>().unwrap(), EmployeeStatus::Terminated);
        assert_eq!(EmployeeStatus::Inactive.to_string(), "inactive");
    }

    #[test]
    fn test_scalar_defaults() {
        let data = EmployeeData::scalar(
            Uuid::new_v4(),
            "E-001".to_string(),
            "Rahim".to_string(),
            "Uddin".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        );
        assert_eq!(data.status, EmployeeStatus::Active);
        assert!(data.department_id.is_none());
    }
}
