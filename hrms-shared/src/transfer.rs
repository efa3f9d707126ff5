/// CSV import and export of organisation data
///
/// Export writes every row in scope as RFC 4180 CSV with a header row.
/// Import reads a header row, validates each data row independently and
/// inserts the valid ones; rows whose natural key (name or employee code)
/// already exists in the company are skipped.
///
/// Row numbers in [`ImportReport::errors`] are 1-based file lines, so the
/// first data row after the header is row 2.
///
/// # Example
///
/// ```
/// use hrms_shared::transfer::{parse_rows, DepartmentRow};
///
/// let csv = "name,code\nFinance,FIN\n,HR\n";
/// let parsed = parse_rows::<DepartmentRow>(csv.as_bytes()).unwrap();
///
/// assert_eq!(parsed.rows.len(), 1);
/// assert_eq!(parsed.errors[0].row, 3);
/// ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::models::{
    degree::{Degree, DegreeData},
    department::{Department, DepartmentData},
    designation::{Designation, DesignationData},
    employee::{Employee, EmployeeData, EmployeeStatus, Gender},
    line::{Line, LineData},
    section::Section,
    shift::{Shift, ShiftData},
};

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("Entity '{0}' cannot be imported")]
    NotImportable(TransferEntity),

    #[error("Invalid CSV header: {0}")]
    InvalidHeader(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Entities that can be exported (and, except sections, imported)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEntity {
    Departments,
    Sections,
    Designations,
    Degrees,
    Lines,
    Shifts,
    Employees,
}

impl TransferEntity {
    pub const ALL: [TransferEntity; 7] = [
        TransferEntity::Departments,
        TransferEntity::Sections,
        TransferEntity::Designations,
        TransferEntity::Degrees,
        TransferEntity::Lines,
        TransferEntity::Shifts,
        TransferEntity::Employees,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferEntity::Departments => "departments",
            TransferEntity::Sections => "sections",
            TransferEntity::Designations => "designations",
            TransferEntity::Degrees => "degrees",
            TransferEntity::Lines => "lines",
            TransferEntity::Shifts => "shifts",
            TransferEntity::Employees => "employees",
        }
    }

    /// Sections need a parent department and are export-only
    pub fn importable(&self) -> bool {
        !matches!(self, TransferEntity::Sections)
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl fmt::Display for TransferEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferEntity {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransferEntity::ALL
            .into_iter()
            .find(|entity| entity.as_str() == s)
            .ok_or_else(|| TransferError::UnknownEntity(s.to_string()))
    }
}

/// A rejected input row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

/// Rows that parsed, with their file line, plus the ones that didn't
#[derive(Debug)]
pub struct ParsedRows<T> {
    pub rows: Vec<(usize, T)>,
    pub errors: Vec<RowError>,
}

/// One CSV record addressed by (lower-cased) header name
pub struct CsvRow<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
}

impl<'a> CsvRow<'a> {
    /// Trimmed value of `column`, `None` when absent or blank
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.columns
            .get(column)
            .and_then(|&idx| self.record.get(idx))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Optional value of `column` holding at most `max` characters
    pub fn bounded(&self, column: &str, max: usize) -> Result<Option<String>, String> {
        self.get(column).map(|v| bounded(v, column, max)).transpose()
    }

    pub fn required(&self, column: &str) -> Result<&'a str, String> {
        self.get(column)
            .ok_or_else(|| format!("'{}' is required", column))
    }

    pub fn parse<T: FromStr>(&self, column: &str) -> Result<Option<T>, String>
    where
        T::Err: fmt::Display,
    {
        self.get(column)
            .map(|v| v.parse::<T>().map_err(|e| format!("'{}': {}", column, e)))
            .transpose()
    }

    pub fn date(&self, column: &str) -> Result<Option<NaiveDate>, String> {
        self.get(column)
            .map(|v| {
                NaiveDate::parse_from_str(v, "%Y-%m-%d")
                    .map_err(|_| format!("'{}' must be a date in YYYY-MM-DD format", column))
            })
            .transpose()
    }

    pub fn time(&self, column: &str) -> Result<Option<NaiveTime>, String> {
        self.get(column).map(|v| parse_time(v, column)).transpose()
    }

    /// Accepts true/false, yes/no and 1/0; blank means `default`
    pub fn flag(&self, column: &str, default: bool) -> Result<bool, String> {
        match self.get(column).map(str::to_lowercase).as_deref() {
            None => Ok(default),
            Some("true" | "yes" | "1") => Ok(true),
            Some("false" | "no" | "0") => Ok(false),
            Some(other) => Err(format!("'{}' must be true or false, got '{}'", column, other)),
        }
    }
}

/// Parses `HH:MM` or `HH:MM:SS`
pub fn parse_time(value: &str, column: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| format!("'{}' must be a time in HH:MM format", column))
}

/// A typed import row
pub trait ImportRow: Sized {
    /// Columns the header must contain
    const REQUIRED: &'static [&'static str];

    fn from_row(row: &CsvRow<'_>) -> Result<Self, String>;
}

/// Reads the header and every data row of `input`
///
/// # Errors
///
/// `InvalidHeader` if the input is empty or a required column is missing.
/// Malformed individual rows are reported in [`ParsedRows::errors`].
pub fn parse_rows<T: ImportRow>(input: &[u8]) -> Result<ParsedRows<T>, TransferError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(TransferError::InvalidHeader("missing header row".to_string()));
    }

    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim_start_matches('\u{feff}').to_lowercase(), idx))
        .collect();

    let missing: Vec<&str> = T::REQUIRED
        .iter()
        .copied()
        .filter(|column| !columns.contains_key(*column))
        .collect();
    if !missing.is_empty() {
        return Err(TransferError::InvalidHeader(format!(
            "missing column(s): {}",
            missing.join(", ")
        )));
    }

    let mut parsed = ParsedRows {
        rows: Vec::new(),
        errors: Vec::new(),
    };

    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(idx + 2, |p| p.line() as usize);
                parsed.errors.push(RowError { row: line, message: e.to_string() });
                continue;
            }
        };
        let line = record.position().map_or(idx + 2, |p| p.line() as usize);
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }

        let row = CsvRow { columns: &columns, record: &record };
        match T::from_row(&row) {
            Ok(value) => parsed.rows.push((line, value)),
            Err(message) => parsed.errors.push(RowError { row: line, message }),
        }
    }

    Ok(parsed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentRow {
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
}

impl ImportRow for DepartmentRow {
    const REQUIRED: &'static [&'static str] = &["name"];

    fn from_row(row: &CsvRow<'_>) -> Result<Self, String> {
        Ok(Self {
            name: bounded(row.required("name")?, "name", 150)?,
            code: row.bounded("code", 20)?,
            description: row.bounded("description", 500)?,
            is_active: row.flag("is_active", true)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignationRow {
    pub name: String,
    pub grade: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
}

impl ImportRow for DesignationRow {
    const REQUIRED: &'static [&'static str] = &["name"];

    fn from_row(row: &CsvRow<'_>) -> Result<Self, String> {
        Ok(Self {
            name: bounded(row.required("name")?, "name", 150)?,
            grade: row.bounded("grade", 50)?,
            description: row.bounded("description", 500)?,
            is_active: row.flag("is_active", true)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegreeRow {
    pub name: String,
    pub level: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
}

impl ImportRow for DegreeRow {
    const REQUIRED: &'static [&'static str] = &["name"];

    fn from_row(row: &CsvRow<'_>) -> Result<Self, String> {
        Ok(Self {
            name: bounded(row.required("name")?, "name", 150)?,
            level: row.bounded("level", 50)?,
            description: row.bounded("description", 500)?,
            is_active: row.flag("is_active", true)?,
        })
    }
}

/// Lines are imported without a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRow {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

impl ImportRow for LineRow {
    const REQUIRED: &'static [&'static str] = &["name"];

    fn from_row(row: &CsvRow<'_>) -> Result<Self, String> {
        Ok(Self {
            name: bounded(row.required("name")?, "name", 150)?,
            description: row.bounded("description", 500)?,
            is_active: row.flag("is_active", true)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftRow {
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub grace_minutes: i32,
    pub is_active: bool,
}

impl ImportRow for ShiftRow {
    const REQUIRED: &'static [&'static str] = &["name", "start_time", "end_time"];

    fn from_row(row: &CsvRow<'_>) -> Result<Self, String> {
        let start_time = parse_time(row.required("start_time")?, "start_time")?;
        let end_time = parse_time(row.required("end_time")?, "end_time")?;
        let grace_minutes = row.parse::<i32>("grace_minutes")?.unwrap_or(0);
        if !(0..=240).contains(&grace_minutes) {
            return Err("'grace_minutes' must be between 0 and 240".to_string());
        }

        Ok(Self {
            name: bounded(row.required("name")?, "name", 100)?,
            start_time,
            end_time,
            grace_minutes,
            is_active: row.flag("is_active", true)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeRow {
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub joining_date: NaiveDate,
    pub status: EmployeeStatus,
}

impl ImportRow for EmployeeRow {
    const REQUIRED: &'static [&'static str] =
        &["employee_code", "first_name", "last_name", "joining_date"];

    fn from_row(row: &CsvRow<'_>) -> Result<Self, String> {
        let email = row.bounded("email", 255)?.map(|e| e.to_lowercase());
        if let Some(email) = &email {
            if !email.validate_email() {
                return Err(format!("'email' is not a valid address: {}", email));
            }
        }

        let date_of_birth = row.date("date_of_birth")?;
        let joining_date = row
            .date("joining_date")?
            .ok_or_else(|| "'joining_date' is required".to_string())?;
        if let Some(dob) = date_of_birth {
            if dob >= joining_date {
                return Err("'date_of_birth' must be before 'joining_date'".to_string());
            }
        }

        Ok(Self {
            employee_code: bounded(row.required("employee_code")?, "employee_code", 50)?,
            first_name: bounded(row.required("first_name")?, "first_name", 100)?,
            last_name: bounded(row.required("last_name")?, "last_name", 100)?,
            email,
            phone: row.bounded("phone", 30)?,
            gender: row.parse::<Gender>("gender")?,
            date_of_birth,
            joining_date,
            status: row.parse::<EmployeeStatus>("status")?.unwrap_or(EmployeeStatus::Active),
        })
    }
}

fn bounded(value: &str, column: &str, max: usize) -> Result<String, String> {
    if value.chars().count() > max {
        Err(format!("'{}' must be at most {} characters", column, max))
    } else {
        Ok(value.to_string())
    }
}

fn write_csv<const N: usize>(
    headers: [&str; N],
    rows: impl IntoIterator<Item = [String; N]>,
) -> Result<String, TransferError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TransferError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_id(value: Option<Uuid>) -> String {
    value.map(|id| id.to_string()).unwrap_or_default()
}

/// Renders every row of `entity` visible under `company_ids` as CSV
pub async fn export(
    pool: &PgPool,
    entity: TransferEntity,
    company_ids: Option<Vec<Uuid>>,
) -> Result<String, TransferError> {
    match entity {
        TransferEntity::Departments => {
            let rows = Department::list_all(pool, company_ids).await?;
            write_csv(
                ["id", "company_id", "name", "code", "description", "is_active"],
                rows.iter().map(|d| {
                    [
                        d.id.to_string(),
                        d.company_id.to_string(),
                        d.name.clone(),
                        opt(&d.code),
                        opt(&d.description),
                        d.is_active.to_string(),
                    ]
                }),
            )
        }
        TransferEntity::Sections => {
            let rows = Section::list_all(pool, company_ids).await?;
            write_csv(
                ["id", "company_id", "department_id", "name", "description", "is_active"],
                rows.iter().map(|s| {
                    [
                        s.id.to_string(),
                        s.company_id.to_string(),
                        s.department_id.to_string(),
                        s.name.clone(),
                        opt(&s.description),
                        s.is_active.to_string(),
                    ]
                }),
            )
        }
        TransferEntity::Designations => {
            let rows = Designation::list_all(pool, company_ids).await?;
            write_csv(
                ["id", "company_id", "name", "grade", "description", "is_active"],
                rows.iter().map(|d| {
                    [
                        d.id.to_string(),
                        d.company_id.to_string(),
                        d.name.clone(),
                        opt(&d.grade),
                        opt(&d.description),
                        d.is_active.to_string(),
                    ]
                }),
            )
        }
        TransferEntity::Degrees => {
            let rows = Degree::list_all(pool, company_ids).await?;
            write_csv(
                ["id", "company_id", "name", "level", "description", "is_active"],
                rows.iter().map(|d| {
                    [
                        d.id.to_string(),
                        d.company_id.to_string(),
                        d.name.clone(),
                        opt(&d.level),
                        opt(&d.description),
                        d.is_active.to_string(),
                    ]
                }),
            )
        }
        TransferEntity::Lines => {
            let rows = Line::list_all(pool, company_ids).await?;
            write_csv(
                ["id", "company_id", "section_id", "name", "description", "is_active"],
                rows.iter().map(|l| {
                    [
                        l.id.to_string(),
                        l.company_id.to_string(),
                        opt_id(l.section_id),
                        l.name.clone(),
                        opt(&l.description),
                        l.is_active.to_string(),
                    ]
                }),
            )
        }
        TransferEntity::Shifts => {
            let rows = Shift::list_all(pool, company_ids).await?;
            write_csv(
                ["id", "company_id", "name", "start_time", "end_time", "grace_minutes", "is_active"],
                rows.iter().map(|s| {
                    [
                        s.id.to_string(),
                        s.company_id.to_string(),
                        s.name.clone(),
                        s.start_time.format("%H:%M:%S").to_string(),
                        s.end_time.format("%H:%M:%S").to_string(),
                        s.grace_minutes.to_string(),
                        s.is_active.to_string(),
                    ]
                }),
            )
        }
        TransferEntity::Employees => {
            let rows = Employee::list_all(pool, company_ids).await?;
            write_csv(
                [
                    "id",
                    "company_id",
                    "employee_code",
                    "first_name",
                    "last_name",
                    "email",
                    "phone",
                    "gender",
                    "date_of_birth",
                    "joining_date",
                    "status",
                ],
                rows.iter().map(|e| {
                    [
                        e.id.to_string(),
                        e.company_id.to_string(),
                        e.employee_code.clone(),
                        e.first_name.clone(),
                        e.last_name.clone(),
                        opt(&e.email),
                        opt(&e.phone),
                        e.gender.map(|g| g.as_str().to_string()).unwrap_or_default(),
                        e.date_of_birth.map(|d| d.to_string()).unwrap_or_default(),
                        e.joining_date.to_string(),
                        e.status.as_str().to_string(),
                    ]
                }),
            )
        }
    }
}

/// Parses `input` and inserts its valid rows into `company_id`
///
/// Run inside a transaction; the caller commits.
///
/// # Errors
///
/// Header problems and database failures abort the whole import. Row-level
/// problems are collected in the report.
pub async fn import(
    conn: &mut PgConnection,
    entity: TransferEntity,
    company_id: Uuid,
    input: &[u8],
) -> Result<ImportReport, TransferError> {
    let mut report = ImportReport::default();

    match entity {
        TransferEntity::Departments => {
            let parsed = parse_rows::<DepartmentRow>(input)?;
            report.errors = parsed.errors;
            for (_, row) in parsed.rows {
                let data = DepartmentData {
                    company_id,
                    name: row.name,
                    code: row.code,
                    description: row.description,
                    is_active: row.is_active,
                };
                report.record(Department::insert_if_absent(&mut *conn, &data).await?);
            }
        }
        TransferEntity::Designations => {
            let parsed = parse_rows::<DesignationRow>(input)?;
            report.errors = parsed.errors;
            for (_, row) in parsed.rows {
                let data = DesignationData {
                    company_id,
                    name: row.name,
                    grade: row.grade,
                    description: row.description,
                    is_active: row.is_active,
                };
                report.record(Designation::insert_if_absent(&mut *conn, &data).await?);
            }
        }
        TransferEntity::Degrees => {
            let parsed = parse_rows::<DegreeRow>(input)?;
            report.errors = parsed.errors;
            for (_, row) in parsed.rows {
                let data = DegreeData {
                    company_id,
                    name: row.name,
                    level: row.level,
                    description: row.description,
                    is_active: row.is_active,
                };
                report.record(Degree::insert_if_absent(&mut *conn, &data).await?);
            }
        }
        TransferEntity::Lines => {
            let parsed = parse_rows::<LineRow>(input)?;
            report.errors = parsed.errors;
            for (_, row) in parsed.rows {
                let data = LineData {
                    company_id,
                    section_id: None,
                    name: row.name,
                    description: row.description,
                    is_active: row.is_active,
                };
                report.record(Line::insert_if_absent(&mut *conn, &data).await?);
            }
        }
        TransferEntity::Shifts => {
            let parsed = parse_rows::<ShiftRow>(input)?;
            report.errors = parsed.errors;
            for (_, row) in parsed.rows {
                let data = ShiftData {
                    company_id,
                    name: row.name,
                    start_time: row.start_time,
                    end_time: row.end_time,
                    grace_minutes: row.grace_minutes,
                    is_active: row.is_active,
                };
                report.record(Shift::insert_if_absent(&mut *conn, &data).await?);
            }
        }
        TransferEntity::Employees => {
            let parsed = parse_rows::<EmployeeRow>(input)?;
            report.errors = parsed.errors;
            for (_, row) in parsed.rows {
                let mut data = EmployeeData::scalar(
                    company_id,
                    row.employee_code,
                    row.first_name,
                    row.last_name,
                    row.joining_date,
                );
                data.email = row.email;
                data.phone = row.phone;
                data.gender = row.gender;
                data.date_of_birth = row.date_of_birth;
                data.status = row.status;
                report.record(Employee::insert_if_absent(&mut *conn, &data).await?);
            }
        }
        TransferEntity::Sections => return Err(TransferError::NotImportable(entity)),
    }

    Ok(report)
}

impl ImportReport {
    fn record(&mut self, inserted: bool) {
        if inserted {
            self.inserted += 1;
        } else {
            self.skipped += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_names() {
        assert_eq!("employees".parse::<TransferEntity>().unwrap(), TransferEntity::Employees);
        assert!(matches!(
            "payroll".parse::<TransferEntity>(),
            Err(TransferError::UnknownEntity(name)) if name == "payroll"
        ));
        assert!(!TransferEntity::Sections.importable());
        assert!(TransferEntity::Shifts.importable());
        assert_eq!(TransferEntity::Degrees.file_name(), "degrees.csv");
    }

    #[test]
    fn test_header_is_case_insensitive_and_extra_columns_ignored() {
        let csv = "Name,CODE,id,notes\nFinance,FIN,abc,ignored\n";
        let parsed = parse_rows::<DepartmentRow>(csv.as_bytes()).unwrap();

        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.rows[0].1.name, "Finance");
        assert_eq!(parsed.rows[0].1.code.as_deref(), Some("FIN"));
        assert!(parsed.rows[0].1.is_active);
    }

    #[test]
    fn test_missing_required_column() {
        let err = parse_rows::<ShiftRow>("name,start_time\nDay,09:00\n".as_bytes()).unwrap_err();
        match err {
            TransferError::InvalidHeader(message) => assert!(message.contains("end_time")),
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(matches!(
            parse_rows::<DepartmentRow>(b""),
            Err(TransferError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_shift_rows() {
        let csv = "name,start_time,end_time,grace_minutes,is_active\n\
                   Morning,06:00,14:00,10,yes\n\
                   Night,22:00:00,06:00,,\n\
                   Broken,25:00,06:00,0,true\n\
                   Lenient,08:00,16:00,300,true\n";
        let parsed = parse_rows::<ShiftRow>(csv.as_bytes()).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].1.grace_minutes, 10);
        assert_eq!(parsed.rows[1].1.start_time, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(parsed.rows[1].1.grace_minutes, 0);

        let rows: Vec<usize> = parsed.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![4, 5]);
        assert!(parsed.errors[0].message.contains("start_time"));
        assert!(parsed.errors[1].message.contains("grace_minutes"));
    }

    #[test]
    fn test_employee_rows() {
        let csv = "employee_code,first_name,last_name,email,gender,date_of_birth,joining_date,status\n\
                   E-1,Karim,Hossain,Karim@Example.com,male,1990-04-01,2020-01-05,\n\
                   E-2,Salma,Akter,,female,,2021-07-11,inactive\n\
                   E-3,Bad,Date,,,,05/01/2020,\n\
                   E-4,Bad,Gender,,robot,,2020-01-01,\n\
                   E-5,Bad,Mail,not-an-email,,,2020-01-01,\n";
        let parsed = parse_rows::<EmployeeRow>(csv.as_bytes()).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        let karim = &parsed.rows[0].1;
        assert_eq!(karim.email.as_deref(), Some("karim@example.com"));
        assert_eq!(karim.gender, Some(Gender::Male));
        assert_eq!(karim.status, EmployeeStatus::Active);
        assert_eq!(parsed.rows[1].1.status, EmployeeStatus::Inactive);

        assert_eq!(parsed.errors.len(), 3);
        assert!(parsed.errors[0].message.contains("joining_date"));
        assert!(parsed.errors[1].message.contains("gender"));
        assert!(parsed.errors[2].message.contains("email"));
    }

    #[test]
    fn test_column_limits_reject_the_row() {
        let csv = format!(
            "name,grade,description\nOperator,B,ok\nSupervisor,{},\nManager,,{}\n",
            "g".repeat(51),
            "d".repeat(501)
        );
        let parsed = parse_rows::<DesignationRow>(csv.as_bytes()).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.errors.len(), 2);
        assert_eq!(parsed.errors[0].row, 3);
        assert!(parsed.errors[0].message.contains("'grade' must be at most 50"));
        assert!(parsed.errors[1].message.contains("'description' must be at most 500"));
    }

    #[test]
    fn test_employee_email_and_phone_checks() {
        let csv = format!(
            "employee_code,first_name,last_name,email,phone,joining_date\n\
             E-1,Ok,Person,ok@example.com,01711000000,2020-01-01\n\
             E-2,Space,Mail,a b@x.y,,2020-01-01\n\
             E-3,Long,Phone,,{},2020-01-01\n",
            "9".repeat(31)
        );
        let parsed = parse_rows::<EmployeeRow>(csv.as_bytes()).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert!(parsed.errors[0].message.contains("email"));
        assert!(parsed.errors[1].message.contains("phone"));
    }

    #[test]
    fn test_blank_lines_and_quoted_values() {
        let csv = "name,description\n\"Sewing, Line A\",\"Floor \"\"2\"\"\"\n,\n";
        let parsed = parse_rows::<LineRow>(csv.as_bytes()).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.rows[0].1.name, "Sewing, Line A");
        assert_eq!(parsed.rows[0].1.description.as_deref(), Some("Floor \"2\""));
    }

    #[test]
    fn test_write_csv_quotes_fields() {
        let out = write_csv(
            ["name", "description"],
            vec![["Finance".to_string(), "Accounts, payroll".to_string()]],
        )
        .unwrap();

        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("name,description"));
        assert_eq!(lines.next(), Some("Finance,\"Accounts, payroll\""));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_report_counts() {
        let mut report = ImportReport::default();
        report.record(true);
        report.record(false);
        report.record(true);

        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 1);
    }
}
