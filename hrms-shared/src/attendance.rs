/// Attendance rules for roster schedules
///
/// Pure functions that turn a roster entry, its shift and a timestamp into
/// the next attendance state. Shift times are wall-clock times at a fixed
/// UTC offset; all stored timestamps are UTC.
///
/// # Example
///
/// ```
/// use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone};
/// use hrms_shared::attendance::{check_in, ShiftWindow};
/// use hrms_shared::models::roster::RosterStatus;
///
/// let dhaka = FixedOffset::east_opt(6 * 3600).unwrap();
/// let window = ShiftWindow {
///     start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
///     end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
///     grace_minutes: 10,
/// };
/// let date = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
/// let at = dhaka.with_ymd_and_hms(2025, 3, 2, 9, 25, 0).unwrap();
///
/// let status = check_in(RosterStatus::Scheduled, None, at.into(), &window, date, dhaka).unwrap();
/// assert_eq!(status, RosterStatus::Late);
/// ```

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

use crate::models::roster::RosterStatus;

/// Longest range accepted by bulk roster creation, in days (inclusive)
pub const MAX_BULK_DAYS: i64 = 62;

const MINUTES_PER_DAY: i32 = 24 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttendanceError {
    #[error("Already checked in")]
    AlreadyCheckedIn,

    #[error("Cannot check in a roster entry with status '{0}'")]
    NotScheduled(RosterStatus),

    #[error("Not checked in yet")]
    NotCheckedIn,

    #[error("Already checked out")]
    AlreadyCheckedOut,

    #[error("Check-out must be after check-in")]
    CheckOutBeforeCheckIn,

    #[error("Status '{0}' can only be set by checking in")]
    StatusRequiresCheckIn(RosterStatus),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Invalid UTC offset: {0} minutes")]
    InvalidOffset(i32),
}

impl AttendanceError {
    /// Conflicts with the current roster state, as opposed to bad input
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AttendanceError::AlreadyCheckedIn
                | AttendanceError::NotScheduled(_)
                | AttendanceError::NotCheckedIn
                | AttendanceError::AlreadyCheckedOut
        )
    }
}

/// The parts of a shift attendance depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub grace_minutes: i32,
}

/// Scheduled start and end of one roster entry, in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTimes {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Result of a check-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutOutcome {
    pub worked_minutes: i32,
    pub overtime_minutes: i32,
}

pub fn utc_offset(minutes: i32) -> Result<FixedOffset, AttendanceError> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or(AttendanceError::InvalidOffset(minutes))
}

/// A shift whose end is not after its start crosses midnight
pub fn is_overnight(start: NaiveTime, end: NaiveTime) -> bool {
    end <= start
}

pub fn planned_minutes(start: NaiveTime, end: NaiveTime) -> i32 {
    let minutes = (end - start).num_minutes() as i32;
    if is_overnight(start, end) {
        minutes + MINUTES_PER_DAY
    } else {
        minutes
    }
}

impl ShiftWindow {
    pub fn planned_minutes(&self) -> i32 {
        planned_minutes(self.start, self.end)
    }

    pub fn scheduled(&self, date: NaiveDate, offset: FixedOffset) -> ScheduledTimes {
        let start = local_to_utc(date, self.start, offset);
        let end_date = if is_overnight(self.start, self.end) {
            date.succ_opt().unwrap_or(date)
        } else {
            date
        };

        ScheduledTimes {
            start,
            end: local_to_utc(end_date, self.end, offset),
        }
    }

    /// Latest check-in that still counts as on time
    pub fn late_after(&self, date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
        self.scheduled(date, offset).start + Duration::minutes(i64::from(self.grace_minutes))
    }
}

fn local_to_utc(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    // A fixed offset has exactly one mapping for every local time
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(time)))
}

/// Validates a check-in and returns the resulting status
///
/// # Errors
///
/// - `AlreadyCheckedIn` if a check-in is already recorded
/// - `NotScheduled` if the entry is absent, on leave or otherwise not `scheduled`
pub fn check_in(
    status: RosterStatus,
    existing_check_in: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
    window: &ShiftWindow,
    date: NaiveDate,
    offset: FixedOffset,
) -> Result<RosterStatus, AttendanceError> {
    if existing_check_in.is_some() {
        return Err(AttendanceError::AlreadyCheckedIn);
    }
    if status != RosterStatus::Scheduled {
        return Err(AttendanceError::NotScheduled(status));
    }

    if at > window.late_after(date, offset) {
        Ok(RosterStatus::Late)
    } else {
        Ok(RosterStatus::Present)
    }
}

/// Validates a check-out and computes worked and overtime minutes
///
/// Overtime is time worked beyond the shift's planned minutes.
pub fn check_out(
    check_in: Option<DateTime<Utc>>,
    existing_check_out: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
    window: &ShiftWindow,
) -> Result<CheckOutOutcome, AttendanceError> {
    let check_in = check_in.ok_or(AttendanceError::NotCheckedIn)?;
    if existing_check_out.is_some() {
        return Err(AttendanceError::AlreadyCheckedOut);
    }
    if at <= check_in {
        return Err(AttendanceError::CheckOutBeforeCheckIn);
    }

    let worked = (at - check_in).num_minutes();
    let worked_minutes = i32::try_from(worked).unwrap_or(i32::MAX);
    let overtime_minutes = (worked_minutes - window.planned_minutes()).max(0);

    Ok(CheckOutOutcome {
        worked_minutes,
        overtime_minutes,
    })
}

/// Checks a manual status change on an existing roster entry
///
/// `present` and `late` are derived from check-in and cannot be set on an
/// entry that has no check-in.
pub fn validate_status_change(
    new_status: RosterStatus,
    check_in: Option<DateTime<Utc>>,
) -> Result<(), AttendanceError> {
    match new_status {
        RosterStatus::Present | RosterStatus::Late if check_in.is_none() => {
            Err(AttendanceError::StatusRequiresCheckIn(new_status))
        }
        _ => Ok(()),
    }
}

/// Every date from `from` to `to`, inclusive
///
/// # Errors
///
/// `InvalidRange` when `from > to` or the range is longer than [`MAX_BULK_DAYS`].
pub fn date_range(from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>, AttendanceError> {
    if from > to {
        return Err(AttendanceError::InvalidRange(format!(
            "'from' ({}) is after 'to' ({})",
            from, to
        )));
    }

    let days = (to - from).num_days() + 1;
    if days > MAX_BULK_DAYS {
        return Err(AttendanceError::InvalidRange(format!(
            "{} days requested, at most {} allowed",
            days, MAX_BULK_DAYS
        )));
    }

    Ok(from.iter_days().take(days as usize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dhaka() -> FixedOffset {
        utc_offset(360).unwrap()
    }

    fn local(d: NaiveDate, h: u32, m: u32) -> DateTime<Utc> {
        dhaka()
            .from_local_datetime(&d.and_time(time(h, m)))
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day_shift() -> ShiftWindow {
        ShiftWindow {
            start: time(9, 0),
            end: time(17, 0),
            grace_minutes: 15,
        }
    }

    fn night_shift() -> ShiftWindow {
        ShiftWindow {
            start: time(22, 0),
            end: time(6, 0),
            grace_minutes: 0,
        }
    }

    #[test]
    fn test_offsets() {
        assert_eq!(utc_offset(360).unwrap().local_minus_utc(), 6 * 3600);
        assert_eq!(utc_offset(-300).unwrap().local_minus_utc(), -5 * 3600);
        assert!(utc_offset(24 * 60).is_err());
    }

    #[test]
    fn test_planned_minutes() {
        assert_eq!(planned_minutes(time(9, 0), time(17, 30)), 510);
        assert_eq!(planned_minutes(time(22, 0), time(6, 0)), 480);
        assert_eq!(planned_minutes(time(7, 0), time(7, 0)), 1440);
    }

    #[test]
    fn test_scheduled_times_overnight() {
        let d = date(2025, 1, 31);
        let times = night_shift().scheduled(d, dhaka());

        assert_eq!(times.start, local(d, 22, 0));
        assert_eq!(times.end, local(date(2025, 2, 1), 6, 0));
        assert_eq!((times.end - times.start).num_minutes(), 480);
    }

    #[test]
    fn test_scheduled_times_are_utc() {
        let d = date(2025, 6, 1);
        let times = day_shift().scheduled(d, dhaka());
        assert_eq!(times.start, Utc.with_ymd_and_hms(2025, 6, 1, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_check_in_on_time_and_late() {
        let d = date(2025, 3, 2);
        let window = day_shift();

        let on_time = check_in(RosterStatus::Scheduled, None, local(d, 9, 15), &window, d, dhaka());
        assert_eq!(on_time, Ok(RosterStatus::Present));

        let early = check_in(RosterStatus::Scheduled, None, local(d, 8, 30), &window, d, dhaka());
        assert_eq!(early, Ok(RosterStatus::Present));

        let late = check_in(RosterStatus::Scheduled, None, local(d, 9, 16), &window, d, dhaka());
        assert_eq!(late, Ok(RosterStatus::Late));
    }

    #[test]
    fn test_check_in_rejections() {
        let d = date(2025, 3, 2);
        let window = day_shift();
        let at = local(d, 9, 0);

        assert_eq!(
            check_in(RosterStatus::Present, Some(at), at, &window, d, dhaka()),
            Err(AttendanceError::AlreadyCheckedIn)
        );
        assert_eq!(
            check_in(RosterStatus::OnLeave, None, at, &window, d, dhaka()),
            Err(AttendanceError::NotScheduled(RosterStatus::OnLeave))
        );
        assert_eq!(
            check_in(RosterStatus::Absent, None, at, &window, d, dhaka()),
            Err(AttendanceError::NotScheduled(RosterStatus::Absent))
        );
    }

    #[test]
    fn test_check_out_computes_overtime() {
        let d = date(2025, 3, 2);
        let window = day_shift();

        let outcome = check_out(Some(local(d, 8, 55)), None, local(d, 18, 10), &window).unwrap();
        assert_eq!(outcome.worked_minutes, 555);
        assert_eq!(outcome.overtime_minutes, 75);

        let short = check_out(Some(local(d, 9, 0)), None, local(d, 12, 0), &window).unwrap();
        assert_eq!(short.worked_minutes, 180);
        assert_eq!(short.overtime_minutes, 0);
    }

    #[test]
    fn test_check_out_overnight() {
        let d = date(2025, 3, 2);
        let next = date(2025, 3, 3);

        let outcome = check_out(Some(local(d, 22, 0)), None, local(next, 7, 0), &night_shift()).unwrap();
        assert_eq!(outcome.worked_minutes, 540);
        assert_eq!(outcome.overtime_minutes, 60);
    }

    #[test]
    fn test_check_out_rejections() {
        let d = date(2025, 3, 2);
        let window = day_shift();
        let at = local(d, 9, 0);

        assert_eq!(check_out(None, None, at, &window), Err(AttendanceError::NotCheckedIn));
        assert_eq!(
            check_out(Some(at), Some(local(d, 17, 0)), local(d, 18, 0), &window),
            Err(AttendanceError::AlreadyCheckedOut)
        );
        assert_eq!(
            check_out(Some(at), None, at, &window),
            Err(AttendanceError::CheckOutBeforeCheckIn)
        );
        assert_eq!(
            check_out(Some(at), None, local(d, 8, 0), &window),
            Err(AttendanceError::CheckOutBeforeCheckIn)
        );
    }

    #[test]
    fn test_status_change_rules() {
        assert!(validate_status_change(RosterStatus::Absent, None).is_ok());
        assert!(validate_status_change(RosterStatus::OnLeave, None).is_ok());
        assert_eq!(
            validate_status_change(RosterStatus::Present, None),
            Err(AttendanceError::StatusRequiresCheckIn(RosterStatus::Present))
        );
        assert!(validate_status_change(RosterStatus::Late, Some(Utc::now())).is_ok());
    }

    #[test]
    fn test_date_range() {
        let days = date_range(date(2025, 2, 27), date(2025, 3, 2)).unwrap();
        assert_eq!(days.len(), 4);
        assert_eq!(days[2], date(2025, 3, 1));

        assert_eq!(date_range(date(2025, 1, 1), date(2025, 1, 1)).unwrap().len(), 1);
        assert_eq!(date_range(date(2025, 1, 1), date(2025, 3, 3)).unwrap().len(), 62);
        assert!(date_range(date(2025, 1, 1), date(2025, 3, 4)).is_err());
        assert!(date_range(date(2025, 1, 2), date(2025, 1, 1)).is_err());
    }

    #[test]
    fn test_conflict_classification() {
        assert!(AttendanceError::AlreadyCheckedIn.is_conflict());
        assert!(AttendanceError::NotCheckedIn.is_conflict());
        assert!(!AttendanceError::CheckOutBeforeCheckIn.is_conflict());
        assert!(!AttendanceError::InvalidRange(String::new()).is_conflict());
    }
}
