//! Timestamps in the log's fixed civil timezone.
//!
//! `add_time` and `task_deadline` each have exactly one canonical format.
//! Other spellings found in older sheets are handled by `ops::migrate`.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

/// Canonical `add_time` format, e.g. `02/01/2024 09:00:00`
pub const ADD_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Canonical `task_deadline` format, e.g. `15/03/2024`
pub const DEADLINE_FORMAT: &str = "%d/%m/%Y";

/// Source of "now" in the log's timezone.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock shifted into a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Falls back to UTC when `hours` is outside ±23.
    pub fn with_offset_hours(hours: i32) -> Self {
        let offset = FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix());
        SystemClock { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::with_offset_hours(7)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// A clock stopped at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Stop the clock at a local date and time in the given offset.
    pub fn at(local: NaiveDateTime, offset_hours: i32) -> Option<Self> {
        let offset = FixedOffset::east_opt(offset_hours * 3600)?;
        local
            .and_local_timezone(offset)
            .single()
            .map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Current time formatted for the `add_time` column.
pub fn now_stamp(clock: &dyn Clock) -> String {
    clock.now().format(ADD_TIME_FORMAT).to_string()
}

/// The current local date, i.e. "now" normalized to midnight.
pub fn today(clock: &dyn Clock) -> NaiveDate {
    clock.now().date_naive()
}

/// Ids issued so far by this process; breaks ties within one clock tick.
static TASK_ID_SEQ: AtomicU32 = AtomicU32::new(0);

/// A fresh per-revision identifier: `TASK-<secs>-<nanos>-<seq>`.
pub fn generate_task_id(clock: &dyn Clock) -> String {
    let now = clock.now();
    let seq = TASK_ID_SEQ.fetch_add(1, Ordering::Relaxed);
    format!(
        "TASK-{}-{:09}-{}",
        now.timestamp(),
        now.timestamp_subsec_nanos(),
        seq
    )
}

pub fn parse_add_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), ADD_TIME_FORMAT).ok()
}

pub fn parse_deadline(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DEADLINE_FORMAT).ok()
}

pub fn format_deadline(date: NaiveDate) -> String {
    date.format(DEADLINE_FORMAT).to_string()
}

pub fn format_add_time(dt: NaiveDateTime) -> String {
    dt.format(ADD_TIME_FORMAT).to_string()
}
