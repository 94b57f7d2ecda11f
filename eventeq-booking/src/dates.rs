//! Calendar arithmetic for bookings. Every day boundary is computed in one
//! fixed UTC+8 zone, independent of the host timezone.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Stored and wire format of booking dates (`DD/MM/YYYY`).
pub const DATE_FORMAT: &str = "%d/%m/%Y";

pub const REGION_OFFSET_HOURS: i64 = 8;

/// How long past the start-of-day boundary an unpaid booking stays payable.
pub const UNPAID_GRACE_HOURS: i64 = 6;

pub fn parse_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Wall-clock time in the booking region.
pub fn local_now(now: DateTime<Utc>) -> NaiveDateTime {
    now.naive_utc() + Duration::hours(REGION_OFFSET_HOURS)
}

pub fn local_today(now: DateTime<Utc>) -> NaiveDate {
    local_now(now).date()
}

/// The instant a booking date begins: midnight in the booking region.
pub fn start_instant(date: NaiveDate) -> DateTime<Utc> {
    (date.and_time(NaiveTime::MIN) - Duration::hours(REGION_OFFSET_HOURS)).and_utc()
}

/// Instant after which an unpaid booking is considered overdue.
pub fn unpaid_deadline(start: NaiveDate) -> DateTime<Utc> {
    start_instant(start) + Duration::hours(UNPAID_GRACE_HOURS)
}

/// Inclusive length of a date range in days; a single-day booking lasts 1 day.
pub fn duration_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Serde adapter for `NaiveDate` in `DD/MM/YYYY`.
pub mod dmy {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).map_err(serde::de::Error::custom)
    }
}
