//! Temporal wire value types and the ISO-8601 renderings shared by the
//! encoder and decoder.
//!
//! The wire carries instants and calendar dates as integers (epoch
//! milliseconds and epoch days) and every other temporal kind as an ISO-8601
//! string. String renderings here use fixed sub-second precision so that this
//! crate's own output always re-parses losslessly.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};

use crate::{Error, Result};

/// Days between the Julian-day epoch and the Unix epoch (1970-01-01).
const JULIAN_DAY_UNIX_EPOCH: i64 = 2_440_588;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const LOCAL_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second].[subsecond digits:9]");
const LOCAL_DATE_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]");
// Millisecond precision matches what the wire's epoch-millis kinds carry.
const INSTANT_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

pub(crate) fn timestamp_to_millis(instant: OffsetDateTime) -> i64 {
    (instant.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn timestamp_from_millis(millis: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(|e| Error::invalid_data(format!("epoch millis {millis} out of range: {e}")))
}

pub(crate) fn date_to_epoch_day(date: Date) -> i64 {
    i64::from(date.to_julian_day()) - JULIAN_DAY_UNIX_EPOCH
}

pub(crate) fn date_from_epoch_day(epoch_day: i64) -> Result<Date> {
    let julian = i32::try_from(epoch_day + JULIAN_DAY_UNIX_EPOCH)
        .map_err(|_| Error::invalid_data(format!("epoch day {epoch_day} out of range")))?;
    Date::from_julian_day(julian)
        .map_err(|e| Error::invalid_data(format!("epoch day {epoch_day} out of range: {e}")))
}

pub(crate) fn format_date(date: Date) -> Result<String> {
    date.format(DATE_FORMAT)
        .map_err(|e| Error::invalid_data(format!("unrepresentable date {date}: {e}")))
}

pub(crate) fn parse_date(s: &str) -> Result<Date> {
    Date::parse(s, DATE_FORMAT).map_err(|e| Error::invalid_data(format!("invalid date `{s}`: {e}")))
}

pub(crate) fn format_local_time(time: Time) -> Result<String> {
    time.format(LOCAL_TIME_FORMAT)
        .map_err(|e| Error::invalid_data(format!("unrepresentable time {time}: {e}")))
}

pub(crate) fn parse_local_time(s: &str) -> Result<Time> {
    Time::parse(s, LOCAL_TIME_FORMAT)
        .map_err(|e| Error::invalid_data(format!("invalid time `{s}`: {e}")))
}

pub(crate) fn format_local_date_time(date_time: PrimitiveDateTime) -> Result<String> {
    date_time
        .format(LOCAL_DATE_TIME_FORMAT)
        .map_err(|e| Error::invalid_data(format!("unrepresentable date-time {date_time}: {e}")))
}

pub(crate) fn parse_local_date_time(s: &str) -> Result<PrimitiveDateTime> {
    PrimitiveDateTime::parse(s, LOCAL_DATE_TIME_FORMAT)
        .map_err(|e| Error::invalid_data(format!("invalid date-time `{s}`: {e}")))
}

pub(crate) fn format_instant(instant: OffsetDateTime) -> Result<String> {
    let utc = instant.to_offset(time::UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
        .format(INSTANT_FORMAT)
        .map_err(|e| Error::invalid_data(format!("unrepresentable instant {instant}: {e}")))
}

pub(crate) fn parse_instant(s: &str) -> Result<OffsetDateTime> {
    PrimitiveDateTime::parse(s, INSTANT_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| Error::invalid_data(format!("invalid instant `{s}`: {e}")))
}

/// Renders `duration` as an ISO-8601 duration string, e.g. `PT90.5S`.
pub(crate) fn format_duration(duration: Duration) -> String {
    let seconds = duration.whole_seconds();
    let nanos = duration.subsec_nanoseconds();
    if nanos == 0 {
        return format!("PT{seconds}S");
    }
    let sign = if duration.is_negative() { "-" } else { "" };
    let frac = format!("{:09}", nanos.unsigned_abs());
    let frac = frac.trim_end_matches('0');
    format!("PT{sign}{}.{frac}S", seconds.unsigned_abs())
}

/// Parses an ISO-8601 duration of the `P[nD]T[nH][nM][n.nS]` shape.
pub(crate) fn parse_duration(s: &str) -> Result<Duration> {
    let err = || Error::invalid_data(format!("invalid ISO-8601 duration `{s}`"));
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let rest = rest.strip_prefix('P').ok_or_else(err)?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date_part, time_part)) => (date_part, time_part),
        None => (rest, ""),
    };

    let mut total = Duration::ZERO;
    let mut number = String::new();
    for c in date_part.chars() {
        match c {
            '0'..='9' | '-' | '+' => number.push(c),
            'D' => {
                let days: i64 = number.parse().map_err(|_| err())?;
                total += Duration::days(days);
                number.clear();
            }
            'W' => {
                let weeks: i64 = number.parse().map_err(|_| err())?;
                total += Duration::weeks(weeks);
                number.clear();
            }
            _ => return Err(err()),
        }
    }
    if !number.is_empty() {
        return Err(err());
    }
    for c in time_part.chars() {
        match c {
            '0'..='9' | '-' | '+' | '.' => number.push(c),
            'H' => {
                let hours: i64 = number.parse().map_err(|_| err())?;
                total += Duration::hours(hours);
                number.clear();
            }
            'M' => {
                let minutes: i64 = number.parse().map_err(|_| err())?;
                total += Duration::minutes(minutes);
                number.clear();
            }
            'S' => {
                total += parse_seconds(&number).ok_or_else(err)?;
                number.clear();
            }
            _ => return Err(err()),
        }
    }
    if !number.is_empty() {
        return Err(err());
    }
    Ok(if negative { -total } else { total })
}

/// Parses a seconds component with an optional fraction, e.g. `-1.5`.
fn parse_seconds(number: &str) -> Option<Duration> {
    let (whole, frac) = match number.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (number, ""),
    };
    let seconds: i64 = whole.parse().ok()?;
    if frac.is_empty() {
        return Some(Duration::seconds(seconds));
    }
    if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut nanos: i32 = frac.parse().ok()?;
    nanos *= 10i32.pow(9 - frac.len() as u32);
    if whole.starts_with('-') {
        nanos = -nanos;
    }
    // `Duration::new` sums the two components, so mixed signs are fine
    Some(Duration::new(seconds, nanos))
}

/// A calendar amount of years, months, and days, carried on the wire as an
/// ISO-8601 period string such as `P1Y2M3D`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    /// Number of years.
    pub years: i32,
    /// Number of months.
    pub months: i32,
    /// Number of days.
    pub days: i32,
}

impl Period {
    /// Creates a new period from the given components.
    pub fn new(years: i32, months: i32, days: i32) -> Self {
        Self {
            years,
            months,
            days,
        }
    }

    /// Whether all components are zero.
    pub fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("P0D");
        }
        f.write_str("P")?;
        if self.years != 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months != 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.days != 0 {
            write!(f, "{}D", self.days)?;
        }
        Ok(())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let err = || Error::invalid_data(format!("invalid ISO-8601 period `{s}`"));
        let rest = s.strip_prefix('P').ok_or_else(err)?;
        if rest.is_empty() {
            return Err(err());
        }
        let mut period = Period::default();
        let mut number = String::new();
        for c in rest.chars() {
            match c {
                '0'..='9' | '-' | '+' => number.push(c),
                'Y' | 'M' | 'W' | 'D' => {
                    let amount: i32 = number.parse().map_err(|_| err())?;
                    match c {
                        'Y' => period.years = amount,
                        'M' => period.months = amount,
                        'W' => period.days += amount * 7,
                        _ => period.days += amount,
                    }
                    number.clear();
                }
                _ => return Err(err()),
            }
        }
        if !number.is_empty() {
            return Err(err());
        }
        Ok(period)
    }
}

/// A span between two instants, carried on the wire as an ISO-8601
/// `start/end` string with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl Interval {
    /// Creates a new interval.
    ///
    /// # Errors
    /// Returns [`Error::InvalidData`] if `end` is before `start`.
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self> {
        if end < start {
            return Err(Error::invalid_data(format!(
                "interval end {end} precedes start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The inclusive start instant.
    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    /// The exclusive end instant.
    pub fn end(&self) -> OffsetDateTime {
        self.end
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let start = format_instant(self.start).map_err(|_| fmt::Error)?;
        let end = format_instant(self.end).map_err(|_| fmt::Error)?;
        write!(f, "{start}/{end}")
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once('/')
            .ok_or_else(|| Error::invalid_data(format!("invalid ISO-8601 interval `{s}`")))?;
        Self::new(parse_instant(start)?, parse_instant(end)?)
    }
}
