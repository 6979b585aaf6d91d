use crate::{ModelError, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Timelike};
use std::fmt::{self, Display, Formatter};
use std::ops::{Add, Sub};
use std::str::FromStr;

const MICROS_PER_SECOND: u64 = 1_000_000;
const MICROS_PER_MINUTE: u64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: u64 = 60 * MICROS_PER_MINUTE;
const MICROS_PER_DAY: u64 = 24 * MICROS_PER_HOUR;

// the interval day field is eight decimal digits wide
const MAX_INTERVAL_MICROS: u64 = 100_000_000 * MICROS_PER_DAY - 1;

/// A CIM `datetime` value: either a point in time or an interval.
///
/// The wire form is exactly 25 characters. A timestamp reads
/// `yyyymmddhhmmss.mmmmmm+ooo` (or `-ooo`) where `ooo` is the UTC offset
/// in minutes; an interval reads `ddddddddhhmmss.mmmmmm:000`, the `:`
/// marker distinguishing the two.
///
/// ```
/// use wbem_types::CimDateTime;
///
/// let dt: CimDateTime = "20140924193040.654321+120".parse().unwrap();
/// assert!(dt.is_timestamp());
/// assert_eq!(dt.to_string(), "20140924193040.654321+120");
///
/// let iv: CimDateTime = "00000183132542.234567:000".parse().unwrap();
/// assert!(iv.is_interval());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CimDateTime {
    /// A point in time with microsecond precision and explicit UTC offset
    Timestamp(Timestamp),
    /// An elapsed duration with microsecond precision
    Interval(Interval),
}

impl CimDateTime {
    /// True for the point-in-time variant.
    pub fn is_timestamp(&self) -> bool {
        matches!(self, CimDateTime::Timestamp(_))
    }

    /// True for the interval variant.
    pub fn is_interval(&self) -> bool {
        matches!(self, CimDateTime::Interval(_))
    }
}

impl Display for CimDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CimDateTime::Timestamp(t) => Display::fmt(t, f),
            CimDateTime::Interval(i) => Display::fmt(i, f),
        }
    }
}

impl FromStr for CimDateTime {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 25 || !s.is_ascii() {
            return Err(ModelError::DateTimeFormat(s.to_string()));
        }
        match &s[21..22] {
            ":" => Interval::parse(s).map(CimDateTime::Interval),
            "+" | "-" => Timestamp::parse(s).map(CimDateTime::Timestamp),
            _ => Err(ModelError::DateTimeFormat(s.to_string())),
        }
    }
}

impl From<Timestamp> for CimDateTime {
    fn from(t: Timestamp) -> Self {
        CimDateTime::Timestamp(t)
    }
}

impl From<Interval> for CimDateTime {
    fn from(i: Interval) -> Self {
        CimDateTime::Interval(i)
    }
}

/// The point-in-time variant of [`CimDateTime`].
///
/// Wraps a [`chrono::DateTime`] truncated to microsecond precision, with a
/// UTC offset expressible in the three-digit wire field (at most ±999
/// minutes). Equality and hashing follow chrono: two timestamps denoting
/// the same instant are equal even if their offsets differ.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    inner: DateTime<FixedOffset>,
}

impl Timestamp {
    /// Wraps a chrono datetime, truncating to microsecond precision.
    ///
    /// Fails when the year is outside 0..=9999 or the offset does not fit
    /// the three-digit minute field.
    pub fn new(datetime: DateTime<FixedOffset>) -> Result<Self> {
        if !(0..=9999).contains(&datetime.year()) {
            return Err(ModelError::DateTimeRange("year"));
        }
        let offset_seconds = datetime.offset().fix().local_minus_utc();
        if offset_seconds % 60 != 0 || offset_seconds.unsigned_abs() / 60 > 999 {
            return Err(ModelError::DateTimeRange("utc offset"));
        }
        let truncated_nanos = datetime.nanosecond() % 1_000_000_000 / 1000 * 1000;
        let inner = datetime
            .with_nanosecond(truncated_nanos)
            .unwrap_or(datetime);
        Ok(Self { inner })
    }

    /// The current time in UTC.
    pub fn now() -> Self {
        Self::new(chrono::Utc::now().fixed_offset()).expect("current time is in range")
    }

    /// The wrapped chrono datetime.
    pub fn datetime(&self) -> DateTime<FixedOffset> {
        self.inner
    }

    /// The UTC offset in minutes, east positive.
    pub fn utc_offset_minutes(&self) -> i32 {
        self.inner.offset().local_minus_utc() / 60
    }

    fn parse(s: &str) -> Result<Self> {
        let malformed = || ModelError::DateTimeFormat(s.to_string());
        let digits = |r: std::ops::Range<usize>| -> Result<u32> {
            let part = &s[r];
            if part.bytes().all(|b| b.is_ascii_digit()) {
                part.parse().map_err(|_| malformed())
            } else {
                Err(malformed())
            }
        };

        if &s[14..15] != "." {
            return Err(malformed());
        }
        let year = digits(0..4)?;
        let month = digits(4..6)?;
        let day = digits(6..8)?;
        let hour = digits(8..10)?;
        let minute = digits(10..12)?;
        let second = digits(12..14)?;
        let micros = digits(15..21)?;
        let offset_minutes = digits(22..25)? as i32;
        let offset_seconds = match &s[21..22] {
            "+" => offset_minutes * 60,
            "-" => -offset_minutes * 60,
            _ => return Err(malformed()),
        };

        let naive = NaiveDate::from_ymd_opt(year as i32, month, day)
            .and_then(|d| d.and_hms_micro_opt(hour, minute, second, micros))
            .ok_or(ModelError::DateTimeRange("date or time field"))?;
        let offset =
            FixedOffset::east_opt(offset_seconds).ok_or(ModelError::DateTimeRange("utc offset"))?;
        let inner = offset
            .from_local_datetime(&naive)
            .single()
            .ok_or(ModelError::DateTimeRange("date or time field"))?;
        Ok(Self { inner })
    }

    /// Adds an interval, returning `None` when the result leaves the
    /// representable range.
    pub fn checked_add(self, interval: Interval) -> Option<Self> {
        let sum = self
            .inner
            .checked_add_signed(Duration::microseconds(interval.micros as i64))?;
        Self::new(sum).ok()
    }

    /// Subtracts an interval, returning `None` when the result leaves the
    /// representable range.
    pub fn checked_sub(self, interval: Interval) -> Option<Self> {
        let diff = self
            .inner
            .checked_sub_signed(Duration::microseconds(interval.micros as i64))?;
        Self::new(diff).ok()
    }

    /// Elapsed time since `earlier`, or `None` when `earlier` is later
    /// than `self` or the difference exceeds the interval range.
    pub fn checked_duration_since(self, earlier: Timestamp) -> Option<Interval> {
        let delta = self.inner.signed_duration_since(earlier.inner);
        let micros = delta.num_microseconds()?;
        if micros < 0 {
            return None;
        }
        Interval::from_micros(micros as u64).ok()
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let dt = &self.inner;
        let offset_minutes = self.utc_offset_minutes();
        let sign = if offset_minutes < 0 { '-' } else { '+' };
        write!(
            f,
            "{:04}{:02}{:02}{:02}{:02}{:02}.{:06}{}{:03}",
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
            dt.nanosecond() % 1_000_000_000 / 1000,
            sign,
            offset_minutes.unsigned_abs(),
        )
    }
}

impl Add<Interval> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Interval) -> Timestamp {
        self.checked_add(rhs)
            .unwrap_or_else(|| panic!("timestamp overflow when adding {rhs}"))
    }
}

impl Sub<Interval> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Interval) -> Timestamp {
        self.checked_sub(rhs)
            .unwrap_or_else(|| panic!("timestamp underflow when subtracting {rhs}"))
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Interval;

    fn sub(self, rhs: Timestamp) -> Interval {
        self.checked_duration_since(rhs)
            .unwrap_or_else(|| panic!("timestamp subtraction with later operand {rhs}"))
    }
}

/// The interval variant of [`CimDateTime`].
///
/// Stored as a microsecond count; the wire fields (days, hours, minutes,
/// seconds, microseconds) are derived views. The day field is limited to
/// eight decimal digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    micros: u64,
}

impl Interval {
    /// Builds an interval from its wire fields.
    ///
    /// `hours`, `minutes`, and `seconds` must be valid clock fields;
    /// `days` at most 99 999 999.
    pub fn new(days: u32, hours: u32, minutes: u32, seconds: u32, microseconds: u32) -> Result<Self> {
        if days > 99_999_999 {
            return Err(ModelError::DateTimeRange("interval days"));
        }
        if hours > 23 {
            return Err(ModelError::DateTimeRange("interval hours"));
        }
        if minutes > 59 {
            return Err(ModelError::DateTimeRange("interval minutes"));
        }
        if seconds > 59 {
            return Err(ModelError::DateTimeRange("interval seconds"));
        }
        if microseconds > 999_999 {
            return Err(ModelError::DateTimeRange("interval microseconds"));
        }
        Ok(Self {
            micros: u64::from(days) * MICROS_PER_DAY
                + u64::from(hours) * MICROS_PER_HOUR
                + u64::from(minutes) * MICROS_PER_MINUTE
                + u64::from(seconds) * MICROS_PER_SECOND
                + u64::from(microseconds),
        })
    }

    /// Builds an interval from a raw microsecond count.
    pub fn from_micros(micros: u64) -> Result<Self> {
        if micros > MAX_INTERVAL_MICROS {
            return Err(ModelError::DateTimeRange("interval days"));
        }
        Ok(Self { micros })
    }

    /// Total length in microseconds.
    pub fn as_micros(&self) -> u64 {
        self.micros
    }

    /// The day field of the wire form.
    pub fn days(&self) -> u32 {
        (self.micros / MICROS_PER_DAY) as u32
    }

    /// The hour field of the wire form.
    pub fn hours(&self) -> u32 {
        (self.micros % MICROS_PER_DAY / MICROS_PER_HOUR) as u32
    }

    /// The minute field of the wire form.
    pub fn minutes(&self) -> u32 {
        (self.micros % MICROS_PER_HOUR / MICROS_PER_MINUTE) as u32
    }

    /// The second field of the wire form.
    pub fn seconds(&self) -> u32 {
        (self.micros % MICROS_PER_MINUTE / MICROS_PER_SECOND) as u32
    }

    /// The microsecond field of the wire form.
    pub fn microseconds(&self) -> u32 {
        (self.micros % MICROS_PER_SECOND) as u32
    }

    fn parse(s: &str) -> Result<Self> {
        let malformed = || ModelError::DateTimeFormat(s.to_string());
        let digits = |r: std::ops::Range<usize>| -> Result<u32> {
            let part = &s[r];
            if part.bytes().all(|b| b.is_ascii_digit()) {
                part.parse().map_err(|_| malformed())
            } else {
                Err(malformed())
            }
        };

        if &s[14..15] != "." || &s[21..25] != ":000" {
            return Err(malformed());
        }
        Self::new(
            digits(0..8)?,
            digits(8..10)?,
            digits(10..12)?,
            digits(12..14)?,
            digits(15..21)?,
        )
    }

    /// Sum, or `None` when it exceeds the interval range.
    pub fn checked_add(self, rhs: Interval) -> Option<Self> {
        self.micros
            .checked_add(rhs.micros)
            .and_then(|m| Self::from_micros(m).ok())
    }

    /// Difference, or `None` when `rhs` is longer than `self`.
    pub fn checked_sub(self, rhs: Interval) -> Option<Self> {
        self.micros.checked_sub(rhs.micros).map(|micros| Self { micros })
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08}{:02}{:02}{:02}.{:06}:000",
            self.days(),
            self.hours(),
            self.minutes(),
            self.seconds(),
            self.microseconds(),
        )
    }
}

impl Add for Interval {
    type Output = Interval;

    fn add(self, rhs: Interval) -> Interval {
        self.checked_add(rhs)
            .unwrap_or_else(|| panic!("interval overflow when adding {rhs}"))
    }
}

impl Sub for Interval {
    type Output = Interval;

    fn sub(self, rhs: Interval) -> Interval {
        self.checked_sub(rhs)
            .unwrap_or_else(|| panic!("interval underflow when subtracting {rhs}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn timestamp_wire_round_trip() {
        for s in [
            "20140924193040.654321+120",
            "20140924193040.654321-300",
            "00010101000000.000000+000",
            "99991231235959.999999+000",
        ] {
            let dt: CimDateTime = s.parse().unwrap();
            assert!(dt.is_timestamp());
            assert_eq!(dt.to_string(), s);
        }
    }

    #[test]
    fn interval_wire_round_trip() {
        for s in [
            "00000183132542.234567:000",
            "00000000000000.000000:000",
            "99999999235959.999999:000",
        ] {
            let dt: CimDateTime = s.parse().unwrap();
            assert!(dt.is_interval());
            assert_eq!(dt.to_string(), s);
        }
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("20140924193040.654321+12".parse::<CimDateTime>().is_err());
        assert!("20140924193040.654321+1200".parse::<CimDateTime>().is_err());
        assert!("".parse::<CimDateTime>().is_err());
    }

    #[test]
    fn rejects_bad_shape() {
        // missing decimal point
        assert!("20140924193040 654321+120".parse::<CimDateTime>().is_err());
        // bad separator position
        assert!("20140924193040.654321*120".parse::<CimDateTime>().is_err());
        // non-digit in a digit field
        assert!("2014x924193040.654321+120".parse::<CimDateTime>().is_err());
        // interval marker must be followed by three zeros
        assert!("00000183132542.234567:001".parse::<CimDateTime>().is_err());
        // calendar violation
        assert!("20140231000000.000000+000".parse::<CimDateTime>().is_err());
        // clock violation in an interval
        assert!("00000001240000.000000:000".parse::<CimDateTime>().is_err());
    }

    #[test]
    fn interval_fields() {
        let iv = Interval::new(183, 13, 25, 42, 234567).unwrap();
        assert_eq!(iv.days(), 183);
        assert_eq!(iv.hours(), 13);
        assert_eq!(iv.minutes(), 25);
        assert_eq!(iv.seconds(), 42);
        assert_eq!(iv.microseconds(), 234567);
    }

    #[test]
    fn interval_arithmetic() {
        let a = Interval::new(1, 0, 0, 0, 0).unwrap();
        let b = Interval::new(0, 12, 0, 0, 0).unwrap();
        assert_eq!(a + b, Interval::new(1, 12, 0, 0, 0).unwrap());
        assert_eq!(a - b, Interval::new(0, 12, 0, 0, 0).unwrap());
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(
            Interval::new(99_999_999, 23, 0, 0, 0).unwrap().checked_add(a),
            None
        );
    }

    #[test]
    fn timestamp_arithmetic() {
        let t: Timestamp = match "20140924193040.000000+000".parse::<CimDateTime>().unwrap() {
            CimDateTime::Timestamp(t) => t,
            _ => unreachable!(),
        };
        let day = Interval::new(1, 0, 0, 0, 0).unwrap();
        assert_eq!((t + day).to_string(), "20140925193040.000000+000");
        assert_eq!((t - day).to_string(), "20140923193040.000000+000");
        assert_eq!((t + day) - t, day);
        assert_eq!(t.checked_duration_since(t + day), None);
    }

    #[test]
    fn equality_compares_instants() {
        let utc: CimDateTime = "20140924100000.000000+000".parse().unwrap();
        let cest: CimDateTime = "20140924120000.000000+120".parse().unwrap();
        assert_eq!(utc, cest);
    }

    #[test]
    fn offset_out_of_chrono_range_rejected() {
        // 999 minutes is the wire maximum and within chrono's ±24h
        assert!("20140924193040.654321+999".parse::<CimDateTime>().is_ok());
    }
}
