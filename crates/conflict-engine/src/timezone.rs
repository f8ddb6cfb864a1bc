//! Timezone validation and UTC ↔ wall-clock conversion.
//!
//! Every timezone value entering the engine passes through [`validate`] or
//! [`ZoneId::parse`]. The resulting [`ZoneId`] cannot represent anything
//! other than a resolvable IANA zone, so no call site downstream has to
//! unwrap array-shaped or empty values.
//!
//! All conversions take the zone explicitly. There is no process-wide
//! default zone; falling back to a default is a decision the caller makes
//! once, at its own boundary.
//!
//! # DST rule
//!
//! [`to_instant`] never guesses silently. For a wall-clock time that does
//! not exist (spring-forward gap) it applies the offset that was in effect
//! before the transition, which lands just after the gap. For a wall-clock
//! time that occurs twice (fall-back fold) it picks the earliest instant,
//! unless the [`WallClock`] carries an offset hint naming the other one.

use std::fmt;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::{Result, SchedulingError};
use crate::interval::Instant;

// ── ZoneId ──────────────────────────────────────────────────────────────────

/// A validated IANA timezone identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneId(Tz);

impl ZoneId {
    /// Coordinated Universal Time.
    pub const UTC: ZoneId = ZoneId(Tz::UTC);

    /// Parse an IANA identifier (surrounding whitespace ignored).
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SchedulingError::InvalidTimeZone("empty identifier".to_string()));
        }
        trimmed
            .parse::<Tz>()
            .map(ZoneId)
            .map_err(|_| SchedulingError::InvalidTimeZone(format!("'{trimmed}'")))
    }

    /// The canonical IANA name, e.g. `"America/Chicago"`.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub fn tz(&self) -> Tz {
        self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ZoneId {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self> {
        ZoneId::parse(s)
    }
}

impl Serialize for ZoneId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ZoneId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = RawTimeZone::deserialize(deserializer)?;
        validate(&raw).map_err(serde::de::Error::custom)
    }
}

/// The untyped shape a timezone field arrives in from outside.
///
/// Some upstream records carry the zone as a one-element list instead of
/// a string. This type exists only at the boundary; [`validate`] turns it
/// into a [`ZoneId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimeZone {
    Name(String),
    List(Vec<String>),
}

impl From<&str> for RawTimeZone {
    fn from(s: &str) -> Self {
        RawTimeZone::Name(s.to_string())
    }
}

/// Validate a boundary timezone value.
///
/// A single-element list is unwrapped (with a warning) and its element
/// validated. Lists of any other length are rejected.
///
/// # Errors
///
/// Returns [`SchedulingError::InvalidTimeZone`] if the value is not a
/// resolvable IANA zone.
pub fn validate(raw: &RawTimeZone) -> Result<ZoneId> {
    match raw {
        RawTimeZone::Name(name) => ZoneId::parse(name),
        RawTimeZone::List(items) => match items.as_slice() {
            [only] => {
                warn!(
                    zone = %only,
                    "timezone arrived as a single-element list; normalizing to a string"
                );
                ZoneId::parse(only)
            }
            _ => Err(SchedulingError::InvalidTimeZone(format!(
                "expected one identifier, got a list of {}",
                items.len()
            ))),
        },
    }
}

// ── Wall-clock conversion ──────────────────────────────────────────────────

/// A local date and time in some zone.
///
/// `offset` is the UTC offset in effect, when known. [`to_local`] always
/// fills it in; callers converting form input usually leave it `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub offset: Option<FixedOffset>,
}

impl WallClock {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            date,
            time,
            offset: None,
        }
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

impl From<NaiveDateTime> for WallClock {
    fn from(naive: NaiveDateTime) -> Self {
        WallClock::new(naive.date(), naive.time())
    }
}

/// Convert a wall-clock time in `zone` to a UTC instant.
///
/// See the module docs for the DST gap and fold rule.
pub fn to_instant(local: WallClock, zone: ZoneId) -> Instant {
    let tz = zone.tz();
    let naive = local.naive();

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, latest) => {
            let hinted_latest = local
                .offset
                .is_some_and(|hint| hint == latest.offset().fix());
            if hinted_latest {
                latest.with_timezone(&Utc)
            } else {
                earliest.with_timezone(&Utc)
            }
        }
        LocalResult::None => {
            // Offset in effect a day before the wall-clock time; transitions
            // are never closer together than that.
            let before = tz
                .offset_from_utc_datetime(&(naive - Duration::days(1)))
                .fix();
            let utc_naive = naive - Duration::seconds(i64::from(before.local_minus_utc()));
            Utc.from_utc_datetime(&utc_naive)
        }
    }
}

/// Convert a UTC instant to the wall-clock time in `zone`.
pub fn to_local(instant: Instant, zone: ZoneId) -> WallClock {
    let local = instant.with_timezone(&zone.tz());
    WallClock {
        date: local.date_naive(),
        time: local.time(),
        offset: Some(local.offset().fix()),
    }
}

/// The instant at which `date` begins in `zone`.
pub(crate) fn start_of_day(date: NaiveDate, zone: ZoneId) -> Instant {
    to_instant(WallClock::new(date, NaiveTime::MIN), zone)
}

// ── Display helpers ─────────────────────────────────────────────────────────

/// A human-facing label for a zone. Not used in comparisons.
pub fn display_name(zone: ZoneId) -> String {
    let friendly = match zone.name() {
        "America/New_York" | "America/Detroit" | "America/Toronto" | "US/Eastern" => {
            Some("Eastern Time")
        }
        "America/Chicago" | "America/Winnipeg" | "US/Central" => Some("Central Time"),
        "America/Denver" | "America/Edmonton" | "US/Mountain" => Some("Mountain Time"),
        "America/Phoenix" | "US/Arizona" => Some("Arizona Time"),
        "America/Los_Angeles" | "America/Vancouver" | "US/Pacific" => Some("Pacific Time"),
        "America/Anchorage" | "US/Alaska" => Some("Alaska Time"),
        "Pacific/Honolulu" | "US/Hawaii" => Some("Hawaii Time"),
        "UTC" | "Etc/UTC" => Some("Coordinated Universal Time"),
        _ => None,
    };
    if let Some(label) = friendly {
        return format!("{label} ({})", zone.name());
    }

    let name = zone.name();
    match name.rsplit_once('/') {
        Some((region, city)) => {
            let region = region.split('/').next().unwrap_or(region);
            format!("{} ({region})", city.replace('_', " "))
        }
        None => name.replace('_', " "),
    }
}

/// An instant as seen from a zone, with display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalView {
    /// The instant in UTC (RFC 3339).
    pub utc: String,
    /// The instant in the zone (RFC 3339 with offset).
    pub local: String,
    /// The IANA zone name used.
    pub timezone: String,
    /// Friendly zone label.
    pub display_name: String,
    /// The UTC offset at this instant (e.g., "-05:00").
    pub utc_offset: String,
    /// Whether Daylight Saving Time is active at this instant.
    pub dst_active: bool,
    /// Human-readable form, e.g. "Monday, March 2, 2026 at 9:00 AM CST".
    pub interpretation: String,
}

/// Describe `instant` in `zone` for presentation.
pub fn describe(instant: Instant, zone: ZoneId) -> LocalView {
    let tz = zone.tz();
    let local = instant.with_timezone(&tz);

    LocalView {
        utc: instant.to_rfc3339(),
        local: local.to_rfc3339(),
        timezone: zone.name().to_string(),
        display_name: display_name(zone),
        utc_offset: format_utc_offset(&local),
        dst_active: is_dst_active(&local, &tz),
        interpretation: local.format("%A, %B %-d, %Y at %-I:%M %p %Z").to_string(),
    }
}

/// Parse an RFC 3339 datetime string into an [`Instant`].
pub fn parse_instant(s: &str) -> Result<Instant> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SchedulingError::InvalidDatetime(format!("'{s}': {e}")))
}

/// Determine if DST is active for a datetime in a timezone.
fn is_dst_active<T: TimeZone>(dt: &DateTime<T>, tz: &Tz) -> bool {
    // Compare against both solstice-adjacent offsets: the smaller one is
    // standard time in either hemisphere.
    let utc = dt.with_timezone(&Utc);
    let year = utc.year();

    let offset_at = |month: u32| {
        Utc.with_ymd_and_hms(year, month, 1, 12, 0, 0)
            .single()
            .map(|sample| sample.with_timezone(tz).offset().fix().local_minus_utc())
    };
    let current = dt.offset().fix().local_minus_utc();

    match (offset_at(1), offset_at(7)) {
        (Some(jan), Some(jul)) => current > jan.min(jul),
        _ => false,
    }
}

/// Format the UTC offset as a string (e.g., "-05:00", "+09:00").
fn format_utc_offset<T: TimeZone>(dt: &DateTime<T>) -> String {
    let offset_secs = dt.offset().fix().local_minus_utc();
    let sign = if offset_secs >= 0 { "+" } else { "-" };
    let abs_secs = offset_secs.unsigned_abs();
    let hours = abs_secs / 3600;
    let minutes = (abs_secs % 3600) / 60;
    format!("{sign}{hours:02}:{minutes:02}")
}
