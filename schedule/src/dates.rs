//! Day labels and kickoff times, as the schedule source prints them: US
//! Eastern wall clock with no offset annotation, so a fixed reference offset.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};
use std::fmt;

const EASTERN_OFFSET_HOURS: i32 = 5;

/// The schedule source's reference offset (UTC-5).
pub fn eastern() -> FixedOffset {
    FixedOffset::west_opt(EASTERN_OFFSET_HOURS * 3600).expect("fixed offset in range")
}

/// A calendar day as printed in a schedule page's day-divider row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameDay {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl GameDay {
    /// Parse a day-divider label. Two layouts appear in the wild: the long
    /// form "Sunday, September 10, 2017" and the short form "Sun 9/10",
    /// which carries no year and adopts `fallback_year`. The weekday word is
    /// display chrome either way and is not checked against the date.
    pub fn parse(label: &str, fallback_year: i32) -> Option<GameDay> {
        let label = label.trim();

        if let Some((_, rest)) = label.split_once(", ")
            && let Ok(d) = NaiveDate::parse_from_str(rest.trim(), "%B %d, %Y")
        {
            return Some(GameDay { year: d.year(), month: d.month(), day: d.day() });
        }

        let nums = label.split_whitespace().nth(1)?;
        let (m, d) = nums.split_once('/')?;
        let month: u32 = m.parse().ok()?;
        let day: u32 = d.parse().ok()?;
        NaiveDate::from_ymd_opt(fallback_year, month, day)?;
        Some(GameDay { year: fallback_year, month, day })
    }

    /// Midnight Eastern on this day, as a UTC instant. Week boundaries and
    /// day comparisons all hang off this.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?;
        let midnight = date.and_hms_opt(0, 0, 0)?;
        let local = eastern().from_local_datetime(&midnight).single()?;
        Some(local.with_timezone(&Utc))
    }
}

impl fmt::Display for GameDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Kickoff instant for a game still to come: the scheduled day plus the
/// clock time from the status cell ("1:00 PM ET" — the trailing zone word is
/// dropped). `None` once the cell no longer shows an AM/PM time.
pub fn kickoff_instant(day: GameDay, status_text: &str) -> Option<DateTime<Utc>> {
    let clock = clock_portion(status_text)?;
    let t = chrono::NaiveTime::parse_from_str(&clock, "%I:%M %p").ok()?;
    Some(day.instant()? + Duration::seconds(i64::from(t.num_seconds_from_midnight())))
}

/// Cut "1:00 PM ET" down to "1:00 PM".
fn clock_portion(text: &str) -> Option<&str> {
    let idx = text.find("AM").or_else(|| text.find("PM"))?;
    Some(text[..idx + 2].trim())
}
