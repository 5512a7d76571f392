//! Season clock: which week of the season is current right now.

use anyhow::bail;
use chrono::{DateTime, Datelike, Duration, Utc};
use log::info;
use nfl_schedule::dates::{self, GameDay};

use crate::pool::Season;

/// How long a finished week stays current past its last scheduled day.
/// Monday-night stragglers finish well inside this.
const WEEK_TAIL_HOURS: i64 = 24;

/// Shift applied before day comparisons so a midnight-Eastern instant lands
/// squarely inside its calendar day whatever offset the host runs in.
const DAY_SHIFT_HOURS: i64 = 6;

/// Where the season stands: the current week, or over entirely. Cheap to
/// copy, so callers snapshot it and drop the lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeasonClock {
    current: Option<usize>,
    ended: bool,
}

impl SeasonClock {
    /// Index into `season.weeks` of the current week, once computed.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn season_over(&self) -> bool {
        self.ended
    }

    /// Walk the weeks in order and settle on the current one: the first
    /// whose window (start to end plus a day) contains `now`, or the first
    /// still ahead of `now`. Past the last window the season is over and the
    /// last week stays current. Weeks without boundaries are skipped; if no
    /// week matches at all the schedule data is unusable and that is an
    /// error, not a guess.
    pub fn recompute(&mut self, now: DateTime<Utc>, season: &Season) -> anyhow::Result<()> {
        let before = *self;

        let mut found = None;
        for (index, week) in season.weeks.iter().enumerate() {
            let (Some(start), Some(end)) = (week.start, week.end) else {
                continue;
            };
            if now > start && now < end + Duration::hours(WEEK_TAIL_HOURS) {
                found = Some((index, false));
                break;
            }
            if now < start {
                found = Some((index, false));
                break;
            }
        }

        if found.is_none()
            && let Some(last) = season.weeks.last()
            && let Some(end) = last.end
            && now > end + Duration::hours(WEEK_TAIL_HOURS)
        {
            found = Some((season.weeks.len() - 1, true));
        }

        let Some((index, over)) = found else {
            bail!(
                "no week of season {} matches {now}; check the schedule's week boundaries",
                season.year
            );
        };

        self.current = Some(index);
        self.ended = over;
        if *self != before {
            if over {
                info!("season {} is over; week {} stands as final", season.year, index + 1);
            } else {
                info!("current week is now {}", index + 1);
            }
        }
        Ok(())
    }
}

/// Whether a game's scheduled day falls before the week it was served under.
/// The schedule source sometimes keeps serving last week's page after a
/// rollover; a day earlier than the week's own start is the tell.
pub fn day_precedes_week_start(day: GameDay, week_start: DateTime<Utc>) -> bool {
    let Some(instant) = day.instant() else {
        return false;
    };
    let shifted = (instant + Duration::hours(DAY_SHIFT_HOURS)).with_timezone(&dates::eastern());
    let start = (week_start + Duration::hours(DAY_SHIFT_HOURS)).with_timezone(&dates::eastern());
    shifted.year() < start.year() || shifted.ordinal() < start.ordinal()
}
