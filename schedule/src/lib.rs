pub mod client;
pub mod dates;
pub mod extract;
pub mod scan;
pub mod teams;

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

use crate::dates::GameDay;
use crate::extract::ScanAbort;

// ---------------------------------------------------------------------------
// Domain types — clean model, independent of the schedule page markup
// ---------------------------------------------------------------------------

/// One matchup as read off a weekly schedule page.
///
/// Created once per week and overwritten in place on later polls; its
/// identity is the (unordered) team pair within the week.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Game {
    pub visitor: String, // canonical nickname, e.g. "Ravens"
    pub home: String,
    pub score_visitor: String, // empty until a score is posted
    pub score_home: String,
    pub day: GameDay,
    pub status_text: String, // raw status/time cell, e.g. "1:00 PM ET"
    pub status: GameStatus,
}

impl Game {
    pub fn involves(&self, team: &str) -> bool {
        self.visitor == team || self.home == team
    }

    /// Scheduled kickoff instant, while the status cell still carries a
    /// clock time. Gone once the game is under way.
    pub fn kickoff(&self) -> Option<DateTime<Utc>> {
        dates::kickoff_instant(self.day, &self.status_text)
    }

    pub fn is_live(&self) -> bool {
        self.status == GameStatus::InProgress
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GameStatus {
    #[default]
    Future,
    InProgress,
    Finished,
}

impl GameStatus {
    /// Derive a status from the raw status cell. "FINAL"/"F/OT" mark a
    /// finished game; a clock time ("1:00 PM ET") one still to come;
    /// anything else ("2nd Qtr 5:22", "Halftime") is live.
    pub fn from_status_text(text: &str) -> Self {
        if text.contains("FINAL") || text.contains("F/OT") {
            GameStatus::Finished
        } else if text.contains("AM") || text.contains("PM") {
            GameStatus::Future
        } else {
            GameStatus::InProgress
        }
    }

    pub fn has_started(&self) -> bool {
        !matches!(self, GameStatus::Future)
    }
}

/// Everything one pass over a week's page yields: games in page order, the
/// distinct scheduled-day instants (week boundaries fall out of these), and
/// a team → game-index lookup covering both sides of every matchup.
#[derive(Debug, Clone, Default)]
pub struct WeekScan {
    pub games: Vec<Game>,
    pub day_instants: BTreeSet<DateTime<Utc>>,
    pub team_index: HashMap<String, usize>,
    pub abort: Option<ScanAbort>,
}

impl WeekScan {
    pub fn is_truncated(&self) -> bool {
        self.abort.is_some()
    }

    /// Earliest scheduled instant of the week.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.day_instants.first().copied()
    }

    /// Latest scheduled instant of the week.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.day_instants.last().copied()
    }
}
