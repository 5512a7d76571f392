//! Week-page extraction: drive [`TagScanner`] through one schedule page and
//! produce [`Game`] records.

use log::warn;
use std::fmt;

use crate::dates::GameDay;
use crate::scan::TagScanner;
use crate::{Game, GameStatus, WeekScan, teams};

const DAY_MARKER: &str = "divider";
const ROW_MARKER: &str = "left";
const STATUS_MARKERS: [&str; 2] = ["right", "center"];
const TEAM_MARKER: &str = "left";

/// Why an extraction stopped before the page ran out of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanAbort {
    /// A game row appeared before any day-divider row.
    MissingDayLabel,
    /// A day-divider label did not parse as a date.
    BadDayLabel { label: String },
    /// A row's status/time cell never showed up.
    MissingStatus,
    /// A team cell had no readable text.
    MissingTeamName,
    /// A finished game's bold score never showed up.
    MissingScore { team: String },
    /// The page used a team spelling the alias table does not know.
    UnknownTeam { name: String },
}

impl fmt::Display for ScanAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanAbort::MissingDayLabel => write!(f, "game row before any day divider"),
            ScanAbort::BadDayLabel { label } => write!(f, "unreadable day label {label:?}"),
            ScanAbort::MissingStatus => write!(f, "row without a status cell"),
            ScanAbort::MissingTeamName => write!(f, "team cell without a name"),
            ScanAbort::MissingScore { team } => {
                write!(f, "no bold score after finished game of the {team}")
            }
            ScanAbort::UnknownTeam { name } => write!(f, "unknown team name {name:?}"),
        }
    }
}

impl std::error::Error for ScanAbort {}

/// Lazy game sequence over one week's page.
///
/// `for game in ScheduleExtractor::new(page, year)` walks the rows; after
/// the sequence ends, [`abort`](Self::abort) tells whether it ended cleanly
/// or cut out early.
pub struct ScheduleExtractor<'a> {
    scanner: TagScanner<'a>,
    season_year: i32,
    day: Option<GameDay>,
    abort: Option<ScanAbort>,
    done: bool,
}

impl<'a> ScheduleExtractor<'a> {
    pub fn new(page: &'a str, season_year: i32) -> Self {
        ScheduleExtractor {
            scanner: TagScanner::new(page),
            season_year,
            day: None,
            abort: None,
            done: false,
        }
    }

    /// The abort reason, once the sequence has ended early.
    pub fn abort(&self) -> Option<&ScanAbort> {
        self.abort.as_ref()
    }

    pub fn into_abort(self) -> Option<ScanAbort> {
        self.abort
    }

    fn stop(&mut self, why: ScanAbort) -> Option<Game> {
        self.abort = Some(why);
        self.done = true;
        None
    }

    fn next_game(&mut self) -> Option<Game> {
        if self.done {
            return None;
        }

        // Anchor on the next game row, absorbing a day divider on the way.
        let marker = match self.scanner.seek_tag(&[DAY_MARKER, ROW_MARKER]) {
            Some(m) => m,
            None => {
                self.done = true; // clean end of page
                return None;
            }
        };
        if marker == DAY_MARKER {
            let Some(label) = self.scanner.next_text() else {
                self.done = true;
                return None;
            };
            match GameDay::parse(&label, self.season_year) {
                Some(day) => self.day = Some(day),
                None => return self.stop(ScanAbort::BadDayLabel { label }),
            }
            if self.scanner.seek_tag(&[ROW_MARKER]).is_none() {
                self.done = true; // the divider was the last thing on the page
                return None;
            }
        }
        let Some(day) = self.day else {
            return self.stop(ScanAbort::MissingDayLabel);
        };

        if self.scanner.seek_tag(&STATUS_MARKERS).is_none() {
            return self.stop(ScanAbort::MissingStatus);
        }
        let Some(status_text) = self.scanner.next_text() else {
            return self.stop(ScanAbort::MissingStatus);
        };
        let status = GameStatus::from_status_text(&status_text);
        let finished = status == GameStatus::Finished;

        let (visitor, score_visitor) = self.side(finished)?;
        let (home, score_home) = self.side(finished)?;

        Some(Game {
            visitor,
            home,
            score_visitor,
            score_home,
            day,
            status_text,
            status,
        })
    }

    // One team cell, plus its bold score when the game is finished.
    fn side(&mut self, finished: bool) -> Option<(String, String)> {
        if self.scanner.seek_tag(&[TEAM_MARKER]).is_none() {
            self.stop(ScanAbort::MissingTeamName);
            return None;
        }
        let Some(raw) = self.scanner.next_text() else {
            self.stop(ScanAbort::MissingTeamName);
            return None;
        };
        let team = match teams::canonical(&raw) {
            Ok(team) => team.to_owned(),
            Err(e) => {
                self.stop(ScanAbort::UnknownTeam { name: e.0 });
                return None;
            }
        };
        let score = if finished {
            match self.scanner.seek_bold_text() {
                Some(score) => score,
                None => {
                    self.stop(ScanAbort::MissingScore { team });
                    return None;
                }
            }
        } else {
            String::new()
        };
        Some((team, score))
    }
}

impl Iterator for ScheduleExtractor<'_> {
    type Item = Game;

    fn next(&mut self) -> Option<Game> {
        self.next_game()
    }
}

/// Scan a whole week's page: games, distinct day instants, team lookup.
pub fn scan_week(page: &str, season_year: i32) -> WeekScan {
    let mut extractor = ScheduleExtractor::new(page, season_year);
    let mut scan = WeekScan::default();
    for game in extractor.by_ref() {
        if let Some(instant) = game.day.instant() {
            scan.day_instants.insert(instant);
        }
        let index = scan.games.len();
        scan.team_index.insert(game.visitor.clone(), index);
        scan.team_index.insert(game.home.clone(), index);
        scan.games.push(game);
    }
    scan.abort = extractor.into_abort();
    if let Some(why) = &scan.abort {
        warn!("page scan stopped early after {} games: {why}", scan.games.len());
    }
    scan
}
