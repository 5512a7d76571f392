//! Shared pool state: the season's schedule and every player's picks.

use chrono::{DateTime, Utc};
use log::{info, warn};
use nfl_schedule::{Game, WeekScan};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::clock::SeasonClock;

// ---------------------------------------------------------------------------
// Schedule aggregates
// ---------------------------------------------------------------------------

/// One week of the season: boundaries, games, and the team → game lookup.
///
/// Games live in a stable arena; `team_index` stores positions, never
/// references, so poll updates overwrite in place without invalidating
/// anything held elsewhere.
#[derive(Debug, Clone, Default)]
pub struct Week {
    pub num: u32,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub games: Vec<Game>,
    team_index: HashMap<String, usize>,
}

impl Week {
    pub fn new(num: u32) -> Self {
        Week { num, ..Default::default() }
    }

    /// Rebuild this week from a fresh page scan. Boundaries are whatever the
    /// scanned days span — a truncated scan still bounds the week with the
    /// days it got, so the week stays current through its real span. Only a
    /// scan with no games at all leaves the week boundary-less.
    pub fn load_scan(&mut self, scan: WeekScan) {
        self.start = scan.start();
        self.end = scan.end();
        self.games = scan.games;
        self.team_index = scan.team_index;
    }

    pub fn game_for(&self, team: &str) -> Option<&Game> {
        self.games.get(*self.team_index.get(team)?)
    }

    /// Overwrite the stored game for this matchup. The lookup keys the
    /// update; a pairing this week does not know is logged and dropped.
    pub fn apply_update(&mut self, update: Game) -> bool {
        match self.team_index.get(&update.visitor).copied() {
            Some(index) if self.games[index].involves(&update.home) => {
                self.games[index] = update;
                true
            }
            _ => {
                warn!(
                    "week {}: no game pairs {} with {}; update dropped",
                    self.num, update.visitor, update.home
                );
                false
            }
        }
    }

    pub fn has_boundaries(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Season {
    pub year: i32,
    pub weeks: Vec<Week>,
}

impl Season {
    pub fn new(year: i32, week_count: u32) -> Self {
        Season { year, weeks: (1..=week_count).map(Week::new).collect() }
    }
}

// ---------------------------------------------------------------------------
// Picks
// ---------------------------------------------------------------------------

/// One pick: a team to win, the points riding on it, and when the user last
/// actually changed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub team: String,
    pub confidence: u32,
    pub when: DateTime<Utc>,
}

/// One user-week. Points and good-pick counts are derived — the scoring
/// engine writes them, nothing else does.
#[derive(Debug, Clone, Default)]
pub struct UserWeek {
    pub points: u32,
    pub good_picks: u32,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, Default)]
pub struct User {
    pub name: String,
    pub weeks: Vec<UserWeek>,
}

impl User {
    pub fn new(name: impl Into<String>, week_count: u32) -> Self {
        User {
            name: name.into(),
            weeks: vec![UserWeek::default(); week_count as usize],
        }
    }
}

/// A requested pick inside a submission batch.
#[derive(Debug, Clone)]
pub struct PickRequest {
    pub team: String,
    pub confidence: u32,
}

/// Why a pick batch was rejected. Rejection is all-or-nothing: stored state
/// is untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickError {
    UnknownUser(String),
    NoSuchWeek(u32),
    UnknownTeam { team: String },
    ConfidenceOutOfRange { team: String, confidence: u32, max: u32 },
    DuplicateConfidence { confidence: u32, first: String, second: String },
}

impl fmt::Display for PickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickError::UnknownUser(name) => write!(f, "no such user {name:?}"),
            PickError::NoSuchWeek(num) => write!(f, "no week {num} in this season"),
            PickError::UnknownTeam { team } => {
                write!(f, "the {team} do not play this week")
            }
            PickError::ConfidenceOutOfRange { team, confidence, max } => {
                write!(f, "confidence {confidence} on the {team} is outside 1..={max}")
            }
            PickError::DuplicateConfidence { confidence, first, second } => {
                write!(f, "confidence {confidence} used twice: {first} and {second}")
            }
        }
    }
}

impl std::error::Error for PickError {}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything shared between the poll task and request handlers. Injected
/// where it is needed; nothing global.
///
/// Lock order when holding more than one guard: season, then clock, then
/// individual users. Pick data sits behind the owning user's lock only, so
/// users never contend with each other.
#[derive(Debug)]
pub struct PoolState {
    pub season: RwLock<Season>,
    pub clock: RwLock<SeasonClock>,
    users: RwLock<HashMap<String, Arc<Mutex<User>>>>,
}

impl PoolState {
    pub fn new(year: i32, week_count: u32) -> Self {
        PoolState {
            season: RwLock::new(Season::new(year, week_count)),
            clock: RwLock::new(SeasonClock::default()),
            users: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add_user(&self, name: &str) {
        let week_count = self.season.read().await.weeks.len() as u32;
        let mut users = self.users.write().await;
        users
            .entry(name.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(User::new(name, week_count))));
    }

    pub async fn user(&self, name: &str) -> Option<Arc<Mutex<User>>> {
        self.users.read().await.get(name).cloned()
    }

    /// All user names, sorted so iteration order is stable.
    pub async fn user_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.users.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Apply a user's pick batch for one week.
    ///
    /// Picks for games already under way — or past their kickoff instant,
    /// whichever the page admits to first — are quietly dropped: the games
    /// move on whether the user refreshed or not. The rest are staged (new
    /// picks inserted, an existing pick for the same game replaced, its
    /// timestamp touched only on a real change) and committed only if every
    /// confidence value is in range and used once.
    pub async fn submit_picks(
        &self,
        user_name: &str,
        week_index: usize,
        picks: &[PickRequest],
        now: DateTime<Utc>,
    ) -> Result<(), PickError> {
        let user = self
            .user(user_name)
            .await
            .ok_or_else(|| PickError::UnknownUser(user_name.to_owned()))?;
        let week_num = week_index as u32 + 1;

        let season = self.season.read().await;
        let week = season.weeks.get(week_index).ok_or(PickError::NoSuchWeek(week_num))?;

        let mut guard = user.lock().await;
        let mut staged: Vec<Selection> = guard
            .weeks
            .get(week_index)
            .ok_or(PickError::NoSuchWeek(week_num))?
            .selections
            .clone();

        for pick in picks {
            let Some(game) = week.game_for(&pick.team) else {
                return Err(PickError::UnknownTeam { team: pick.team.clone() });
            };
            let started = game.status.has_started() || game.kickoff().map_or(true, |k| k <= now);
            if started {
                info!(
                    "{user_name}: week {week_num} pick for {} at {} ignored, game under way",
                    game.visitor, game.home
                );
                continue;
            }
            match staged.iter_mut().find(|s| game.involves(&s.team)) {
                Some(existing) => {
                    if existing.team != pick.team || existing.confidence != pick.confidence {
                        existing.team = pick.team.clone();
                        existing.confidence = pick.confidence;
                        existing.when = now;
                    }
                }
                None => staged.push(Selection {
                    team: pick.team.clone(),
                    confidence: pick.confidence,
                    when: now,
                }),
            }
        }

        let max = week.games.len() as u32;
        let mut seen: HashMap<u32, &str> = HashMap::new();
        for sel in &staged {
            if sel.confidence == 0 || sel.confidence > max {
                return Err(PickError::ConfidenceOutOfRange {
                    team: sel.team.clone(),
                    confidence: sel.confidence,
                    max,
                });
            }
            if let Some(first) = seen.insert(sel.confidence, &sel.team) {
                return Err(PickError::DuplicateConfidence {
                    confidence: sel.confidence,
                    first: first.to_owned(),
                    second: sel.team.clone(),
                });
            }
        }

        let last_change = staged.iter().map(|s| s.when).max();
        if let Some(user_week) = guard.weeks.get_mut(week_index) {
            user_week.selections = staged;
            if let Some(when) = last_change {
                info!(
                    "{user_name}: week {week_num} picks saved, {} selections, last change {when}",
                    user_week.selections.len()
                );
            }
        }
        Ok(())
    }
}
