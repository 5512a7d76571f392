//! Adaptive schedule polling.

use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Utc};
use log::{debug, error, info, warn};
use nfl_schedule::GameStatus;
use nfl_schedule::client::ScheduleClient;
use nfl_schedule::extract::scan_week;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::clock::day_precedes_week_start;
use crate::events::PoolEvent;
use crate::pool::PoolState;
use crate::scoring;

const RETRY_DELAY_SECS: u64 = 60;
const LIVE_RECHECK_MINS: i64 = 30;
const STALE_START_MINS: i64 = 15;
const POST_KICKOFF_LAG_HOURS: i64 = 3;
const DAILY_WAKE_HOUR: u32 = 8;
const PACIFIC_OFFSET_HOURS: i32 = 8;

/// Reference offset for the daily wake (UTC-8): by 08:00 Pacific every US
/// wall clock has rolled onto the new day.
fn pacific() -> FixedOffset {
    FixedOffset::west_opt(PACIFIC_OFFSET_HOURS * 3600).expect("fixed offset in range")
}

/// When to look at the schedule again.
///
/// Any live game pins the next poll half an hour out, ahead of everything
/// else. Otherwise start from tomorrow's morning check and pull it earlier
/// per scheduled kickoff: three hours past a start there are results worth
/// reading, and a kickoff already behind the wall clock gets a short retry
/// until the page admits the game is under way.
pub fn next_wake(
    now: DateTime<Utc>,
    kickoffs: &BTreeSet<DateTime<Utc>>,
    any_live: bool,
) -> DateTime<Utc> {
    if any_live {
        return now + chrono::Duration::minutes(LIVE_RECHECK_MINS);
    }
    let mut wake = daily_wake(now);
    for &kickoff in kickoffs {
        let candidate = if kickoff <= now {
            now + chrono::Duration::minutes(STALE_START_MINS)
        } else {
            kickoff + chrono::Duration::hours(POST_KICKOFF_LAG_HOURS)
        };
        if candidate < wake {
            wake = candidate;
        }
    }
    wake
}

/// 08:00 Pacific tomorrow.
fn daily_wake(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.with_timezone(&pacific()).date_naive() + chrono::Duration::days(1);
    match pacific()
        .with_ymd_and_hms(tomorrow.year(), tomorrow.month(), tomorrow.day(), DAILY_WAKE_HOUR, 0, 0)
        .single()
    {
        Some(wake) => wake.with_timezone(&Utc),
        None => now + chrono::Duration::hours(24),
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Background task that keeps the current week fresh. The only writer of
/// schedule state.
pub struct PollWorker {
    state: Arc<PoolState>,
    client: ScheduleClient,
    events: mpsc::Sender<PoolEvent>,
    shutdown: watch::Receiver<bool>,
}

impl PollWorker {
    pub fn new(
        state: Arc<PoolState>,
        client: ScheduleClient,
        events: mpsc::Sender<PoolEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        PollWorker { state, client, events, shutdown }
    }

    /// Poll loop: refresh the current week, re-score it, sleep until the
    /// next interesting instant, move the season clock, repeat. Returns on
    /// shutdown, or if the season data becomes unusable.
    pub async fn run(mut self) {
        loop {
            let Some(index) = self.state.clock.read().await.current_index() else {
                error!("poll worker has no current week; stopping");
                return;
            };
            let Some(wake) = self.poll_week(index).await else {
                return;
            };
            if !self.sleep_until(wake).await {
                return;
            }
            let now = Utc::now();
            let season = self.state.season.read().await;
            if let Err(e) = self.state.clock.write().await.recompute(now, &season) {
                error!("season clock failed: {e:#}");
                return;
            }
        }
    }

    /// One refresh pass over the week at `index`. Returns the next wake
    /// instant, or `None` if shutdown arrived while fetching.
    async fn poll_week(&mut self, index: usize) -> Option<DateTime<Utc>> {
        let week_num = index as u32 + 1;
        let season_year = self.state.season.read().await.year;

        let page = self.fetch_with_retry(week_num).await?;
        let scan = scan_week(&page, season_year);
        let truncated = scan.is_truncated();

        let mut applied = 0usize;
        {
            let mut season = self.state.season.write().await;
            if let Some(week) = season.weeks.get_mut(index) {
                for game in scan.games {
                    if let Some(start) = week.start
                        && day_precedes_week_start(game.day, start)
                    {
                        warn!(
                            "week {week_num}: page still serves {}; stale page dropped",
                            game.day
                        );
                        break;
                    }
                    if week.apply_update(game) {
                        applied += 1;
                    }
                }
            }
        }
        let _ = self
            .events
            .send(PoolEvent::WeekRefreshed { week: week_num, applied, truncated })
            .await;

        scoring::rescore_week(&self.state, index, &self.events).await;

        let now = Utc::now();
        let mut kickoffs = BTreeSet::new();
        let mut any_live = false;
        {
            let season = self.state.season.read().await;
            if let Some(week) = season.weeks.get(index) {
                for game in &week.games {
                    if game.is_live() {
                        any_live = true;
                    }
                    if game.status == GameStatus::Future
                        && let Some(kickoff) = game.kickoff()
                    {
                        kickoffs.insert(kickoff);
                    }
                }
            }
        }
        let wake = next_wake(now, &kickoffs, any_live);
        debug!("week {week_num}: next poll at {wake}");
        Some(wake)
    }

    /// Fetch a week's page, retrying on failure until it lands or shutdown
    /// arrives.
    async fn fetch_with_retry(&mut self, week_num: u32) -> Option<String> {
        loop {
            match self.client.fetch_week(week_num).await {
                Ok(page) => return Some(page),
                Err(e) => {
                    warn!("week {week_num} fetch failed: {e}; retrying in {RETRY_DELAY_SECS}s");
                    if !self.sleep_for(Duration::from_secs(RETRY_DELAY_SECS)).await {
                        return None;
                    }
                }
            }
        }
    }

    async fn sleep_until(&mut self, wake: DateTime<Utc>) -> bool {
        let period = (wake - Utc::now()).to_std().unwrap_or_default();
        self.sleep_for(period).await
    }

    /// Sleep, unless shutdown lands first. Returns false on shutdown.
    async fn sleep_for(&mut self, period: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(period) => true,
            _ = self.shutdown.changed() => {
                info!("poll worker shutting down");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 9, day, hour, min, 0).unwrap()
    }

    #[test]
    fn quiet_day_waits_for_the_morning_check() {
        // Nothing scheduled: tomorrow 08:00 Pacific, which is 16:00 UTC.
        let wake = next_wake(utc(10, 14, 0), &BTreeSet::new(), false);
        assert_eq!(wake, utc(11, 16, 0));
    }

    #[test]
    fn kickoff_pulls_the_wake_three_hours_past_start() {
        let mut kickoffs = BTreeSet::new();
        kickoffs.insert(utc(11, 0, 0));
        let wake = next_wake(utc(10, 14, 0), &kickoffs, false);
        assert_eq!(wake, utc(11, 3, 0));
    }

    #[test]
    fn passed_kickoff_retries_shortly() {
        let mut kickoffs = BTreeSet::new();
        kickoffs.insert(utc(10, 17, 0));
        let wake = next_wake(utc(10, 18, 0), &kickoffs, false);
        assert_eq!(wake, utc(10, 18, 15));
    }

    #[test]
    fn live_game_rechecks_in_half_an_hour() {
        let mut kickoffs = BTreeSet::new();
        kickoffs.insert(utc(10, 20, 0));
        let wake = next_wake(utc(10, 18, 0), &kickoffs, true);
        assert_eq!(wake, utc(10, 18, 30));
    }

    #[test]
    fn earliest_candidate_wins() {
        let mut kickoffs = BTreeSet::new();
        kickoffs.insert(utc(10, 17, 0)); // results readable by 20:00
        kickoffs.insert(utc(10, 21, 25));
        let wake = next_wake(utc(10, 14, 0), &kickoffs, false);
        assert_eq!(wake, utc(10, 20, 0));
    }

    const THIS_WEEK_PAGE: &str = r#"
        <tr class="divider"><td>Sunday, September 17, 2017</td></tr>
        <tr class="left">
          <td class="center">1:00 PM ET</td>
          <td class="left">Green Bay</td><td></td>
          <td class="left">Seattle</td><td></td>
        </tr>
    "#;

    // The same pairing, finished, dated the Sunday before.
    const LAST_WEEK_PAGE: &str = r#"
        <tr class="divider"><td>Sunday, September 10, 2017</td></tr>
        <tr class="left">
          <td class="right">FINAL</td>
          <td class="left">Green Bay</td><td><b>17</b></td>
          <td class="left">Seattle</td><td><b>9</b></td>
        </tr>
    "#;

    #[tokio::test]
    async fn stale_page_is_dropped_and_prior_data_kept() {
        // After a rollover the source can keep serving last week's page for a
        // while. Week 2 holds a fresh Sep 17 matchup; its location serves the
        // same matchup finished a week earlier. None of it may land.
        let dir = std::env::temp_dir().join(format!("gridpool-poll-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        std::fs::write(dir.join("week2.html"), LAST_WEEK_PAGE).expect("write page");

        let state = Arc::new(PoolState::new(2017, 2));
        state.season.write().await.weeks[1].load_scan(scan_week(THIS_WEEK_PAGE, 2017));

        let client = ScheduleClient::new(format!("{}/week", dir.display()), false);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut worker = PollWorker::new(Arc::clone(&state), client, event_tx, shutdown_rx);

        worker.poll_week(1).await.expect("next wake instant");

        assert_eq!(
            event_rx.try_recv().ok(),
            Some(PoolEvent::WeekRefreshed { week: 2, applied: 0, truncated: false })
        );
        let season = state.season.read().await;
        let kept = season.weeks[1].game_for("Packers").expect("scheduled game kept");
        assert_eq!(kept.status, GameStatus::Future);
        assert_eq!(kept.status_text, "1:00 PM ET");
        assert_eq!(kept.score_home, "");
    }
}
