//! Scoring: posted results become points, points become standings.

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::events::PoolEvent;
use crate::pool::{PoolState, Selection, Week};
use nfl_schedule::GameStatus;

// ---------------------------------------------------------------------------
// Per-week scoring
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekScore {
    pub points: u32,
    pub good_picks: u32,
}

/// Score one user's selections against one week's games. Pure and cheap;
/// callers re-run it whenever the schedule moves.
///
/// A pick whose team leads — or won — takes its confidence value and counts
/// as a good pick. Ties take nothing. Games yet to start, games without two
/// parseable scores, and picks for teams the week does not know score
/// nothing and are skipped.
pub fn score_selections(week: &Week, selections: &[Selection]) -> WeekScore {
    let mut score = WeekScore::default();
    for sel in selections {
        let Some(game) = week.game_for(&sel.team) else {
            warn!("week {}: picked team {} has no game; pick skipped", week.num, sel.team);
            continue;
        };
        if game.status == GameStatus::Future {
            continue;
        }
        let (Ok(visitor), Ok(home)) =
            (game.score_visitor.parse::<i64>(), game.score_home.parse::<i64>())
        else {
            debug!("week {}: {} at {} has no usable score yet", week.num, game.visitor, game.home);
            continue;
        };
        let leader = if visitor > home {
            Some(&game.visitor)
        } else if home > visitor {
            Some(&game.home)
        } else {
            None
        };
        if leader == Some(&sel.team) {
            score.points += sel.confidence;
            score.good_picks += 1;
        }
    }
    score
}

/// Re-score every user for one week, storing fresh totals and announcing
/// each user whose numbers actually moved.
pub async fn rescore_week(
    state: &PoolState,
    week_index: usize,
    events: &mpsc::Sender<PoolEvent>,
) {
    let names = state.user_names().await;
    let season = state.season.read().await;
    let Some(week) = season.weeks.get(week_index) else {
        return;
    };
    for name in names {
        let Some(user) = state.user(&name).await else {
            continue;
        };
        let mut guard = user.lock().await;
        let Some(user_week) = guard.weeks.get_mut(week_index) else {
            continue;
        };
        let fresh = score_selections(week, &user_week.selections);
        if fresh.points == user_week.points && fresh.good_picks == user_week.good_picks {
            debug!("{name}: week {} unchanged at {} points", week.num, fresh.points);
            continue;
        }
        user_week.points = fresh.points;
        user_week.good_picks = fresh.good_picks;
        let _ = events
            .send(PoolEvent::ScoreChanged {
                user: name.clone(),
                week: week.num,
                points: fresh.points,
                good_picks: fresh.good_picks,
            })
            .await;
    }
}

/// Re-score the whole season, week by week. Run at startup so stored totals
/// match whatever schedule state was just loaded.
pub async fn rescore_all(state: &PoolState, events: &mpsc::Sender<PoolEvent>) {
    let week_count = state.season.read().await.weeks.len();
    for index in 0..week_count {
        rescore_week(state, index, events).await;
    }
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingRow {
    pub name: String,
    pub total: u32,
    pub weeks_played: u32,
    pub weeks_won: u32,
    /// Average over played weeks, one decimal; "0.0" before any week played.
    pub ave_per_week: String,
}

/// Season standings over the weeks completed so far; once the season is over
/// the final week counts too. A week is won by every user sharing its top
/// score, and played by every user with picks in it. Rows sort by total
/// descending, name ascending on equal totals.
pub async fn standings(state: &PoolState) -> Vec<StandingRow> {
    let clock = *state.clock.read().await;
    let Some(current) = clock.current_index() else {
        return Vec::new();
    };
    let through = if clock.season_over() { current + 1 } else { current };

    let names = state.user_names().await;
    let mut rows = Vec::with_capacity(names.len());
    let mut week_points: Vec<Vec<u32>> = Vec::with_capacity(names.len());
    for name in names {
        let Some(user) = state.user(&name).await else {
            continue;
        };
        let guard = user.lock().await;
        let mut total = 0u32;
        let mut played = 0u32;
        let mut points = Vec::with_capacity(through);
        for user_week in guard.weeks.iter().take(through) {
            total += user_week.points;
            if !user_week.selections.is_empty() {
                played += 1;
            }
            points.push(user_week.points);
        }
        let ave = if played > 0 {
            format!("{:.1}", f64::from(total) / f64::from(played))
        } else {
            "0.0".to_owned()
        };
        week_points.push(points);
        rows.push(StandingRow { name, total, weeks_played: played, weeks_won: 0, ave_per_week: ave });
    }

    let mut high = vec![0u32; through];
    for points in &week_points {
        for (i, p) in points.iter().enumerate() {
            if *p > high[i] {
                high[i] = *p;
            }
        }
    }
    for (row, points) in rows.iter_mut().zip(&week_points) {
        row.weeks_won = points.iter().zip(&high).filter(|(p, h)| p == h).count() as u32;
    }

    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use nfl_schedule::dates::GameDay;
    use nfl_schedule::{Game, WeekScan};

    fn game(visitor: &str, home: &str, sv: &str, sh: &str, status_text: &str) -> Game {
        Game {
            visitor: visitor.into(),
            home: home.into(),
            score_visitor: sv.into(),
            score_home: sh.into(),
            day: GameDay { year: 2017, month: 9, day: 10 },
            status_text: status_text.into(),
            status: GameStatus::from_status_text(status_text),
        }
    }

    fn week_of(games: Vec<Game>) -> Week {
        let mut scan = WeekScan::default();
        for g in games {
            let index = scan.games.len();
            scan.team_index.insert(g.visitor.clone(), index);
            scan.team_index.insert(g.home.clone(), index);
            scan.games.push(g);
        }
        let mut week = Week::new(1);
        week.load_scan(scan);
        week
    }

    fn sel(team: &str, confidence: u32) -> Selection {
        Selection { team: team.into(), confidence, when: Utc::now() }
    }

    #[test]
    fn finished_games_award_confidence_points() {
        let week = week_of(vec![
            game("Bills", "Ravens", "20", "24", "FINAL"),
            game("Packers", "Seahawks", "17", "9", "FINAL"),
            game("Saints", "Vikings", "", "", "1:00 PM ET"),
        ]);
        // Home winner picked, road loser's side picked, future game picked.
        let picks = vec![sel("Ravens", 10), sel("Seahawks", 2), sel("Saints", 1)];
        let score = score_selections(&week, &picks);
        assert_eq!(score, WeekScore { points: 10, good_picks: 1 });

        let other = vec![sel("Bills", 5)];
        assert_eq!(score_selections(&week, &other), WeekScore::default());
    }

    #[test]
    fn live_leader_scores_until_the_lead_flips() {
        let ahead = week_of(vec![game("Saints", "Vikings", "14", "7", "2nd Qtr 5:22")]);
        let picks = vec![sel("Saints", 4)];
        assert_eq!(score_selections(&ahead, &picks), WeekScore { points: 4, good_picks: 1 });

        let behind = week_of(vec![game("Saints", "Vikings", "14", "21", "3rd Qtr 9:01")]);
        assert_eq!(score_selections(&behind, &picks), WeekScore::default());
    }

    #[test]
    fn a_tie_awards_nothing() {
        let week = week_of(vec![game("Saints", "Vikings", "10", "10", "Halftime")]);
        assert_eq!(score_selections(&week, &[sel("Saints", 5)]), WeekScore::default());
    }

    #[test]
    fn unposted_scores_are_skipped() {
        let week = week_of(vec![game("Ravens", "Bengals", "", "", "FINAL")]);
        assert_eq!(score_selections(&week, &[sel("Ravens", 2)]), WeekScore::default());
    }

    #[test]
    fn pick_without_a_game_is_skipped() {
        let week = week_of(vec![game("Ravens", "Bengals", "20", "0", "FINAL")]);
        let picks = vec![sel("Bears", 2), sel("Ravens", 1)];
        assert_eq!(score_selections(&week, &picks), WeekScore { points: 1, good_picks: 1 });
    }

    #[tokio::test]
    async fn rescore_announces_only_real_changes() {
        let state = PoolState::new(2017, 1);
        state.add_user("alice").await;
        state
            .season
            .write()
            .await
            .weeks[0]
            .load_scan({
                let mut scan = WeekScan::default();
                let g = game("Ravens", "Bengals", "20", "0", "FINAL");
                scan.team_index.insert(g.visitor.clone(), 0);
                scan.team_index.insert(g.home.clone(), 0);
                scan.games.push(g);
                scan
            });
        {
            let user = state.user("alice").await.unwrap();
            user.lock().await.weeks[0].selections = vec![sel("Ravens", 3)];
        }

        let (tx, mut rx) = mpsc::channel(8);
        rescore_week(&state, 0, &tx).await;
        assert_eq!(
            rx.try_recv().ok(),
            Some(PoolEvent::ScoreChanged {
                user: "alice".into(),
                week: 1,
                points: 3,
                good_picks: 1,
            })
        );

        // Same inputs again: totals already match, nothing announced.
        rescore_week(&state, 0, &tx).await;
        assert!(rx.try_recv().is_err());
    }

    // ---- standings ----

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 9, day, hour, 0, 0).unwrap()
    }

    /// Three bounded weeks (Sep 7-11, 14-18, 21-25) and two users.
    async fn seeded_state() -> PoolState {
        let state = PoolState::new(2017, 3);
        {
            let mut season = state.season.write().await;
            for (i, first) in [7, 14, 21].into_iter().enumerate() {
                season.weeks[i].start = Some(at(first, 5));
                season.weeks[i].end = Some(at(first + 4, 5));
            }
        }
        state.add_user("alice").await;
        state.add_user("bob").await;
        state
    }

    async fn set_week(state: &PoolState, name: &str, index: usize, points: u32) {
        let user = state.user(name).await.unwrap();
        let mut guard = user.lock().await;
        guard.weeks[index].points = points;
        guard.weeks[index].selections = vec![sel("Ravens", 1)];
    }

    async fn set_clock(state: &PoolState, now: DateTime<Utc>) {
        let season = state.season.read().await;
        state.clock.write().await.recompute(now, &season).expect("bounded weeks");
    }

    #[tokio::test]
    async fn standings_cover_completed_weeks() {
        let state = seeded_state().await;
        set_week(&state, "alice", 0, 5).await;
        set_week(&state, "alice", 1, 10).await;
        set_week(&state, "bob", 0, 5).await;
        set_week(&state, "bob", 1, 3).await;
        // Week 3 is in play; its points must not count yet.
        set_week(&state, "alice", 2, 99).await;
        set_clock(&state, at(21, 12)).await;

        let rows = standings(&state).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "alice");
        assert_eq!(rows[0].total, 15);
        assert_eq!(rows[0].weeks_played, 2);
        assert_eq!(rows[0].weeks_won, 2); // shared week 1, took week 2
        assert_eq!(rows[0].ave_per_week, "7.5");
        assert_eq!(rows[1].name, "bob");
        assert_eq!(rows[1].total, 8);
        assert_eq!(rows[1].weeks_won, 1);
        assert_eq!(rows[1].ave_per_week, "4.0");
    }

    #[tokio::test]
    async fn equal_totals_order_by_name() {
        let state = seeded_state().await;
        set_week(&state, "alice", 0, 7).await;
        set_week(&state, "bob", 0, 7).await;
        set_clock(&state, at(14, 12)).await;

        let rows = standings(&state).await;
        assert_eq!(rows[0].name, "alice");
        assert_eq!(rows[1].name, "bob");
        assert_eq!(rows[0].weeks_won, 1);
        assert_eq!(rows[1].weeks_won, 1);
    }

    #[tokio::test]
    async fn average_counts_only_played_weeks() {
        let state = seeded_state().await;
        // Alice sat out week 1 entirely.
        set_week(&state, "alice", 1, 9).await;
        set_clock(&state, at(21, 12)).await;

        let rows = standings(&state).await;
        let alice = rows.iter().find(|r| r.name == "alice").unwrap();
        assert_eq!(alice.weeks_played, 1);
        assert_eq!(alice.ave_per_week, "9.0");
        let bob = rows.iter().find(|r| r.name == "bob").unwrap();
        assert_eq!(bob.ave_per_week, "0.0");
    }

    #[tokio::test]
    async fn season_over_counts_the_final_week() {
        let state = seeded_state().await;
        set_week(&state, "alice", 2, 12).await;
        set_clock(&state, at(30, 12)).await;

        let rows = standings(&state).await;
        let alice = rows.iter().find(|r| r.name == "alice").unwrap();
        assert_eq!(alice.total, 12);
        assert_eq!(alice.weeks_played, 1);
    }

    #[tokio::test]
    async fn no_clock_means_no_standings() {
        let state = seeded_state().await;
        assert!(standings(&state).await.is_empty());
    }
}
