use gridpool::events::PoolEvent;
use gridpool::poller::PollWorker;
use gridpool::pool::PoolState;
use gridpool::scoring;
use gridpool::settings::Settings;
use log::{info, warn};
use nfl_schedule::client::ScheduleClient;
use nfl_schedule::extract::scan_week;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_flag = match handle_cli_args() {
        CliAction::Quit => return Ok(()),
        CliAction::Run { config } => config,
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = Settings::resolve_path(config_flag);
    let settings = match Settings::load(&path) {
        Ok(s) => s,
        Err(e) => {
            warn!("no usable config at {path}: {e:#}; using defaults");
            Settings::default()
        }
    };
    info!(
        "season {}, {} weeks, schedule at {} ({})",
        settings.season_year,
        settings.weeks,
        settings.schedule_url,
        if settings.schedule_from_web { "web" } else { "local files" }
    );

    let client = ScheduleClient::new(&settings.schedule_url, settings.schedule_from_web);
    let state = Arc::new(PoolState::new(settings.season_year, settings.weeks));
    for name in &settings.players {
        state.add_user(name).await;
    }

    bootstrap_season(&state, &client).await;
    {
        let season = state.season.read().await;
        state.clock.write().await.recompute(chrono::Utc::now(), &season)?;
    }

    let (event_tx, mut event_rx) = mpsc::channel::<PoolEvent>(100);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Event drain. Spawned before the first full rescore so the channel
    // never backs up against an absent reader.
    let drain_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                PoolEvent::WeekRefreshed { week, applied, truncated } => {
                    if truncated {
                        warn!("week {week}: applied {applied} games from a truncated page");
                    } else {
                        info!("week {week}: refresh applied {applied} games");
                    }
                }
                PoolEvent::ScoreChanged { user, week, points, good_picks } => {
                    info!("{user}: week {week} now {points} points ({good_picks} good picks)");
                }
            }
        }
    });

    scoring::rescore_all(&state, &event_tx).await;

    // Poll worker — sole writer of schedule state from here on.
    let worker = PollWorker::new(Arc::clone(&state), client, event_tx.clone(), shutdown_rx);
    let poll_task = tokio::spawn(worker.run());

    tokio::signal::ctrl_c().await?;
    info!("interrupt received; shutting down");
    let _ = shutdown_tx.send(true);
    let _ = poll_task.await;

    for row in scoring::standings(&state).await {
        info!(
            "{}: {} points over {} weeks played, {} won, {} avg",
            row.name, row.total, row.weeks_played, row.weeks_won, row.ave_per_week
        );
    }

    drop(event_tx);
    let _ = drain_task.await;
    Ok(())
}

/// Load every week's page once so picks and scores have a schedule to hang
/// off before the poll loop narrows to the current week. A week whose page
/// will not come is logged and left empty; the rest of the season loads
/// anyway.
async fn bootstrap_season(state: &Arc<PoolState>, client: &ScheduleClient) {
    let (year, week_count) = {
        let season = state.season.read().await;
        (season.year, season.weeks.len() as u32)
    };
    for num in 1..=week_count {
        let page = match client.fetch_week(num).await {
            Ok(page) => page,
            Err(e) => {
                warn!("week {num}: initial fetch failed: {e}");
                continue;
            }
        };
        let scan = scan_week(&page, year);
        let mut season = state.season.write().await;
        if let Some(week) = season.weeks.get_mut(num as usize - 1) {
            week.load_scan(scan);
            info!("week {num}: loaded {} games", week.games.len());
        }
    }
}

enum CliAction {
    Run { config: Option<String> },
    Quit,
}

fn handle_cli_args() -> CliAction {
    let mut args = std::env::args().skip(1);
    let mut config = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{}", usage_text());
                return CliAction::Quit;
            }
            "-V" | "--version" => {
                println!("gridpool {}", env!("CARGO_PKG_VERSION"));
                return CliAction::Quit;
            }
            "-c" | "--config" => match args.next() {
                Some(path) => config = Some(path),
                None => {
                    eprintln!("{arg} expects a path\n\n{}", usage_text());
                    std::process::exit(2);
                }
            },
            _ => {
                eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
                std::process::exit(2);
            }
        }
    }

    CliAction::Run { config }
}

fn usage_text() -> &'static str {
    "gridpool - NFL confidence pool engine

Usage:
  gridpool
  gridpool --config pool.json
  gridpool --help
  gridpool --version

Environment:
  GRIDPOOL_CONFIG   Path to the pool config JSON (default gridpool.json)
  RUST_LOG          Log filter (default info)"
}
