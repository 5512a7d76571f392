/// Notifications the engine publishes for the layer that persists and
/// serves results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    /// A week's page was fetched and its games applied in place.
    WeekRefreshed { week: u32, applied: usize, truncated: bool },
    /// A user's weekly score moved; worth persisting.
    ScoreChanged { user: String, week: u32, points: u32, good_picks: u32 },
}
