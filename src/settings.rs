//! Runtime configuration, read once at startup from a JSON file.

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Season year. Week pages and short day labels hang off it.
    pub season_year: i32,
    /// Weeks in the regular season.
    pub weeks: u32,
    /// Schedule page base; the week number is appended to it.
    pub schedule_url: String,
    /// Fetch pages over HTTP when true, from local files when false.
    pub schedule_from_web: bool,
    /// Pool members, seeded at startup.
    pub players: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            season_year: 2017,
            weeks: 17,
            schedule_url: "schedule/week".into(),
            schedule_from_web: false,
            players: Vec::new(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Settings> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading settings {path}"))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing settings {path}"))
    }

    /// Resolution order: the `--config` flag, `GRIDPOOL_CONFIG`, then
    /// `gridpool.json` in the working directory.
    pub fn resolve_path(flag: Option<String>) -> String {
        flag.or_else(|| std::env::var("GRIDPOOL_CONFIG").ok())
            .unwrap_or_else(|| "gridpool.json".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_settings_parse() {
        let raw = r#"{
            "season_year": 2017,
            "weeks": 17,
            "schedule_url": "http://site/schedule/week",
            "schedule_from_web": true,
            "players": ["alice", "bob"]
        }"#;
        let s: Settings = serde_json::from_str(raw).expect("should parse");
        assert_eq!(s.season_year, 2017);
        assert!(s.schedule_from_web);
        assert_eq!(s.players, vec!["alice".to_owned(), "bob".to_owned()]);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let s: Settings = serde_json::from_str(r#"{"season_year": 2016}"#).expect("should parse");
        assert_eq!(s.season_year, 2016);
        assert_eq!(s.weeks, 17);
        assert!(!s.schedule_from_web);
        assert!(s.players.is_empty());
    }

    #[test]
    fn flag_wins_path_resolution() {
        assert_eq!(Settings::resolve_path(Some("custom.json".into())), "custom.json");
    }
}
