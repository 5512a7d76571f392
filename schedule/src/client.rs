use reqwest::Client;
use std::fmt;
use std::time::Duration;

pub type FetchResult<T> = Result<T, FetchError>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum FetchError {
    Network(reqwest::Error, String),
    Status(reqwest::Error, String),
    File(std::io::Error, String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(e, url) => write!(f, "network error for {url}: {e}"),
            FetchError::Status(e, url) => write!(f, "bad status for {url}: {e}"),
            FetchError::File(e, path) => write!(f, "could not read {path}: {e}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Schedule-page client. Built once, reused for every poll.
#[derive(Debug, Clone)]
pub struct ScheduleClient {
    base: String,
    from_web: bool,
    client: Client,
}

impl ScheduleClient {
    /// `base` is the location prefix the week number gets appended to:
    /// `http://site/schedule/week` or `pages/week`.
    pub fn new(base: impl Into<String>, from_web: bool) -> Self {
        ScheduleClient {
            base: base.into(),
            from_web,
            client: Client::builder()
                .user_agent("gridpool/0.1 (confidence pool engine)")
                .build()
                .unwrap_or_default(),
        }
    }

    /// Where week `week` lives: `{base}{week}` on the web, `{base}{week}.html`
    /// on disk.
    pub fn week_location(&self, week: u32) -> String {
        if self.from_web {
            format!("{}{week}", self.base)
        } else {
            format!("{}{week}.html", self.base)
        }
    }

    /// Fetch the raw page for one week.
    pub async fn fetch_week(&self, week: u32) -> FetchResult<String> {
        let location = self.week_location(week);
        if self.from_web {
            let response = self
                .client
                .get(&location)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
                .map_err(|e| FetchError::Network(e, location.clone()))?
                .error_for_status()
                .map_err(|e| FetchError::Status(e, location.clone()))?;
            response
                .text()
                .await
                .map_err(|e| FetchError::Network(e, location))
        } else {
            tokio::fs::read_to_string(&location)
                .await
                .map_err(|e| FetchError::File(e, location))
        }
    }
}
