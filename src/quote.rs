/*
 *  quote.rs
 *
 *  TickerTock - time is money
 *  (c) 2020-26 Stuart Hunter
 *
 *  Quote API client, snapshot cache, and background polling task.
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use chrono::{DateTime, Local, Utc};
use log::{error, info};
use reqwest::{Client, header};
use serde::Serialize;
use serde_json::{Error as JsonError, Value};
use std::fmt::{self, Display};
use std::io::Read;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use flate2::read::GzDecoder;

use crate::errlog::FetchLog;
use crate::market::{MarketCalendar, MarketWindow};

/// Directional indicator derived from the latest trade against the
/// previous close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    /// Fetch succeeded outside the trading session; no intraday comparison.
    Closed,
    /// Placeholder before the first fetch completes.
    Unknown,
    /// Last fetch failed; the cached value is the last known price.
    Error,
}

impl Trend {
    pub fn from_prices(latest: f64, reference: f64) -> Trend {
        if latest >= reference {
            Trend::Up
        } else {
            Trend::Down
        }
    }
}

/// Immutable point-in-time record of the latest price and trend.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSnapshot {
    pub trend: Trend,
    pub value: String,
    pub fetched_at: DateTime<Local>,
}

impl QuoteSnapshot {
    /// Startup placeholder, held until the first fetch lands.
    pub fn placeholder() -> Self {
        Self {
            trend: Trend::Unknown,
            value: "--.--".to_string(),
            fetched_at: Local::now(),
        }
    }
}

/// Single-slot snapshot cache. Writes replace the whole value atomically;
/// readers clone the latest without blocking the writer.
pub struct QuoteCache {
    tx: watch::Sender<QuoteSnapshot>,
}

#[derive(Clone)]
pub struct QuoteReader {
    rx: watch::Receiver<QuoteSnapshot>,
}

impl QuoteCache {
    pub fn channel() -> (QuoteCache, QuoteReader) {
        let (tx, rx) = watch::channel(QuoteSnapshot::placeholder());
        (QuoteCache { tx }, QuoteReader { rx })
    }

    pub fn write(&self, snapshot: QuoteSnapshot) {
        self.tx.send_replace(snapshot);
    }

    pub fn read(&self) -> QuoteSnapshot {
        self.tx.borrow().clone()
    }
}

impl QuoteReader {
    pub fn read(&self) -> QuoteSnapshot {
        self.rx.borrow().clone()
    }
}

// Custom error type for quote API operations.
#[allow(dead_code)]
#[derive(Debug)]
pub enum QuoteApiError {
    HttpRequestError(reqwest::Error),
    DeserializationError(JsonError),
    ApiKeyError(String),
    MissingData(String),
    PollingError(String),
}

impl QuoteApiError {
    /// Error kind as written to the fetch log.
    pub fn kind(&self) -> &'static str {
        match self {
            QuoteApiError::HttpRequestError(_) | QuoteApiError::PollingError(_) => "NetworkError",
            QuoteApiError::DeserializationError(_) | QuoteApiError::MissingData(_) => "ParseError",
            QuoteApiError::ApiKeyError(_) => "ConfigError",
        }
    }
}

impl Display for QuoteApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteApiError::HttpRequestError(e) => write!(f, "HTTP request error: {}", e),
            QuoteApiError::DeserializationError(e) => write!(f, "JSON deserialization error: {}", e),
            QuoteApiError::ApiKeyError(msg) => write!(f, "Quote API key required: {}", msg),
            QuoteApiError::MissingData(msg) => write!(f, "Missing quote data: {}", msg),
            QuoteApiError::PollingError(msg) => write!(f, "Polling error: {}", msg),
        }
    }
}

impl std::error::Error for QuoteApiError {}

impl From<reqwest::Error> for QuoteApiError {
    fn from(err: reqwest::Error) -> Self {
        QuoteApiError::HttpRequestError(err)
    }
}

impl From<JsonError> for QuoteApiError {
    fn from(err: JsonError) -> Self {
        QuoteApiError::DeserializationError(err)
    }
}

/// Last trade and previous close out of the quote payload.
fn parse_prices(v: &Value) -> Result<(f64, f64), QuoteApiError> {
    let latest = v["c"]
        .as_f64()
        .filter(|p| *p > 0.0)
        .ok_or_else(|| QuoteApiError::MissingData("no last trade price".to_string()))?;
    let reference = v["pc"]
        .as_f64()
        .filter(|p| *p > 0.0)
        .ok_or_else(|| QuoteApiError::MissingData("no previous close price".to_string()))?;
    Ok((latest, reference))
}

/// Degrade the cache after a failed fetch: the previous value stays
/// readable, the trend flips to Error, and exactly one line lands in the
/// fetch log.
fn record_failure(cache: &QuoteCache, log: &FetchLog, err: &QuoteApiError) {
    error!("Quote fetch failed: {}", err);
    log.append(err.kind(), &err.to_string());

    let previous = cache.read();
    cache.write(QuoteSnapshot {
        trend: Trend::Error,
        value: previous.value,
        fetched_at: Local::now(),
    });
}

/// Quote API client with session awareness.
#[derive(Debug)]
pub struct QuoteClient {
    base_url: String,
    api_key: String,
    symbol: String,
    client: Client,
    calendar: MarketCalendar,
    window: Option<MarketWindow>,
    interval: Duration,
    backoff: Duration,
}

/// Handle to the running poll task; shutting down signals the task and
/// joins it.
pub struct QuotePoller {
    stop_sender: mpsc::Sender<()>,
    poll_handle: JoinHandle<()>,
}

impl QuotePoller {
    pub async fn shutdown(self) {
        if let Err(e) = self.stop_sender.send(()).await {
            error!("Failed to send stop signal to quote polling task: {}", e);
        }
        self.poll_handle
            .await
            .unwrap_or_else(|e| error!("Quote polling task failed to join: {}", e));
        info!("Quote polling stopped.");
    }
}

impl QuoteClient {
    pub fn new(
        symbol: &str,
        api_key: &str,
        calendar: MarketCalendar,
        interval: Duration,
        backoff: Duration,
    ) -> Result<Self, QuoteApiError> {
        const VERSION: &'static str =
            concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

        if api_key.is_empty() {
            return Err(QuoteApiError::ApiKeyError("no key specified".to_string()));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));
        headers.insert(
            "Accept-Encoding",
            header::HeaderValue::from_static("deflate, gzip"),
        );
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .connect_timeout(Duration::from_millis(1500))
            .default_headers(headers)
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        Ok(QuoteClient {
            base_url: "https://finnhub.io/api/v1/quote".to_string(),
            api_key: api_key.to_string(),
            symbol: symbol.to_string(),
            client,
            calendar,
            window: None,
            interval,
            backoff,
        })
    }

    async fn send_with_retries<T: Serialize + ?Sized>(
        &self,
        params: &T,
        max_retries: u8,
    ) -> Result<String, reqwest::Error> {
        let mut retries = 0;
        loop {
            match self.client.get(&self.base_url).query(params).send().await {
                Ok(response) => {
                    let raw = response.error_for_status()?.bytes().await?;

                    // Try to decode as gzip first, fall back to plain text
                    let plain = {
                        let mut decoder = GzDecoder::new(&raw[..]);
                        let mut decoded = String::new();
                        match decoder.read_to_string(&mut decoded) {
                            Ok(_) => decoded,
                            Err(_) => String::from_utf8_lossy(&raw).to_string(),
                        }
                    };
                    return Ok(plain);
                }
                Err(e) => {
                    retries += 1;
                    if retries >= max_retries {
                        return Err(e);
                    }
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Fetches the latest quote and classifies the trend against the
    /// session calendar.
    pub async fn fetch_quote(&mut self) -> Result<QuoteSnapshot, QuoteApiError> {
        let params = [("symbol", self.symbol.clone()), ("token", self.api_key.clone())];

        let plain = self.send_with_retries(&params, 3).await?;
        let payload: Value = serde_json::from_str(plain.as_str())?;
        let (latest, reference) = parse_prices(&payload)?;

        let now = Utc::now();
        // Roll the session window once the close boundary has passed,
        // before resuming the intraday comparison.
        match self.window {
            Some(w) if now < w.closes_at => {}
            _ => self.window = Some(self.calendar.current_window(now)),
        }
        let in_session = self.window.map(|w| w.contains(now)).unwrap_or(false);

        let trend = if in_session {
            Trend::from_prices(latest, reference)
        } else {
            Trend::Closed
        };

        Ok(QuoteSnapshot {
            trend,
            value: format!("{:.2}", latest),
            fetched_at: Local::now(),
        })
    }

    /// Starts the background polling task. The first fetch fires
    /// immediately; refreshes are unconditional every interval, with the
    /// backoff interval after a failure. Never terminates on fetch errors.
    pub fn start_polling(mut self, cache: QuoteCache, log: FetchLog) -> QuotePoller {
        let (stop_tx, mut stop_rx) = mpsc::channel(1);

        let poll_handle = tokio::spawn(async move {
            let mut delay = Duration::ZERO;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        match self.fetch_quote().await {
                            Ok(snapshot) => {
                                info!("Quote {} {} ({:?})", self.symbol, snapshot.value, snapshot.trend);
                                cache.write(snapshot);
                                delay = self.interval;
                            }
                            Err(e) => {
                                record_failure(&cache, &log, &e);
                                delay = self.backoff;
                            }
                        }
                    }
                    _ = stop_rx.recv() => {
                        info!("Quote polling task received stop signal. Exiting.");
                        break;
                    }
                }
            }
        });

        QuotePoller {
            stop_sender: stop_tx,
            poll_handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_trend_from_prices() {
        assert_eq!(Trend::from_prices(101.0, 100.0), Trend::Up);
        assert_eq!(Trend::from_prices(99.0, 100.0), Trend::Down);
        // Unchanged counts as up
        assert_eq!(Trend::from_prices(100.0, 100.0), Trend::Up);
    }

    #[test]
    fn test_cache_read_after_write() {
        let (cache, reader) = QuoteCache::channel();
        assert_eq!(reader.read().trend, Trend::Unknown);

        let snapshot = QuoteSnapshot {
            trend: Trend::Up,
            value: "245.67".to_string(),
            fetched_at: Local::now(),
        };
        cache.write(snapshot.clone());

        assert_eq!(reader.read(), snapshot);
        assert_eq!(cache.read(), snapshot);
    }

    #[test]
    fn test_parse_prices() {
        let payload = json!({"c": 245.67, "pc": 244.01, "h": 247.0});
        assert_eq!(parse_prices(&payload).unwrap(), (245.67, 244.01));
    }

    #[test]
    fn test_parse_prices_rejects_empty_payload() {
        // The API answers unknown symbols with zeroed prices
        let payload = json!({"c": 0, "pc": 0});
        let err = parse_prices(&payload).unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn test_failure_preserves_value_and_logs_once() {
        let path = std::env::temp_dir().join("tickertock-test-failure.log");
        let _ = fs::remove_file(&path);
        let log = FetchLog::new(path.clone());

        let (cache, reader) = QuoteCache::channel();
        cache.write(QuoteSnapshot {
            trend: Trend::Up,
            value: "245.67".to_string(),
            fetched_at: Local::now(),
        });

        let err = QuoteApiError::PollingError("connection reset".to_string());
        record_failure(&cache, &log, &err);

        let snapshot = reader.read();
        assert_eq!(snapshot.trend, Trend::Error);
        assert_eq!(snapshot.value, "245.67");

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("NetworkError"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            QuoteApiError::PollingError("x".into()).kind(),
            "NetworkError"
        );
        assert_eq!(
            QuoteApiError::MissingData("x".into()).kind(),
            "ParseError"
        );
        assert_eq!(QuoteApiError::ApiKeyError("x".into()).kind(), "ConfigError");
    }

    #[test]
    fn test_missing_key_rejected_at_construction() {
        let err = QuoteClient::new(
            "TSLA",
            "",
            MarketCalendar::new(),
            Duration::from_secs(120),
            Duration::from_secs(300),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
    }
}
