use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::HttpSettings;
use crate::error::{AdapterError, PulseError};
use crate::metrics::{METRICS, RuntimeMetrics};

use super::rate_limit::RateLimiter;

/// Rate-limited JSON GET client owned by a single adapter.
///
/// RESPONSIBILITIES:
/// - Wait for the adapter's rate limiter before every request
/// - Map transport and HTTP status failures onto `AdapterError`
/// - Decode the body into the adapter's wire type
///
/// Venue-level error codes carried inside a 200 response are the
/// adapter's job, not this client's.
pub struct VenueHttp {
    exchange: &'static str,
    client: Client,
    limiter: RateLimiter,
}

impl VenueHttp {
    pub fn new(
        exchange: &'static str,
        settings: &HttpSettings,
        min_interval: Duration,
    ) -> Result<Self, PulseError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| PulseError::config(format!("http client for {exchange}: {e}")))?;

        Ok(Self {
            exchange,
            client,
            limiter: RateLimiter::new(min_interval),
        })
    }

    /// GETs `url` and decodes the JSON body.
    ///
    /// `symbol` is the canonical symbol the request is about, if
    /// any. With a symbol, a 400/404 answer is read as "venue does
    /// not list this symbol"; without one it is a plain failure.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        symbol: Option<&str>,
    ) -> Result<T, AdapterError> {
        self.limiter.acquire().await;
        RuntimeMetrics::incr(&METRICS.requests_sent);

        log::debug!("[{}] GET {}", self.exchange, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(self.status_error(status, &body, symbol));
        }

        serde_json::from_str(&body).map_err(|e| self.malformed(e.to_string()))
    }

    pub fn exchange(&self) -> &'static str {
        self.exchange
    }

    pub fn unavailable(&self, reason: impl Into<String>) -> AdapterError {
        AdapterError::ExchangeUnavailable {
            exchange: self.exchange.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(&self, reason: impl Into<String>) -> AdapterError {
        AdapterError::MalformedResponse {
            exchange: self.exchange.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_found(&self, symbol: &str) -> AdapterError {
        AdapterError::SymbolNotFound {
            exchange: self.exchange.to_string(),
            symbol: symbol.to_string(),
        }
    }

    pub fn rate_limited(&self) -> AdapterError {
        RuntimeMetrics::incr(&METRICS.rate_limited);
        AdapterError::RateLimited {
            exchange: self.exchange.to_string(),
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> AdapterError {
        if e.is_timeout() {
            AdapterError::Timeout {
                exchange: self.exchange.to_string(),
            }
        } else if e.is_decode() {
            self.malformed(e.to_string())
        } else {
            self.unavailable(e.to_string())
        }
    }

    fn status_error(&self, status: StatusCode, body: &str, symbol: Option<&str>) -> AdapterError {
        match (status.as_u16(), symbol) {
            // 418 is Binance's "banned after ignoring 429"
            (429 | 418, _) => self.rate_limited(),
            (400 | 404, Some(symbol)) => {
                log::debug!("[{}] {} for {}: {}", self.exchange, status, symbol, snippet(body));
                self.not_found(symbol)
            }
            _ => self.unavailable(format!("http {}: {}", status, snippet(body))),
        }
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
