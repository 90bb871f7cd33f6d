//! HTTP execution with per-host rate limiting, retries, and circuit breaking
//!
//! Every request funnels through [`Transport::execute`]: circuit breaker
//! check, token acquisition, bounded-backoff attempt loop, capped body read,
//! breaker bookkeeping. Per-host state lives in two maps keyed by
//! `host[:port]`; contention on one host never blocks another beyond the
//! brief map lookup.

use crate::error::{Result, TalosError};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, warn};

const INITIAL_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 5_000;
const DEFAULT_BREAKER_THRESHOLD: u32 = 10;
const DEFAULT_BREAKER_COOLDOWN: Duration = Duration::from_secs(30);

/// A fully-read HTTP response with the body capped at the configured size.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// True when the body exceeded the cap and the excess was discarded.
    /// Informational only, never surfaced as an error.
    pub truncated: bool,
}

impl HttpResponse {
    /// Body as UTF-8 text, lossy.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Value of a response header, empty string if absent or non-UTF-8.
    pub fn header(&self, name: &str) -> String {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    }
}

/// Per-host circuit breaker state.
///
/// CLOSED until `threshold` consecutive failures, then OPEN for the cooldown
/// window. After the cooldown one probe is let through (HALF_OPEN); its
/// outcome either closes the circuit or re-opens it.
#[derive(Debug, Default)]
struct HostCircuit {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// HTTP transport shared by all workers.
pub struct Transport {
    client: Client,
    rate_limit: u32,
    retry_attempts: u32,
    max_body_bytes: usize,
    buckets: RwLock<HashMap<String, Arc<DefaultDirectRateLimiter>>>,
    breakers: Mutex<HashMap<String, HostCircuit>>,
    breaker_threshold: u32,
    breaker_cooldown: Duration,
}

impl Transport {
    /// Creates a transport from scan parameters. Redirects are never
    /// followed: 301/302 responses carry directory-classification signal.
    pub fn new(
        timeout_secs: u64,
        rate_limit: u32,
        retry_attempts: u32,
        max_response_mb: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            rate_limit,
            retry_attempts,
            max_body_bytes: max_response_mb * 1024 * 1024,
            buckets: RwLock::new(HashMap::new()),
            breakers: Mutex::new(HashMap::new()),
            breaker_threshold: DEFAULT_BREAKER_THRESHOLD,
            breaker_cooldown: DEFAULT_BREAKER_COOLDOWN,
        })
    }

    /// Overrides the circuit breaker knobs. Defaults: 10 failures, 30 s.
    pub fn with_breaker(mut self, threshold: u32, cooldown: Duration) -> Self {
        self.breaker_threshold = threshold;
        self.breaker_cooldown = cooldown;
        self
    }

    /// Executes one logical request: breaker check, rate limiting, retry
    /// loop with exponential backoff, capped body read.
    ///
    /// 5xx responses and network errors are retried; after retries are
    /// exhausted the breaker records one failure and the final 5xx response
    /// (if any) is returned as-is. 2xx/3xx/4xx return immediately.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<HttpResponse> {
        let host = host_key(url)?;
        self.check_breaker(&host)?;

        if self.rate_limit > 0 {
            self.acquire_token(&host).await;
        }

        let mut last_err: Option<TalosError> = None;
        let mut last_5xx: Option<HttpResponse> = None;

        for attempt in 0..=self.retry_attempts {
            if attempt > 0 {
                let backoff = Duration::from_millis(
                    (INITIAL_BACKOFF_MS << (attempt - 1)).min(MAX_BACKOFF_MS),
                );
                debug!("retry {attempt} for {url}, waiting {backoff:?}");
                sleep(backoff).await;
            }

            let mut req = self.client.request(method.clone(), url);
            for (key, value) in headers {
                req = req.header(key.as_str(), value.as_str());
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if status >= 500 {
                        debug!("HTTP {status} from {url}, attempt {attempt}");
                        last_5xx = self.read_capped(resp).await.ok();
                        continue;
                    }
                    match self.read_capped(resp).await {
                        Ok(response) => {
                            self.record_success(&host);
                            return Ok(response);
                        }
                        Err(e) => {
                            warn!("body read failed for {url}: {e}");
                            last_err = Some(e);
                            continue;
                        }
                    }
                }
                Err(e) => {
                    debug!("request failed for {url} (attempt {attempt}): {e}");
                    last_err = Some(if e.is_timeout() {
                        TalosError::Timeout(url.to_string())
                    } else {
                        TalosError::HttpError(e)
                    });
                }
            }
        }

        self.record_failure(&host);

        if let Some(resp) = last_5xx {
            return Ok(resp);
        }
        Err(last_err
            .unwrap_or_else(|| TalosError::ScanError(format!("retries exhausted for {url}"))))
    }

    /// True when the breaker for this URL's host is currently OPEN.
    pub fn circuit_open(&self, url: &str) -> bool {
        let Ok(host) = host_key(url) else {
            return false;
        };
        let breakers = self.breakers.lock().unwrap();
        breakers
            .get(&host)
            .and_then(|s| s.opened_at)
            .map(|opened| opened.elapsed() < self.breaker_cooldown)
            .unwrap_or(false)
    }

    /// Blocks until the host's token bucket grants a token. Buckets are
    /// created lazily; the map write lock is held only for the lookup.
    async fn acquire_token(&self, host: &str) {
        let limiter = {
            let mut buckets = self.buckets.write().await;
            Arc::clone(buckets.entry(host.to_string()).or_insert_with(|| {
                let rate = NonZeroU32::new(self.rate_limit).unwrap_or(nonzero!(1u32));
                let quota = Quota::per_second(rate).allow_burst(nonzero!(1u32));
                Arc::new(RateLimiter::direct(quota))
            }))
        };
        limiter.until_ready().await;
    }

    fn check_breaker(&self, host: &str) -> Result<()> {
        let mut breakers = self.breakers.lock().unwrap();
        if let Some(state) = breakers.get_mut(host) {
            if let Some(opened) = state.opened_at {
                if opened.elapsed() < self.breaker_cooldown {
                    return Err(TalosError::CircuitOpen(host.to_string()));
                }
                // Cooldown elapsed: half-open, let one probe through.
                state.opened_at = None;
            }
        }
        Ok(())
    }

    fn record_success(&self, host: &str) {
        let mut breakers = self.breakers.lock().unwrap();
        if let Some(state) = breakers.get_mut(host) {
            state.consecutive_failures = 0;
            state.opened_at = None;
        }
    }

    fn record_failure(&self, host: &str) {
        let mut breakers = self.breakers.lock().unwrap();
        let state = breakers.entry(host.to_string()).or_default();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.breaker_threshold {
            if state.opened_at.is_none() {
                warn!("circuit breaker opened for {host}");
            }
            state.opened_at = Some(Instant::now());
        }
    }

    /// Reads at most `max_body_bytes` of the body; the remainder is
    /// discarded by dropping the connection.
    async fn read_capped(&self, mut resp: reqwest::Response) -> Result<HttpResponse> {
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();

        let mut body: Vec<u8> = Vec::new();
        let mut truncated = false;

        loop {
            let chunk = match resp.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    if e.is_timeout() {
                        return Err(TalosError::Timeout(resp.url().to_string()));
                    }
                    return Err(TalosError::HttpError(e));
                }
            };
            if body.len() + chunk.len() > self.max_body_bytes {
                let room = self.max_body_bytes - body.len();
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
            truncated,
        })
    }
}

/// Host key for per-host state maps: `host` or `host:port`.
fn host_key(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| TalosError::ScanError(format!("URL has no host: {url}")))?;
    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_key_includes_port() {
        assert_eq!(
            host_key("http://127.0.0.1:8080/admin").unwrap(),
            "127.0.0.1:8080"
        );
        assert_eq!(host_key("https://example.com/x").unwrap(), "example.com");
    }

    #[test]
    fn host_key_rejects_garbage() {
        assert!(host_key("not a url").is_err());
    }
}
