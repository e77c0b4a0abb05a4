//! Page fetching with retry, and network-identity rotation.
//!
//! Both side effects of a harvest sit behind small traits so the extraction
//! pipeline can be driven by recorded pages in tests:
//! - [`PageFetcher`]: fetch a URL and return its body
//! - [`RetryFetch`]: decorator that retries any [`PageFetcher`] until the
//!   caller accepts the page or the attempt budget runs out
//! - [`IdentityRotator`]: ask for a fresh exit identity after each URL
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```
//!
//! A zero base delay disables waiting entirely.

use crate::error::{HarvestError, Result};
use rand::{Rng, rng};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/70.0.3538.77 Safari/537.36";

/// Fetch the body of a page.
pub trait PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Request a new network identity from whatever routes our traffic.
pub trait IdentityRotator {
    async fn rotate(&self) -> Result<()>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client, optionally routed through `proxy`
    /// (e.g. `socks5h://127.0.0.1:9050`).
    pub fn new(proxy: Option<&str>, timeout: StdDuration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"),
        );

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout);
        if let Some(proxy) = proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let t0 = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Wrapper that retries a [`PageFetcher`] with exponential backoff.
pub struct RetryFetch<T> {
    inner: T,
    /// Total attempts per URL, at least one.
    attempts: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: PageFetcher,
{
    pub fn new(inner: T, attempts: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Fetch `url` until `accept` turns a body into a value.
    ///
    /// Transport errors and bodies rejected by `accept` both consume an
    /// attempt. The last error is returned once the budget is spent.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn fetch_with<V, F>(&self, url: &str, mut accept: F) -> Result<V>
    where
        F: FnMut(String) -> Result<V>,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await.and_then(&mut accept) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.attempts {
                        error!(
                            attempt,
                            max = self.attempts,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "fetch exhausted attempts"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(attempt, max = self.attempts, ?delay, error = %e, "fetch attempt failed; retrying");
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        if self.base_delay.is_zero() {
            return StdDuration::ZERO;
        }
        let shift = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("attempts", &self.attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

/// Rotates the Tor circuit through the control port (`SIGNAL NEWNYM`).
#[derive(Debug, Clone)]
pub struct TorControl {
    addr: String,
    password: Option<String>,
}

impl TorControl {
    pub fn new(addr: impl Into<String>, password: Option<String>) -> Self {
        Self {
            addr: addr.into(),
            password,
        }
    }

    async fn command(conn: &mut BufReader<TcpStream>, line: &str) -> Result<()> {
        conn.get_mut().write_all(format!("{line}\r\n").as_bytes()).await?;
        let mut reply = String::new();
        conn.read_line(&mut reply).await?;
        if reply.starts_with("250") {
            Ok(())
        } else {
            // Never echo the AUTHENTICATE argument.
            let verb = line.split_whitespace().next().unwrap_or_default();
            Err(HarvestError::Identity(format!(
                "{verb} rejected: {}",
                reply.trim_end()
            )))
        }
    }
}

impl IdentityRotator for TorControl {
    #[instrument(level = "debug", skip_all, fields(addr = %self.addr))]
    async fn rotate(&self) -> Result<()> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| HarvestError::Identity(format!("connect {}: {e}", self.addr)))?;
        let mut conn = BufReader::new(stream);

        let auth = match &self.password {
            Some(password) => format!("AUTHENTICATE \"{}\"", password.replace('"', "\\\"")),
            None => "AUTHENTICATE".to_string(),
        };
        Self::command(&mut conn, &auth).await?;
        Self::command(&mut conn, "SIGNAL NEWNYM").await?;
        let _ = conn.get_mut().write_all(b"QUIT\r\n").await;
        debug!("Requested new identity");
        Ok(())
    }
}

/// The rotation strategy selected at startup.
#[derive(Debug, Clone)]
pub enum Rotator {
    Tor(TorControl),
    Disabled,
}

impl IdentityRotator for Rotator {
    async fn rotate(&self) -> Result<()> {
        match self {
            Rotator::Tor(tor) => tor.rotate().await,
            Rotator::Disabled => Ok(()),
        }
    }
}
