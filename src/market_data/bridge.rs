// =============================================================================
// Bridge REST Client - HMAC-SHA256 signed OHLCV history requests
// =============================================================================
//
// Talks to an MT5-style HTTP gateway that exposes the terminal's price
// history. SECURITY: the secret key is never logged or serialized. Signed
// requests carry the API key in an X-API-KEY header and an HMAC signature
// over the query string, never the secret itself.
// =============================================================================

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::market_data::{Bar, DataError, MarketData};

type HmacSha256 = Hmac<Sha256>;

/// One bar as serialised by the bridge gateway.
#[derive(Debug, Deserialize)]
struct RawBar {
    /// Bar open time as a UNIX timestamp in seconds.
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// REST client for the price-history bridge with HMAC-SHA256 request signing.
#[derive(Clone)]
pub struct BridgeClient {
    secret: String,
    base_url: String,
    client: reqwest::Client,
}

impl BridgeClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new `BridgeClient`.
    ///
    /// # Arguments
    /// * `base_url` - gateway root, e.g. `http://127.0.0.1:8080`.
    /// * `api_key`  - sent as a header on every request, never in the query.
    /// * `secret`   - used exclusively for HMAC signing.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        let api_key = api_key.into();
        let secret = secret.into();

        let mut default_headers = HeaderMap::new();
        if let Ok(val) = HeaderValue::from_str(&api_key) {
            default_headers.insert("X-API-KEY", val);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "BridgeClient initialised");

        Self {
            secret,
            base_url,
            client,
        }
    }

    // -------------------------------------------------------------------------
    // Signing helpers
    // -------------------------------------------------------------------------

    /// Produce an HMAC-SHA256 hex signature of `query`.
    fn sign(&self, query: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key size");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Current UNIX timestamp in milliseconds.
    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX epoch")
            .as_millis() as u64
    }

    /// Append timestamp and signature to a query string.
    fn signed_query(&self, params: &str) -> String {
        let ts = Self::timestamp_ms();
        let base = if params.is_empty() {
            format!("timestamp={ts}")
        } else {
            format!("{params}&timestamp={ts}")
        };
        let sig = self.sign(&base);
        format!("{base}&signature={sig}")
    }
}

// ---------------------------------------------------------------------------
// MarketData implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl MarketData for BridgeClient {
    /// GET /api/v1/bars - fetch the most recent `count` closed bars.
    async fn fetch_window(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<Bar>, DataError> {
        let params = format!("symbol={symbol}&interval={interval}&count={count}");
        let qs = self.signed_query(&params);
        let url = format!("{}/api/v1/bars?{}", self.base_url, qs);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DataError::Unavailable(format!("bars request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DataError::Unavailable(format!(
                "bridge returned {status}: {body}"
            )));
        }

        let raw: Vec<RawBar> = resp
            .json()
            .await
            .map_err(|e| DataError::Malformed(format!("failed to parse bars response: {e}")))?;

        let mut bars = Vec::with_capacity(raw.len());
        for entry in raw {
            let open_time = chrono::DateTime::from_timestamp(entry.time, 0).ok_or_else(|| {
                DataError::Malformed(format!("bar timestamp out of range: {}", entry.time))
            })?;

            if !(entry.open.is_finite()
                && entry.high.is_finite()
                && entry.low.is_finite()
                && entry.close.is_finite())
            {
                warn!(time = entry.time, "skipping bar with non-finite prices");
                continue;
            }

            bars.push(Bar {
                open_time,
                open: entry.open,
                high: entry.high,
                low: entry.low,
                close: entry.close,
                volume: entry.volume,
            });
        }

        // The gateway serves oldest-first; enforce it in case of a misbehaving
        // implementation rather than corrupting every indicator downstream.
        bars.sort_by_key(|b| b.open_time);

        debug!(symbol, interval, count = bars.len(), "bars fetched");
        Ok(bars)
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
