//! Active reachability probe.
//!
//! The platform's online/offline signal can claim connectivity while the
//! network is actually unreachable, so the engine pairs it with this
//! probe against a known-reachable endpoint.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use uuid::Uuid;

use tally_core::gateway::ReachabilityProbe;

/// Small, highly available asset the original client pinged.
pub const DEFAULT_PROBE_URL: &str = "https://www.google.com/favicon.ico";

/// Probes are latency-sensitive; fail fast rather than hang a reconnect.
const PROBE_TIMEOUT_SECS: u64 = 5;

/// Cache-busting GET probe.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self::with_url(DEFAULT_PROBE_URL)
    }

    pub fn with_url(url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            url: url.to_string(),
        }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Append a nonce query parameter so no intermediary cache can answer.
fn cache_busted(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}cb={}", url, separator, Uuid::new_v4())
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn check(&self) -> bool {
        let url = cache_busted(&self.url);

        match self.client.get(&url).send().await {
            Ok(response) => {
                debug!("Connectivity probe answered HTTP {}", response.status());
                response.status().is_success()
            }
            Err(err) => {
                debug!("Connectivity probe failed: {}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_buster_picks_the_right_separator() {
        let plain = cache_busted("https://example.com/ping");
        assert!(plain.starts_with("https://example.com/ping?cb="));

        let with_query = cache_busted("https://example.com/ping?x=1");
        assert!(with_query.starts_with("https://example.com/ping?x=1&cb="));
    }

    #[test]
    fn successive_probes_never_share_a_url() {
        let a = cache_busted(DEFAULT_PROBE_URL);
        let b = cache_busted(DEFAULT_PROBE_URL);
        assert_ne!(a, b);
    }
}
