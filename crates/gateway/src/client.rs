//! HTTP client for the spreadsheet-backed transaction service.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::CONTENT_TYPE;

use tally_core::errors::{Error, Result};
use tally_core::gateway::{PushAck, RemoteGateway};
use tally_core::models::{Snapshot, Transaction};

use crate::wire::{
    normalize_taxonomy, normalize_transactions, FetchResponse, SyncAckResponse, SyncRequest,
};

/// Bounded timeout for data requests; a timed-out call is a network
/// error, never left pending.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the sheet web app endpoint.
///
/// Reads come back as JSON. Writes go out as `text/plain` — the content
/// type browsers may send without a cross-origin preflight, which is
/// what the service's write path is built around — so the response to a
/// push is not guaranteed to be readable. See
/// [`RemoteGateway::push`] for how that degraded mode is classified.
#[derive(Debug, Clone)]
pub struct SheetClient {
    client: reqwest::Client,
    base_url: String,
}

impl SheetClient {
    /// Create a client for the given web app URL.
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RemoteGateway for SheetClient {
    async fn fetch_all(&self) -> Result<Snapshot> {
        let url = format!("{}?action=getData", self.base_url);
        debug!("Fetching data from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::network(format!("fetch failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(format!("fetch returned HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("fetch body unreadable: {}", e)))?;
        let parsed: FetchResponse = serde_json::from_str(&body)
            .map_err(|e| Error::network(format!("malformed response: {}", e)))?;

        let snapshot = match parsed {
            FetchResponse::Native {
                estabelecimentos,
                categorias,
            } => Snapshot {
                transactions: normalize_transactions(estabelecimentos),
                taxonomy: normalize_taxonomy(categorias),
            },
            FetchResponse::Domain(snapshot) => snapshot,
        };
        debug!(
            "Mapped {} transaction(s), {} taxonomy root(s)",
            snapshot.transactions.len(),
            snapshot.taxonomy.len()
        );
        Ok(snapshot)
    }

    async fn push(&self, transactions: &[Transaction]) -> Result<PushAck> {
        let body = serde_json::to_string(&SyncRequest::new(transactions))?;
        debug!("Pushing {} transaction(s) for sync", transactions.len());

        let response = self
            .client
            .post(&self.base_url)
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::network(format!("sync dispatch failed: {}", e)))?;

        // The request left the process. Anything from here on is the
        // degraded-response mode: classify, never fail.
        let status = response.status();
        match response.text().await {
            Ok(text) if status.is_success() => {
                if let Ok(ack) = serde_json::from_str::<SyncAckResponse>(&text) {
                    if ack.status.as_deref() == Some("ok") {
                        return Ok(PushAck::Confirmed);
                    }
                }
                Ok(PushAck::Dispatched)
            }
            Ok(_) => {
                warn!("Sync push answered HTTP {}; treating as dispatched", status);
                Ok(PushAck::Dispatched)
            }
            Err(err) => {
                warn!("Sync push ack unreadable ({}); treating as dispatched", err);
                Ok(PushAck::Dispatched)
            }
        }
    }
}
