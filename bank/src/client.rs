//! HTTP client for the bank's period-boundary calls to mintettes

use rscoin_core::{Mintette, NewPeriodData, PeriodId, PeriodResult};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MintetteClient {
    http: reqwest::Client,
    poll_timeout: Duration,
}

impl MintetteClient {
    pub fn new(poll_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            poll_timeout,
        }
    }

    /// Poll one mintette for its period result. Timeouts, transport errors
    /// and undecodable replies all come back as `None`; the period engine
    /// treats them as a missed result, nothing is rolled back.
    pub async fn period_finished(
        &self,
        mintette: &Mintette,
        period_id: PeriodId,
    ) -> Option<PeriodResult> {
        let url = format!("http://{}/period_finished", mintette);
        let request = self
            .http
            .post(&url)
            .json(&json!({ "period_id": period_id }))
            .send();

        let response = match tokio::time::timeout(self.poll_timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                log::warn!("period poll failed for {}: {}", mintette, e);
                return None;
            }
            Err(_) => {
                log::warn!("period poll timed out for {}", mintette);
                return None;
            }
        };

        if !response.status().is_success() {
            log::warn!("period poll rejected by {}: {}", mintette, response.status());
            return None;
        }

        match response.json::<PeriodResult>().await {
            Ok(result) => Some(result),
            Err(e) => {
                log::warn!("undecodable period result from {}: {}", mintette, e);
                None
            }
        }
    }

    /// Push a period announcement; failures are logged and retried by the
    /// next boundary, the engine does not wait for stragglers.
    pub async fn announce_new_period(&self, mintette: &Mintette, data: &NewPeriodData) {
        let url = format!("http://{}/announce_new_period", mintette);
        let request = self.http.post(&url).json(data).send();

        match tokio::time::timeout(self.poll_timeout, request).await {
            Ok(Ok(response)) if response.status().is_success() => {}
            Ok(Ok(response)) => {
                log::warn!("announcement rejected by {}: {}", mintette, response.status());
            }
            Ok(Err(e)) => log::warn!("announcement failed for {}: {}", mintette, e),
            Err(_) => log::warn!("announcement timed out for {}", mintette),
        }
    }
}
