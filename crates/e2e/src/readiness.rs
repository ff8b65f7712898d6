//! Readiness probing against `GET /status`

use reqwest::StatusCode;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ProbeConfig;

/// Poll `GET {base_url}/status` until it answers 200 or the budget runs out.
///
/// Every failed attempt, whether a refused connection, a non-200 answer or no
/// answer within `request_timeout`, costs one retry and one fixed `interval`
/// sleep. The total wait is therefore bounded even if something else holds the
/// port and never responds.
pub async fn wait_ready(client: &reqwest::Client, base_url: &str, probe: &ProbeConfig) -> bool {
    let url = format!("{}/status", base_url);
    let mut remaining = probe.max_retries;

    while remaining > 0 {
        match client.get(&url).timeout(probe.request_timeout).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => {
                debug!(
                    "Server ready after {} attempt(s)",
                    probe.max_retries - remaining + 1
                );
                return true;
            }
            Ok(resp) => {
                warn!("Readiness probe returned {}", resp.status());
            }
            Err(e) => {
                if remaining == probe.max_retries {
                    info!("Waiting for server to start...");
                }
                // Connection refused is expected while the server is binding
                if e.is_timeout() {
                    debug!("Readiness probe timed out after {:?}", probe.request_timeout);
                } else if !e.is_connect() {
                    warn!("Readiness probe error: {}", e);
                }
            }
        }

        sleep(probe.interval).await;
        remaining -= 1;
    }

    false
}
