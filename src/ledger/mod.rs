use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::config::OracleConfig;

/// Access-control oracle client.
///
/// The oracle is the single authorization checkpoint for every event
/// kind: a read-only "is this address permitted" query against the
/// ledger, executed under the agent's fixed service identity.
#[derive(Clone)]
pub struct AccessGate {
    http: Client,
    base_url: String,
    username: String,
    password: String,
    service_address: String,
}

#[derive(Deserialize)]
struct AccessDecision {
    allowed: bool,
}

impl AccessGate {
    pub fn new(config: &OracleConfig) -> Self {
        let http = Client::builder()
            .user_agent("iotbridge/0.1")
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http,
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            service_address: config.service_address.clone(),
        }
    }

    /// Whether `address` is permitted to publish through this agent.
    ///
    /// Fail-closed: a transport error, a non-2xx status or an
    /// unreadable body all count as a denial. The caller must abort the
    /// event with no further side effects on a `false`.
    pub async fn authorize(&self, address: &str) -> bool {
        let url = format!("{}/access/check", self.base_url);
        let body = json!({
            "address": address,
            "from": self.service_address,
        });

        let response = match self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Access oracle unreachable; denying");
                return false;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Access oracle returned failure; denying");
            return false;
        }

        match response.json::<AccessDecision>().await {
            Ok(decision) => decision.allowed,
            Err(e) => {
                warn!(error = %e, "Unreadable access oracle response; denying");
                false
            }
        }
    }
}
