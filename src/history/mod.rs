use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::StoreConfig;
use crate::entity::EntityAttrs;
use crate::error::AgentError;
use crate::topic::EntityType;

#[cfg(test)]
mod tests;

const SERVICE: &str = "history store";

/// HTTP client for the history store (append-only event log, one
/// collection per event kind).
#[derive(Clone)]
pub struct HistoryClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl HistoryClient {
    pub fn new(config: &StoreConfig) -> Self {
        let http = Client::builder()
            .user_agent("iotbridge/0.1")
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http,
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    /// Append an immutable record and return its store-assigned id.
    ///
    /// The store answers 201 with an `Id` response header; anything
    /// else is a failure.
    pub async fn insert(&self, collection: &str, record: &Value) -> Result<String, AgentError> {
        let url = format!("{}/data?type={}", self.base_url, collection);

        debug!(collection, "Appending history record");

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(record)
            .send()
            .await
            .map_err(|e| AgentError::upstream(SERVICE, e))?;

        if response.status() != StatusCode::CREATED {
            return Err(AgentError::upstream(SERVICE, response.status()));
        }

        response
            .headers()
            .get("Id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AgentError::upstream(SERVICE, "201 response without Id header"))
    }
}

/// The fields every history record starts from: the sender's type,
/// location and zone, one field per entity type holding the sender's id
/// when the sender is of that type (else `"NA"`), and the record time.
pub fn record_base(attrs: &EntityAttrs) -> Map<String, Value> {
    let mut record = Map::new();
    record.insert("Use".into(), attrs.entity_type.as_str().into());
    record.insert("Location".into(), attrs.location.clone().into());
    record.insert("Zone".into(), attrs.zone.clone().into());
    for entity_type in EntityType::ALL {
        let value = if entity_type == attrs.entity_type {
            attrs.id.clone()
        } else {
            "NA".to_string()
        };
        record.insert(entity_type.as_str().into(), value.into());
    }
    record.insert("Time".into(), record_time().into());
    record
}

/// History timestamps use a flat `YYYY-MM-DD HH:MM:SS` format, unlike
/// the RFC3339 metadata timestamps in the context store.
pub fn record_time() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
