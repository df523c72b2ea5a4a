use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::AgentError;
use crate::topic::EntityType;

#[cfg(test)]
mod tests;

const SERVICE: &str = "context store";

/// HTTP client for the context store (current-state entity documents,
/// NGSI attribute/value/metadata model).
#[derive(Clone)]
pub struct ContextClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl ContextClient {
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

    /// Fetch the full current-state document for an entity.
    pub async fn get_entity(
        &self,
        entity_id: &str,
        entity_type: EntityType,
    ) -> Result<Value, AgentError> {
        let url = format!(
            "{}/entities/{}?type={}",
            self.base_url, entity_id, entity_type
        );
        self.get_document(&url, entity_id, entity_type).await
    }

    /// Fetch a projection of an entity document, limited to `attrs`.
    pub async fn get_attributes(
        &self,
        entity_id: &str,
        entity_type: EntityType,
        attrs: &str,
    ) -> Result<Value, AgentError> {
        let url = format!(
            "{}/entities/{}?type={}&attrs={}",
            self.base_url, entity_id, entity_type, attrs
        );
        self.get_document(&url, entity_id, entity_type).await
    }

    async fn get_document(
        &self,
        url: &str,
        entity_id: &str,
        entity_type: EntityType,
    ) -> Result<Value, AgentError> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| AgentError::upstream(SERVICE, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AgentError::EntityNotFound {
                entity_type: entity_type.to_string(),
                entity_id: entity_id.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(AgentError::upstream(SERVICE, response.status()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AgentError::upstream(SERVICE, e))
    }

    /// Apply a partial update to an entity's document.
    ///
    /// The store answers 204 on success; any other status is a failure
    /// and is never retried.
    pub async fn update_entity(
        &self,
        entity_id: &str,
        entity_type: EntityType,
        patch: &Value,
    ) -> Result<(), AgentError> {
        let url = format!(
            "{}/entities/{}/attrs?type={}",
            self.base_url, entity_id, entity_type
        );

        debug!(entity = %entity_id, entity_type = %entity_type, "Patching context document");

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(patch)
            .send()
            .await
            .map_err(|e| AgentError::upstream(SERVICE, e))?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(AgentError::upstream(SERVICE, response.status()));
        }
        Ok(())
    }
}

/// Patch fields shared by every context mutation: the entity is marked
/// online and its modification timestamp refreshed.
pub fn online_patch_base() -> Map<String, Value> {
    let now = Utc::now().to_rfc3339();
    let mut patch = Map::new();
    patch.insert("networkStatus".into(), json!({ "value": "ONLINE" }));
    patch.insert(
        "networkStatus.metadata".into(),
        json!({ "timestamp": { "value": now } }),
    );
    patch.insert("dateModified".into(), json!({ "value": now }));
    patch
}

/// Patch for a Status event: only the reported status and timestamps.
pub fn status_patch(status: &str) -> Value {
    let now = Utc::now().to_rfc3339();
    json!({
        "networkStatus": { "value": status },
        "networkStatus.metadata": { "timestamp": { "value": now } },
        "dateModified": { "value": now }
    })
}

/// Replacement attribute for a read-modify-write property update.
///
/// `existing` is the attribute as freshly read from the store; its type
/// and metadata (unit, command vocabulary, description) are preserved,
/// only the value and metadata timestamp change.
pub fn property_update(existing: &Value, new_value: Value) -> Value {
    let mut metadata = existing
        .get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    metadata.insert(
        "timestamp".into(),
        json!({ "value": Utc::now().to_rfc3339() }),
    );

    let mut attr = Map::new();
    if let Some(attr_type) = existing.get("type") {
        attr.insert("type".into(), attr_type.clone());
    }
    attr.insert("value".into(), new_value);
    attr.insert("metadata".into(), Value::Object(metadata));
    Value::Object(attr)
}
