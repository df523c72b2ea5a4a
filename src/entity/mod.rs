use serde_json::Value;

use crate::context::ContextClient;
use crate::error::AgentError;
use crate::topic::EntityType;

/// Sentinel zone for entities a zone genuinely does not apply to.
pub const NO_ZONE: &str = "NA";

/// The minimal projection of a registered entity the pipeline needs.
#[derive(Clone, Debug)]
pub struct EntityAttrs {
    pub id: String,
    pub entity_type: EntityType,
    /// Ledger account the sender authenticates as; the access gate's input.
    pub authorized_address: String,
    pub location: String,
    /// `"NA"` for application-class entities.
    pub zone: String,
}

/// Resolves `(entityType, entityID)` pairs against the context store.
pub struct EntityResolver<'a> {
    context: &'a ContextClient,
}

const BASE_ATTRS: &str = "id,type,authenticationBlockchainUser.value,networkLocation.value";

impl<'a> EntityResolver<'a> {
    pub fn new(context: &'a ContextClient) -> Self {
        Self { context }
    }

    /// Fetch exactly the attribute projection the pipeline consumes.
    ///
    /// Zoned types additionally request `networkZone`; a missing zone
    /// value falls back to the `"NA"` sentinel.
    pub async fn resolve(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<EntityAttrs, AgentError> {
        let attrs = if entity_type.is_zoneless() {
            BASE_ATTRS.to_string()
        } else {
            format!("{BASE_ATTRS},networkZone.value")
        };

        let doc = self
            .context
            .get_attributes(entity_id, entity_type, &attrs)
            .await?;

        let id = required_str(&doc, "id", entity_type, entity_id)?;
        let authorized_address = required_value_str(
            &doc,
            "authenticationBlockchainUser",
            entity_type,
            entity_id,
        )?;
        let location = required_value_str(&doc, "networkLocation", entity_type, entity_id)?;
        let zone = doc
            .get("networkZone")
            .and_then(|a| a.get("value"))
            .and_then(Value::as_str)
            .unwrap_or(NO_ZONE)
            .to_string();

        Ok(EntityAttrs {
            id,
            entity_type,
            authorized_address,
            location,
            zone,
        })
    }
}

fn required_str(
    doc: &Value,
    field: &str,
    entity_type: EntityType,
    entity_id: &str,
) -> Result<String, AgentError> {
    doc.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| not_found(entity_type, entity_id))
}

fn required_value_str(
    doc: &Value,
    attr: &str,
    entity_type: EntityType,
    entity_id: &str,
) -> Result<String, AgentError> {
    doc.get(attr)
        .and_then(|a| a.get("value"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| not_found(entity_type, entity_id))
}

// A document without the registration attributes is indistinguishable
// from an unregistered entity as far as the pipeline is concerned.
fn not_found(entity_type: EntityType, entity_id: &str) -> AgentError {
    AgentError::EntityNotFound {
        entity_type: entity_type.to_string(),
        entity_id: entity_id.to_string(),
    }
}
