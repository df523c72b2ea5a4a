use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::context;
use crate::entity::EntityAttrs;
use crate::error::AgentError;
use crate::history;
use crate::pipeline::{self, AgentContext, ContextPatch, Projected, Projection};
use crate::topic::EventKind;

/// AI model classification results: `{Model, Type, Value, State,
/// Message}`. Only the named model's entry inside the entity's `models`
/// list is touched; the rest of the list is carried through unchanged.
pub struct ClassificationProjection;

#[async_trait]
impl Projection for ClassificationProjection {
    fn kind(&self) -> EventKind {
        EventKind::Classification
    }

    async fn project(
        &self,
        ctx: &AgentContext,
        sender: &EntityAttrs,
        payload: &[u8],
    ) -> Result<Projected, AgentError> {
        let data = pipeline::parse_json(payload)?;
        let model = pipeline::field_str(&data, "Model")?;
        let state = pipeline::field_str(&data, "State")?;
        let message = pipeline::field_str(&data, "Message")?;
        // Original classifiers report either a typed value or a bare state.
        let result_type =
            pipeline::field_opt_str(&data, "Type").unwrap_or_else(|| "State".to_string());
        let result_value = data
            .get("Value")
            .cloned()
            .unwrap_or_else(|| Value::String(state.clone()));

        let doc = ctx
            .context
            .get_attributes(&sender.id, sender.entity_type, "models")
            .await?;
        let mut models = doc
            .get("models")
            .cloned()
            .ok_or_else(|| AgentError::ModelNotFound(model.clone()))?;

        let entries = models
            .get_mut("value")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| AgentError::ModelNotFound(model.clone()))?;

        let entry = entries
            .iter_mut()
            .find(|e| {
                e.get("name")
                    .and_then(|n| n.get("value"))
                    .and_then(Value::as_str)
                    == Some(model.as_str())
            })
            .ok_or_else(|| AgentError::ModelNotFound(model.clone()))?;

        let now = Utc::now().to_rfc3339();
        entry["state"] = json!({
            "value": state,
            "metadata": { "timestamp": { "value": now } }
        });
        entry["property"] = json!({ "value": result_value });

        let mut body = context::online_patch_base();
        body.insert("models".into(), models);

        let patch = ContextPatch {
            entity_type: sender.entity_type,
            entity_id: sender.id.clone(),
            body: Value::Object(body),
        };

        let mut record = history::record_base(sender);
        record.insert("Model".into(), model.clone().into());
        record.insert("Type".into(), result_type.clone().into());
        record.insert("Value".into(), result_value.clone());
        record.insert("Message".into(), message.clone().into());

        let mut confirmation = Map::new();
        confirmation.insert("Model".into(), model.into());
        confirmation.insert("Type".into(), result_type.into());
        confirmation.insert("Value".into(), result_value);
        confirmation.insert("Message".into(), message.into());

        Ok(Projected {
            patch: Some(patch),
            record: Value::Object(record),
            confirmation,
            side_effect: None,
        })
    }
}
