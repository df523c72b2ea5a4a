use serde_json::Value;

use crate::context;
use crate::entity::EntityAttrs;
use crate::error::AgentError;
use crate::pipeline::{AgentContext, ContextPatch};

/// Read-modify-write for property-bearing kinds (Sensors, Actuators,
/// State, BCI).
///
/// The entity document is re-read immediately before the write so the
/// property's metadata (unit, command vocabulary, description) is
/// preserved from its current state; only the value and its timestamp
/// are replaced. This is a blind-merge-free update but carries no
/// concurrency token, so concurrent writers can still lose updates.
pub(super) async fn property_patch(
    ctx: &AgentContext,
    sender: &EntityAttrs,
    property: &str,
    new_value: Value,
) -> Result<ContextPatch, AgentError> {
    let doc = ctx.context.get_entity(&sender.id, sender.entity_type).await?;

    let existing = doc
        .get(property)
        .ok_or_else(|| AgentError::PropertyNotFound(property.to_string()))?;

    let mut patch = context::online_patch_base();
    patch.insert(
        property.to_string(),
        context::property_update(existing, new_value),
    );

    Ok(ContextPatch {
        entity_type: sender.entity_type,
        entity_id: sender.id.clone(),
        body: Value::Object(patch),
    })
}
