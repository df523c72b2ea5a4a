use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::entity::EntityAttrs;
use crate::error::AgentError;
use crate::history;
use crate::pipeline::{self, property, AgentContext, Projected, Projection};
use crate::topic::EventKind;

/// Actuator state reports: `{Name, Type, Value, Message}`. The named
/// actuator property takes the reported value.
pub struct ActuatorsProjection;

#[async_trait]
impl Projection for ActuatorsProjection {
    fn kind(&self) -> EventKind {
        EventKind::Actuators
    }

    async fn project(
        &self,
        ctx: &AgentContext,
        sender: &EntityAttrs,
        payload: &[u8],
    ) -> Result<Projected, AgentError> {
        let data = pipeline::parse_json(payload)?;
        let name = pipeline::field_str(&data, "Name")?;
        let actuator_type = pipeline::field_str(&data, "Type")?;
        let message = pipeline::field_str(&data, "Message")?;
        let value = data
            .get("Value")
            .cloned()
            .ok_or_else(|| AgentError::InvalidPayload("missing field 'Value'".to_string()))?;

        let property_name = name.to_lowercase();
        let patch = property::property_patch(ctx, sender, &property_name, value.clone()).await?;

        let mut record = history::record_base(sender);
        record.insert("Actuator".into(), name.clone().into());
        record.insert("Type".into(), actuator_type.clone().into());
        record.insert("Value".into(), value.clone());
        record.insert("Message".into(), message.clone().into());

        let mut confirmation = Map::new();
        confirmation.insert("Actuator".into(), name.into());
        confirmation.insert("Type".into(), actuator_type.into());
        confirmation.insert("Value".into(), value);
        confirmation.insert("Message".into(), message.into());

        Ok(Projected {
            patch: Some(patch),
            record: Value::Object(record),
            confirmation,
            side_effect: None,
        })
    }
}
