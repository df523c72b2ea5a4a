use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::entity::EntityAttrs;
use crate::error::AgentError;
use crate::history;
use crate::pipeline::{self, property, AgentContext, Projected, Projection};
use crate::topic::EventKind;

/// Brain-computer-interface readings share the sensor payload shape
/// (`{Type, Value, Sensor, Message}`) but land in their own history
/// collection.
pub struct BciProjection;

#[async_trait]
impl Projection for BciProjection {
    fn kind(&self) -> EventKind {
        EventKind::Bci
    }

    async fn project(
        &self,
        ctx: &AgentContext,
        sender: &EntityAttrs,
        payload: &[u8],
    ) -> Result<Projected, AgentError> {
        let data = pipeline::parse_json(payload)?;
        let reading_type = pipeline::field_str(&data, "Type")?;
        let sensor = pipeline::field_str(&data, "Sensor")?;
        let message = pipeline::field_str(&data, "Message")?;
        let value = data
            .get("Value")
            .cloned()
            .ok_or_else(|| AgentError::InvalidPayload("missing field 'Value'".to_string()))?;

        let property_name = reading_type.to_lowercase();
        let patch = property::property_patch(ctx, sender, &property_name, value.clone()).await?;

        let mut record = history::record_base(sender);
        record.insert("Sensor".into(), sensor.clone().into());
        record.insert("Type".into(), reading_type.clone().into());
        record.insert("Value".into(), value.clone());
        record.insert("Message".into(), message.clone().into());

        let mut confirmation = Map::new();
        confirmation.insert("Sensor".into(), sensor.into());
        confirmation.insert("Type".into(), reading_type.into());
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
