use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::entity::EntityAttrs;
use crate::error::AgentError;
use crate::history;
use crate::pipeline::{self, property, AgentContext, Projected, Projection};
use crate::topic::EventKind;

/// State transitions: `{Type, State, Message}`. The named property's
/// value moves to the reported state.
pub struct StateProjection;

#[async_trait]
impl Projection for StateProjection {
    fn kind(&self) -> EventKind {
        EventKind::State
    }

    async fn project(
        &self,
        ctx: &AgentContext,
        sender: &EntityAttrs,
        payload: &[u8],
    ) -> Result<Projected, AgentError> {
        let data = pipeline::parse_json(payload)?;
        let state_type = pipeline::field_str(&data, "Type")?;
        let state = pipeline::field_str(&data, "State")?;
        let message = pipeline::field_str(&data, "Message")?;

        let property_name = state_type.to_lowercase();
        let patch =
            property::property_patch(ctx, sender, &property_name, Value::String(state.clone()))
                .await?;

        let mut record = history::record_base(sender);
        record.insert("Type".into(), state_type.clone().into());
        record.insert("Value".into(), state.clone().into());
        record.insert("Message".into(), message.clone().into());

        let mut confirmation = Map::new();
        confirmation.insert("Type".into(), state_type.into());
        confirmation.insert("Value".into(), state.into());
        confirmation.insert("Message".into(), message.into());

        Ok(Projected {
            patch: Some(patch),
            record: Value::Object(record),
            confirmation,
            side_effect: None,
        })
    }
}
