use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::context;
use crate::entity::EntityAttrs;
use crate::error::AgentError;
use crate::history;
use crate::pipeline::{AgentContext, ContextPatch, Projected, Projection};
use crate::topic::EventKind;

/// Status events carry a plain-text payload ("ONLINE"/"OFFLINE"), not
/// JSON; the sender's connectivity state is mirrored into its document.
pub struct StatusProjection;

#[async_trait]
impl Projection for StatusProjection {
    fn kind(&self) -> EventKind {
        EventKind::Status
    }

    async fn project(
        &self,
        _ctx: &AgentContext,
        sender: &EntityAttrs,
        payload: &[u8],
    ) -> Result<Projected, AgentError> {
        let status = String::from_utf8_lossy(payload).trim().to_string();
        if status.is_empty() {
            return Err(AgentError::InvalidPayload("empty status".to_string()));
        }

        let patch = ContextPatch {
            entity_type: sender.entity_type,
            entity_id: sender.id.clone(),
            body: context::status_patch(&status),
        };

        let mut record = history::record_base(sender);
        record.insert("Status".into(), status.clone().into());

        let mut confirmation = Map::new();
        confirmation.insert("Status".into(), status.into());

        Ok(Projected {
            patch: Some(patch),
            record: Value::Object(record),
            confirmation,
            side_effect: None,
        })
    }
}
