use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::entity::{EntityAttrs, EntityResolver};
use crate::error::AgentError;
use crate::history;
use crate::pipeline::{
    self, AgentContext, InboundEvent, Projected, Projection, SideEffect,
};
use crate::topic::{self, EntityType, EventKind};

/// Staff/application notifications: `{Use, To, From, FromType, Type,
/// State, Message}`.
///
/// Notifications originate from the Rules collaborator rather than a
/// device's own topic, so the sender is always taken from the payload.
/// `Use` names the recipient class (Application or Staff) and `To` the
/// recipient, which is resolved as a second entity to confirm it is
/// registered. No context attribute changes; the event is logged and
/// relayed to the recipient's notification topic.
pub struct NotificationsProjection;

#[async_trait]
impl Projection for NotificationsProjection {
    fn kind(&self) -> EventKind {
        EventKind::Notifications
    }

    fn sender(&self, event: &InboundEvent<'_>) -> Result<(EntityType, String), AgentError> {
        let data = pipeline::parse_json(event.payload)?;
        let from = pipeline::field_str(&data, "From")?;
        let from_type = pipeline::field_opt_str(&data, "FromType")
            .unwrap_or_else(|| "Device".to_string());
        let entity_type = EntityType::from_name(&from_type)
            .ok_or_else(|| AgentError::InvalidPayload(format!("unknown FromType '{from_type}'")))?;
        Ok((entity_type, from))
    }

    async fn project(
        &self,
        ctx: &AgentContext,
        sender: &EntityAttrs,
        payload: &[u8],
    ) -> Result<Projected, AgentError> {
        let data = pipeline::parse_json(payload)?;
        let use_type = pipeline::field_str(&data, "Use")?;
        let to = pipeline::field_str(&data, "To")?;
        let message = pipeline::field_str(&data, "Message")?;

        let recipient_type = EntityType::from_name(&use_type)
            .ok_or_else(|| AgentError::InvalidPayload(format!("unknown Use '{use_type}'")))?;
        if !matches!(recipient_type, EntityType::Application | EntityType::Staff) {
            return Err(AgentError::InvalidPayload(format!(
                "notifications cannot target '{use_type}'"
            )));
        }

        // Confirm the recipient is registered before relaying.
        let recipient = EntityResolver::new(&ctx.context)
            .resolve(recipient_type, &to)
            .await?;

        // The relay lands on the recipient's subtree, which may be a
        // different location than the sender's.
        let side_effect = SideEffect {
            topic: topic::notification_topic(&recipient.location, recipient_type, &recipient.id),
            payload: data.clone(),
        };

        let mut record = Map::new();
        record.insert("Use".into(), use_type.clone().into());
        record.insert("From".into(), sender.id.clone().into());
        record.insert("To".into(), recipient.id.clone().into());
        record.insert("Location".into(), sender.location.clone().into());
        for class in [EntityType::Application, EntityType::Staff] {
            let value = if class == recipient_type {
                recipient.id.clone()
            } else {
                "NA".to_string()
            };
            record.insert(class.as_str().into(), value.into());
        }
        record.insert("Message".into(), message.clone().into());
        record.insert("Time".into(), history::record_time().into());

        let mut confirmation = Map::new();
        confirmation.insert("Use".into(), use_type.into());
        confirmation.insert("To".into(), recipient.id.into());
        confirmation.insert("Message".into(), message.into());

        Ok(Projected {
            patch: None,
            record: Value::Object(record),
            confirmation,
            side_effect: Some(side_effect),
        })
    }
}
