use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::context;
use crate::entity::{EntityAttrs, EntityResolver};
use crate::error::AgentError;
use crate::history;
use crate::pipeline::{
    self, AgentContext, ContextPatch, InboundEvent, Projected, Projection, SideEffect,
};
use crate::topic::{self, EntityType, EventKind};

/// Device commands: `{To, Use, Property, Type, Value, Message, Zone}`.
///
/// The sender asks a *target* entity to execute a command, so a second
/// resolution runs for the target and all validation happens against
/// the target's document: the property must exist, the command type
/// must be declared in the property's command vocabulary, and the value
/// must be legal for that type. The instruction is forwarded to the
/// target's own command topic as a side effect.
pub struct CommandsProjection;

#[async_trait]
impl Projection for CommandsProjection {
    fn kind(&self) -> EventKind {
        EventKind::Commands
    }

    /// Broker path: sender from the topic. Rules path: no topic, the
    /// triggering entity is named in the payload (`From`, `FromType`).
    fn sender(&self, event: &InboundEvent<'_>) -> Result<(EntityType, String), AgentError> {
        if let Some(t) = event.topic {
            return topic::decode(t).map(|(entity_type, id)| (entity_type, id.to_string()));
        }
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
        let to = pipeline::field_str(&data, "To")?;
        let use_type = pipeline::field_str(&data, "Use")?;
        let property = pipeline::field_str(&data, "Property")?;
        let command_type = pipeline::field_str(&data, "Type")?;
        let value = pipeline::field_str(&data, "Value")?;
        let message = pipeline::field_str(&data, "Message")?;

        let target_type = EntityType::from_name(&use_type)
            .ok_or_else(|| AgentError::InvalidPayload(format!("unknown Use '{use_type}'")))?;
        let target = EntityResolver::new(&ctx.context)
            .resolve(target_type, &to)
            .await?;

        let doc = ctx.context.get_entity(&target.id, target_type).await?;
        let attr = doc
            .get(&property)
            .ok_or_else(|| AgentError::PropertyNotFound(property.clone()))?;

        check_vocabulary(attr, &property, &command_type, &value)?;

        // The target's document shows the command as in flight; the
        // device reports the final state back as an Actuators event.
        let mut body = context::online_patch_base();
        body.insert(
            property.clone(),
            context::property_update(attr, Value::String("Processing".to_string())),
        );
        let patch = ContextPatch {
            entity_type: target_type,
            entity_id: target.id.clone(),
            body: Value::Object(body),
        };

        let zone = pipeline::field_opt_str(&data, "Zone").unwrap_or_else(|| target.zone.clone());
        let side_effect = SideEffect {
            topic: topic::command_topic(&target.location, &zone, &target.id),
            payload: data.clone(),
        };

        let mut record = history::record_base(sender);
        record.insert("Use".into(), use_type.into());
        record.insert("From".into(), sender.id.clone().into());
        record.insert("Property".into(), property.clone().into());
        record.insert("Type".into(), command_type.clone().into());
        record.insert("Value".into(), value.clone().into());
        record.insert("Message".into(), message.clone().into());

        let mut confirmation = Map::new();
        confirmation.insert("Property".into(), property.into());
        confirmation.insert("Type".into(), command_type.into());
        confirmation.insert("Value".into(), value.into());
        confirmation.insert("Message".into(), message.into());

        Ok(Projected {
            patch: Some(patch),
            record: Value::Object(record),
            confirmation,
            side_effect: Some(side_effect),
        })
    }
}

/// The property's `metadata.commands.value` maps each command type to
/// the values it accepts. Anything outside that vocabulary rejects
/// before any mutation.
fn check_vocabulary(
    attr: &Value,
    property: &str,
    command_type: &str,
    value: &str,
) -> Result<(), AgentError> {
    let rejected = || AgentError::CommandNotSupported {
        property: property.to_string(),
        command: command_type.to_string(),
        value: value.to_string(),
    };

    let vocabulary = attr
        .get("metadata")
        .and_then(|m| m.get("commands"))
        .and_then(|c| c.get("value"))
        .and_then(Value::as_object)
        .ok_or_else(rejected)?;

    let accepted = vocabulary
        .get(&command_type.to_lowercase())
        .and_then(Value::as_array)
        .ok_or_else(rejected)?;

    let legal = accepted
        .iter()
        .filter_map(Value::as_str)
        .any(|v| v.eq_ignore_ascii_case(value));
    if !legal {
        return Err(rejected());
    }
    Ok(())
}
