use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::broker::Publisher;
use crate::context::ContextClient;
use crate::entity::{EntityAttrs, EntityResolver};
use crate::error::AgentError;
use crate::history::HistoryClient;
use crate::ledger::AccessGate;
use crate::topic::{self, AgentIdentity, EntityType, EventKind};

mod actuators;
mod bci;
mod classification;
mod commands;
mod life;
mod notifications;
mod property;
mod sensors;
mod state;
mod status;

pub use actuators::ActuatorsProjection;
pub use bci::BciProjection;
pub use classification::ClassificationProjection;
pub use commands::CommandsProjection;
pub use life::LifeProjection;
pub use notifications::NotificationsProjection;
pub use sensors::SensorsProjection;
pub use state::StateProjection;
pub use status::StatusProjection;

/// The long-lived collaborators every handler works against, built once
/// at startup and shared by reference.
pub struct AgentContext {
    pub identity: AgentIdentity,
    pub context: ContextClient,
    pub history: HistoryClient,
    pub gate: AccessGate,
    pub publisher: Arc<dyn Publisher>,
}

/// One inbound event as delivered by the broker (or, for the Rules
/// path, by the HTTP boundary with no topic).
pub struct InboundEvent<'a> {
    pub kind: EventKind,
    pub topic: Option<&'a str>,
    pub payload: &'a [u8],
}

/// A context-store partial update and the entity it applies to. The
/// target is the sender for most kinds; Commands patch the command's
/// target device instead.
pub struct ContextPatch {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub body: Value,
}

/// Everything a kind strategy derives from one event: the dual-write
/// payloads, the confirmation fields, and an optional broker
/// side-effect (Commands, Notifications).
pub struct Projected {
    pub patch: Option<ContextPatch>,
    pub record: Value,
    pub confirmation: Map<String, Value>,
    pub side_effect: Option<SideEffect>,
}

pub struct SideEffect {
    pub topic: String,
    pub payload: Value,
}

/// Per-event-kind projection strategy.
///
/// One implementation per event kind; the generic [`handle_event`]
/// protocol drives them all.
#[async_trait]
pub trait Projection: Send + Sync {
    fn kind(&self) -> EventKind;

    /// Identify the sending entity. The default decodes the topic;
    /// kinds that can arrive without one (Notifications, and Commands
    /// through the Rules path) read the payload instead.
    fn sender(&self, event: &InboundEvent<'_>) -> Result<(EntityType, String), AgentError> {
        let topic = event
            .topic
            .ok_or_else(|| AgentError::MalformedTopic("<direct>".to_string()))?;
        topic::decode(topic).map(|(entity_type, id)| (entity_type, id.to_string()))
    }

    /// Build the stores' view of the event. Runs only after the sender
    /// has been resolved and has passed the access gate; all kind
    /// validation (property lookups, command vocabulary, model names)
    /// rejects here, before any mutation.
    async fn project(
        &self,
        ctx: &AgentContext,
        sender: &EntityAttrs,
        payload: &[u8],
    ) -> Result<Projected, AgentError>;
}

/// The seven-step protocol shared by all event kinds:
/// decode → resolve → gate → project → mutate → append → echo.
///
/// The two writes are deliberately not transactional: a history failure
/// after a successful context mutation leaves the mutation in place and
/// only suppresses the confirmation (at-most-once context, best-effort
/// history).
pub async fn handle_event(
    ctx: &AgentContext,
    strategy: &dyn Projection,
    event: InboundEvent<'_>,
) -> Result<(), AgentError> {
    let (sender_type, sender_id) = strategy.sender(&event)?;
    info!(kind = %event.kind, entity_type = %sender_type, entity = %sender_id, "Received event");

    let resolver = EntityResolver::new(&ctx.context);
    let sender = resolver.resolve(sender_type, &sender_id).await?;

    if !ctx.gate.authorize(&sender.authorized_address).await {
        return Err(AgentError::AccessDenied(sender.authorized_address));
    }

    let projected = strategy.project(ctx, &sender, event.payload).await?;

    if let Some(patch) = &projected.patch {
        ctx.context
            .update_entity(&patch.entity_id, patch.entity_type, &patch.body)
            .await?;
    }

    // Side-effects ride on the context mutation, not on the history
    // append: they go out before the record is written and regardless
    // of whether it succeeds.
    if let Some(side_effect) = &projected.side_effect {
        if let Err(e) = ctx
            .publisher
            .publish_json(&side_effect.topic, &side_effect.payload)
            .await
        {
            warn!(topic = %side_effect.topic, error = %e, "Side-effect publish failed");
        }
    }

    let record_id = ctx
        .history
        .insert(event.kind.collection(), &projected.record)
        .await?;

    let mut confirmation = projected.confirmation;
    confirmation.insert("_id".into(), json!(record_id));
    ctx.publisher
        .publish_json(
            &ctx.identity.integrity_topic(),
            &Value::Object(confirmation),
        )
        .await?;

    info!(
        kind = %event.kind,
        entity_type = %sender.entity_type,
        entity = %sender.id,
        record = %record_id,
        "Event processed"
    );
    Ok(())
}

// ── Payload helpers shared by the kind strategies ────────────────────────────

pub(crate) fn parse_json(payload: &[u8]) -> Result<Value, AgentError> {
    serde_json::from_slice(payload).map_err(AgentError::invalid_payload)
}

pub(crate) fn field_str(payload: &Value, name: &str) -> Result<String, AgentError> {
    payload
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AgentError::InvalidPayload(format!("missing field '{name}'")))
}

pub(crate) fn field_opt_str(payload: &Value, name: &str) -> Option<String> {
    payload.get(name).and_then(Value::as_str).map(str::to_string)
}

/// Numeric field that tolerates stringly numbers ("36.6").
pub(crate) fn field_f64(payload: &Value, name: &str) -> Result<f64, AgentError> {
    let value = payload
        .get(name)
        .ok_or_else(|| AgentError::InvalidPayload(format!("missing field '{name}'")))?;
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| AgentError::InvalidPayload(format!("field '{name}' is not finite"))),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| AgentError::InvalidPayload(format!("field '{name}' is not numeric"))),
        _ => Err(AgentError::InvalidPayload(format!(
            "field '{name}' is not numeric"
        ))),
    }
}
