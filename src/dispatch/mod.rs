use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::AgentError;
use crate::pipeline::{
    self, ActuatorsProjection, AgentContext, BciProjection, ClassificationProjection,
    CommandsProjection, InboundEvent, LifeProjection, NotificationsProjection, Projection,
    SensorsProjection, StateProjection, StatusProjection,
};
use crate::topic::{self, EventKind};

/// Routes inbound broker messages to the handler for their event kind.
///
/// The kind-to-handler table is built once at startup and never mutated
/// afterwards; an event kind with no binding is logged and dropped
/// without surfacing anything to the broker.
pub struct Dispatcher {
    ctx: Arc<AgentContext>,
    handlers: HashMap<EventKind, Arc<dyn Projection>>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        let strategies: Vec<Arc<dyn Projection>> = vec![
            Arc::new(StatusProjection),
            Arc::new(LifeProjection),
            Arc::new(SensorsProjection),
            Arc::new(ActuatorsProjection),
            Arc::new(CommandsProjection),
            Arc::new(StateProjection),
            Arc::new(ClassificationProjection),
            Arc::new(BciProjection),
            Arc::new(NotificationsProjection),
        ];
        let handlers = strategies
            .into_iter()
            .map(|s| (s.kind(), s))
            .collect();
        Self { ctx, handlers }
    }

    /// Broker entry point: classify by the final topic segment and run
    /// the pipeline. All failures are handled here; nothing propagates
    /// to the receive loop.
    pub async fn dispatch(&self, message_topic: &str, payload: &[u8]) {
        let Some(segment) = topic::kind_segment(message_topic) else {
            debug!(topic = %message_topic, "Message without a kind segment; dropping");
            return;
        };
        let Some(kind) = EventKind::from_segment(segment) else {
            debug!(topic = %message_topic, segment, "Unrecognized event kind; dropping");
            return;
        };
        if kind == EventKind::Integrity {
            // our own confirmation echoes come back on the wildcard
            debug!(topic = %message_topic, "Ignoring integrity echo");
            return;
        }
        let Some(handler) = self.handlers.get(&kind) else {
            debug!(topic = %message_topic, kind = %kind, "No handler bound; dropping");
            return;
        };

        let event = InboundEvent {
            kind,
            topic: Some(message_topic),
            payload,
        };
        if let Err(e) = pipeline::handle_event(&self.ctx, handler.as_ref(), event).await {
            log_failure(kind, message_topic, &e);
        }
    }

    /// HTTP-originated path (Rules): same pipeline contract, payload
    /// supplied directly with no topic to decode.
    pub async fn dispatch_direct(&self, kind: EventKind, payload: &[u8]) {
        let Some(handler) = self.handlers.get(&kind) else {
            debug!(kind = %kind, "No handler bound; dropping");
            return;
        };
        let event = InboundEvent {
            kind,
            topic: None,
            payload,
        };
        if let Err(e) = pipeline::handle_event(&self.ctx, handler.as_ref(), event).await {
            log_failure(kind, "<direct>", &e);
        }
    }
}

fn log_failure(kind: EventKind, message_topic: &str, error: &AgentError) {
    match error {
        // fail-closed denial: expected operational condition, not a fault
        AgentError::AccessDenied(_) => {
            warn!(kind = %kind, topic = %message_topic, %error, "Event dropped")
        }
        _ => error!(kind = %kind, topic = %message_topic, %error, "Event failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Publisher;
    use crate::config::{OracleConfig, StoreConfig};
    use crate::context::ContextClient;
    use crate::history::HistoryClient;
    use crate::ledger::AccessGate;
    use crate::topic::AgentIdentity;
    use async_trait::async_trait;
    use serde_json::Value;

    struct NullPublisher;

    #[async_trait]
    impl Publisher for NullPublisher {
        async fn publish_json(&self, _: &str, _: &Value) -> Result<(), AgentError> {
            Ok(())
        }
        async fn publish_text(&self, _: &str, _: &str, _: bool) -> Result<(), AgentError> {
            Ok(())
        }
    }

    fn test_dispatcher() -> Dispatcher {
        let store = StoreConfig {
            base_url: "http://localhost:1".into(),
            username: "u".into(),
            password: "p".into(),
        };
        let oracle = OracleConfig {
            base_url: "http://localhost:1".into(),
            username: "u".into(),
            password: "p".into(),
            service_address: "0x0".into(),
        };
        let ctx = Arc::new(AgentContext {
            identity: AgentIdentity {
                location: "site1".into(),
                zone: "zoneA".into(),
                entity_id: "agent1".into(),
            },
            context: ContextClient::new(&store),
            history: HistoryClient::new(&store),
            gate: AccessGate::new(&oracle),
            publisher: Arc::new(NullPublisher),
        });
        Dispatcher::new(ctx)
    }

    #[test]
    fn all_nine_kinds_have_a_binding() {
        let dispatcher = test_dispatcher();
        assert_eq!(dispatcher.handlers.len(), 9);
        for (kind, handler) in &dispatcher.handlers {
            assert_eq!(*kind, handler.kind());
        }
        // Integrity is recognized but deliberately unbound
        assert!(!dispatcher.handlers.contains_key(&EventKind::Integrity));
    }
}
