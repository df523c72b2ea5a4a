use thiserror::Error;

/// Errors raised while processing a single inbound event.
///
/// Every variant is terminal for the event that raised it: the dispatcher
/// logs the entity and the step that failed, then drops the event. Nothing
/// is surfaced back to the broker and nothing is retried.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("malformed topic '{0}'")]
    MalformedTopic(String),

    #[error("{entity_type} '{entity_id}' not found in context store")]
    EntityNotFound {
        entity_type: String,
        entity_id: String,
    },

    /// Fail-closed authorization result. Always a silent abort: the
    /// dispatcher logs it at `warn` and never treats it as a fault.
    #[error("access denied for address '{0}'")]
    AccessDenied(String),

    #[error("property '{0}' not found on entity document")]
    PropertyNotFound(String),

    #[error("command '{command}'='{value}' not in the vocabulary of property '{property}'")]
    CommandNotSupported {
        property: String,
        command: String,
        value: String,
    },

    #[error("model '{0}' not found on entity document")]
    ModelNotFound(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{service} request failed: {reason}")]
    Upstream {
        service: &'static str,
        reason: String,
    },
}

impl AgentError {
    pub fn upstream(service: &'static str, reason: impl std::fmt::Display) -> Self {
        AgentError::Upstream {
            service,
            reason: reason.to_string(),
        }
    }

    pub fn invalid_payload(reason: impl std::fmt::Display) -> Self {
        AgentError::InvalidPayload(reason.to_string())
    }
}
