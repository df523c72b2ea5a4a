use crate::error::AgentError;

#[cfg(test)]
mod tests;

/// Registered participant kinds on the broker.
///
/// Device and Agent appear pluralized in topics ("Devices", "Agents");
/// the remaining types use their canonical name as the topic segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityType {
    Device,
    Agent,
    Application,
    Robotics,
    Staff,
    ContextStore,
    HistoryStore,
    Ledger,
}

impl EntityType {
    /// All types, in one-hot history record field order.
    pub const ALL: [EntityType; 8] = [
        EntityType::Device,
        EntityType::Agent,
        EntityType::Application,
        EntityType::Robotics,
        EntityType::Staff,
        EntityType::ContextStore,
        EntityType::HistoryStore,
        EntityType::Ledger,
    ];

    /// Canonical (singular) type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Device => "Device",
            EntityType::Agent => "Agent",
            EntityType::Application => "Application",
            EntityType::Robotics => "Robotics",
            EntityType::Staff => "Staff",
            EntityType::ContextStore => "ContextStore",
            EntityType::HistoryStore => "HistoryStore",
            EntityType::Ledger => "Ledger",
        }
    }

    /// The segment this type occupies in a broker topic.
    pub fn topic_segment(&self) -> &'static str {
        match self {
            EntityType::Device => "Devices",
            EntityType::Agent => "Agents",
            other => other.as_str(),
        }
    }

    /// Parse a canonical type name (e.g. a payload `Use` field).
    pub fn from_name(name: &str) -> Option<EntityType> {
        EntityType::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    /// Parse the entity-type segment of a topic. Types outside the
    /// canonical set are pluralized on the wire, so the trailing 's'
    /// is stripped before matching.
    pub fn from_topic_segment(segment: &str) -> Option<EntityType> {
        if let Some(t) = EntityType::from_name(segment) {
            if t.topic_segment() == segment {
                return Some(t);
            }
        }
        let singular = segment.strip_suffix('s')?;
        EntityType::from_name(singular).filter(|t| t.topic_segment() == segment)
    }

    /// Application-class types carry no zone segment in topics and no
    /// `networkZone` attribute in the context store.
    pub fn is_zoneless(&self) -> bool {
        matches!(
            self,
            EntityType::Robotics | EntityType::Application | EntityType::Staff
        )
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The broker message categories the agent understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Status,
    Life,
    Sensors,
    Actuators,
    Commands,
    State,
    Classification,
    Bci,
    Notifications,
    /// The agent's own confirmation echo; recognized and ignored.
    Integrity,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Status => "Status",
            EventKind::Life => "Life",
            EventKind::Sensors => "Sensors",
            EventKind::Actuators => "Actuators",
            EventKind::Commands => "Commands",
            EventKind::State => "State",
            EventKind::Classification => "Classification",
            EventKind::Bci => "BCI",
            EventKind::Notifications => "Notifications",
            EventKind::Integrity => "Integrity",
        }
    }

    pub fn from_segment(segment: &str) -> Option<EventKind> {
        let all = [
            EventKind::Status,
            EventKind::Life,
            EventKind::Sensors,
            EventKind::Actuators,
            EventKind::Commands,
            EventKind::State,
            EventKind::Classification,
            EventKind::Bci,
            EventKind::Notifications,
            EventKind::Integrity,
        ];
        all.into_iter().find(|k| k.as_str() == segment)
    }

    /// History store collection this kind appends to.
    pub fn collection(&self) -> &'static str {
        match self {
            EventKind::Status => "Statuses",
            other => other.as_str(),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode a broker topic into the sending entity's type and id.
///
/// Grammar: `<location>/<TypeSegment>/[<zone>/]<entityID>/<EventKind>`.
/// Application-class types omit the zone segment, putting the entity id
/// at position 2 instead of 3. Pure and deterministic; the same topic
/// always decodes to the same pair.
pub fn decode(topic: &str) -> Result<(EntityType, &str), AgentError> {
    let segments: Vec<&str> = topic.split('/').collect();
    if segments.len() < 2 {
        return Err(AgentError::MalformedTopic(topic.to_string()));
    }

    let entity_type = EntityType::from_topic_segment(segments[1])
        .ok_or_else(|| AgentError::MalformedTopic(topic.to_string()))?;

    let id_index = if entity_type.is_zoneless() { 2 } else { 3 };
    // id plus a trailing event-kind segment must both be present
    if segments.len() < id_index + 2 {
        return Err(AgentError::MalformedTopic(topic.to_string()));
    }

    Ok((entity_type, segments[id_index]))
}

/// The event-kind segment a topic is classified by (its final segment).
pub fn kind_segment(topic: &str) -> Option<&str> {
    topic.rsplit('/').next().filter(|s| !s.is_empty())
}

/// This agent's place in the topic hierarchy, fixed at startup.
#[derive(Clone, Debug)]
pub struct AgentIdentity {
    pub location: String,
    pub zone: String,
    pub entity_id: String,
}

impl AgentIdentity {
    fn own_topic(&self, kind: EventKind) -> String {
        format!(
            "{}/Agents/{}/{}/{}",
            self.location,
            self.zone,
            self.entity_id,
            kind.as_str()
        )
    }

    /// Liveness topic; carries the retained ONLINE/OFFLINE status and
    /// the broker last-will.
    pub fn status_topic(&self) -> String {
        self.own_topic(EventKind::Status)
    }

    pub fn life_topic(&self) -> String {
        self.own_topic(EventKind::Life)
    }

    /// Confirmation echoes are published here.
    pub fn integrity_topic(&self) -> String {
        self.own_topic(EventKind::Integrity)
    }

    /// Wildcard subscription covering every entity at this location.
    pub fn subscription(&self) -> String {
        format!("{}/#", self.location)
    }
}

/// Topic a device-directed command instruction is published to.
pub fn command_topic(location: &str, zone: &str, device_id: &str) -> String {
    format!("{location}/Devices/{zone}/{device_id}/Commands")
}

/// Topic a staff/application notification is published to.
pub fn notification_topic(location: &str, recipient: EntityType, recipient_id: &str) -> String {
    if recipient.is_zoneless() {
        format!(
            "{location}/{}/{recipient_id}/Notifications",
            recipient.topic_segment()
        )
    } else {
        format!(
            "{location}/{}/NA/{recipient_id}/Notifications",
            recipient.topic_segment()
        )
    }
}
