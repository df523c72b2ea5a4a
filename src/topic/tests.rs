use super::*;

#[test]
fn decode_zoned_topic() {
    let (entity_type, id) = decode("site1/Devices/zoneA/dev42/Sensors").unwrap();
    assert_eq!(entity_type, EntityType::Device);
    assert_eq!(id, "dev42");
}

#[test]
fn decode_zoneless_topic() {
    let (entity_type, id) = decode("site1/Application/app7/Status").unwrap();
    assert_eq!(entity_type, EntityType::Application);
    assert_eq!(id, "app7");
}

/// Every well-formed topic round-trips back to the (type, id) pair it
/// was built from.
#[test]
fn decode_round_trips_all_types() {
    for entity_type in EntityType::ALL {
        let topic = if entity_type.is_zoneless() {
            format!("site1/{}/e99/Life", entity_type.topic_segment())
        } else {
            format!("site1/{}/zoneB/e99/Life", entity_type.topic_segment())
        };
        let (decoded_type, decoded_id) = decode(&topic).unwrap();
        assert_eq!(decoded_type, entity_type, "topic {topic}");
        assert_eq!(decoded_id, "e99", "topic {topic}");
    }
}

/// Zoneless types take the id from segment 2, all others from segment 3.
#[test]
fn id_position_depends_on_zone() {
    let (_, id) = decode("loc/Staff/nurse1/Notifications").unwrap();
    assert_eq!(id, "nurse1");
    let (_, id) = decode("loc/Agents/z/agent1/Status").unwrap();
    assert_eq!(id, "agent1");
    let (_, id) = decode("loc/Ledger/z/chain1/Status").unwrap();
    assert_eq!(id, "chain1");
}

#[test]
fn decode_rejects_short_topics() {
    assert!(matches!(
        decode("site1"),
        Err(AgentError::MalformedTopic(_))
    ));
    assert!(matches!(
        decode("site1/Devices/zoneA"),
        Err(AgentError::MalformedTopic(_))
    ));
    // zoned type with only three trailing segments
    assert!(matches!(
        decode("site1/Devices/zoneA/dev42"),
        Err(AgentError::MalformedTopic(_))
    ));
}

#[test]
fn decode_rejects_unknown_type_segment() {
    assert!(matches!(
        decode("site1/Gadgets/zoneA/g1/Status"),
        Err(AgentError::MalformedTopic(_))
    ));
}

#[test]
fn type_segment_parsing() {
    assert_eq!(
        EntityType::from_topic_segment("Devices"),
        Some(EntityType::Device)
    );
    assert_eq!(
        EntityType::from_topic_segment("Agents"),
        Some(EntityType::Agent)
    );
    assert_eq!(
        EntityType::from_topic_segment("Robotics"),
        Some(EntityType::Robotics)
    );
    assert_eq!(
        EntityType::from_topic_segment("ContextStore"),
        Some(EntityType::ContextStore)
    );
    // singular forms are not valid topic segments for pluralized types
    assert_eq!(EntityType::from_topic_segment("Device"), None);
    assert_eq!(EntityType::from_topic_segment("Applications"), None);
}

#[test]
fn kind_segment_is_final_segment() {
    assert_eq!(
        kind_segment("site1/Devices/zoneA/dev42/Sensors"),
        Some("Sensors")
    );
    assert_eq!(kind_segment("site1/Staff/s1/Status"), Some("Status"));
    assert_eq!(kind_segment(""), None);
}

#[test]
fn event_kind_vocabulary() {
    assert_eq!(EventKind::from_segment("BCI"), Some(EventKind::Bci));
    assert_eq!(EventKind::from_segment("Sensors"), Some(EventKind::Sensors));
    assert_eq!(EventKind::from_segment("Zone"), None);
    assert_eq!(EventKind::Status.collection(), "Statuses");
    assert_eq!(EventKind::Bci.collection(), "BCI");
    assert_eq!(EventKind::Commands.collection(), "Commands");
}

#[test]
fn identity_topics() {
    let identity = AgentIdentity {
        location: "site1".into(),
        zone: "zoneA".into(),
        entity_id: "agent1".into(),
    };
    assert_eq!(identity.status_topic(), "site1/Agents/zoneA/agent1/Status");
    assert_eq!(
        identity.integrity_topic(),
        "site1/Agents/zoneA/agent1/Integrity"
    );
    assert_eq!(identity.subscription(), "site1/#");
    assert_eq!(
        command_topic("site1", "zoneA", "dev42"),
        "site1/Devices/zoneA/dev42/Commands"
    );
    assert_eq!(
        notification_topic("site1", EntityType::Staff, "nurse1"),
        "site1/Staff/nurse1/Notifications"
    );
}
