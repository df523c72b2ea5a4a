use super::*;
use crate::entity::EntityAttrs;
use crate::topic::EntityType;

fn device_attrs() -> EntityAttrs {
    EntityAttrs {
        id: "dev42".into(),
        entity_type: EntityType::Device,
        authorized_address: "0xabc".into(),
        location: "site1".into(),
        zone: "zoneA".into(),
    }
}

#[test]
fn record_base_one_hot_fields() {
    let record = record_base(&device_attrs());

    assert_eq!(record["Use"], "Device");
    assert_eq!(record["Location"], "site1");
    assert_eq!(record["Zone"], "zoneA");
    assert_eq!(record["Device"], "dev42");
    // every other entity-type field carries the sentinel
    assert_eq!(record["Agent"], "NA");
    assert_eq!(record["Application"], "NA");
    assert_eq!(record["Staff"], "NA");
    assert_eq!(record["Robotics"], "NA");
    assert_eq!(record["ContextStore"], "NA");
    assert_eq!(record["HistoryStore"], "NA");
    assert_eq!(record["Ledger"], "NA");
}

#[test]
fn record_base_time_format() {
    let record = record_base(&device_attrs());
    let time = record["Time"].as_str().unwrap();
    // YYYY-MM-DD HH:MM:SS
    assert_eq!(time.len(), 19);
    assert_eq!(&time[4..5], "-");
    assert_eq!(&time[10..11], " ");
    assert_eq!(&time[13..14], ":");
}
