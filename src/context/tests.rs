use super::*;

#[test]
fn status_patch_carries_status_and_timestamps() {
    let patch = status_patch("OFFLINE");
    assert_eq!(patch["networkStatus"]["value"], "OFFLINE");
    assert!(patch["dateModified"]["value"].is_string());
    assert!(patch["networkStatus.metadata"]["timestamp"]["value"].is_string());
}

#[test]
fn online_patch_base_marks_entity_online() {
    let patch = online_patch_base();
    assert_eq!(patch["networkStatus"]["value"], "ONLINE");
    assert!(patch.contains_key("dateModified"));
}

#[test]
fn property_update_preserves_metadata() {
    let existing = serde_json::json!({
        "type": "Float",
        "value": "20.1",
        "metadata": {
            "property": { "value": "temperature" },
            "description": { "value": "ambient temperature" },
            "timestamp": { "value": "2020-01-01T00:00:00Z" }
        }
    });

    let updated = property_update(&existing, serde_json::json!("36.6"));

    assert_eq!(updated["value"], "36.6");
    assert_eq!(updated["type"], "Float");
    assert_eq!(updated["metadata"]["property"]["value"], "temperature");
    assert_eq!(
        updated["metadata"]["description"]["value"],
        "ambient temperature"
    );
    // only the timestamp moves
    assert_ne!(
        updated["metadata"]["timestamp"]["value"],
        "2020-01-01T00:00:00Z"
    );
}

#[test]
fn property_update_tolerates_missing_metadata() {
    let existing = serde_json::json!({ "value": 1 });
    let updated = property_update(&existing, serde_json::json!(2));
    assert_eq!(updated["value"], 2);
    assert!(updated["metadata"]["timestamp"]["value"].is_string());
}
