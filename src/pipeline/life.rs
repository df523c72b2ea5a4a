use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::context;
use crate::entity::EntityAttrs;
use crate::error::AgentError;
use crate::history;
use crate::pipeline::{self, AgentContext, ContextPatch, Projected, Projection};
use crate::topic::EventKind;

/// Life events report an entity's host resource metrics and position.
/// The numbers arrive as strings from most firmwares and are coerced.
pub struct LifeProjection;

#[async_trait]
impl Projection for LifeProjection {
    fn kind(&self) -> EventKind {
        EventKind::Life
    }

    async fn project(
        &self,
        _ctx: &AgentContext,
        sender: &EntityAttrs,
        payload: &[u8],
    ) -> Result<Projected, AgentError> {
        let data = pipeline::parse_json(payload)?;
        let cpu = pipeline::field_f64(&data, "CPU")?;
        let memory = pipeline::field_f64(&data, "Memory")?;
        let disk = pipeline::field_f64(&data, "Diskspace")?;
        let temperature = pipeline::field_f64(&data, "Temperature")?;
        let latitude = pipeline::field_f64(&data, "Latitude")?;
        let longitude = pipeline::field_f64(&data, "Longitude")?;

        let mut body = context::online_patch_base();
        body.insert("cpuUsage".into(), json!({ "value": cpu }));
        body.insert("memoryUsage".into(), json!({ "value": memory }));
        body.insert("hddUsage".into(), json!({ "value": disk }));
        body.insert("temperature".into(), json!({ "value": temperature }));
        body.insert(
            "location".into(),
            json!({
                "type": "geo:json",
                "value": {
                    "type": "Point",
                    "coordinates": [latitude, longitude]
                }
            }),
        );

        let patch = ContextPatch {
            entity_type: sender.entity_type,
            entity_id: sender.id.clone(),
            body: Value::Object(body),
        };

        let mut record = history::record_base(sender);
        record.insert("Data".into(), data.clone());

        let mut confirmation = Map::new();
        for (field, value) in [
            ("CPU", cpu),
            ("Memory", memory),
            ("Diskspace", disk),
            ("Temperature", temperature),
            ("Latitude", latitude),
            ("Longitude", longitude),
        ] {
            confirmation.insert(field.into(), json!(value.to_string()));
        }

        Ok(Projected {
            patch: Some(patch),
            record: Value::Object(record),
            confirmation,
            side_effect: None,
        })
    }
}
