//! The wire envelope and command codec (spec.md §4.5.4, §4.5.5).
//!
//! One `#[serde(tag = "cmd", content = "data")]` enum plays the role of
//! the source's four hand-written codec functions per command: the
//! derive *is* `ToCore_Decode`/`ToCore_Encode` for every variant at
//! once. `Response` plays `FromCore_Encode`/`FromCore_Decode`: every
//! handler produces a typed result and `Response::ok`/`Response::err`
//! serializes it into the envelope.

use std::collections::BTreeMap;

use azrael_types::{ConstraintMeta, Fragment, FragmentType, ObjectId, Quaternion, RigidBodyState, Template, Vec3};
use serde::{Deserialize, Serialize};

/// The request envelope: `{cmd: string, data: object}` (spec.md §4.5.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "data", rename_all = "snake_case")]
pub enum Command {
    Ping,
    AddTemplates(AddTemplatesRequest),
    GetTemplates(GetTemplatesRequest),
    GetTemplateId(GetTemplateIdRequest),
    GetAllObjectIds,
    Spawn(SpawnRequest),
    Remove(RemoveRequest),
    GetRigidBodies(ObjectIdsRequest),
    GetObjectStates(ObjectIdsRequest),
    SetRigidBodies(SetRigidBodiesRequest),
    SetFragments(SetFragmentsRequest),
    GetFragments(ObjectIdsRequest),
    SetForce(SetForceRequest),
    ControlParts(ControlPartsRequest),
    UpdateBoosterForces(UpdateBoosterForcesRequest),
    AddConstraints(ConstraintsRequest),
    DeleteConstraints(ConstraintsRequest),
    GetConstraints(GetConstraintsRequest),
    GetCustom(ObjectIdsRequest),
    SetCustom(SetCustomRequest),
}

/// The response envelope: `{ok: bool, msg: string|null, data: any}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    pub msg: Option<String>,
    pub data: serde_json::Value,
}

impl Response {
    pub fn ok(data: impl Serialize) -> Self {
        Response {
            ok: true,
            msg: None,
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn ok_empty() -> Self {
        Response {
            ok: true,
            msg: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Response {
            ok: false,
            msg: Some(msg.into()),
            data: serde_json::Value::Null,
        }
    }

    /// The envelope used for malformed top-level JSON (spec.md §4.5.4).
    pub fn decode_error() -> Self {
        Response::err("JSON decoding error in Clerk")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateInput {
    pub aid: String,
    #[serde(default)]
    pub rbs: RigidBodyState,
    #[serde(default)]
    pub fragments: BTreeMap<String, Fragment>,
    #[serde(default)]
    pub boosters: BTreeMap<String, azrael_types::Booster>,
    #[serde(default)]
    pub factories: BTreeMap<String, azrael_types::Factory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTemplatesRequest {
    pub templates: Vec<TemplateInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTemplatesRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub template: Template,
    pub url_frag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTemplateIdRequest {
    #[serde(rename = "objID")]
    pub obj_id: ObjectId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnItem {
    #[serde(rename = "templateID")]
    pub template_id: String,
    /// A partial rigid-body override, merged onto the template's
    /// `rbs` (spec.md §3) — not a full `RigidBodyState`, since a
    /// client omitting a field means "inherit from the template", not
    /// "reset to that field's type default".
    #[serde(default)]
    pub rbs: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub objects: Vec<SpawnItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnResponse {
    pub created: Vec<ObjectId>,
    pub failed_templates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveRequest {
    #[serde(rename = "objID")]
    pub obj_id: ObjectId,
}

/// Shared by every read command that accepts `None` to mean "all".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectIdsRequest {
    #[serde(rename = "objIDs", default)]
    pub obj_ids: Option<Vec<ObjectId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStateView {
    pub rbs: RigidBodyState,
    pub frag: BTreeMap<String, azrael_types::FragmentMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRigidBodiesRequest {
    pub updates: BTreeMap<ObjectId, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRigidBodiesResponse {
    pub failed: Vec<ObjectId>,
}

/// A `set_fragments` patch (spec.md §4.5.1): which variant it is
/// depends on which fields are present, not a discriminant tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FragmentPatch {
    #[serde(default)]
    pub fragtype: Option<FragmentType>,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub rotation: Option<Quaternion>,
    #[serde(default)]
    pub fragdata: Option<azrael_types::FragmentData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetFragmentsRequest {
    pub updates: BTreeMap<ObjectId, BTreeMap<String, FragmentPatch>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetFragmentsResponse {
    pub failed: Vec<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentSummary {
    pub fragtype: FragmentType,
    pub url_frag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetForceRequest {
    #[serde(rename = "objID")]
    pub obj_id: ObjectId,
    pub force: Vec3,
    #[serde(rename = "relPos")]
    pub rel_pos: Vec3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoosterCommand {
    pub force: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryCommand {
    pub exit_speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPartsRequest {
    #[serde(rename = "objID")]
    pub obj_id: ObjectId,
    #[serde(default)]
    pub cmd_boosters: BTreeMap<String, BoosterCommand>,
    #[serde(default)]
    pub cmd_factories: BTreeMap<String, FactoryCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPartsResponse {
    pub spawned: Vec<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBoosterForcesRequest {
    #[serde(rename = "objID")]
    pub obj_id: ObjectId,
    pub booster_id: String,
    pub force: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceTorque {
    pub force: Vec3,
    pub torque: Vec3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintsRequest {
    pub constraints: Vec<ConstraintMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetConstraintsRequest {
    #[serde(rename = "bodyIDs", default)]
    pub body_ids: Option<Vec<ObjectId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCustomRequest {
    pub values: BTreeMap<ObjectId, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCustomResponse {
    pub failed: Vec<ObjectId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_round_trips_through_json() {
        let cmd = Command::Spawn(SpawnRequest {
            objects: vec![SpawnItem {
                template_id: "_templateSphere".into(),
                rbs: None,
            }],
        });
        let json = serde_json::to_string(&cmd).unwrap();
        let decoded: Command = serde_json::from_str(&json).unwrap();
        match decoded {
            Command::Spawn(req) => assert_eq!(req.objects[0].template_id, "_templateSphere"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn ping_has_no_data_payload() {
        let json = serde_json::to_string(&Command::Ping).unwrap();
        assert_eq!(json, r#"{"cmd":"ping"}"#);
    }

    #[test]
    fn integer_object_ids_survive_as_map_keys() {
        let mut updates = BTreeMap::new();
        updates.insert(ObjectId::new(42), "hello".to_string());
        let req = SetCustomRequest { values: updates };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json["values"].as_object().unwrap().contains_key("42"));
        let back: SetCustomRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back.values[&ObjectId::new(42)], "hello");
    }

    #[test]
    fn response_ok_wraps_data_and_clears_msg() {
        let resp = Response::ok(42u32);
        assert!(resp.ok);
        assert!(resp.msg.is_none());
        assert_eq!(resp.data, serde_json::json!(42));
    }

    #[test]
    fn response_err_carries_message_and_null_data() {
        let resp = Response::err("boom");
        assert!(!resp.ok);
        assert_eq!(resp.msg.unwrap(), "boom");
        assert_eq!(resp.data, serde_json::Value::Null);
    }
}
