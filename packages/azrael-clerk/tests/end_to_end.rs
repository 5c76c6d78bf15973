//! End-to-end scenarios exercising `Store`, `Igor`, `Dibbler`, and
//! `Clerk` wired together as `apps/azrael-server` wires them. Unit
//! tests inside each collaborator cover its own contract in
//! isolation; these scenarios catch anything that only shows up when
//! all five pieces share one request.

use std::collections::BTreeMap;
use std::sync::Arc;

use azrael_clerk::{Clerk, ClerkConfig, InMemoryPhysicsQueue, PhysicsCommand};
use azrael_dibbler::Dibbler;
use azrael_igor::Igor;
use azrael_protocol::{
    AddTemplatesRequest, Command, ConstraintsRequest, ControlPartsRequest, FactoryCommand, FragmentPatch,
    GetConstraintsRequest, GetTemplatesRequest, ObjectIdsRequest, SetForceRequest,
    SetFragmentsRequest, SpawnItem, SpawnRequest, SpawnResponse, TemplateInput, TemplateRecord,
};
use azrael_store::{Store, StoreConfig};
use azrael_types::{ConstraintMeta, ConstraintType, Factory, ExitSpeedRange, ObjectId, Quaternion, RigidBodyState, Vec3};

fn new_clerk() -> (Clerk, Arc<InMemoryPhysicsQueue>) {
    let store = Arc::new(Store::new(StoreConfig::default()));
    let igor = Arc::new(Igor::new());
    let dibbler = Arc::new(Dibbler::new());
    let queue = Arc::new(InMemoryPhysicsQueue::new());
    let clerk = Clerk::new(store, igor, dibbler, queue.clone(), ClerkConfig::default());
    (clerk, queue)
}

fn spawn_one(clerk: &Clerk, template_id: &str, rbs: Option<serde_json::Value>) -> ObjectId {
    let resp = clerk.dispatch(Command::Spawn(SpawnRequest {
        objects: vec![SpawnItem {
            template_id: template_id.to_string(),
            rbs,
        }],
    }));
    assert!(resp.ok);
    let spawned: SpawnResponse = serde_json::from_value(resp.data).unwrap();
    spawned.created[0]
}

#[test]
fn default_templates_present() {
    let (clerk, _queue) = new_clerk();
    let resp = clerk.dispatch(Command::GetTemplates(GetTemplatesRequest {
        names: vec![
            "_templateEmpty".to_string(),
            "_templateSphere".to_string(),
            "_templateBox".to_string(),
            "_templatePlane".to_string(),
        ],
    }));
    assert!(resp.ok);
    let records: BTreeMap<String, TemplateRecord> = serde_json::from_value(resp.data).unwrap();
    assert_eq!(records.len(), 4);

    let sphere = &records["_templateSphere"];
    assert!(sphere.template.rbs.cshapes.contains_key("csphere"));
    let cube = &records["_templateBox"];
    assert!(cube.template.rbs.cshapes.contains_key("cbox"));
    let plane = &records["_templatePlane"];
    assert!(plane.template.rbs.cshapes.contains_key("cplane"));
    assert!(plane.template.fragments.contains_key("frag_1"));
}

#[test]
fn spawn_and_move() {
    let (clerk, queue) = new_clerk();
    let obj_id = spawn_one(&clerk, "_templateSphere", Some(serde_json::json!({ "imass": 1.0 })));

    let resp = clerk.dispatch(Command::GetRigidBodies(ObjectIdsRequest {
        obj_ids: Some(vec![obj_id]),
    }));
    let states: BTreeMap<ObjectId, Option<RigidBodyState>> = serde_json::from_value(resp.data).unwrap();
    let rbs = states.get(&obj_id).unwrap().clone().unwrap();
    assert_eq!(rbs.position, Vec3::ZERO);

    let force = Vec3::new(1.0, 2.0, 3.0);
    let rel_pos = Vec3::new(4.0, 5.0, 6.0);
    let resp = clerk.dispatch(Command::SetForce(SetForceRequest {
        obj_id,
        force,
        rel_pos,
    }));
    assert!(resp.ok);

    let queued = queue.snapshot();
    let command = queued
        .iter()
        .find(|c| matches!(c, PhysicsCommand::SetForce { .. }))
        .unwrap();
    match command {
        PhysicsCommand::SetForce { force: f, rel_pos: r, .. } => {
            let torque = r.cross(*f);
            assert_eq!(torque, rel_pos.cross(force));
        }
        _ => unreachable!(),
    }
}

#[test]
fn spawn_partial_rbs_override_preserves_template_collision_shape() {
    let (clerk, _queue) = new_clerk();
    // `_templateSphere` carries a collision shape; overriding only
    // `imass` must not wipe it back to the template's defaults.
    let obj_id = spawn_one(&clerk, "_templateSphere", Some(serde_json::json!({ "imass": 2.0 })));

    let resp = clerk.dispatch(Command::GetRigidBodies(ObjectIdsRequest {
        obj_ids: Some(vec![obj_id]),
    }));
    let states: BTreeMap<ObjectId, Option<RigidBodyState>> = serde_json::from_value(resp.data).unwrap();
    let rbs = states.get(&obj_id).unwrap().clone().unwrap();
    assert_eq!(rbs.imass, 2.0);
    assert!(rbs.cshapes.contains_key("csphere"), "unrelated template fields must survive a partial override");
}

#[test]
fn factory_spawn_inherits_parent_pose() {
    let (clerk, queue) = new_clerk();

    let mut factories = BTreeMap::new();
    factories.insert(
        "launcher".to_string(),
        Factory {
            pos: Vec3::new(0.0, 0.0, 3.0),
            direction: Vec3::new(0.0, 0.0, 2.0),
            template_id: "_templateEmpty".to_string(),
            exit_speed: ExitSpeedRange { min: 0.0, max: 1.0 },
        },
    );
    clerk.dispatch(Command::AddTemplates(AddTemplatesRequest {
        templates: vec![TemplateInput {
            aid: "launcher_ship".to_string(),
            factories,
            ..Default::default()
        }],
    }));

    // The wire's scalar-last [x,y,z,w]: [1,0,0,0] is 180 degrees about X
    // (spec.md §8 scenario 3). Decoded from JSON, not built in Rust field
    // order, so this actually exercises the wire (de)serializer.
    let parent_rotation: Quaternion = serde_json::from_value(serde_json::json!([1.0, 0.0, 0.0, 0.0])).unwrap();
    let parent = spawn_one(
        &clerk,
        "launcher_ship",
        Some(serde_json::json!({
            "position": serde_json::to_value(Vec3::new(1.0, 2.0, 3.0)).unwrap(),
            "velocityLin": serde_json::to_value(Vec3::new(4.0, 5.0, 6.0)).unwrap(),
            "rotation": serde_json::to_value(parent_rotation).unwrap(),
        })),
    );

    let mut cmd_factories = BTreeMap::new();
    cmd_factories.insert("launcher".to_string(), FactoryCommand { exit_speed: 0.2 });
    let resp = clerk.dispatch(Command::ControlParts(ControlPartsRequest {
        obj_id: parent,
        cmd_boosters: BTreeMap::new(),
        cmd_factories,
    }));
    assert!(resp.ok);

    let spawn_bodies: Vec<_> = queue
        .snapshot()
        .into_iter()
        .filter(|c| matches!(c, PhysicsCommand::SpawnBody { obj_id, .. } if *obj_id != parent))
        .collect();
    assert_eq!(spawn_bodies.len(), 1);
    match &spawn_bodies[0] {
        PhysicsCommand::SpawnBody { rbs, .. } => {
            assert!((rbs.position.x - 1.0).abs() < 1e-9);
            assert!((rbs.position.y - 2.0).abs() < 1e-9);
            assert!(rbs.position.z.abs() < 1e-9);
            assert!((rbs.velocity_lin.x - 4.0).abs() < 1e-9);
            assert!((rbs.velocity_lin.y - 5.0).abs() < 1e-9);
            assert!((rbs.velocity_lin.z - 5.8).abs() < 1e-9);
        }
        _ => unreachable!(),
    }
}

#[test]
fn fragment_version_bumps_only_on_data_or_tombstone_edits() {
    let (clerk, _queue) = new_clerk();
    let obj_id = spawn_one(&clerk, "_templateSphere", None);

    let resp = clerk.dispatch(Command::GetRigidBodies(ObjectIdsRequest {
        obj_ids: Some(vec![obj_id]),
    }));
    let states: BTreeMap<ObjectId, Option<RigidBodyState>> = serde_json::from_value(resp.data).unwrap();
    let v0 = states.get(&obj_id).unwrap().clone().unwrap().version;

    let mut pose_only = BTreeMap::new();
    pose_only.insert(
        "frag_1".to_string(),
        FragmentPatch {
            scale: Some(10.0),
            ..Default::default()
        },
    );
    let mut updates = BTreeMap::new();
    updates.insert(obj_id, pose_only);
    let resp = clerk.dispatch(Command::SetFragments(SetFragmentsRequest { updates }));
    assert!(resp.ok);

    let resp = clerk.dispatch(Command::GetRigidBodies(ObjectIdsRequest {
        obj_ids: Some(vec![obj_id]),
    }));
    let states: BTreeMap<ObjectId, Option<RigidBodyState>> = serde_json::from_value(resp.data).unwrap();
    let v1 = states.get(&obj_id).unwrap().clone().unwrap().version;
    assert_eq!(v1, v0, "pose-only edit must not bump version");

    let mut data_replace = BTreeMap::new();
    data_replace.insert(
        "frag_1".to_string(),
        FragmentPatch {
            fragdata: Some(azrael_types::FragmentData::single("model.raw", vec![9, 9])),
            ..Default::default()
        },
    );
    let mut updates = BTreeMap::new();
    updates.insert(obj_id, data_replace);
    let resp = clerk.dispatch(Command::SetFragments(SetFragmentsRequest { updates }));
    assert!(resp.ok);

    let resp = clerk.dispatch(Command::GetRigidBodies(ObjectIdsRequest {
        obj_ids: Some(vec![obj_id]),
    }));
    let states: BTreeMap<ObjectId, Option<RigidBodyState>> = serde_json::from_value(resp.data).unwrap();
    let v2 = states.get(&obj_id).unwrap().clone().unwrap().version;
    assert!(v2 > v0, "fragdata replacement must bump version");
}

#[test]
fn constraint_link_is_queryable_by_either_body() {
    let (clerk, _queue) = new_clerk();
    let left = spawn_one(
        &clerk,
        "_templateSphere",
        Some(serde_json::json!({ "position": {"x": -2.0, "y": 0.0, "z": 0.0}, "imass": 1.0 })),
    );
    let right = spawn_one(
        &clerk,
        "_templateSphere",
        Some(serde_json::json!({ "position": {"x": 2.0, "y": 0.0, "z": 0.0}, "imass": 1.0 })),
    );

    let constraint = ConstraintMeta::new(
        "link".to_string(),
        ConstraintType::P2P,
        left,
        right,
        serde_json::json!({}),
    );
    let resp = clerk.dispatch(Command::AddConstraints(ConstraintsRequest {
        constraints: vec![constraint],
    }));
    assert!(resp.ok);

    let resp = clerk.dispatch(Command::GetConstraints(GetConstraintsRequest {
        body_ids: Some(vec![left]),
    }));
    let found: Vec<ConstraintMeta> = serde_json::from_value(resp.data).unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].touches(left));
    assert!(found[0].touches(right));

    let resp = clerk.dispatch(Command::GetConstraints(GetConstraintsRequest {
        body_ids: Some(vec![right]),
    }));
    let found: Vec<ConstraintMeta> = serde_json::from_value(resp.data).unwrap();
    assert_eq!(found.len(), 1);

    let force_on_left = Vec3::new(-10.0, 0.0, 0.0);
    let resp = clerk.dispatch(Command::SetForce(SetForceRequest {
        obj_id: left,
        force: force_on_left,
        rel_pos: Vec3::ZERO,
    }));
    assert!(resp.ok);
}

#[test]
fn add_constraints_canonicalizes_body_order_from_raw_json() {
    let (clerk, _queue) = new_clerk();
    let left = spawn_one(&clerk, "_templateSphere", None);
    let right = spawn_one(&clerk, "_templateSphere", None);
    // `left` was allocated first, so `left < right`; submit the pair
    // the wrong way around, as raw JSON, to exercise the same decode
    // path a real client's socket frame would go through.
    assert!(left < right);

    let command_json = serde_json::json!({
        "cmd": "add_constraints",
        "data": {
            "constraints": [{
                "aid": "link",
                "conType": "P2P",
                "rb_a": right,
                "rb_b": left,
                "condata": {},
            }],
        },
    });
    let command: Command = serde_json::from_value(command_json).unwrap();
    let resp = clerk.dispatch(command);
    assert!(resp.ok);

    let resp = clerk.dispatch(Command::GetConstraints(GetConstraintsRequest {
        body_ids: Some(vec![left]),
    }));
    let found: Vec<ConstraintMeta> = serde_json::from_value(resp.data).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].rb_a, left, "canonicalized rb_a must be the smaller id");
    assert_eq!(found[0].rb_b, right);
}

#[test]
fn asset_spawn_failure_leaves_document_store_consistent() {
    // Pre-occupy the asset path the fresh id allocator's very first
    // allocation will resolve to, so `Dibbler::spawn_template` fails
    // the same way it would if an asset-store write genuinely raced
    // with another writer. No mocking: a real `AlreadyExists`.
    let store = Arc::new(Store::new(StoreConfig::default()));
    let igor = Arc::new(Igor::new());
    let dibbler = Arc::new(Dibbler::new());
    let mut decoy_fragments = BTreeMap::new();
    decoy_fragments.insert(
        "frag_1".to_string(),
        azrael_types::Fragment::raw(azrael_types::FragmentData::single("decoy.raw", vec![0])),
    );
    dibbler.add_template("_decoy", &decoy_fragments).unwrap();
    dibbler.spawn_template("_decoy", ObjectId::new(1)).unwrap();
    let queue = Arc::new(InMemoryPhysicsQueue::new());
    let clerk = Clerk::new(store, igor, dibbler, queue.clone(), ClerkConfig::default());

    let resp = clerk.dispatch(Command::Spawn(SpawnRequest {
        objects: vec![SpawnItem {
            template_id: "_templateEmpty".to_string(),
            rbs: None,
        }],
    }));
    assert!(resp.ok);
    let spawned: SpawnResponse = serde_json::from_value(resp.data).unwrap();
    assert!(spawned.created.is_empty());
    assert_eq!(spawned.failed_templates, vec!["_templateEmpty".to_string()]);

    let resp = clerk.dispatch(Command::GetAllObjectIds);
    let ids: Vec<ObjectId> = serde_json::from_value(resp.data).unwrap();
    assert!(ids.is_empty(), "the allocated id must never surface as a live object");
    assert!(queue.is_empty(), "a failed spawn must not enqueue a physics command");
}
