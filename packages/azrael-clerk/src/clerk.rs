//! The Clerk dispatcher (spec.md §4.5).

use std::collections::BTreeMap;
use std::sync::Arc;

use azrael_dibbler::{Dibbler, FragmentUpdate};
use azrael_igor::Igor;
use azrael_store::{ModOp, PutOp, Store};
use azrael_types::{ConstraintMeta, FragmentMeta, FragmentType, Instance, ObjectId, RigidBodyState, Template};
use azrael_protocol::{
    Command, ControlPartsRequest, ControlPartsResponse, ForceTorque, FragmentPatch, FragmentSummary,
    GetConstraintsRequest, GetTemplateIdRequest, GetTemplatesRequest, ObjectIdsRequest, ObjectStateView,
    RemoveRequest, Response, SetCustomRequest, SetCustomResponse, SetForceRequest, SetFragmentsRequest,
    SetFragmentsResponse, SetRigidBodiesRequest, SetRigidBodiesResponse, SpawnItem, SpawnRequest, SpawnResponse,
    TemplateInput, TemplateRecord, UpdateBoosterForcesRequest,
};
use tracing::{debug, warn};

use crate::config::ClerkConfig;
use crate::error::ClerkError;
use crate::physics::{PhysicsCommand, PhysicsCommandSink};

const RBS_FIELDS: &[&str] = &[
    "scale",
    "imass",
    "restitution",
    "rotation",
    "position",
    "velocityLin",
    "velocityRot",
    "cshapes",
    "axesLockLin",
    "axesLockRot",
];

/// The command dispatcher. Holds no lock of its own — every piece of
/// cross-request synchronization lives in the collaborators'
/// per-document atomics (spec.md §5).
pub struct Clerk {
    store: Arc<Store>,
    igor: Arc<Igor>,
    dibbler: Arc<Dibbler>,
    queue: Arc<dyn PhysicsCommandSink>,
    config: ClerkConfig,
}

impl Clerk {
    pub fn new(
        store: Arc<Store>,
        igor: Arc<Igor>,
        dibbler: Arc<Dibbler>,
        queue: Arc<dyn PhysicsCommandSink>,
        config: ClerkConfig,
    ) -> Self {
        Clerk {
            store,
            igor,
            dibbler,
            queue,
            config,
        }
    }

    /// The single entry point: a totality-checked match over `Command`.
    pub fn dispatch(&self, command: Command) -> Response {
        debug!(cmd = ?std::mem::discriminant(&command), "dispatching command");
        let result = match command {
            Command::Ping => Ok(Response::ok("pong clerk")),
            Command::AddTemplates(req) => Ok(self.add_templates(req.templates)),
            Command::GetTemplates(req) => Ok(self.get_templates(req)),
            Command::GetTemplateId(req) => self.get_template_id(req).map(Response::ok),
            Command::GetAllObjectIds => Ok(Response::ok(self.get_all_object_ids())),
            Command::Spawn(req) => Ok(self.spawn(req)),
            Command::Remove(req) => Ok(self.remove(req)),
            Command::GetRigidBodies(req) => Ok(Response::ok(self.get_rigid_bodies(req))),
            Command::GetObjectStates(req) => Ok(Response::ok(self.get_object_states(req))),
            Command::SetRigidBodies(req) => Ok(self.set_rigid_bodies_response(req)),
            Command::SetFragments(req) => Ok(Response::ok(self.set_fragments(req))),
            Command::GetFragments(req) => Ok(Response::ok(self.get_fragments(req))),
            Command::SetForce(req) => self.set_force(req).map(|()| Response::ok_empty()),
            Command::ControlParts(req) => self.control_parts(req).map(Response::ok),
            Command::UpdateBoosterForces(req) => self.update_booster_forces(req).map(Response::ok),
            Command::AddConstraints(req) => self
                .igor
                .add_constraints(req.constraints)
                .map(Response::ok)
                .map_err(ClerkError::from),
            Command::DeleteConstraints(req) => self
                .igor
                .delete_constraints(&req.constraints)
                .map(Response::ok)
                .map_err(ClerkError::from),
            Command::GetConstraints(req) => Ok(Response::ok(self.get_constraints(req))),
            Command::GetCustom(req) => Ok(Response::ok(self.get_custom(req))),
            Command::SetCustom(req) => Ok(Response::ok(self.set_custom(req))),
        };
        match result {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "command failed");
                err.to_response()
            }
        }
    }

    fn add_templates(&self, templates: Vec<TemplateInput>) -> Response {
        let mut results = BTreeMap::new();
        for t in templates {
            let ok = self.add_one_template(t.clone()).is_ok();
            results.insert(t.aid, ok);
        }
        Response::ok(results)
    }

    fn add_one_template(&self, input: TemplateInput) -> Result<(), ClerkError> {
        if !Template::is_valid_name(&input.aid) {
            return Err(ClerkError::InvalidArgument(format!("invalid template name {:?}", input.aid)));
        }
        // Assets first, document second (spec.md §5 I7).
        self.dibbler.add_template(&input.aid, &input.fragments)?;

        let mut template = Template::new(input.aid.clone());
        template.rbs = input.rbs;
        template.boosters = input.boosters;
        template.factories = input.factories;
        for (name, frag) in &input.fragments {
            template.fragments.insert(name.clone(), frag.meta);
        }

        let data = serde_json::to_value(&template).map_err(|e| ClerkError::InvalidArgument(e.to_string()))?;
        let put = self
            .store
            .templates
            .put(vec![PutOp { aid: template.aid.clone(), data }])?;
        if put.get(&template.aid).copied().unwrap_or(false) {
            Ok(())
        } else {
            Err(ClerkError::InvalidArgument(format!("template {:?} already exists", template.aid)))
        }
    }

    fn get_templates(&self, req: GetTemplatesRequest) -> Response {
        let mut seen = std::collections::BTreeSet::new();
        let mut out = BTreeMap::new();
        for name in req.names {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Ok(Some(value)) = self.store.templates.get_one(&name, &None) {
                if let Ok(template) = serde_json::from_value::<Template>(value) {
                    out.insert(
                        name.clone(),
                        TemplateRecord {
                            template,
                            url_frag: format!("/templates/{name}"),
                        },
                    );
                }
            }
        }
        Response::ok(out)
    }

    fn get_template_id(&self, req: GetTemplateIdRequest) -> Result<String, ClerkError> {
        let instance = self.load_instance(req.obj_id)?;
        Ok(instance.template_id)
    }

    fn get_all_object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .store
            .instances
            .get_all(&None)
            .unwrap_or_default()
            .keys()
            .filter_map(|aid| aid.parse::<u64>().ok().map(ObjectId::new))
            .collect();
        ids.sort();
        ids
    }

    fn spawn(&self, req: SpawnRequest) -> Response {
        let mut created = Vec::new();
        let mut failed_templates = Vec::new();
        for item in req.objects {
            match self.spawn_one(&item) {
                Ok(obj_id) => created.push(obj_id),
                Err(_) => failed_templates.push(item.template_id),
            }
        }
        Response::ok(SpawnResponse { created, failed_templates })
    }

    fn spawn_one(&self, item: &SpawnItem) -> Result<ObjectId, ClerkError> {
        let template_value = self
            .store
            .templates
            .get_one(&item.template_id, &None)?
            .ok_or_else(|| ClerkError::NotFound(format!("template {:?}", item.template_id)))?;
        let template: Template =
            serde_json::from_value(template_value).map_err(|e| ClerkError::InvalidArgument(e.to_string()))?;

        let (first, _) = self.store.ids.allocate(1);
        let obj_id = ObjectId::new(first);
        let instance = Instance::spawn(obj_id, &template, item.rbs.clone())
            .map_err(|e| ClerkError::InvalidArgument(e.to_string()))?;

        // Assets first, document second (spec.md §5 I7): an asset failure
        // is a non-fatal skip, the allocated id is simply never used.
        self.dibbler.spawn_template(&template.aid, obj_id)?;

        let data = serde_json::to_value(&instance).map_err(|e| ClerkError::InvalidArgument(e.to_string()))?;
        let put = self
            .store
            .instances
            .put(vec![PutOp { aid: obj_id.to_string(), data }])?;
        if !put.get(&obj_id.to_string()).copied().unwrap_or(false) {
            return Err(ClerkError::InvalidArgument("instance id collision".into()));
        }

        self.queue.push(PhysicsCommand::SpawnBody { obj_id, rbs: instance.rbs });
        Ok(obj_id)
    }

    fn remove(&self, req: RemoveRequest) -> Response {
        let obj_id = req.obj_id;
        let removed = self.store.instances.remove(&obj_id.to_string()).unwrap_or(false);
        let _ = self.igor.remove_body(obj_id);
        let _ = self.dibbler.del_instance(obj_id);
        if removed {
            self.queue.push(PhysicsCommand::RemoveBody { obj_id });
        }
        Response::ok(serde_json::json!({ "removed": removed }))
    }

    fn load_instance(&self, obj_id: ObjectId) -> Result<Instance, ClerkError> {
        let value = self
            .store
            .instances
            .get_one(&obj_id.to_string(), &None)?
            .ok_or_else(|| ClerkError::NotFound(format!("object {obj_id}")))?;
        serde_json::from_value(value).map_err(|e| ClerkError::InvalidArgument(e.to_string()))
    }

    fn get_rigid_bodies(&self, req: ObjectIdsRequest) -> BTreeMap<ObjectId, Option<RigidBodyState>> {
        let ids = req.obj_ids.unwrap_or_else(|| self.get_all_object_ids());
        ids.into_iter()
            .map(|id| (id, self.load_instance(id).ok().map(|i| i.rbs)))
            .collect()
    }

    fn get_object_states(&self, req: ObjectIdsRequest) -> BTreeMap<ObjectId, Option<ObjectStateView>> {
        let ids = req.obj_ids.unwrap_or_else(|| self.get_all_object_ids());
        ids.into_iter()
            .map(|id| {
                let view = self.load_instance(id).ok().map(|i| ObjectStateView {
                    rbs: i.rbs,
                    frag: i.fragments,
                });
                (id, view)
            })
            .collect()
    }

    /// A non-empty request where every object failed reports `ok=false`
    /// so a caller can tell "everything failed" apart from "nothing was
    /// asked for" (resolves an open question in favor of the more
    /// informative response).
    fn set_rigid_bodies_response(&self, req: SetRigidBodiesRequest) -> Response {
        let total = req.updates.len();
        let result = self.set_rigid_bodies(req);
        if total > 0 && result.failed.len() == total {
            Response {
                ok: false,
                msg: Some(format!("all {total} rigid body updates failed")),
                data: serde_json::to_value(&result).unwrap_or(serde_json::Value::Null),
            }
        } else {
            Response::ok(result)
        }
    }

    fn set_rigid_bodies(&self, req: SetRigidBodiesRequest) -> SetRigidBodiesResponse {
        let mut failed = Vec::new();
        for (obj_id, patch) in req.updates {
            if self.set_one_rigid_body(obj_id, &patch).is_err() {
                failed.push(obj_id);
            }
        }
        SetRigidBodiesResponse { failed }
    }

    fn set_one_rigid_body(&self, obj_id: ObjectId, patch: &serde_json::Value) -> Result<(), ClerkError> {
        let fields = patch
            .as_object()
            .ok_or_else(|| ClerkError::InvalidArgument("rigid body patch must be an object".into()))?;
        for key in fields.keys() {
            if !RBS_FIELDS.contains(&key.as_str()) {
                return Err(ClerkError::InvalidArgument(format!("unknown rigid body field {key:?}")));
            }
        }
        let mut op = ModOp::new(obj_id.to_string());
        for (key, value) in fields {
            op.set.push((azrael_store::FieldPath::parse(&format!("rbs.{key}")).unwrap(), value.clone()));
        }
        let results = self.store.instances.modify(vec![op])?;
        if results.get(&obj_id.to_string()).copied().unwrap_or(false) {
            Ok(())
        } else {
            Err(ClerkError::NotFound(format!("object {obj_id}")))
        }
    }

    fn set_fragments(&self, req: SetFragmentsRequest) -> SetFragmentsResponse {
        let mut failed = Vec::new();
        for (obj_id, patches) in req.updates {
            if self.set_fragments_one(obj_id, patches).is_err() {
                failed.push(obj_id);
            }
        }
        SetFragmentsResponse { failed }
    }

    fn set_fragments_one(&self, obj_id: ObjectId, patches: BTreeMap<String, FragmentPatch>) -> Result<(), ClerkError> {
        let mut instance = self.load_instance(obj_id)?;
        for frag_name in patches.keys() {
            if !instance.fragments.contains_key(frag_name) {
                return Err(ClerkError::NotFound(format!("fragment {frag_name:?}")));
            }
        }

        let mut version_bump = false;
        for (frag_name, patch) in patches {
            let is_tombstone = patch.fragtype == Some(FragmentType::None);
            if is_tombstone {
                instance.fragments.remove(&frag_name);
                let _ = self.dibbler.del_fragment(obj_id, &frag_name);
                version_bump = true;
                continue;
            }

            let existing = instance.fragments.get(&frag_name).copied().unwrap();
            let new_meta = FragmentMeta {
                fragtype: patch.fragtype.unwrap_or(existing.fragtype),
                scale: patch.scale.unwrap_or(existing.scale),
                position: patch.position.unwrap_or(existing.position),
                rotation: patch.rotation.unwrap_or(existing.rotation),
            };

            if let Some(fragdata) = patch.fragdata {
                self.dibbler
                    .update_fragments(obj_id, [(frag_name.clone(), FragmentUpdate::Data(fragdata))].into())?;
                version_bump = true;
            }
            self.dibbler
                .update_fragments(obj_id, [(frag_name.clone(), FragmentUpdate::Meta(new_meta))].into())?;
            instance.fragments.insert(frag_name, new_meta);
        }

        if version_bump {
            instance.rbs.version += 1;
        }
        let data = serde_json::to_value(&instance).map_err(|e| ClerkError::InvalidArgument(e.to_string()))?;
        self.store.instances.remove(&obj_id.to_string())?;
        self.store.instances.put(vec![PutOp { aid: obj_id.to_string(), data }])?;
        Ok(())
    }

    fn get_fragments(&self, req: ObjectIdsRequest) -> BTreeMap<ObjectId, Option<BTreeMap<String, FragmentSummary>>> {
        let ids = req.obj_ids.unwrap_or_else(|| self.get_all_object_ids());
        ids.into_iter()
            .map(|id| {
                let summary = self.load_instance(id).ok().map(|i| {
                    i.fragments
                        .into_iter()
                        .map(|(name, meta)| {
                            let url_frag = format!("/instances/{id}/{name}");
                            (name, FragmentSummary { fragtype: meta.fragtype, url_frag })
                        })
                        .collect()
                });
                (id, summary)
            })
            .collect()
    }

    fn set_force(&self, req: SetForceRequest) -> Result<(), ClerkError> {
        self.load_instance(req.obj_id)?;
        self.queue.push(PhysicsCommand::SetForce {
            obj_id: req.obj_id,
            force: req.force,
            rel_pos: req.rel_pos,
        });
        Ok(())
    }

    fn control_parts(&self, req: ControlPartsRequest) -> Result<ControlPartsResponse, ClerkError> {
        let instance = self.load_instance(req.obj_id)?;
        let template_value = self
            .store
            .templates
            .get_one(&instance.template_id, &None)?
            .ok_or_else(|| ClerkError::NotFound(format!("template {:?}", instance.template_id)))?;
        let template: Template =
            serde_json::from_value(template_value).map_err(|e| ClerkError::InvalidArgument(e.to_string()))?;

        for (part_id, cmd) in &req.cmd_boosters {
            let booster = template
                .boosters
                .get(part_id)
                .ok_or_else(|| ClerkError::NotFound(format!("booster {part_id:?}")))?;
            if cmd.force < booster.minval || cmd.force > booster.maxval {
                return Err(ClerkError::InvalidArgument(format!(
                    "booster {part_id:?} force {} out of range [{}, {}]",
                    cmd.force, booster.minval, booster.maxval
                )));
            }
            let force_vec = booster.direction.scale(cmd.force);
            let torque = booster.pos.cross(force_vec);
            self.queue.push(PhysicsCommand::DirectForceAndTorque {
                obj_id: req.obj_id,
                force: force_vec,
                torque,
            });
        }

        let mut spawned = Vec::new();
        for (part_id, cmd) in &req.cmd_factories {
            let factory = template
                .factories
                .get(part_id)
                .ok_or_else(|| ClerkError::NotFound(format!("factory {part_id:?}")))?;
            let exit_speed = cmd.exit_speed.clamp(factory.exit_speed.min, factory.exit_speed.max);

            let child_template_value = self
                .store
                .templates
                .get_one(&factory.template_id, &None)?
                .ok_or_else(|| ClerkError::NotFound(format!("template {:?}", factory.template_id)))?;
            let child_template: Template =
                serde_json::from_value(child_template_value).map_err(|e| ClerkError::InvalidArgument(e.to_string()))?;

            let world_pos = instance.rbs.position.add(instance.rbs.rotation.rotate_vec3(factory.pos));
            let rotated_dir = instance.rbs.rotation.rotate_vec3(factory.direction).normalize();
            let world_vel = instance.rbs.velocity_lin.add(rotated_dir.scale(exit_speed));

            let mut child_rbs = child_template.rbs.clone();
            child_rbs.position = world_pos;
            child_rbs.rotation = instance.rbs.rotation;
            child_rbs.velocity_lin = world_vel;

            let (first, _) = self.store.ids.allocate(1);
            let child_id = ObjectId::new(first);
            let child_rbs_patch =
                serde_json::to_value(&child_rbs).map_err(|e| ClerkError::InvalidArgument(e.to_string()))?;
            let child_instance = Instance::spawn(child_id, &child_template, Some(child_rbs_patch))
                .map_err(|e| ClerkError::InvalidArgument(e.to_string()))?;

            self.dibbler.spawn_template(&factory.template_id, child_id)?;
            let data = serde_json::to_value(&child_instance).map_err(|e| ClerkError::InvalidArgument(e.to_string()))?;
            self.store
                .instances
                .put(vec![PutOp { aid: child_id.to_string(), data }])?;
            self.queue.push(PhysicsCommand::SpawnBody { obj_id: child_id, rbs: child_rbs });
            spawned.push(child_id);
        }

        Ok(ControlPartsResponse { spawned })
    }

    fn update_booster_forces(&self, req: UpdateBoosterForcesRequest) -> Result<ForceTorque, ClerkError> {
        let instance = self.load_instance(req.obj_id)?;
        let template_value = self
            .store
            .templates
            .get_one(&instance.template_id, &None)?
            .ok_or_else(|| ClerkError::NotFound(format!("template {:?}", instance.template_id)))?;
        let template: Template =
            serde_json::from_value(template_value).map_err(|e| ClerkError::InvalidArgument(e.to_string()))?;
        let booster = template
            .boosters
            .get(&req.booster_id)
            .ok_or_else(|| ClerkError::NotFound(format!("booster {:?}", req.booster_id)))?;

        let clamped = req.force.clamp(booster.minval, booster.maxval);
        let force = booster.direction.scale(clamped);
        let torque = booster.pos.cross(force);
        self.queue.push(PhysicsCommand::DirectForceAndTorque {
            obj_id: req.obj_id,
            force,
            torque,
        });
        Ok(ForceTorque { force, torque })
    }

    fn get_constraints(&self, req: GetConstraintsRequest) -> Vec<ConstraintMeta> {
        self.igor.get_constraints(req.body_ids.as_deref()).unwrap_or_default()
    }

    fn get_custom(&self, req: ObjectIdsRequest) -> BTreeMap<ObjectId, Option<String>> {
        let ids = req.obj_ids.unwrap_or_else(|| self.get_all_object_ids());
        ids.into_iter()
            .map(|id| (id, self.load_instance(id).ok().map(|i| i.custom)))
            .collect()
    }

    fn set_custom(&self, req: SetCustomRequest) -> SetCustomResponse {
        let mut failed = Vec::new();
        for (obj_id, value) in req.values {
            if value.len() > self.config.custom_field_max_bytes {
                failed.push(obj_id);
                continue;
            }
            let mut op = ModOp::new(obj_id.to_string());
            op.set.push((
                azrael_store::FieldPath::parse("custom").unwrap(),
                serde_json::Value::String(value),
            ));
            match self.store.instances.modify(vec![op]) {
                Ok(results) if results.get(&obj_id.to_string()).copied().unwrap_or(false) => {}
                _ => failed.push(obj_id),
            }
        }
        SetCustomResponse { failed }
    }
}
