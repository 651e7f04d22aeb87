//! The scene: owning pools for materials, meshes and mesh instances, the
//! light list and the root of the node tree.
//!
//! Ownership is explicit. Nodes own their children and reference instances by
//! key; instances reference meshes by key; meshes reference their material by
//! key. The reverse directions (which meshes a material shades, which
//! instances place a mesh) are kept in membership ledgers so removal is O(1)
//! and iterating a material's meshes after a shader reload stays cheap.
//!
//! The scene is passed into camera/viewport operations instead of living in a
//! global, so there is no hidden mutable state behind the render path.

use cgmath::{Matrix4, SquareMatrix, Vector3};
use slotmap::{SlotMap, new_key_type};

use crate::{
    context::Context,
    data_structures::{
        membership::MembershipLedger,
        model::{Material, Mesh, MeshData},
        scene_graph::{DrawCmd, MeshInstance, SceneNode},
    },
    light::Light,
};

new_key_type! {
    pub struct MaterialKey;
    pub struct MeshKey;
    pub struct InstanceKey;
}

pub struct Scene {
    pub root: SceneNode,
    materials: SlotMap<MaterialKey, Material>,
    meshes: SlotMap<MeshKey, Mesh>,
    instances: SlotMap<InstanceKey, MeshInstance>,
    lights: Vec<Light>,
    material_meshes: MembershipLedger<MaterialKey, MeshKey>,
    mesh_instances: MembershipLedger<MeshKey, InstanceKey>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            root: SceneNode::root(),
            materials: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            instances: SlotMap::with_key(),
            lights: Vec::new(),
            material_meshes: MembershipLedger::new(),
            mesh_instances: MembershipLedger::new(),
        }
    }

    pub fn add_material(&mut self, material: Material) -> MaterialKey {
        self.materials.insert(material)
    }

    /// Builds the GPU mesh from `data` and assigns it to `material` for its
    /// whole lifetime. The material's mesh list is updated to match.
    pub fn add_mesh(&mut self, ctx: &Context, data: &MeshData, material: MaterialKey) -> MeshKey {
        let mesh = Mesh::new(&ctx.device, data, material);
        let key = self.meshes.insert(mesh);
        self.material_meshes.register(material, key);
        key
    }

    /// Creates a placement of `mesh`. Attach the returned key to a
    /// [`SceneNode`] to make it part of the tree.
    pub fn instantiate(&mut self, mesh: MeshKey) -> InstanceKey {
        let key = self.instances.insert(MeshInstance::new(mesh));
        self.mesh_instances.register(mesh, key);
        key
    }

    /// Destroys an instance: it is removed from its mesh's instance list
    /// exactly once. Node instance lists still holding the key skip it during
    /// traversal.
    pub fn remove_instance(&mut self, key: InstanceKey) -> bool {
        match self.instances.remove(key) {
            Some(instance) => {
                self.mesh_instances.unregister(instance.mesh(), key);
                true
            }
            None => false,
        }
    }

    /// Destroys a mesh: it leaves its material's mesh list and every instance
    /// placing it is destroyed with it.
    pub fn remove_mesh(&mut self, key: MeshKey) -> bool {
        let Some(mesh) = self.meshes.remove(key) else {
            return false;
        };
        self.material_meshes.unregister(mesh.material(), key);
        for instance in self.mesh_instances.take_members(key) {
            self.instances.remove(instance);
        }
        true
    }

    /// Destroys a material and, cascading, every mesh that belongs to it.
    pub fn remove_material(&mut self, key: MaterialKey) -> bool {
        if self.materials.remove(key).is_none() {
            return false;
        }
        for mesh in self.material_meshes.take_members(key) {
            if self.meshes.remove(mesh).is_some() {
                for instance in self.mesh_instances.take_members(mesh) {
                    self.instances.remove(instance);
                }
            }
        }
        true
    }

    /// Recursively destroys a detached subtree (see
    /// [`SceneNode::take_child`]): every instance owned by any node in it is
    /// removed from its mesh's instance list.
    pub fn destroy_subtree(&mut self, node: SceneNode) {
        let mut keys = Vec::new();
        node.collect_instances(&mut keys);
        for key in keys {
            self.remove_instance(key);
        }
    }

    /// Unloads the scene: drops the whole tree and every pooled entity.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn add_light(
        &mut self,
        ctx: &Context,
        position: Vector3<f32>,
        color: [f32; 3],
        darkness: f32,
    ) -> usize {
        self.lights
            .push(Light::new(&ctx.device, &ctx.layouts.light, position, color, darkness));
        self.lights.len() - 1
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    pub fn mesh(&self, key: MeshKey) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    pub fn material(&self, key: MaterialKey) -> Option<&Material> {
        self.materials.get(key)
    }

    pub fn instance(&self, key: InstanceKey) -> Option<&MeshInstance> {
        self.instances.get(key)
    }

    /// Meshes currently shaded by `material`, e.g. for iterating after a
    /// shader reload.
    pub fn meshes_of(&self, material: MaterialKey) -> &[MeshKey] {
        self.material_meshes.members(material)
    }

    /// Instances currently placing `mesh`.
    pub fn instances_of(&self, mesh: MeshKey) -> &[InstanceKey] {
        self.mesh_instances.members(mesh)
    }

    /// Walks the tree from the root and records one draw per reachable
    /// instance, world transforms freshly propagated.
    pub fn collect_draws(&self) -> Vec<DrawCmd> {
        let mut draws = Vec::new();
        self.root
            .collect_draws(&self.instances, Matrix4::identity(), &mut draws);
        draws
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
