//! Scene graph and hierarchical scene organization.
//!
//! A [`SceneNode`] forms a strict tree rooted at one node with an identity
//! transform. Each node owns its child nodes and the placements
//! ([`MeshInstance`] keys) attached to it; the instance values themselves
//! live in the [`crate::scene::Scene`] pool so that mesh membership can be
//! maintained without back pointers into the tree.
//!
//! Traversal is depth-first and pre-order. World transforms are recomputed on
//! every walk instead of being cached; the tree is shallow compared to the
//! per-draw GPU cost.

use cgmath::{Matrix4, SquareMatrix};
use slotmap::SlotMap;

use crate::scene::{InstanceKey, MeshKey};

/// A placement of one mesh inside exactly one scene node. Does not own the
/// mesh; the scene's mesh pool does.
#[derive(Debug)]
pub struct MeshInstance {
    mesh: MeshKey,
}

impl MeshInstance {
    pub(crate) fn new(mesh: MeshKey) -> Self {
        Self { mesh }
    }

    pub fn mesh(&self) -> MeshKey {
        self.mesh
    }
}

/// One recorded draw: which mesh, and the world transform it was reached
/// with. Recorded by [`SceneNode::collect_draws`] and executed identically by
/// the geometry and the shadow pass.
#[derive(Debug, Clone, Copy)]
pub struct DrawCmd {
    pub mesh: MeshKey,
    pub world: Matrix4<f32>,
}

#[derive(Debug)]
pub struct SceneNode {
    pub name: String,
    pub transform: Matrix4<f32>,
    children: Vec<SceneNode>,
    instances: Vec<InstanceKey>,
}

impl SceneNode {
    /// The tree root: identity transform, no parent.
    pub fn root() -> Self {
        Self::new("Root", Matrix4::identity())
    }

    pub fn new(name: &str, transform: Matrix4<f32>) -> Self {
        Self {
            name: name.to_string(),
            transform,
            children: Vec::new(),
            instances: Vec::new(),
        }
    }

    /// Appends `child` and returns a reference to it for further building.
    pub fn add_child(&mut self, child: SceneNode) -> &mut SceneNode {
        self.children.push(child);
        self.children.last_mut().expect("child was just pushed")
    }

    /// Detaches and returns the child at `index`. Use together with
    /// [`crate::scene::Scene::destroy_subtree`] so the subtree's instances
    /// are released from their meshes.
    pub fn take_child(&mut self, index: usize) -> SceneNode {
        self.children.remove(index)
    }

    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [SceneNode] {
        &mut self.children
    }

    pub fn attach_instance(&mut self, instance: InstanceKey) {
        self.instances.push(instance);
    }

    pub fn detach_instance(&mut self, instance: InstanceKey) -> bool {
        match self.instances.iter().position(|&key| key == instance) {
            Some(position) => {
                self.instances.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn instances(&self) -> &[InstanceKey] {
        &self.instances
    }

    /// Depth-first search by node name.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(name))
    }

    /// Pre-order traversal with transform propagation: this node's world
    /// transform is `parent_transform * transform`, every owned instance is
    /// recorded with it, then children are visited with it as their parent.
    /// A leaf's world transform therefore always equals the matrix product of
    /// every ancestor's local transform, root to leaf.
    pub fn collect_draws(
        &self,
        instances: &SlotMap<InstanceKey, MeshInstance>,
        parent_transform: Matrix4<f32>,
        out: &mut Vec<DrawCmd>,
    ) {
        let world_transform = parent_transform * self.transform;

        for key in &self.instances {
            // Keys whose instance was removed from the pool are skipped.
            if let Some(instance) = instances.get(*key) {
                out.push(DrawCmd {
                    mesh: instance.mesh(),
                    world: world_transform,
                });
            }
        }
        for child in &self.children {
            child.collect_draws(instances, world_transform, out);
        }
    }

    /// Every instance key in this subtree, pre-order.
    pub(crate) fn collect_instances(&self, out: &mut Vec<InstanceKey>) {
        out.extend_from_slice(&self.instances);
        for child in &self.children {
            child.collect_instances(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Rad, Vector3};
    use slotmap::SlotMap;

    fn pool_with_one_mesh() -> (SlotMap<InstanceKey, MeshInstance>, MeshKey) {
        let mut mesh_keys: SlotMap<MeshKey, ()> = SlotMap::with_key();
        let mesh = mesh_keys.insert(());
        (SlotMap::with_key(), mesh)
    }

    #[test]
    fn leaf_world_transform_is_the_ancestor_product() {
        let (mut instances, mesh) = pool_with_one_mesh();

        let level_one = Matrix4::from_translation(Vector3::new(4.0, 0.0, -1.0));
        let level_two = Matrix4::from_angle_y(Rad(0.5)) * Matrix4::from_scale(2.0);
        let leaf_local = Matrix4::from_translation(Vector3::new(0.0, 3.0, 0.0));

        let mut root = SceneNode::root();
        let middle = root.add_child(SceneNode::new("middle", level_one));
        let leaf = middle.add_child(SceneNode::new("leaf", level_two));
        leaf.add_child(SceneNode::new("tip", leaf_local))
            .attach_instance(instances.insert(MeshInstance::new(mesh)));

        let mut draws = Vec::new();
        root.collect_draws(&instances, Matrix4::identity(), &mut draws);

        assert_eq!(draws.len(), 1);
        let expected = level_one * level_two * leaf_local;
        let world: [[f32; 4]; 4] = draws[0].world.into();
        let expected: [[f32; 4]; 4] = expected.into();
        for (col_a, col_b) in world.iter().zip(expected.iter()) {
            for (a, b) in col_a.iter().zip(col_b.iter()) {
                assert!((a - b).abs() < 1e-5, "world transform mismatch");
            }
        }
    }

    #[test]
    fn traversal_is_preorder_depth_first() {
        let (mut instances, mesh) = pool_with_one_mesh();
        let mut order = Vec::new();

        let mut root = SceneNode::root();
        let root_instance = instances.insert(MeshInstance::new(mesh));
        root.attach_instance(root_instance);
        order.push(root_instance);

        {
            let first = root.add_child(SceneNode::new("first", Matrix4::identity()));
            let key = instances.insert(MeshInstance::new(mesh));
            first.attach_instance(key);
            order.push(key);

            let nested = first.add_child(SceneNode::new("nested", Matrix4::identity()));
            let key = instances.insert(MeshInstance::new(mesh));
            nested.attach_instance(key);
            order.push(key);
        }
        {
            let second = root.add_child(SceneNode::new("second", Matrix4::identity()));
            let key = instances.insert(MeshInstance::new(mesh));
            second.attach_instance(key);
            order.push(key);
        }

        let mut draws = Vec::new();
        root.collect_draws(&instances, Matrix4::identity(), &mut draws);
        assert_eq!(draws.len(), order.len());

        // Removing pooled instances mid-scene must not break the walk.
        instances.remove(order[1]);
        draws.clear();
        root.collect_draws(&instances, Matrix4::identity(), &mut draws);
        assert_eq!(draws.len(), order.len() - 1);
    }

    #[test]
    fn find_mut_locates_nested_nodes() {
        let mut root = SceneNode::root();
        root.add_child(SceneNode::new("arm", Matrix4::identity()))
            .add_child(SceneNode::new("hand", Matrix4::identity()));

        assert!(root.find_mut("hand").is_some());
        assert!(root.find_mut("missing").is_none());
    }

    #[test]
    fn detach_instance_removes_only_the_given_key() {
        let (mut instances, mesh) = pool_with_one_mesh();
        let first = instances.insert(MeshInstance::new(mesh));
        let second = instances.insert(MeshInstance::new(mesh));

        let mut node = SceneNode::new("props", Matrix4::identity());
        node.attach_instance(first);
        node.attach_instance(second);

        assert!(node.detach_instance(first));
        assert!(!node.detach_instance(first));
        assert_eq!(node.instances(), &[second]);
    }
}
