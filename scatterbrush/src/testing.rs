//! In-memory scene host used by the unit tests.

use crate::engine::FlightGuard;
use crate::math::{DVec3, LinearUnit, Point3, UpAxis};
use crate::scene::{HostHit, NodeKind, NodeRef, SceneHost, WorldTransform};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Clock the tests advance by hand.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Cell::new(Duration::ZERO),
        }
    }

    pub fn now(&self) -> Instant {
        self.base + self.offset.get()
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockKind {
    Transform { group: bool },
    Shape,
}

#[derive(Debug, Clone)]
pub struct MockNode {
    kind: MockKind,
    parent: Option<NodeRef>,
    children: Vec<NodeRef>,
    pub translation: DVec3,
    /// Scale pivot relative to the translation
    pub pivot_offset: DVec3,
    pub rotation: DVec3,
    pub scale: DVec3,
    pub visible: bool,
    /// Node this one was duplicated from
    pub duplicated_from: Option<NodeRef>,
}

impl MockNode {
    fn new(kind: MockKind, parent: Option<NodeRef>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            translation: DVec3::ZERO,
            pivot_offset: DVec3::ZERO,
            rotation: DVec3::ZERO,
            scale: DVec3::ONE,
            visible: true,
            duplicated_from: None,
        }
    }
}

/// Square plane orthogonal to the scene's up axis.
#[derive(Debug, Clone, Copy)]
struct MockPlane {
    height: f64,
    half_extent: f64,
}

/// Mutating host call, recorded in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Duplicate(NodeRef),
    SetTranslation(NodeRef, DVec3),
    Translate(NodeRef, DVec3),
    SetRotation(NodeRef, DVec3),
    Rotate(NodeRef, DVec3),
    ScaleAbsolute(NodeRef, DVec3),
    ScaleRelative(NodeRef, DVec3),
    Visibility(NodeRef, bool),
    Reparent(NodeRef, NodeRef),
    Delete(NodeRef),
}

/// Scene of horizontal planes and mesh stand-ins, plus a record of every edit.
#[derive(Debug)]
pub struct MockScene {
    nodes: BTreeMap<NodeRef, MockNode>,
    planes: HashMap<NodeRef, MockPlane>,
    name_counter: HashMap<String, usize>,
    pub calls: Vec<HostCall>,
    pub rays: RefCell<Vec<(Point3, DVec3)>>,
    pub far_clip: f64,
    pub unit: LinearUnit,
    pub up: UpAxis,
    pub smooth_normal_override: Option<DVec3>,
    pub modifier_bits: u32,
    pub fail_duplicates: bool,
    pub clock: ManualClock,
    pub refresh_count: usize,
    /// Guard inspected from `refresh_viewport`
    pub watched_guard: Option<FlightGuard>,
    /// Whether the watched guard was busy at each refresh
    pub guard_busy_on_refresh: Vec<bool>,
}

impl MockScene {
    pub fn new() -> Self {
        init_logger();
        Self {
            nodes: BTreeMap::new(),
            planes: HashMap::new(),
            name_counter: HashMap::new(),
            calls: Vec::new(),
            rays: RefCell::new(Vec::new()),
            far_clip: 1.0e6,
            unit: LinearUnit::Centimeter,
            up: UpAxis::Y,
            smooth_normal_override: None,
            modifier_bits: 0,
            fail_duplicates: false,
            clock: ManualClock::new(),
            refresh_count: 0,
            watched_guard: None,
            guard_busy_on_refresh: Vec::new(),
        }
    }

    /// Adds a plane mesh at `height` along up. Both the transform and its
    /// shape answer ray queries; the transform is returned.
    pub fn add_plane(&mut self, name: &str, height: f64, half_extent: f64) -> NodeRef {
        let (transform, shape) = self.add_mesh(name);
        let plane = MockPlane { height, half_extent };
        self.planes.insert(transform.clone(), plane);
        self.planes.insert(shape, plane);
        transform
    }

    /// Adds a transform with one mesh shape at the root.
    pub fn add_mesh(&mut self, name: &str) -> (NodeRef, NodeRef) {
        self.insert_mesh(NodeRef::new(name), None)
    }

    /// Adds a transform with one mesh shape below `parent`. `name` is the full path.
    pub fn add_mesh_under(&mut self, name: &str, parent: &NodeRef) -> (NodeRef, NodeRef) {
        self.insert_mesh(NodeRef::new(name), Some(parent.clone()))
    }

    /// Adds an empty transform meant to hold other transforms.
    pub fn add_group(&mut self, name: &str) -> NodeRef {
        let group = NodeRef::new(name);
        self.insert_node(group.clone(), MockNode::new(MockKind::Transform { group: true }, None));
        group
    }

    /// Adds a drawable with no transform above it.
    pub fn add_root_shape(&mut self, name: &str) -> NodeRef {
        let shape = NodeRef::new(name);
        self.insert_node(shape.clone(), MockNode::new(MockKind::Shape, None));
        shape
    }

    pub fn node(&self, node: &NodeRef) -> Option<&MockNode> {
        self.nodes.get(node)
    }

    pub fn node_mut(&mut self, node: &NodeRef) -> Option<&mut MockNode> {
        self.nodes.get_mut(node)
    }

    /// Removes a node without going through the host interface.
    pub fn remove_externally(&mut self, node: &NodeRef) {
        self.remove_recursive(node);
    }

    /// Transforms duplicated from `source` that still exist.
    pub fn duplicates_of(&self, source: &NodeRef) -> Vec<NodeRef> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.duplicated_from.as_ref() == Some(source))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn duplicate_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, HostCall::Duplicate(_)))
            .count()
    }

    pub fn calls_for(&self, node: &NodeRef) -> Vec<HostCall> {
        self.calls
            .iter()
            .filter(|c| match c {
                HostCall::Duplicate(n)
                | HostCall::SetTranslation(n, _)
                | HostCall::Translate(n, _)
                | HostCall::SetRotation(n, _)
                | HostCall::Rotate(n, _)
                | HostCall::ScaleAbsolute(n, _)
                | HostCall::ScaleRelative(n, _)
                | HostCall::Visibility(n, _)
                | HostCall::Reparent(n, _)
                | HostCall::Delete(n) => n == node,
            })
            .cloned()
            .collect()
    }

    fn insert_mesh(&mut self, transform: NodeRef, parent: Option<NodeRef>) -> (NodeRef, NodeRef) {
        let shape = NodeRef::new(format!("{}|{}Shape", transform, transform.short_name()));
        self.insert_node(
            transform.clone(),
            MockNode::new(MockKind::Transform { group: false }, parent),
        );
        self.insert_node(shape.clone(), MockNode::new(MockKind::Shape, Some(transform.clone())));
        (transform, shape)
    }

    fn insert_node(&mut self, id: NodeRef, node: MockNode) {
        if let Some(parent) = node.parent.as_ref() {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.push(id.clone());
            }
        }
        self.nodes.insert(id, node);
    }

    fn unique_name(&mut self, base: &str) -> String {
        let counter = self.name_counter.entry(base.to_string()).or_insert(0);
        loop {
            let candidate = if *counter == 0 {
                base.to_string()
            } else {
                format!("{}{}", base, counter)
            };
            *counter += 1;
            let taken = self.nodes.keys().any(|k| k.short_name() == candidate);
            if !taken {
                return candidate;
            }
        }
    }

    fn remove_recursive(&mut self, node: &NodeRef) {
        let Some(removed) = self.nodes.remove(node) else {
            return;
        };
        if let Some(parent) = removed.parent.as_ref().and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|c| c != node);
        }
        for child in removed.children {
            self.remove_recursive(&child);
        }
        self.planes.remove(node);
    }

    fn triangle(&self, plane: MockPlane, sub_face: u32) -> [Point3; 3] {
        let (h, e) = (plane.height, plane.half_extent);
        match (self.up, sub_face) {
            (UpAxis::Y, 0) => [
                DVec3::new(-e, h, -e),
                DVec3::new(-e, h, e),
                DVec3::new(e, h, -e),
            ],
            (UpAxis::Y, _) => [
                DVec3::new(e, h, e),
                DVec3::new(e, h, -e),
                DVec3::new(-e, h, e),
            ],
            (UpAxis::Z, 0) => [
                DVec3::new(-e, -e, h),
                DVec3::new(e, -e, h),
                DVec3::new(-e, e, h),
            ],
            (UpAxis::Z, _) => [
                DVec3::new(e, e, h),
                DVec3::new(-e, e, h),
                DVec3::new(e, -e, h),
            ],
        }
    }
}

impl Default for MockScene {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneHost for MockScene {
    fn cast_ray(
        &self,
        origin: Point3,
        direction: DVec3,
        surface: &NodeRef,
        far_clip: f64,
    ) -> Option<HostHit> {
        self.rays.borrow_mut().push((origin, direction));
        let plane = *self.planes.get(surface)?;
        let up = self.up.vector();
        let denom = direction.dot(up);
        if denom.abs() < 1e-12 {
            return None;
        }
        let t = (plane.height - origin.dot(up)) / denom;
        if t < 0.0 || t * direction.length() > far_clip {
            return None;
        }
        let point = origin + direction * t;
        let flat = point - up * point.dot(up);
        if flat.abs().max_element() > plane.half_extent {
            return None;
        }
        // the plane is split along its anti-diagonal
        let (a, b) = match self.up {
            UpAxis::Y => (point.x, point.z),
            UpAxis::Z => (point.x, point.y),
        };
        let sub_face_index = u32::from(a + b > 0.0);
        Some(HostHit {
            point,
            face_index: 0,
            sub_face_index,
        })
    }

    fn smooth_normal(&self, surface: &NodeRef, _point: Point3) -> Option<DVec3> {
        self.planes.get(surface)?;
        Some(self.smooth_normal_override.unwrap_or(self.up.vector()))
    }

    fn face_triangle(&self, surface: &NodeRef, _face: u32, sub_face: u32) -> Option<[Point3; 3]> {
        let plane = *self.planes.get(surface)?;
        Some(self.triangle(plane, sub_face))
    }

    fn duplicate(
        &mut self,
        source: &NodeRef,
        _preserve_connections: bool,
        _as_instance: bool,
    ) -> Option<NodeRef> {
        self.calls.push(HostCall::Duplicate(source.clone()));
        if self.fail_duplicates {
            return None;
        }
        let original = self.nodes.get(source)?.clone();
        if original.kind == MockKind::Shape {
            return None;
        }
        let base = source.short_name().trim_end_matches(|c: char| c.is_ascii_digit());
        let base = if base.is_empty() { "node" } else { base };
        let name = self.unique_name(base);
        let copy = NodeRef::new(format!("|{}", name));
        let mut node = MockNode::new(original.kind, None);
        node.translation = original.translation;
        node.pivot_offset = original.pivot_offset;
        node.rotation = original.rotation;
        node.scale = original.scale;
        node.visible = original.visible;
        node.duplicated_from = Some(source.clone());
        self.insert_node(copy.clone(), node);
        for child in original.children {
            if self.nodes.get(&child).map(|c| c.kind) == Some(MockKind::Shape) {
                let shape = NodeRef::new(format!("{}|{}Shape", copy, name));
                self.insert_node(shape, MockNode::new(MockKind::Shape, Some(copy.clone())));
            }
        }
        Some(copy)
    }

    fn world_transform(&self, node: &NodeRef) -> Option<WorldTransform> {
        let n = self.nodes.get(node)?;
        Some(WorldTransform {
            translation: n.translation,
            scale_pivot: n.translation + n.pivot_offset,
            scale: n.scale,
        })
    }

    fn set_world_translation(&mut self, node: &NodeRef, translation: DVec3) {
        self.calls.push(HostCall::SetTranslation(node.clone(), translation));
        if let Some(n) = self.nodes.get_mut(node) {
            n.translation = translation;
        }
    }

    fn translate_relative(&mut self, node: &NodeRef, offset: DVec3) {
        self.calls.push(HostCall::Translate(node.clone(), offset));
        if let Some(n) = self.nodes.get_mut(node) {
            n.translation += offset;
        }
    }

    fn set_rotation(&mut self, node: &NodeRef, euler_degrees: DVec3) {
        self.calls.push(HostCall::SetRotation(node.clone(), euler_degrees));
        if let Some(n) = self.nodes.get_mut(node) {
            n.rotation = euler_degrees;
        }
    }

    fn rotate_object_space(&mut self, node: &NodeRef, euler_degrees: DVec3) {
        self.calls.push(HostCall::Rotate(node.clone(), euler_degrees));
        // summing Euler angles is enough for what the tests inspect
        if let Some(n) = self.nodes.get_mut(node) {
            n.rotation += euler_degrees;
        }
    }

    fn scale_absolute(&mut self, node: &NodeRef, scale: DVec3) {
        self.calls.push(HostCall::ScaleAbsolute(node.clone(), scale));
        if let Some(n) = self.nodes.get_mut(node) {
            n.scale = scale;
        }
    }

    fn scale_relative(&mut self, node: &NodeRef, scale: DVec3) {
        self.calls.push(HostCall::ScaleRelative(node.clone(), scale));
        if let Some(n) = self.nodes.get_mut(node) {
            n.scale *= scale;
        }
    }

    fn set_visibility(&mut self, node: &NodeRef, visible: bool) {
        self.calls.push(HostCall::Visibility(node.clone(), visible));
        if let Some(n) = self.nodes.get_mut(node) {
            n.visible = visible;
        }
    }

    fn create_group(&mut self, name: &str) -> NodeRef {
        let unique = self.unique_name(name);
        let group = NodeRef::new(format!("|{}", unique));
        self.insert_node(group.clone(), MockNode::new(MockKind::Transform { group: true }, None));
        group
    }

    fn reparent(&mut self, child: &NodeRef, parent: &NodeRef) -> NodeRef {
        self.calls.push(HostCall::Reparent(child.clone(), parent.clone()));
        let old_parent = self.nodes.get(child).and_then(|n| n.parent.clone());
        if let Some(old) = old_parent.and_then(|p| self.nodes.get_mut(&p)) {
            old.children.retain(|c| c != child);
        }
        if let Some(n) = self.nodes.get_mut(child) {
            n.parent = Some(parent.clone());
        }
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child.clone());
        }
        // identifiers stay stable in this scene
        child.clone()
    }

    fn children(&self, node: &NodeRef) -> Vec<NodeRef> {
        self.nodes
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn parent(&self, node: &NodeRef) -> Option<NodeRef> {
        self.nodes.get(node)?.parent.clone()
    }

    fn delete_node(&mut self, node: &NodeRef) {
        self.calls.push(HostCall::Delete(node.clone()));
        self.remove_recursive(node);
    }

    fn node_exists(&self, node: &NodeRef) -> bool {
        self.nodes.contains_key(node)
    }

    fn node_kind(&self, node: &NodeRef) -> Option<NodeKind> {
        let n = self.nodes.get(node)?;
        match n.kind {
            MockKind::Shape => Some(NodeKind::Shape),
            MockKind::Transform { .. } => {
                let mut shapes = Vec::new();
                let mut child_transforms = 0;
                for child in &n.children {
                    match self.nodes.get(child).map(|c| c.kind) {
                        Some(MockKind::Shape) => shapes.push(child.clone()),
                        Some(MockKind::Transform { .. }) => child_transforms += 1,
                        None => {}
                    }
                }
                Some(NodeKind::Transform {
                    shapes,
                    child_transforms,
                })
            }
        }
    }

    fn descendant_drawables(&self, node: &NodeRef) -> Vec<NodeRef> {
        let mut found = Vec::new();
        let mut queue = std::collections::VecDeque::from(self.children(node));
        while let Some(next) = queue.pop_front() {
            match self.nodes.get(&next).map(|n| n.kind) {
                Some(MockKind::Shape) => found.push(next),
                Some(MockKind::Transform { .. }) => queue.extend(self.children(&next)),
                None => {}
            }
        }
        found
    }

    fn groups_with_prefix(&self, prefix: &str) -> Vec<NodeRef> {
        self.nodes
            .iter()
            .filter(|(id, n)| {
                n.kind == MockKind::Transform { group: true } && id.short_name().starts_with(prefix)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn modifier_bits(&self) -> u32 {
        self.modifier_bits
    }

    fn far_clip(&self) -> f64 {
        self.far_clip
    }

    fn up_axis(&self) -> UpAxis {
        self.up
    }

    fn linear_unit(&self) -> LinearUnit {
        self.unit
    }

    fn refresh_viewport(&mut self) {
        self.refresh_count += 1;
        if let Some(guard) = self.watched_guard.as_ref() {
            self.guard_busy_on_refresh.push(guard.is_busy());
        }
    }

    fn now(&self) -> Instant {
        self.clock.now()
    }
}
