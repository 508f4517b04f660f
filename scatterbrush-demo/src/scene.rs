use scatterbrush::math::{LinearUnit, UpAxis};
use scatterbrush::scene::{HostHit, NodeKind, WorldTransform};
use scatterbrush::{DVec3, NodeRef, Point3, SceneHost};
use std::cell::Cell;
use std::collections::BTreeMap;

/// Rectangular surface spanned by two perpendicular edges from a corner.
#[derive(Debug, Clone, Copy)]
struct Quad {
    corner: Point3,
    u: DVec3,
    v: DVec3,
}

impl Quad {
    fn normal(&self) -> DVec3 {
        self.u.cross(self.v).normalize()
    }

    fn triangle(&self, sub_face: u32) -> [Point3; 3] {
        let o = self.corner;
        if sub_face == 0 {
            [o, o + self.u, o + self.v]
        } else {
            [o + self.u + self.v, o + self.v, o + self.u]
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    shape: bool,
    group: bool,
    parent: Option<NodeRef>,
    children: Vec<NodeRef>,
    translation: DVec3,
    rotation: DVec3,
    scale: DVec3,
    visible: bool,
}

impl Node {
    fn new(shape: bool, parent: Option<NodeRef>) -> Self {
        Self {
            shape,
            group: false,
            parent,
            children: Vec::new(),
            translation: DVec3::ZERO,
            rotation: DVec3::ZERO,
            scale: DVec3::ONE,
            visible: true,
        }
    }
}

/// In-memory scene of flat quads and mesh stand-ins, Y up, centimeters.
#[derive(Debug, Default)]
pub struct PlaneScene {
    nodes: BTreeMap<NodeRef, Node>,
    surfaces: BTreeMap<NodeRef, Quad>,
    modifiers: Cell<u32>,
    refreshes: usize,
}

impl PlaneScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mesh transform with one shape child and returns the transform.
    pub fn add_mesh(&mut self, name: &str) -> NodeRef {
        let transform = NodeRef::new(format!("|{}", name));
        let shape = NodeRef::new(format!("{}|{}Shape", transform, name));
        self.insert(transform.clone(), Node::new(false, None));
        self.insert(shape, Node::new(true, Some(transform.clone())));
        transform
    }

    /// Adds a mesh whose shape is a quad spanned by `u` and `v` from `corner`.
    pub fn add_quad(&mut self, name: &str, corner: Point3, u: DVec3, v: DVec3) -> NodeRef {
        let transform = self.add_mesh(name);
        self.surfaces.insert(transform.clone(), Quad { corner, u, v });
        transform
    }

    pub fn set_modifiers(&self, bits: u32) {
        self.modifiers.set(bits);
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }

    /// One line per node: path, translation, rotation, scale.
    pub fn describe(&self, node: &NodeRef) -> String {
        match self.nodes.get(node) {
            Some(n) => format!(
                "{} t=({:.1}, {:.1}, {:.1}) r=({:.1}, {:.1}, {:.1}) s={:.2}",
                node,
                n.translation.x,
                n.translation.y,
                n.translation.z,
                n.rotation.x,
                n.rotation.y,
                n.rotation.z,
                n.scale.x
            ),
            None => format!("{} (deleted)", node),
        }
    }

    fn insert(&mut self, id: NodeRef, node: Node) {
        if let Some(parent) = node.parent.as_ref().and_then(|p| self.nodes.get_mut(p)) {
            parent.children.push(id.clone());
        }
        self.nodes.insert(id, node);
    }

    fn unique_name(&self, base: &str) -> String {
        let taken = |name: &str| self.nodes.keys().any(|k| k.short_name() == name);
        if !taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{}{}", base, i))
            .find(|name| !taken(name))
            .unwrap_or_else(|| base.to_string())
    }

    fn remove(&mut self, node: &NodeRef) {
        let Some(removed) = self.nodes.remove(node) else {
            return;
        };
        if let Some(parent) = removed.parent.as_ref().and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|c| c != node);
        }
        for child in removed.children {
            self.remove(&child);
        }
        self.surfaces.remove(node);
    }

    fn surface(&self, node: &NodeRef) -> Option<Quad> {
        // shapes answer for their transform's quad
        self.surfaces.get(node).copied().or_else(|| {
            let parent = self.nodes.get(node)?.parent.as_ref()?;
            self.surfaces.get(parent).copied()
        })
    }
}

impl SceneHost for PlaneScene {
    fn cast_ray(
        &self,
        origin: Point3,
        direction: DVec3,
        surface: &NodeRef,
        far_clip: f64,
    ) -> Option<HostHit> {
        let quad = self.surface(surface)?;
        let normal = quad.normal();
        let denom = direction.dot(normal);
        if denom.abs() < 1e-12 {
            return None;
        }
        let t = (quad.corner - origin).dot(normal) / denom;
        if t < 0.0 || t * direction.length() > far_clip {
            return None;
        }
        let point = origin + direction * t;
        let local = point - quad.corner;
        let a = local.dot(quad.u) / quad.u.length_squared();
        let b = local.dot(quad.v) / quad.v.length_squared();
        if !(0.0..=1.0).contains(&a) || !(0.0..=1.0).contains(&b) {
            return None;
        }
        Some(HostHit {
            point,
            face_index: 0,
            sub_face_index: u32::from(a + b > 1.0),
        })
    }

    fn smooth_normal(&self, surface: &NodeRef, _point: Point3) -> Option<DVec3> {
        Some(self.surface(surface)?.normal())
    }

    fn face_triangle(&self, surface: &NodeRef, _face: u32, sub_face: u32) -> Option<[Point3; 3]> {
        Some(self.surface(surface)?.triangle(sub_face))
    }

    fn duplicate(
        &mut self,
        source: &NodeRef,
        _preserve_connections: bool,
        _as_instance: bool,
    ) -> Option<NodeRef> {
        let original = self.nodes.get(source)?.clone();
        if original.shape {
            return None;
        }
        let base = source.short_name().trim_end_matches(|c: char| c.is_ascii_digit());
        let name = self.unique_name(base);
        let copy = NodeRef::new(format!("|{}", name));
        self.insert(
            copy.clone(),
            Node {
                parent: None,
                children: Vec::new(),
                ..original.clone()
            },
        );
        let shapes = original
            .children
            .iter()
            .filter(|c| self.nodes.get(*c).is_some_and(|n| n.shape))
            .count();
        for _ in 0..shapes {
            let shape = NodeRef::new(format!("{}|{}Shape", copy, name));
            self.insert(shape, Node::new(true, Some(copy.clone())));
        }
        Some(copy)
    }

    fn world_transform(&self, node: &NodeRef) -> Option<WorldTransform> {
        let n = self.nodes.get(node)?;
        Some(WorldTransform {
            translation: n.translation,
            scale_pivot: n.translation,
            scale: n.scale,
        })
    }

    fn set_world_translation(&mut self, node: &NodeRef, translation: DVec3) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.translation = translation;
        }
    }

    fn translate_relative(&mut self, node: &NodeRef, offset: DVec3) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.translation += offset;
        }
    }

    fn set_rotation(&mut self, node: &NodeRef, euler_degrees: DVec3) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.rotation = euler_degrees;
        }
    }

    fn rotate_object_space(&mut self, node: &NodeRef, euler_degrees: DVec3) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.rotation += euler_degrees;
        }
    }

    fn scale_absolute(&mut self, node: &NodeRef, scale: DVec3) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.scale = scale;
        }
    }

    fn scale_relative(&mut self, node: &NodeRef, scale: DVec3) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.scale *= scale;
        }
    }

    fn set_visibility(&mut self, node: &NodeRef, visible: bool) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.visible = visible;
        }
    }

    fn create_group(&mut self, name: &str) -> NodeRef {
        let group = NodeRef::new(format!("|{}", self.unique_name(name)));
        let mut node = Node::new(false, None);
        node.group = true;
        self.insert(group.clone(), node);
        group
    }

    fn reparent(&mut self, child: &NodeRef, parent: &NodeRef) -> NodeRef {
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
        // names are unique scene-wide, so identifiers survive reparenting
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
        self.remove(node);
    }

    fn node_exists(&self, node: &NodeRef) -> bool {
        self.nodes.contains_key(node)
    }

    fn node_kind(&self, node: &NodeRef) -> Option<NodeKind> {
        let n = self.nodes.get(node)?;
        if n.shape {
            return Some(NodeKind::Shape);
        }
        let (shapes, transforms): (Vec<_>, Vec<_>) = n
            .children
            .iter()
            .cloned()
            .partition(|c| self.nodes.get(c).is_some_and(|c| c.shape));
        Some(NodeKind::Transform {
            shapes,
            child_transforms: transforms.len(),
        })
    }

    fn descendant_drawables(&self, node: &NodeRef) -> Vec<NodeRef> {
        let mut found = Vec::new();
        let mut queue = std::collections::VecDeque::from(self.children(node));
        while let Some(next) = queue.pop_front() {
            match self.nodes.get(&next) {
                Some(n) if n.shape => found.push(next),
                Some(_) => queue.extend(self.children(&next)),
                None => {}
            }
        }
        found
    }

    fn groups_with_prefix(&self, prefix: &str) -> Vec<NodeRef> {
        self.nodes
            .iter()
            .filter(|(id, n)| n.group && id.short_name().starts_with(prefix))
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn modifier_bits(&self) -> u32 {
        self.modifiers.get()
    }

    fn far_clip(&self) -> f64 {
        100_000.0
    }

    fn up_axis(&self) -> UpAxis {
        UpAxis::Y
    }

    fn linear_unit(&self) -> LinearUnit {
        LinearUnit::Centimeter
    }

    fn refresh_viewport(&mut self) {
        self.refreshes += 1;
    }
}
