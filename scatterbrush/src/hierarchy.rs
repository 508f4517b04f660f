//! Output grouping of placements and cleanup of scaffolding groups.

use crate::config::GroupNames;
use crate::scene::{Intersection, NodeRef, SceneHost};
use std::collections::HashMap;

/// Where placements end up once a stroke closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HierarchyPolicy {
    /// Every placement over the tool's lifetime goes into one group
    #[default]
    SingleSessionGroup,
    /// Each stroke gets a fresh group
    PerStrokeGroup,
    /// One group per source, keyed by the source's immediate parent
    PerSourceGroup,
}

/// Owns the persistent output groups and the transient scaffolding group.
#[derive(Debug, Clone, Default)]
pub struct HierarchyManager {
    names: GroupNames,
    session_group: Option<NodeRef>,
    source_groups: HashMap<NodeRef, NodeRef>,
    scaffolding: Option<NodeRef>,
}

impl HierarchyManager {
    pub fn new(names: GroupNames) -> Self {
        Self {
            names,
            ..Default::default()
        }
    }

    pub fn names(&self) -> &GroupNames {
        &self.names
    }

    pub fn session_group(&self) -> Option<&NodeRef> {
        self.session_group.as_ref()
    }

    pub fn scaffolding(&self) -> Option<&NodeRef> {
        self.scaffolding.as_ref()
    }

    /// Deletes empty scaffolding groups left behind by strokes that never closed.
    pub fn sweep_stale_scaffolding<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> usize {
        let mut removed = 0;
        for group in host.groups_with_prefix(&self.names.scaffolding) {
            if host.children(&group).is_empty() {
                log::debug!("removing empty scaffolding group {}", group);
                host.delete_node(&group);
                if self.scaffolding.as_ref() == Some(&group) {
                    self.scaffolding = None;
                }
                removed += 1;
            }
        }
        removed
    }

    /// Moves an in-progress placement into the scaffolding group, creating it on demand.
    pub fn park<H: SceneHost + ?Sized>(&mut self, host: &mut H, node: &NodeRef) -> NodeRef {
        let scaffolding = match &self.scaffolding {
            Some(group) if host.node_exists(group) => group.clone(),
            _ => {
                let group = host.create_group(&self.names.scaffolding);
                log::debug!("created scaffolding group {}", group);
                self.scaffolding = Some(group.clone());
                group
            }
        };
        host.reparent(node, &scaffolding)
    }

    /// Reparents every created instance of a closed stroke into its output group.
    ///
    /// Updates each placement's `created_instance` with the identifier the host
    /// reports after reparenting. Returns the distinct groups used, in first-use order.
    pub fn assign_stroke<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        policy: HierarchyPolicy,
        placements: &mut [Intersection],
    ) -> Vec<NodeRef> {
        let mut stroke_group = None;
        let mut used = Vec::new();
        for placement in placements.iter_mut() {
            let Some(node) = placement.created_instance.clone() else {
                continue;
            };
            if !host.node_exists(&node) {
                log::warn!("placement {} was deleted before grouping", node);
                continue;
            }
            let group = self.output_group(host, policy, placement.source_used.as_ref(), &mut stroke_group);
            placement.created_instance = Some(reparent_if_needed(host, &node, &group));
            if !used.contains(&group) {
                used.push(group);
            }
        }
        used
    }

    /// Groups a single node, as placed by the place tool.
    pub fn assign_node<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        policy: HierarchyPolicy,
        node: &NodeRef,
        source: Option<&NodeRef>,
    ) -> (NodeRef, NodeRef) {
        let group = self.output_group(host, policy, source, &mut None);
        let node = reparent_if_needed(host, node, &group);
        (node, group)
    }

    /// Deletes this stroke's scaffolding if it ended up empty, then sweeps by name.
    pub fn release_scaffolding<H: SceneHost + ?Sized>(&mut self, host: &mut H) {
        if let Some(group) = self.scaffolding.take() {
            if host.node_exists(&group) && host.children(&group).is_empty() {
                log::debug!("scaffolding group {} is empty, removing", group);
                host.delete_node(&group);
            } else if host.node_exists(&group) {
                self.scaffolding = Some(group);
            }
        }
        self.sweep_stale_scaffolding(host);
    }

    fn output_group<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        policy: HierarchyPolicy,
        source: Option<&NodeRef>,
        stroke_group: &mut Option<NodeRef>,
    ) -> NodeRef {
        match policy {
            HierarchyPolicy::SingleSessionGroup => {
                let existing = self.session_group.clone().filter(|g| host.node_exists(g));
                existing.unwrap_or_else(|| {
                    let group = host.create_group(&self.names.session);
                    self.session_group = Some(group.clone());
                    group
                })
            }
            HierarchyPolicy::PerStrokeGroup => stroke_group
                .get_or_insert_with(|| host.create_group(&self.names.stroke))
                .clone(),
            HierarchyPolicy::PerSourceGroup => {
                let Some(source) = source else {
                    return self.output_group(host, HierarchyPolicy::SingleSessionGroup, None, stroke_group);
                };
                let owner = host.parent(source).unwrap_or_else(|| source.clone());
                if let Some(group) = self.source_groups.get(&owner).filter(|g| host.node_exists(g)) {
                    return group.clone();
                }
                let name = format!("{}{}", self.names.source_prefix, owner.short_name());
                let group = host.create_group(&name);
                self.source_groups.insert(owner, group.clone());
                group
            }
        }
    }
}

fn reparent_if_needed<H: SceneHost + ?Sized>(host: &mut H, node: &NodeRef, group: &NodeRef) -> NodeRef {
    if host.parent(node).as_ref() == Some(group) {
        return node.clone();
    }
    host.reparent(node, group)
}
