//! Asset pools: the ordered collections of source assets and target surfaces.
//!
//! A pool maps a stable key (the host identifier of an asset's transform) to
//! an [`AssetEntry`]. Entries remember their registration order, which is the
//! order target surfaces are queried in, while round-robin selection walks
//! keys in sorted order.

use crate::error::{PoolError, SelectionError};
use crate::random::RandomSource;
use crate::scene::{NodeKind, NodeRef, SceneHost};
use std::collections::HashMap;

/// Per-asset override of surface alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignOverride {
    /// Follow the tool's `align` option
    #[default]
    Inherit,
    /// Always align to the surface normal
    Surface,
    /// Never align, keep the asset upright
    Upright,
}

impl AlignOverride {
    pub fn resolve(self, align: bool) -> bool {
        match self {
            Self::Inherit => align,
            Self::Surface => true,
            Self::Upright => false,
        }
    }
}

/// One selectable asset or target surface.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetEntry {
    /// Canonical identifier of the asset's transform
    pub key: NodeRef,
    /// Node used for duplication and existence checks (shape, or the group itself)
    pub drawable: NodeRef,
    pub active: bool,
    pub probability: f64,
    pub align_override: AlignOverride,
    /// Weight used when the weight map has no entry for this asset
    pub weight: f64,
    order: u64,
}

impl AssetEntry {
    pub fn new(key: NodeRef, drawable: NodeRef) -> Self {
        Self {
            key,
            drawable,
            active: true,
            probability: 0.5,
            align_override: AlignOverride::Inherit,
            weight: 1.0,
            order: 0,
        }
    }

    pub fn with_align_override(mut self, align_override: AlignOverride) -> Self {
        self.align_override = align_override;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.max(0.0);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Keyed collection of assets plus the round-robin cursor.
#[derive(Debug, Clone, Default)]
pub struct AssetPool {
    entries: HashMap<NodeRef, AssetEntry>,
    cursor: usize,
    next_order: u64,
}

impl AssetPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `node` to its transform and registers it.
    ///
    /// Shapes climb to their parent transform. A group (child transforms but
    /// no drawable of its own) is stored as one opaque unit so selecting it
    /// always places the whole group.
    pub fn add_entry<H: SceneHost + ?Sized>(
        &mut self,
        host: &H,
        node: &NodeRef,
    ) -> Result<NodeRef, PoolError> {
        let (key, kind) = resolve_transform(host, node)?;
        if self.entries.contains_key(&key) {
            return Err(PoolError::AlreadyExists(key));
        }

        let drawable = match &kind {
            NodeKind::Transform { shapes, .. } if !kind.is_group() && shapes.len() == 1 => {
                shapes[0].clone()
            }
            _ => key.clone(),
        };

        log::debug!(
            "adding {} to pool (drawable {}, group: {})",
            key,
            drawable,
            kind.is_group()
        );
        self.insert(AssetEntry::new(key.clone(), drawable))?;
        Ok(key)
    }

    /// Registers an already resolved entry.
    pub fn insert(&mut self, mut entry: AssetEntry) -> Result<(), PoolError> {
        if self.entries.contains_key(&entry.key) {
            return Err(PoolError::AlreadyExists(entry.key));
        }
        entry.order = self.next_order;
        self.next_order += 1;
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    pub fn remove_entry(&mut self, key: &NodeRef) -> Option<AssetEntry> {
        self.entries.remove(key)
    }

    /// Empties the pool and resets the round-robin cursor.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &NodeRef) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &NodeRef) -> Option<&AssetEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &NodeRef) -> Option<&mut AssetEntry> {
        self.entries.get_mut(key)
    }

    /// Entry whose key or drawable is `node`.
    pub fn find(&self, node: &NodeRef) -> Option<&AssetEntry> {
        self.entries
            .get(node)
            .or_else(|| self.entries.values().find(|e| &e.drawable == node))
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_active(&mut self, key: &NodeRef, active: bool) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.active = active;
                true
            }
            None => false,
        }
    }

    /// Entries in registration order.
    pub fn entries(&self) -> Vec<&AssetEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by_key(|e| e.order);
        entries
    }

    /// Drawables of active entries in registration order.
    pub fn active_drawables(&self) -> Vec<NodeRef> {
        self.entries()
            .into_iter()
            .filter(|e| e.active)
            .map(|e| e.drawable.clone())
            .collect()
    }

    /// First key of this pool that also appears in `other`, in sorted order.
    pub fn shared_key(&self, other: &AssetPool) -> Option<NodeRef> {
        let mut shared: Vec<_> = self.entries.keys().filter(|k| other.contains(k)).collect();
        shared.sort();
        shared.first().map(|k| (*k).clone())
    }

    /// Next active entry in sorted-key order. Advances the cursor by one per call.
    pub fn get_next(&mut self) -> Result<NodeRef, SelectionError> {
        let mut active: Vec<&AssetEntry> = self.entries.values().filter(|e| e.active).collect();
        if active.is_empty() {
            return Err(SelectionError::EmptyPool);
        }
        active.sort_by(|a, b| a.key.cmp(&b.key));
        let picked = active[self.cursor % active.len()].drawable.clone();
        self.cursor = self.cursor.wrapping_add(1);
        Ok(picked)
    }

    /// Random active entry, optionally weighted.
    ///
    /// Weights are looked up by full key, then by short name, then fall back
    /// to the entry's own weight. A non-positive total falls back to a uniform
    /// draw. Does not touch the round-robin cursor.
    pub fn get_random<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        weighted: bool,
        weights: &HashMap<String, f64>,
    ) -> Result<NodeRef, SelectionError> {
        let active: Vec<&AssetEntry> = self
            .entries()
            .into_iter()
            .filter(|e| e.active)
            .collect();
        if active.is_empty() {
            return Err(SelectionError::EmptyPool);
        }

        if weighted {
            let table: Vec<f64> = active
                .iter()
                .map(|e| {
                    weights
                        .get(e.key.as_str())
                        .or_else(|| weights.get(e.key.short_name()))
                        .copied()
                        .unwrap_or(e.weight)
                        .max(0.0)
                })
                .collect();
            let total: f64 = table.iter().sum();
            if total > 0.0 {
                let draw = rng.uniform(0.0, total);
                let mut cumulative = 0.0;
                for (entry, weight) in active.iter().zip(&table) {
                    cumulative += weight;
                    if cumulative > draw {
                        return Ok(entry.drawable.clone());
                    }
                }
                // float rounding left the draw past the last bucket
                if let Some((entry, _)) = active.iter().zip(&table).rev().find(|(_, w)| **w > 0.0) {
                    return Ok(entry.drawable.clone());
                }
            }
            log::debug!("source weights sum to {}, falling back to uniform selection", total);
        }

        Ok(active[rng.index(active.len())].drawable.clone())
    }
}

/// Resolves a node to its positionable transform.
fn resolve_transform<H: SceneHost + ?Sized>(
    host: &H,
    node: &NodeRef,
) -> Result<(NodeRef, NodeKind), PoolError> {
    match host.node_kind(node) {
        Some(kind @ NodeKind::Transform { .. }) => Ok((node.clone(), kind)),
        Some(NodeKind::Shape) => {
            let parent = host
                .parent(node)
                .ok_or_else(|| PoolError::NoTransform(node.clone()))?;
            match host.node_kind(&parent) {
                Some(kind @ NodeKind::Transform { .. }) => Ok((parent, kind)),
                _ => Err(PoolError::NoTransform(node.clone())),
            }
        }
        None => Err(PoolError::NoTransform(node.clone())),
    }
}
