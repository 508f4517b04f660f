//! Event types for Scatterbrush

use crate::error::PlacementError;
use crate::math::Point3;
use crate::modifiers::ModifierEdges;
use crate::scene::NodeRef;
use crate::stroke::StrokeId;

/// Which interaction a stroke drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    /// Continuous scattering along the drag
    #[default]
    Paint,
    /// One cursor object positioned interactively and committed on release
    Place,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScatterEvent {
    StrokeStarted {
        stroke: StrokeId,
        mode: ToolMode,
    },
    PlacementCreated {
        stroke: StrokeId,
        node: NodeRef,
        source: NodeRef,
        point: Point3,
    },
    PlacementGated {
        stroke: StrokeId,
        point: Point3,
    },
    PlacementFailed {
        stroke: StrokeId,
        error: PlacementError,
    },
    ModifierChanged {
        edges: ModifierEdges,
    },
    CursorUpdated {
        stroke: StrokeId,
        cursor: NodeRef,
        source: NodeRef,
    },
    StrokeClosed {
        stroke: StrokeId,
        placements: usize,
        groups: Vec<NodeRef>,
    },
}

impl ScatterEvent {
    pub fn stroke_id(&self) -> Option<StrokeId> {
        match self {
            Self::StrokeStarted { stroke, .. }
            | Self::PlacementCreated { stroke, .. }
            | Self::PlacementGated { stroke, .. }
            | Self::PlacementFailed { stroke, .. }
            | Self::CursorUpdated { stroke, .. }
            | Self::StrokeClosed { stroke, .. } => Some(*stroke),
            Self::ModifierChanged { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::PlacementFailed { .. })
    }

    pub fn is_placement_event(&self) -> bool {
        matches!(
            self,
            Self::PlacementCreated { .. } | Self::PlacementGated { .. } | Self::PlacementFailed { .. }
        )
    }
}
