//! Math types for Scatterbrush

pub use glam::{DQuat, DVec3, EulerRot};

/// A 3D coordinate in the scene's working length unit.
pub type Point3 = DVec3;

/// A ray in world space. `direction` does not need to be normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3,
    pub direction: DVec3,
}

impl Ray {
    pub fn new(origin: Point3, direction: DVec3) -> Self {
        Self { origin, direction }
    }

    /// Straight down along `up`, starting at `origin`.
    pub fn downward(origin: Point3, up: UpAxis) -> Self {
        Self {
            origin,
            direction: -up.vector(),
        }
    }

    pub fn normalized_direction(&self) -> DVec3 {
        self.direction.normalize_or_zero()
    }
}

/// World up axis reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpAxis {
    #[default]
    Y,
    Z,
}

impl UpAxis {
    pub fn vector(self) -> DVec3 {
        match self {
            Self::Y => DVec3::Y,
            Self::Z => DVec3::Z,
        }
    }

    /// Offset in the plane orthogonal to this axis, built from two jitter draws.
    pub fn horizontal_offset(self, u: f64, v: f64) -> DVec3 {
        match self {
            Self::Y => DVec3::new(u, 0.0, v),
            Self::Z => DVec3::new(u, v, 0.0),
        }
    }
}

/// Linear units a host scene may work in.
///
/// Host geometry is exchanged in centimeters; these factors convert one
/// centimeter into the given unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearUnit {
    Millimeter,
    #[default]
    Centimeter,
    Meter,
    Inch,
    Foot,
    Yard,
}

impl LinearUnit {
    pub fn per_centimeter(self) -> f64 {
        match self {
            Self::Millimeter => 10.0,
            Self::Centimeter => 1.0,
            Self::Meter => 0.01,
            Self::Inch => 0.393701,
            Self::Foot => 0.0328084,
            Self::Yard => 0.0109361,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "mm" => Some(Self::Millimeter),
            "cm" => Some(Self::Centimeter),
            "m" => Some(Self::Meter),
            "in" => Some(Self::Inch),
            "ft" => Some(Self::Foot),
            "yd" => Some(Self::Yard),
            _ => None,
        }
    }

    /// Converts a point from the host's internal centimeters into this unit.
    pub fn from_internal(self, p: Point3) -> Point3 {
        if self == Self::Centimeter {
            return p;
        }
        p * self.per_centimeter()
    }

    /// Converts a point in this unit back into the host's internal centimeters.
    pub fn to_internal(self, p: Point3) -> Point3 {
        if self == Self::Centimeter {
            return p;
        }
        p / self.per_centimeter()
    }
}

/// Hard normal of a triangle: cross product of its two normalized edges.
///
/// Returns `None` for degenerate triangles.
pub fn triangle_normal(p0: DVec3, p1: DVec3, p2: DVec3) -> Option<DVec3> {
    let a = (p1 - p0).try_normalize()?;
    let b = (p2 - p0).try_normalize()?;
    a.cross(b).try_normalize()
}

/// Euler XYZ rotation in degrees that takes `up` onto `normal` along the shortest arc.
pub fn align_rotation(up: DVec3, normal: DVec3) -> DVec3 {
    let (Some(from), Some(to)) = (up.try_normalize(), normal.try_normalize()) else {
        return DVec3::ZERO;
    };
    let (x, y, z) = DQuat::from_rotation_arc(from, to).to_euler(EulerRot::XYZ);
    DVec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}
