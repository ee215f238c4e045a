//! Renderable objects held at scene locations

use serde::{Deserialize, Serialize};

use super::Aabb;
use crate::foundation::math::Vec3;

/// Kind of light emitted by a [`Object::Light`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    /// Light at a point, radiating in all directions
    Point,
    /// Parallel light along the local -Z axis
    Directional,
    /// Cone of light along the local -Z axis
    Spot,
}

/// The object stored at a scene location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Object {
    /// Sphere centred on the origin
    Sphere {
        /// Sphere radius
        radius: f32,
    },
    /// Box centred on the origin
    Cube {
        /// Edge lengths
        size: [f32; 3],
    },
    /// Point soup standing in for arbitrary geometry
    Mesh {
        /// Vertex positions
        positions: Vec<[f32; 3]>,
    },
    /// Light source
    Light {
        /// Light type
        kind: LightKind,
        /// Intensity multiplier
        intensity: f32,
        /// Linear colour
        color: [f32; 3],
    },
    /// Proxy standing in for unexpanded descendants
    BoundingBox(Aabb),
}

impl Object {
    /// Bound of the object in its own space
    pub fn bound(&self) -> Aabb {
        match self {
            Self::Sphere { radius } => Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(*radius)),
            Self::Cube { size } => Aabb::from_center_extents(
                Vec3::zeros(),
                Vec3::new(size[0], size[1], size[2]) * 0.5,
            ),
            Self::Mesh { positions } => {
                let mut bound = Aabb::empty();
                for p in positions {
                    bound.extend_by_point(Vec3::new(p[0], p[1], p[2]));
                }
                bound
            }
            // Lights are drawn as a small locator
            Self::Light { .. } => Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5)),
            Self::BoundingBox(bound) => *bound,
        }
    }
}
