//! Positions and object footprints.
//!
//! All simulation geometry is `f32`. Footprints are either circles
//! (sphere/cylinder geometry) or oriented rectangles (box geometry) described
//! by a major and minor half-extent.

use std::f32::consts::PI;
use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

use super::rng::GameRng;

/// A point or vector in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coord3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Coord3 {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The origin.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[must_use]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Length ignoring the z component.
    #[must_use]
    pub fn length_2d(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Squared horizontal distance to another point.
    #[must_use]
    pub fn distance_sq_2d(self, other: Coord3) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Horizontal distance to another point.
    #[must_use]
    pub fn distance_2d(self, other: Coord3) -> f32 {
        self.distance_sq_2d(other).sqrt()
    }

    /// Unit vector in the horizontal plane, or zero for a zero vector.
    #[must_use]
    pub fn normalized_2d(self) -> Coord3 {
        let len = self.length_2d();
        if len <= f32::EPSILON {
            Coord3::zero()
        } else {
            Coord3::new(self.x / len, self.y / len, 0.0)
        }
    }

    /// Heading of the horizontal component, in radians.
    #[must_use]
    pub fn heading(self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Rotate the horizontal component about the z axis.
    #[must_use]
    pub fn rotated_2d(self, angle: f32) -> Coord3 {
        let (s, c) = angle.sin_cos();
        Coord3::new(self.x * c - self.y * s, self.x * s + self.y * c, self.z)
    }
}

impl Add for Coord3 {
    type Output = Coord3;

    fn add(self, rhs: Coord3) -> Coord3 {
        Coord3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Coord3 {
    fn add_assign(&mut self, rhs: Coord3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Coord3 {
    type Output = Coord3;

    fn sub(self, rhs: Coord3) -> Coord3 {
        Coord3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Coord3 {
    type Output = Coord3;

    fn mul(self, rhs: f32) -> Coord3 {
        Coord3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Footprint shape of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryShape {
    Sphere,
    Cylinder,
    Box,
}

/// Footprint and height of an object.
///
/// For circular shapes `major_radius` is the radius and `minor_radius` is
/// ignored. For boxes both are half-extents along the object's local x and y.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryInfo {
    pub shape: GeometryShape,
    pub major_radius: f32,
    pub minor_radius: f32,
    pub height: f32,
}

impl GeometryInfo {
    /// A cylinder of the given radius.
    #[must_use]
    pub fn circle(radius: f32) -> Self {
        Self {
            shape: GeometryShape::Cylinder,
            major_radius: radius,
            minor_radius: radius,
            height: 10.0,
        }
    }

    /// A box with the given half-extents.
    #[must_use]
    pub fn rect(major_radius: f32, minor_radius: f32) -> Self {
        Self {
            shape: GeometryShape::Box,
            major_radius,
            minor_radius,
            height: 10.0,
        }
    }

    #[must_use]
    pub fn is_rectangular(&self) -> bool {
        self.shape == GeometryShape::Box
    }

    /// Radius of the smallest circle containing the footprint.
    #[must_use]
    pub fn bounding_circle_radius(&self) -> f32 {
        if self.is_rectangular() {
            (self.major_radius * self.major_radius + self.minor_radius * self.minor_radius).sqrt()
        } else {
            self.major_radius
        }
    }

    /// Grow the footprint outward by `distance` on every side.
    pub fn expand_footprint(&mut self, distance: f32) {
        self.major_radius += distance;
        self.minor_radius += distance;
    }

    /// Replace the footprint with its bounding circle.
    pub fn make_circular(&mut self) {
        let radius = self.bounding_circle_radius();
        self.shape = GeometryShape::Cylinder;
        self.major_radius = radius;
        self.minor_radius = radius;
    }

    #[must_use]
    pub fn footprint_area(&self) -> f32 {
        if self.is_rectangular() {
            4.0 * self.major_radius * self.minor_radius
        } else {
            PI * self.major_radius * self.major_radius
        }
    }

    /// Does the footprint, placed at `center` with `orientation`, contain `pt`?
    #[must_use]
    pub fn contains_point(&self, center: Coord3, orientation: f32, pt: Coord3) -> bool {
        let local = (pt - center).rotated_2d(-orientation);
        if self.is_rectangular() {
            local.x.abs() <= self.major_radius && local.y.abs() <= self.minor_radius
        } else {
            local.x * local.x + local.y * local.y <= self.major_radius * self.major_radius
        }
    }

    /// The four footprint corners in world space, counter-clockwise.
    #[must_use]
    pub fn corners(&self, center: Coord3, orientation: f32) -> [Coord3; 4] {
        let (a, b) = (self.major_radius, self.minor_radius);
        [
            Coord3::new(a, b, 0.0),
            Coord3::new(-a, b, 0.0),
            Coord3::new(-a, -b, 0.0),
            Coord3::new(a, -b, 0.0),
        ]
        .map(|c| {
            let r = c.rotated_2d(orientation);
            Coord3::new(center.x + r.x, center.y + r.y, center.z)
        })
    }

    /// A uniformly random point inside the footprint.
    pub fn random_point_within(&self, center: Coord3, orientation: f32, rng: &mut GameRng) -> Coord3 {
        let local = if self.is_rectangular() {
            Coord3::new(
                rng.random_real(-self.major_radius, self.major_radius),
                rng.random_real(-self.minor_radius, self.minor_radius),
                0.0,
            )
        } else {
            let angle = rng.random_real(-PI, PI);
            let radius = self.major_radius * rng.random_real(0.0, 1.0).sqrt();
            Coord3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
        };
        let r = local.rotated_2d(orientation);
        Coord3::new(center.x + r.x, center.y + r.y, center.z)
    }
}

impl Default for GeometryInfo {
    fn default() -> Self {
        Self::circle(5.0)
    }
}
