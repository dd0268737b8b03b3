//! Closest-hit ray/scene intersection.

use crate::{Ray, Scene};
use flyby_math::{Interval, Vec3};

/// Result of tracing one ray against the scene.
///
/// A negative `hit_distance` means the ray missed everything; the remaining
/// fields are only meaningful on a hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitPayload {
    /// Ray parameter t of the hit (in units of the ray direction's length)
    pub hit_distance: f32,
    pub world_position: Vec3,
    /// Unit outward normal at the hit
    pub world_normal: Vec3,
    /// Index into `Scene::spheres()`
    pub object_index: usize,
}

impl HitPayload {
    /// Sentinel distance reported for a miss.
    pub const MISS_DISTANCE: f32 = -1.0;

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.hit_distance >= 0.0
    }

    #[inline]
    pub fn is_miss(&self) -> bool {
        !self.is_hit()
    }
}

/// Find the closest sphere hit in front of the ray origin.
///
/// Each sphere is tested by solving `|O + tD - C|^2 = r^2` for the near root.
/// Roots are accepted only when `0 < t < best`, so for exactly equal distances
/// the sphere that comes first in the scene wins.
pub fn trace_ray(scene: &Scene, ray: &Ray) -> HitPayload {
    // a == 0 would divide by zero below
    if ray.is_degenerate() {
        return miss(ray);
    }

    let direction = ray.direction();
    let a = direction.length_squared();

    let mut closest_sphere = None;
    let mut hit_distance = f32::MAX;

    for (index, sphere) in scene.spheres().iter().enumerate() {
        let origin = ray.origin() - sphere.position;

        let b = 2.0 * origin.dot(direction);
        let c = origin.length_squared() - sphere.radius * sphere.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            continue;
        }

        let closest_t = (-b - discriminant.sqrt()) / (2.0 * a);
        if Interval::new(0.0, hit_distance).surrounds(closest_t) {
            hit_distance = closest_t;
            closest_sphere = Some(index);
        }
    }

    match closest_sphere {
        Some(index) => closest_hit(scene, ray, hit_distance, index),
        None => miss(ray),
    }
}

/// Build the full payload for an accepted hit.
pub fn closest_hit(scene: &Scene, ray: &Ray, hit_distance: f32, object_index: usize) -> HitPayload {
    let sphere = &scene.spheres()[object_index];

    // Work relative to the sphere center so the normal is just the offset
    let origin = ray.origin() - sphere.position;
    let local_position = origin + ray.direction() * hit_distance;

    HitPayload {
        hit_distance,
        world_position: local_position + sphere.position,
        world_normal: local_position.normalize(),
        object_index,
    }
}

/// Payload for a ray that hit nothing.
pub fn miss(_ray: &Ray) -> HitPayload {
    HitPayload {
        hit_distance: HitPayload::MISS_DISTANCE,
        world_position: Vec3::ZERO,
        world_normal: Vec3::ZERO,
        object_index: 0,
    }
}
