//! Interactive fly camera with a cached per-pixel ray direction table.
//!
//! Rows of the table map bottom-to-top in normalized device coordinates:
//! row 0 is NDC y = -1, so image rows grow along the camera's up axis.

use crate::input::{InputState, MovementKey};
use flyby_math::{Mat4, Quat, Vec2, Vec3, Vec4};
use rayon::prelude::*;

/// Base rotation speed in radians per unit of scaled mouse delta, at a 45° FOV.
const BASE_ROTATION_SPEED: f32 = 0.3;

/// Position/orientation changes below this are treated as no movement.
const MOVE_EPSILON: f32 = 1e-6;

/// Stop pitching before the forward vector lines up with world up.
const MAX_PITCH_COS: f32 = 0.999;

/// Fly camera driven by an `InputState`.
#[derive(Debug, Clone)]
pub struct Camera {
    projection: Mat4,
    view: Mat4,
    inverse_projection: Mat4,
    inverse_view: Mat4,

    vertical_fov: f32, // Degrees
    near_clip: f32,
    far_clip: f32,

    position: Vec3,
    forward_direction: Vec3,

    // Movement settings
    move_speed: f32,        // World units per second
    mouse_sensitivity: f32, // Scale applied to cursor deltas in pixels

    // Cached ray directions, one per pixel
    ray_directions: Vec<Vec3>,

    last_mouse_position: Option<Vec2>,

    viewport_width: u32,
    viewport_height: u32,
}

impl Camera {
    /// Create a camera at (0, 0, 6) looking down -Z.
    ///
    /// The FOV is expected to lie strictly between 0 and 180 degrees.
    pub fn new(vertical_fov: f32, near_clip: f32, far_clip: f32) -> Self {
        let mut camera = Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            inverse_projection: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
            vertical_fov,
            near_clip,
            far_clip,
            position: Vec3::new(0.0, 0.0, 6.0),
            forward_direction: Vec3::NEG_Z,
            move_speed: 5.0,
            mouse_sensitivity: 0.002,
            ray_directions: Vec::new(),
            last_mouse_position: None,
            viewport_width: 0,
            viewport_height: 0,
        };
        camera.recalculate_view();
        camera
    }

    /// Set camera position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self.refresh();
        self
    }

    /// Set the forward direction (normalized here).
    pub fn with_direction(mut self, forward: Vec3) -> Self {
        let forward = forward.normalize_or_zero();
        self.forward_direction = if forward == Vec3::ZERO { Vec3::NEG_Z } else { forward };
        self.refresh();
        self
    }

    /// Set translation speed in world units per second.
    pub fn with_move_speed(mut self, move_speed: f32) -> Self {
        self.move_speed = move_speed;
        self
    }

    /// Set the scale applied to cursor movement before rotating.
    pub fn with_mouse_sensitivity(mut self, mouse_sensitivity: f32) -> Self {
        self.mouse_sensitivity = mouse_sensitivity;
        self
    }

    /// Apply one frame of input.
    ///
    /// Movement keys translate along forward/right/up; cursor movement rotates
    /// only while the look button is held. Returns true when the camera moved,
    /// in which case the view and ray directions have been recomputed.
    pub fn on_update(&mut self, input: &InputState, delta_time: f32) -> bool {
        let mouse_position = input.mouse_position;
        let delta = match self.last_mouse_position {
            Some(last) => (mouse_position - last) * self.mouse_sensitivity,
            None => Vec2::ZERO,
        };
        self.last_mouse_position = Some(mouse_position);

        let mut moved = false;

        let up_direction = Vec3::Y;
        let right_direction = self.forward_direction.cross(up_direction).normalize_or_zero();

        // Movement
        let mut translation = Vec3::ZERO;
        for key in MovementKey::ALL {
            if !input.is_down(key) {
                continue;
            }
            translation += match key {
                MovementKey::Forward => self.forward_direction,
                MovementKey::Backward => -self.forward_direction,
                MovementKey::Left => -right_direction,
                MovementKey::Right => right_direction,
                MovementKey::Down => -up_direction,
                MovementKey::Up => up_direction,
            };
        }
        let translation = translation * self.move_speed * delta_time;
        if translation.length() > MOVE_EPSILON {
            self.position += translation;
            moved = true;
        }

        // Rotation
        if input.look && delta != Vec2::ZERO {
            let pitch_delta = delta.y * self.rotation_speed();
            let yaw_delta = delta.x * self.rotation_speed();

            let yaw = Quat::from_axis_angle(up_direction, -yaw_delta);
            let pitch = if right_direction == Vec3::ZERO {
                Quat::IDENTITY
            } else {
                Quat::from_axis_angle(right_direction, -pitch_delta)
            };

            let mut forward = ((pitch * yaw).normalize() * self.forward_direction).normalize();
            if forward.dot(up_direction).abs() > MAX_PITCH_COS {
                forward = (yaw * self.forward_direction).normalize();
            }

            if (forward - self.forward_direction).length() > MOVE_EPSILON {
                self.forward_direction = forward;
                moved = true;
            }
        }

        if moved {
            self.recalculate_view();
            self.recalculate_ray_directions();
        }

        moved
    }

    /// Match the viewport size, rebuilding projection and ray directions on change.
    ///
    /// Zero-sized viewports are ignored.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width == self.viewport_width && height == self.viewport_height {
            return;
        }

        self.viewport_width = width;
        self.viewport_height = height;

        self.recalculate_projection();
        self.recalculate_ray_directions();
    }

    /// Mouse rotation speed, scaled with the field of view so narrow lenses turn slower.
    pub fn rotation_speed(&self) -> f32 {
        BASE_ROTATION_SPEED * self.vertical_fov / 45.0
    }

    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    pub fn inverse_projection(&self) -> &Mat4 {
        &self.inverse_projection
    }

    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    pub fn inverse_view(&self) -> &Mat4 {
        &self.inverse_view
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn direction(&self) -> Vec3 {
        self.forward_direction
    }

    /// Per-pixel unit ray directions, indexed `x + y * width`.
    pub fn ray_directions(&self) -> &[Vec3] {
        &self.ray_directions
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    fn refresh(&mut self) {
        self.recalculate_view();
        self.recalculate_ray_directions();
    }

    fn recalculate_projection(&mut self) {
        let aspect = self.viewport_width as f32 / self.viewport_height as f32;
        self.projection = Mat4::perspective_rh(
            self.vertical_fov.to_radians(),
            aspect,
            self.near_clip,
            self.far_clip,
        );
        self.inverse_projection = self.projection.inverse();
    }

    fn recalculate_view(&mut self) {
        self.view = Mat4::look_at_rh(
            self.position,
            self.position + self.forward_direction,
            Vec3::Y,
        );
        self.inverse_view = self.view.inverse();
    }

    fn recalculate_ray_directions(&mut self) {
        let width = self.viewport_width as usize;
        let height = self.viewport_height as usize;
        if width == 0 || height == 0 {
            return;
        }

        self.ray_directions.resize(width * height, Vec3::ZERO);

        let inverse_projection = self.inverse_projection;
        let inverse_view = self.inverse_view;

        self.ray_directions
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, direction) in row.iter_mut().enumerate() {
                    let coord = Vec2::new(x as f32 / width as f32, y as f32 / height as f32) * 2.0 - 1.0;

                    // Point on the far plane, back into view space
                    let target = inverse_projection * Vec4::new(coord.x, coord.y, 1.0, 1.0);
                    let local = (target.truncate() / target.w).normalize();

                    *direction = inverse_view.transform_vector3(local).normalize();
                }
            });
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(45.0, 0.1, 100.0)
    }
}
