//! Flyby Renderer - progressive CPU ray tracing
//!
//! Traces a small sphere scene one sample per pixel per frame and averages
//! the samples over time while the camera holds still. Windowing and
//! presentation live in `flyby_viewer`; this crate only produces packed
//! RGBA pixels.

mod accumulation;
mod camera;
mod hit;
mod input;
mod random;
mod renderer;
mod scene;

pub use accumulation::AccumulationBuffer;
pub use camera::Camera;
pub use hit::{closest_hit, miss, trace_ray, HitPayload};
pub use input::{InputState, MovementKey};
pub use random::{gen_f32, pixel_rng, random_vec3};
pub use renderer::{color_to_rgba, per_pixel, trace_path, FrameBuffer, RenderSettings, Renderer};
pub use scene::{Color, Material, Scene, SceneError, Sphere};

/// Re-export the math types used in this crate's API
pub use flyby_math::{Interval, Ray, Vec2, Vec3, Vec4};
