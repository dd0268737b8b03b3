//! Viewer settings fixed at startup.

/// Window and camera parameters owned by the viewer.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub target_fps: u32,

    /// Vertical field of view in degrees, strictly between 0 and 180
    pub vertical_fov: f32,
    pub near_clip: f32,
    pub far_clip: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Flyby".to_string(),
            width: 1280,
            height: 720,
            fullscreen: false,
            target_fps: 60,
            vertical_fov: 45.0,
            near_clip: 0.1,
            far_clip: 100.0,
        }
    }
}
