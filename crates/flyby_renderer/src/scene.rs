//! Scene description: spheres and the materials they reference.
//!
//! The scene is built once at startup and is read-only while rendering.
//! Material indices are validated when a sphere is added, so the tracer
//! can index `materials` without checking again.

use flyby_math::Vec3;
use thiserror::Error;

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// Errors raised while assembling a scene.
#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("material index {index} out of range ({count} materials)")]
    InvalidMaterialIndex { index: usize, count: usize },

    #[error("sphere radius must be positive and finite, got {0}")]
    InvalidRadius(f32),
}

/// Surface description shared by any number of spheres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Base reflected color (RGB, 0-1)
    pub albedo: Color,
    /// Reflection perturbation, 0.0 = mirror, 1.0 = very rough
    pub roughness: f32,
}

impl Material {
    /// Create a new material.
    ///
    /// - `albedo`: The base color
    /// - `roughness`: Clamped to [0, 1]
    pub fn new(albedo: Color, roughness: f32) -> Self {
        Self {
            albedo,
            roughness: roughness.clamp(0.0, 1.0),
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Color::ONE,
            roughness: 0.0,
        }
    }
}

/// A sphere primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub position: Vec3,
    pub radius: f32,
    pub material_index: usize,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(position: Vec3, radius: f32, material_index: usize) -> Self {
        Self {
            position,
            radius,
            material_index,
        }
    }
}

/// Ordered spheres and materials.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    spheres: Vec<Sphere>,
    materials: Vec<Material>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material and return its index.
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Add a sphere and return its index.
    ///
    /// The sphere's material must already be present in the scene.
    pub fn add_sphere(&mut self, sphere: Sphere) -> Result<usize, SceneError> {
        if !(sphere.radius.is_finite() && sphere.radius > 0.0) {
            return Err(SceneError::InvalidRadius(sphere.radius));
        }
        if sphere.material_index >= self.materials.len() {
            return Err(SceneError::InvalidMaterialIndex {
                index: sphere.material_index,
                count: self.materials.len(),
            });
        }

        self.spheres.push(sphere);
        Ok(self.spheres.len() - 1)
    }

    /// Spheres in iteration (and tie-break) order.
    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Material of the sphere at `object_index`.
    #[inline]
    pub fn material_of(&self, object_index: usize) -> &Material {
        &self.materials[self.spheres[object_index].material_index]
    }

    /// The default scene: a rough pink sphere resting on a large blue ground sphere.
    ///
    /// The ground sits at +Y because image rows grow along world +Y (see `Camera`),
    /// which puts it at the bottom of the window.
    pub fn demo() -> Self {
        let mut scene = Self::new();

        let pink = scene.add_material(Material::new(Color::new(1.0, 0.0, 1.0), 1.0));
        let blue = scene.add_material(Material::new(Color::new(0.2, 0.3, 1.0), 0.1));

        scene.spheres.push(Sphere::new(Vec3::ZERO, 1.0, pink));
        scene.spheres.push(Sphere::new(Vec3::new(0.0, 101.0, 0.0), 100.0, blue));

        scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sphere_with_valid_material() {
        let mut scene = Scene::new();
        let mat = scene.add_material(Material::default());

        let index = scene.add_sphere(Sphere::new(Vec3::ZERO, 1.0, mat)).unwrap();
        assert_eq!(index, 0);
        assert_eq!(scene.spheres().len(), 1);
        assert_eq!(scene.material_of(0), &Material::default());
    }

    #[test]
    fn test_add_sphere_rejects_missing_material() {
        let mut scene = Scene::new();
        scene.add_material(Material::default());

        let err = scene
            .add_sphere(Sphere::new(Vec3::ZERO, 1.0, 3))
            .unwrap_err();
        assert_eq!(err, SceneError::InvalidMaterialIndex { index: 3, count: 1 });
        assert!(scene.spheres().is_empty());
    }

    #[test]
    fn test_add_sphere_rejects_bad_radius() {
        let mut scene = Scene::new();
        let mat = scene.add_material(Material::default());

        assert_eq!(
            scene.add_sphere(Sphere::new(Vec3::ZERO, 0.0, mat)),
            Err(SceneError::InvalidRadius(0.0))
        );
        assert!(scene.add_sphere(Sphere::new(Vec3::ZERO, f32::NAN, mat)).is_err());
        assert!(scene.add_sphere(Sphere::new(Vec3::ZERO, -2.0, mat)).is_err());
    }

    #[test]
    fn test_roughness_clamped() {
        assert_eq!(Material::new(Color::ONE, 4.0).roughness, 1.0);
        assert_eq!(Material::new(Color::ONE, -1.0).roughness, 0.0);
    }

    #[test]
    fn test_demo_scene() {
        let scene = Scene::demo();
        assert_eq!(scene.spheres().len(), 2);
        assert_eq!(scene.materials().len(), 2);

        // Every sphere references a real material
        for sphere in scene.spheres() {
            assert!(sphere.material_index < scene.materials().len());
        }

        let ground = scene.spheres()[1];
        assert_eq!(ground.position, Vec3::new(0.0, 101.0, 0.0));
        assert_eq!(ground.radius, 100.0);
        assert_eq!(scene.material_of(1).roughness, 0.1);
    }

    #[test]
    fn test_error_messages() {
        let err = SceneError::InvalidMaterialIndex { index: 2, count: 1 };
        assert_eq!(err.to_string(), "material index 2 out of range (1 materials)");
    }
}
