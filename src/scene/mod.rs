//! Drawables consumed by the render pipeline.
//!
//! The pipeline never owns scene objects: it borrows a slice of
//! [`Drawable`]s each frame and reads their mesh, transform and material.
//! [`Primitive`] is a minimal implementation over procedural meshes.

/// CPU mesh data, GPU mesh buffers and the vertex layout.
pub mod mesh;
/// Procedural primitives implementing [`Drawable`].
pub mod primitive;

use glam::{Mat4, Vec3};

pub use mesh::{GpuMesh, MeshData, Vertex};
pub use primitive::Primitive;

/// Surface parameters written to the G-Buffer material attachments and used
/// by the forward shaders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Base color.
    pub albedo: Vec3,
    /// Metalness in [0,1].
    pub metallic: f32,
    /// Specular tint.
    pub specular: Vec3,
    /// Perceptual roughness in [0,1].
    pub roughness: f32,
    /// Reflectance at normal incidence.
    pub fresnel: Vec3,
    /// Baked occlusion in [0,1] (1 = unoccluded).
    pub occlusion: f32,
    /// Ambient tint.
    pub ambient: Vec3,
    /// Emissive brightness multiplier.
    pub brightness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vec3::splat(0.5),
            metallic: 0.0,
            specular: Vec3::ONE,
            roughness: 0.5,
            fresnel: Vec3::splat(0.04),
            occlusion: 1.0,
            ambient: Vec3::ONE,
            brightness: 1.0,
        }
    }
}

impl Material {
    /// Default material with the given base color.
    #[must_use]
    pub fn with_albedo(albedo: Vec3) -> Self {
        Self {
            albedo,
            ..Self::default()
        }
    }
}

/// Something the pipeline can draw.
///
/// Implementors expose their geometry and surface; the pipeline's scene
/// passes pick the pipeline and bind groups for each pass.
pub trait Drawable {
    /// Geometry to draw.
    fn mesh(&self) -> &GpuMesh;
    /// Model-to-world transform.
    fn transform(&self) -> Mat4;
    /// Surface parameters.
    fn material(&self) -> Material;
    /// Whether this object is rendered into shadow maps.
    fn casts_shadow(&self) -> bool {
        true
    }
}

/// Per-object uniform (group 1, dynamic offset). Mirrors `ObjectUniform` in
/// the raster shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    /// Model-to-world matrix.
    pub model: [[f32; 4]; 4],
    /// Inverse-transpose of the model matrix.
    pub normal_matrix: [[f32; 4]; 4],
    /// `albedo.rgb`, `metallic`.
    pub albedo_metallic: [f32; 4],
    /// `specular.rgb`, `roughness`.
    pub specular_roughness: [f32; 4],
    /// `fresnel.rgb`, `occlusion`.
    pub fresnel_occlusion: [f32; 4],
    /// `ambient.rgb`, `brightness`.
    pub ambient_brightness: [f32; 4],
}

impl ObjectUniform {
    /// Uniform for one drawable.
    pub fn new(transform: Mat4, material: &Material) -> Self {
        let normal_matrix = if transform.determinant().abs() > f32::EPSILON {
            transform.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        Self {
            model: transform.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            albedo_metallic: material.albedo.extend(material.metallic).to_array(),
            specular_roughness: material
                .specular
                .extend(material.roughness)
                .to_array(),
            fresnel_occlusion: material
                .fresnel
                .extend(material.occlusion)
                .to_array(),
            ambient_brightness: material
                .ambient
                .extend(material.brightness)
                .to_array(),
        }
    }

    /// Uniform for a drawable's current state.
    pub fn from_drawable(drawable: &dyn Drawable) -> Self {
        Self::new(drawable.transform(), &drawable.material())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_uniform_is_192_bytes() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 192);
    }

    #[test]
    fn material_packs_into_channels() {
        let material = Material {
            albedo: Vec3::new(0.1, 0.2, 0.3),
            metallic: 0.9,
            roughness: 0.25,
            occlusion: 0.75,
            brightness: 2.0,
            ..Material::default()
        };
        let u = ObjectUniform::new(Mat4::IDENTITY, &material);
        assert_eq!(u.albedo_metallic, [0.1, 0.2, 0.3, 0.9]);
        assert_eq!(u.specular_roughness[3], 0.25);
        assert_eq!(u.fresnel_occlusion[3], 0.75);
        assert_eq!(u.ambient_brightness[3], 2.0);
    }

    #[test]
    fn normal_matrix_undoes_nonuniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let u = ObjectUniform::new(model, &Material::default());
        let n = Mat4::from_cols_array_2d(&u.normal_matrix);
        assert!((n.x_axis.x - 0.5).abs() < 1e-6);
        assert!((n.y_axis.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn singular_transform_falls_back_to_identity_normals() {
        let u = ObjectUniform::new(Mat4::ZERO, &Material::default());
        assert_eq!(u.normal_matrix, Mat4::IDENTITY.to_cols_array_2d());
    }
}
