use glam::{Mat4, Quat, Vec3};

use super::{Drawable, GpuMesh, Material, MeshData};

/// A procedural mesh placed in the world.
pub struct Primitive {
    /// Debug name.
    pub name: String,
    mesh: GpuMesh,
    /// World-space translation.
    pub position: Vec3,
    /// Orientation.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
    /// Surface parameters.
    pub material: Material,
    /// Whether this primitive is rendered into shadow maps.
    pub casts_shadow: bool,
}

impl Primitive {
    /// Upload `data` and place it at the origin.
    pub fn new(device: &wgpu::Device, name: &str, data: &MeshData) -> Self {
        Self {
            name: name.to_owned(),
            mesh: data.upload(device, name),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            material: Material::default(),
            casts_shadow: true,
        }
    }

    /// Unit cube.
    pub fn cube(device: &wgpu::Device) -> Self {
        Self::new(device, "Cube", &MeshData::cube())
    }

    /// Ground plane of the given edge length.
    pub fn plane(device: &wgpu::Device, size: f32) -> Self {
        Self::new(device, "Plane", &MeshData::plane(size))
    }

    /// UV sphere.
    pub fn sphere(device: &wgpu::Device, radius: f32) -> Self {
        Self::new(device, "Sphere", &MeshData::uv_sphere(radius, 24, 32))
    }

    /// Builder-style translation.
    #[must_use]
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder-style material.
    #[must_use]
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }
}

impl Drawable for Primitive {
    fn mesh(&self) -> &GpuMesh {
        &self.mesh
    }

    fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale,
            self.rotation,
            self.position,
        )
    }

    fn material(&self) -> Material {
        self.material
    }

    fn casts_shadow(&self) -> bool {
        self.casts_shadow
    }
}
