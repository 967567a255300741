//! Light-space projection math.
//!
//! All matrices use glam's right-handed conventions with a `[0, 1]` depth
//! range, matching wgpu clip space.

use glam::{Mat4, Vec3};

/// Half extent of the orthographic box used for directional shadows.
pub const DIRECTIONAL_EXTENT: f32 = 10.0;

/// Forward and up vectors of the six cube faces, in layer order
/// (+X, -X, +Y, -Y, +Z, -Z).
pub const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

/// View matrix looking from `position` along `direction`.
///
/// Falls back to +Z as the up vector when `direction` is (anti)parallel to
/// +Y, where `look_at_rh` would be degenerate.
pub fn light_view(position: Vec3, direction: Vec3) -> Mat4 {
    let forward = direction.normalize_or(Vec3::NEG_Y);
    let up = if forward.dot(Vec3::Y).abs() > 0.999 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    Mat4::look_at_rh(position, position + forward, up)
}

/// Orthographic light-space matrix of a directional light.
pub fn directional(position: Vec3, direction: Vec3, near: f32, far: f32) -> Mat4 {
    let projection = Mat4::orthographic_rh(
        -DIRECTIONAL_EXTENT,
        DIRECTIONAL_EXTENT,
        -DIRECTIONAL_EXTENT,
        DIRECTIONAL_EXTENT,
        near,
        far,
    );
    projection * light_view(position, direction)
}

/// Perspective light-space matrix of a spotlight whose outer cone has
/// cosine `outer_cut_off`.
pub fn spot(
    position: Vec3,
    direction: Vec3,
    outer_cut_off: f32,
    near: f32,
    far: f32,
) -> Mat4 {
    let fov = 2.0 * outer_cut_off.clamp(-1.0, 1.0).acos();
    let fov = fov.clamp(0.01, std::f32::consts::PI - 0.01);
    Mat4::perspective_rh(fov, 1.0, near, far) * light_view(position, direction)
}

/// 90° projection of one cube face.
///
/// Flipped vertically so that rendering into layer `i` lands where cube
/// sampling along that face expects it. The flip reverses triangle winding;
/// the cube shadow pipeline compensates by treating clockwise as front.
pub fn cube_projection(near: f32, far: f32) -> Mat4 {
    Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
        * Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, near, far)
}

/// Light-space matrices of the six faces of a point light's cube map.
pub fn point_faces(position: Vec3, near: f32, far: f32) -> [Mat4; 6] {
    let projection = cube_projection(near, far);
    CUBE_FACES.map(|(forward, up)| {
        projection * Mat4::look_at_rh(position, position + forward, up)
    })
}

/// Depth a cube face stores for a point at `offset` from the light.
///
/// The distance along the dominant axis goes through the same perspective
/// mapping the face projection applies, which is what the shadowed shader
/// compares cube samples against.
pub fn cube_reference_depth(offset: Vec3, near: f32, far: f32) -> f32 {
    let d = offset.abs().max_element().max(f32::EPSILON);
    far * (d - near) / (d * (far - near))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn assert_vec_near(a: Vec3, b: Vec3) {
        assert!((a - b).length() < EPS, "{a} != {b}");
    }

    #[test]
    fn every_view_maps_light_position_to_origin() {
        let position = Vec3::new(-6.0, 8.0, -6.0);
        let directions = [
            -position.normalize(),
            Vec3::NEG_Y,
            Vec3::Y,
            Vec3::new(-1.0, -1.0, -1.0).normalize(),
        ];
        for direction in directions {
            let view = light_view(position, direction);
            assert_vec_near(view.transform_point3(position), Vec3::ZERO);
        }
        for (forward, up) in CUBE_FACES {
            let view = Mat4::look_at_rh(position, position + forward, up);
            assert_vec_near(view.transform_point3(position), Vec3::ZERO);
        }
    }

    #[test]
    fn directional_light_sees_the_origin() {
        let position = Vec3::new(-6.0, 8.0, -6.0);
        let m = directional(position, -position.normalize(), 1.0, 25.0);
        let ndc = m.project_point3(Vec3::ZERO);
        assert!(ndc.x.abs() < EPS && ndc.y.abs() < EPS);
        // |position| is about 11.66, inside [near, far].
        let expected = (position.length() - 1.0) / 24.0;
        assert!((ndc.z - expected).abs() < EPS, "{}", ndc.z);
    }

    #[test]
    fn unit_cube_fits_directional_frustum() {
        let position = Vec3::new(-6.0, 8.0, -6.0);
        let m = directional(position, -position.normalize(), 1.0, 25.0);
        for x in [-0.5, 0.5] {
            for y in [-0.5, 0.5] {
                for z in [-0.5, 0.5] {
                    let ndc = m.project_point3(Vec3::new(x, y, z));
                    assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0);
                    assert!((0.0..=1.0).contains(&ndc.z));
                }
            }
        }
    }

    #[test]
    fn spot_field_of_view_follows_outer_cone() {
        let outer = 30f32.to_radians().cos();
        let m = spot(Vec3::ZERO, Vec3::NEG_Z, outer, 1.0, 25.0);
        // A point on the outer cone lies on the frustum edge.
        let edge = Vec3::new(30f32.to_radians().tan() * 5.0, 0.0, -5.0);
        let ndc = m.project_point3(edge);
        assert!((ndc.x - 1.0).abs() < 1e-3, "{}", ndc.x);
    }

    #[test]
    fn cube_face_depth_matches_reference() {
        let position = Vec3::new(1.0, 2.0, 3.0);
        let faces = point_faces(position, 1.0, 25.0);
        let offsets = [
            Vec3::new(5.0, 1.0, -2.0),
            Vec3::new(-4.0, 0.5, 1.0),
            Vec3::new(0.3, 7.0, 1.0),
            Vec3::new(-1.0, -3.0, 0.5),
            Vec3::new(1.0, 1.0, 6.0),
            Vec3::new(0.0, 2.0, -9.0),
        ];
        for (face, offset) in offsets.into_iter().enumerate() {
            let ndc = faces[face].project_point3(position + offset);
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "face {face}");
            let reference = cube_reference_depth(offset, 1.0, 25.0);
            assert!((ndc.z - reference).abs() < EPS, "face {face}");
        }
    }

    #[test]
    fn cube_rows_follow_sampling_convention() {
        // On +X, cube sampling puts -Y world toward the bottom row (v = 1),
        // which is NDC y = -1 after the flip.
        let faces = point_faces(Vec3::ZERO, 1.0, 25.0);
        let ndc = faces[0].project_point3(Vec3::new(5.0, -4.0, 0.0));
        assert!(ndc.y < 0.0, "{}", ndc.y);
        // On +Y, sampling maps +Z toward the bottom row.
        let ndc = faces[2].project_point3(Vec3::new(0.0, 5.0, 4.0));
        assert!(ndc.y < 0.0, "{}", ndc.y);
    }
}
