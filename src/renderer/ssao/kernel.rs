use glam::Vec3;
use rand::Rng;

/// Number of hemisphere samples.
pub const KERNEL_SIZE: usize = 64;
/// Edge length of the tiled rotation-noise texture.
pub const NOISE_SIZE: u32 = 4;

/// Length cap of sample `index`: `lerp(0.1, 1.0, t²)` with
/// `t = index / KERNEL_SIZE`, so samples cluster near the origin.
pub fn kernel_scale(index: usize) -> f32 {
    let t = index as f32 / KERNEL_SIZE as f32;
    0.1 + (1.0 - 0.1) * t * t
}

/// Sample offsets inside the unit +Z hemisphere, padded to `vec4`.
pub fn generate_kernel<R: Rng>(rng: &mut R) -> [[f32; 4]; KERNEL_SIZE] {
    let mut kernel = [[0.0f32; 4]; KERNEL_SIZE];
    for (i, sample) in kernel.iter_mut().enumerate() {
        let direction = Vec3::new(
            rng.random::<f32>() * 2.0 - 1.0,
            rng.random::<f32>() * 2.0 - 1.0,
            rng.random::<f32>(),
        )
        .normalize_or(Vec3::Z);
        let s = direction * rng.random::<f32>() * kernel_scale(i);
        *sample = s.extend(0.0).to_array();
    }
    kernel
}

/// Rotation vectors around +Z (z = 0, x/y in `[-1, 1]`), one per texel of
/// the noise tile.
pub fn generate_noise<R: Rng>(
    rng: &mut R,
) -> Vec<[f32; 4]> {
    (0..NOISE_SIZE * NOISE_SIZE)
        .map(|_| {
            [
                rng.random::<f32>() * 2.0 - 1.0,
                rng.random::<f32>() * 2.0 - 1.0,
                0.0,
                0.0,
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn kernel_samples_stay_in_scaled_hemisphere() {
        let mut rng = StdRng::seed_from_u64(7);
        let kernel = generate_kernel(&mut rng);
        assert_eq!(kernel.len(), 64);
        for (i, s) in kernel.iter().enumerate() {
            let v = Vec3::new(s[0], s[1], s[2]);
            assert!(v.z >= 0.0, "sample {i} below the hemisphere");
            assert!(v.length() <= 1.0 + 1e-6);
            assert!(v.length() <= kernel_scale(i) + 1e-6, "sample {i}");
            assert_eq!(s[3], 0.0);
        }
    }

    #[test]
    fn scale_grows_from_a_tenth_to_one() {
        assert_eq!(kernel_scale(0), 0.1);
        assert!(kernel_scale(63) < 1.0);
        assert!(kernel_scale(63) > 0.95);
        assert!((1..KERNEL_SIZE).all(|i| kernel_scale(i) > kernel_scale(i - 1)));
    }

    #[test]
    fn noise_rotates_around_z() {
        let mut rng = StdRng::seed_from_u64(3);
        let noise = generate_noise(&mut rng);
        assert_eq!(noise.len(), 16);
        for n in noise {
            assert!((-1.0..=1.0).contains(&n[0]));
            assert!((-1.0..=1.0).contains(&n[1]));
            assert_eq!(n[2], 0.0);
        }
    }
}
