//! Geometry kernel: vector helpers glam does not provide and the simulation cube
//!
//! Dot, cross, and magnitude come straight from [`glam::DVec3`]; this module only
//! adds the fast inverse square root normalization, perfect-cube arithmetic used
//! by the partitioner, and the axis-aligned [`Cube`] domain.

use glam::DVec3;

/// Three-component vector used throughout the simulation
pub type Vector3 = DVec3;

/// Axis-aligned cubic simulation domain.
///
/// Invariant: `max - min == (side, side, side)`. The domain is static for the
/// lifetime of a simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cube {
    /// Reference point of the domain; grid cells are laid out from here
    pub origin: Vector3,
    pub min: Vector3,
    pub max: Vector3,
    pub side: f64,
}

impl Cube {
    /// Create a cube whose minimum corner (and origin) is `origin`.
    ///
    /// Returns `None` when `side` is not a positive finite number.
    pub fn new(origin: Vector3, side: f64) -> Option<Self> {
        if !(side.is_finite() && side > 0.0) || !origin.is_finite() {
            return None;
        }
        Some(Self {
            origin,
            min: origin,
            max: origin + Vector3::splat(side),
            side,
        })
    }

    /// Cube spanning `[0, side]` on every axis
    pub fn with_side(side: f64) -> Option<Self> {
        Self::new(Vector3::ZERO, side)
    }

    pub fn center(&self) -> Vector3 {
        self.min + Vector3::splat(self.side * 0.5)
    }

    pub fn volume(&self) -> f64 {
        self.side * self.side * self.side
    }

    /// Whether `point` lies inside the closed cube
    pub fn contains(&self, point: Vector3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Quake III fast inverse square root, one Newton iteration.
///
/// Relative error stays below 0.2% for positive normal inputs.
#[inline]
pub fn fast_inv_sqrt(number: f32) -> f32 {
    let x2 = number * 0.5;
    let i = 0x5f37_59df_u32.wrapping_sub(number.to_bits() >> 1);
    let y = f32::from_bits(i);
    y * (1.5 - x2 * y * y)
}

/// Normalize `v` using [`fast_inv_sqrt`]. Zero-length input yields zero.
#[inline]
pub fn fast_normalize(v: Vector3) -> Vector3 {
    let length_squared = v.length_squared();
    if length_squared <= f64::EPSILON {
        return Vector3::ZERO;
    }
    v * fast_inv_sqrt(length_squared as f32) as f64
}

/// Integer cube root, rounded down
pub fn cube_root(n: usize) -> usize {
    let mut root = (n as f64).cbrt().round() as usize;
    // cbrt is not exact for large inputs, settle on the integer floor
    while root > 0 && root.checked_pow(3).map_or(true, |cube| cube > n) {
        root -= 1;
    }
    while (root + 1).checked_pow(3).is_some_and(|cube| cube <= n) {
        root += 1;
    }
    root
}

pub fn is_perfect_cube(n: usize) -> bool {
    let root = cube_root(n);
    root.pow(3) == n
}

/// Smallest perfect cube strictly greater than `n`, or `None` on overflow
pub fn next_perfect_cube(n: usize) -> Option<usize> {
    let root = cube_root(n).checked_add(1)?;
    root.checked_mul(root)?.checked_mul(root)
}

/// View a slice of vectors as a flat `[x0, y0, z0, x1, ...]` slice
pub fn flatten_vectors(vectors: &[Vector3]) -> &[f64] {
    bytemuck::cast_slice(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_corners() {
        let cube = Cube::new(Vector3::new(1.0, 2.0, 3.0), 4.0).unwrap();
        assert_eq!(cube.min, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(cube.max, Vector3::new(5.0, 6.0, 7.0));
        assert_eq!(cube.max - cube.min, Vector3::splat(cube.side));
        assert_eq!(cube.center(), Vector3::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn test_cube_rejects_bad_side() {
        assert!(Cube::with_side(0.0).is_none());
        assert!(Cube::with_side(-1.0).is_none());
        assert!(Cube::with_side(f64::NAN).is_none());
    }

    #[test]
    fn test_fast_inv_sqrt() {
        for &x in &[0.25_f32, 1.0, 2.0, 10.0, 1234.5] {
            let exact = 1.0 / x.sqrt();
            let fast = fast_inv_sqrt(x);
            assert!((fast - exact).abs() / exact < 2e-3, "x = {x}");
        }
    }

    #[test]
    fn test_fast_normalize() {
        let n = fast_normalize(Vector3::new(3.0, 4.0, 0.0));
        assert!((n.length() - 1.0).abs() < 2e-3);
        assert!((n.x - 0.6).abs() < 2e-3);
        assert_eq!(fast_normalize(Vector3::ZERO), Vector3::ZERO);
    }

    #[test]
    fn test_perfect_cubes() {
        assert_eq!(cube_root(0), 0);
        assert_eq!(cube_root(1), 1);
        assert_eq!(cube_root(26), 2);
        assert_eq!(cube_root(27), 3);
        assert_eq!(cube_root(1_000_000), 100);
        assert!(is_perfect_cube(1));
        assert!(is_perfect_cube(8));
        assert!(is_perfect_cube(3375));
        assert!(!is_perfect_cube(9));
        assert_eq!(next_perfect_cube(1), Some(8));
        assert_eq!(next_perfect_cube(8), Some(27));
        assert_eq!(next_perfect_cube(9), Some(27));
        assert_eq!(next_perfect_cube(0), Some(1));
    }

    #[test]
    fn test_cube_root_of_largest_values() {
        for n in [usize::MAX, usize::MAX - 1, usize::MAX / 2] {
            let root = cube_root(n);
            assert!(root.checked_pow(3).is_some_and(|cube| cube <= n), "{n}");
            assert!((root + 1).checked_pow(3).map_or(true, |cube| cube > n), "{n}");
        }
        assert!(!is_perfect_cube(usize::MAX));
        assert_eq!(next_perfect_cube(usize::MAX), None);
    }

    #[test]
    fn test_flatten_vectors() {
        let vectors = [Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)];
        assert_eq!(flatten_vectors(&vectors), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
