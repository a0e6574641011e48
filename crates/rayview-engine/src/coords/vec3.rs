use core::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Lengths below this are treated as zero when normalizing.
const NORMALIZE_EPSILON: f32 = 1e-12;

/// 3D vector in world space.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const Y: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    pub const Z: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(self, rhs: Vec3) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[inline]
    pub fn cross(self, rhs: Vec3) -> Vec3 {
        Vec3::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Returns the unit vector in the same direction.
    ///
    /// `None` for zero-length or non-finite input; callers skip the operation
    /// instead of propagating NaN.
    #[inline]
    pub fn normalized(self) -> Option<Vec3> {
        let len = self.length();
        if len > NORMALIZE_EPSILON && len.is_finite() {
            Some(self * (1.0 / len))
        } else {
            None
        }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Rotates `self` by `angle` radians around the unit vector `axis`
    /// (Rodrigues' rotation formula, right-hand rule).
    pub fn rotated_about(self, axis: Vec3, angle: f32) -> Vec3 {
        let (s, c) = angle.sin_cos();
        self * c + axis.cross(self) * s + axis * (axis.dot(self) * (1.0 - c))
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    #[inline]
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    // ── cross / dot ───────────────────────────────────────────────────────

    #[test]
    fn cross_of_basis_vectors() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(x.cross(Vec3::Y), Vec3::Z);
        assert_eq!(Vec3::Y.cross(x), -Vec3::Z);
    }

    #[test]
    fn cross_is_orthogonal_to_operands() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-4.0, 0.5, 2.0);
        let c = a.cross(b);
        assert!(c.dot(a).abs() < 1e-5);
        assert!(c.dot(b).abs() < 1e-5);
    }

    // ── normalized ────────────────────────────────────────────────────────

    #[test]
    fn normalized_has_unit_length() {
        let n = Vec3::new(3.0, -4.0, 12.0).normalized().unwrap();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalized_zero_is_none() {
        assert!(Vec3::ZERO.normalized().is_none());
    }

    #[test]
    fn normalized_nan_is_none() {
        assert!(Vec3::new(f32::NAN, 0.0, 1.0).normalized().is_none());
    }

    // ── rotated_about ─────────────────────────────────────────────────────

    #[test]
    fn quarter_turn_about_y() {
        let v = Vec3::Z.rotated_about(Vec3::Y, std::f32::consts::FRAC_PI_2);
        assert!(approx(v, Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn rotation_preserves_length() {
        let axis = Vec3::new(1.0, 1.0, 0.0).normalized().unwrap();
        let v = Vec3::new(0.3, -2.0, 5.0);
        let r = v.rotated_about(axis, 1.234);
        assert!((r.length() - v.length()).abs() < 1e-4);
    }

    #[test]
    fn rotate_then_unrotate_round_trips() {
        let axis = Vec3::new(-0.2, 0.9, 0.4).normalized().unwrap();
        let v = Vec3::new(0.6, 0.0, -0.8);
        for &theta in &[0.01f32, 0.5, 1.0, 3.0, -2.2] {
            let back = v.rotated_about(axis, theta).rotated_about(axis, -theta);
            assert!(approx(back, v), "theta = {theta}");
        }
    }

    #[test]
    fn rotation_about_own_axis_is_identity() {
        let v = Vec3::new(0.0, 2.0, 0.0);
        assert!(approx(v.rotated_about(Vec3::Y, 0.7), v));
    }
}
