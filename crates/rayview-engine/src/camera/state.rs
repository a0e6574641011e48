use crate::coords::Vec3;

/// Smallest `|direction x up|` (sine of the angle between them) accepted as a basis.
const MIN_BASIS_SINE: f32 = 1e-4;

#[inline]
fn spans_basis(direction: Vec3, up: Vec3) -> bool {
    direction.cross(up).length() >= MIN_BASIS_SINE
}

/// Camera pose.
///
/// Invariants:
/// - `direction` and `up` are unit length
/// - `direction x up` is non-zero (the basis never collapses)
///
/// `up` is the world reference axis; it is fixed for the lifetime of the pose.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
}

impl CameraState {
    /// Builds a pose from a position, view direction and up reference.
    ///
    /// Returns `None` if either vector is zero-length or they are parallel.
    pub fn new(position: Vec3, direction: Vec3, up: Vec3) -> Option<Self> {
        let direction = direction.normalized()?;
        let up = up.normalized()?;
        spans_basis(direction, up).then_some(Self { position, direction, up })
    }

    /// Builds a pose at `position` looking toward `target`.
    pub fn looking_at(position: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        Self::new(position, target - position, up)
    }

    /// Point one unit ahead of the camera.
    ///
    /// The compute program takes a target point rather than a direction.
    #[inline]
    pub fn look_target(&self) -> Vec3 {
        self.position + self.direction
    }

    /// Side axis `normalize(direction x up)`.
    ///
    /// With the left-handed basis the scene program builds, this points to the
    /// left edge of the screen.
    #[inline]
    pub fn right_axis(&self) -> Option<Vec3> {
        self.direction.cross(self.up).normalized()
    }

    /// Camera-relative vertical axis `normalize((direction x up) x direction)`.
    #[inline]
    pub fn yaw_axis(&self) -> Option<Vec3> {
        self.direction
            .cross(self.up)
            .cross(self.direction)
            .normalized()
    }

    /// Rotates `direction` by `angle` radians around `axis`.
    ///
    /// The rotation is rejected (and `false` returned) if it would make
    /// `direction` parallel to `up` or produce a non-finite vector.
    pub fn rotate_direction(&mut self, axis: Vec3, angle: f32) -> bool {
        if angle == 0.0 || !angle.is_finite() {
            return false;
        }

        let Some(candidate) = self.direction.rotated_about(axis, angle).normalized() else {
            return false;
        };
        if !spans_basis(candidate, self.up) {
            return false;
        }

        self.direction = candidate;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_vectors() {
        let cam = CameraState::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 2.0, 0.0))
            .unwrap();
        assert_eq!(cam.direction, Vec3::Z);
        assert_eq!(cam.up, Vec3::Y);
    }

    #[test]
    fn new_rejects_parallel_basis() {
        assert!(CameraState::new(Vec3::ZERO, Vec3::Y, Vec3::Y).is_none());
        assert!(CameraState::new(Vec3::ZERO, -Vec3::Y, Vec3::Y).is_none());
    }

    #[test]
    fn new_rejects_zero_direction() {
        assert!(CameraState::new(Vec3::ZERO, Vec3::ZERO, Vec3::Y).is_none());
    }

    #[test]
    fn look_target_is_position_plus_direction() {
        let cam = CameraState::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Z, Vec3::Y).unwrap();
        assert_eq!(cam.look_target(), Vec3::new(1.0, 2.0, 4.0));
    }

    #[test]
    fn looking_at_points_toward_target() {
        let cam = CameraState::looking_at(
            Vec3::new(14.0, 10.0, 14.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::Y,
        )
        .unwrap();
        let expected = (Vec3::new(0.0, 2.0, 0.0) - cam.position).normalized().unwrap();
        assert!((cam.direction - expected).length() < 1e-6);
    }

    #[test]
    fn rotation_onto_up_is_rejected() {
        let mut cam = CameraState::new(Vec3::ZERO, Vec3::Z, Vec3::Y).unwrap();
        let axis = cam.right_axis().unwrap();
        // direction x up = -X here; a quarter turn about it lands on +up.
        assert!(!cam.rotate_direction(axis, std::f32::consts::FRAC_PI_2));
        assert_eq!(cam.direction, Vec3::Z);
    }

    #[test]
    fn small_pitch_is_accepted() {
        let mut cam = CameraState::new(Vec3::ZERO, Vec3::Z, Vec3::Y).unwrap();
        let axis = cam.right_axis().unwrap();
        assert!(cam.rotate_direction(axis, 0.1));
        assert!((cam.direction.length() - 1.0).abs() < 1e-6);
    }
}
