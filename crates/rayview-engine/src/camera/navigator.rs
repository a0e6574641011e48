use crate::coords::{Vec2, Vec3};

use super::state::CameraState;

/// Navigation tuning.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NavigationConfig {
    /// Strafe speed `K` in world units per second at coefficient 1.
    pub move_speed: f32,

    /// Look rotation in radians per unit of look delta.
    pub look_sensitivity: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            move_speed: 4.0,
            // 0.1 degree per pixel of mouse motion.
            look_sensitivity: 0.1_f32.to_radians(),
        }
    }
}

/// One tick of navigation input.
///
/// Rebuilt every frame from held keys and accumulated mouse motion.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct NavigationInput {
    /// Signed coefficient along `CameraState::right_axis`.
    pub strafe_right: f32,

    /// Signed coefficient along the view direction.
    pub strafe_forward: f32,

    /// Look delta since the previous tick; `x` yaws, `y` pitches.
    pub look: Vec2,
}

impl NavigationInput {
    pub fn is_idle(&self) -> bool {
        self.strafe_right == 0.0 && self.strafe_forward == 0.0 && self.look.is_zero()
    }
}

/// Applies navigation input to a camera.
///
/// Strafe axes are captured when the corresponding coefficient becomes non-zero
/// and held until it returns to zero, so looking around while moving does not
/// bend the path.
#[derive(Debug, Clone)]
pub struct Navigator {
    camera: CameraState,
    config: NavigationConfig,
    forward_axis: Option<Vec3>,
    right_axis: Option<Vec3>,
}

impl Navigator {
    pub fn new(camera: CameraState, config: NavigationConfig) -> Self {
        Self {
            camera,
            config,
            forward_axis: None,
            right_axis: None,
        }
    }

    #[inline]
    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    #[inline]
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Advances the camera by one tick and returns the new pose.
    ///
    /// Look is applied first, then strafing. Zero input is the identity; a
    /// zero or non-finite `dt` skips strafing only.
    pub fn advance(&mut self, dt: f32, input: &NavigationInput) -> CameraState {
        self.apply_look(input.look);

        let forward = capture_axis(
            &mut self.forward_axis,
            input.strafe_forward,
            Some(self.camera.direction),
        );
        let right = capture_axis(
            &mut self.right_axis,
            input.strafe_right,
            self.camera.right_axis(),
        );

        if dt > 0.0 && dt.is_finite() {
            let step = dt * self.config.move_speed;
            if let Some(axis) = forward {
                self.camera.position += axis * (input.strafe_forward * step);
            }
            if let Some(axis) = right {
                self.camera.position += axis * (input.strafe_right * step);
            }
        }

        self.camera
    }

    fn apply_look(&mut self, look: Vec2) {
        if look.is_zero() || !look.is_finite() {
            return;
        }

        let sensitivity = self.config.look_sensitivity;

        if let Some(axis) = self.camera.yaw_axis() {
            self.camera.rotate_direction(axis, look.x * sensitivity);
        }
        if let Some(axis) = self.camera.right_axis() {
            self.camera.rotate_direction(axis, look.y * sensitivity);
        }
    }
}

/// Returns the held axis for `coef`, capturing `current` on the first non-zero tick.
fn capture_axis(slot: &mut Option<Vec3>, coef: f32, current: Option<Vec3>) -> Option<Vec3> {
    if coef == 0.0 || !coef.is_finite() {
        *slot = None;
        return None;
    }
    if slot.is_none() {
        *slot = current;
    }
    *slot
}
