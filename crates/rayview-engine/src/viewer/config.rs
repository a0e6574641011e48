use std::path::PathBuf;

use crate::camera::{CameraState, NavigationConfig};
use crate::coords::{GridSize, Vec3};
use crate::sampling::SamplePolicy;

/// Everything the viewer needs to start, with the stock scene's defaults.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub title: String,

    /// Compute grid; also the initial window size.
    pub grid: GridSize,

    pub sample_count: usize,
    pub sample_policy: SamplePolicy,

    pub navigation: NavigationConfig,

    pub initial_position: Vec3,
    pub initial_target: Vec3,
    pub up: Vec3,

    /// WGSL compute program; `None` runs the bundled scene.
    pub program: Option<PathBuf>,

    /// Hide and lock the cursor while focused.
    pub grab_cursor: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "rayview".to_string(),
            grid: GridSize::new(1060, 600),
            sample_count: 16,
            sample_policy: SamplePolicy::Once,
            navigation: NavigationConfig::default(),
            initial_position: Vec3::new(14.0, 10.0, 14.0),
            initial_target: Vec3::new(0.0, 2.0, 0.0),
            up: Vec3::Y,
            program: None,
            grab_cursor: true,
        }
    }
}

impl ViewerConfig {
    /// Starting pose; `None` if position, target and up do not form a basis.
    pub fn initial_camera(&self) -> Option<CameraState> {
        CameraState::looking_at(self.initial_position, self.initial_target, self.up)
    }

    /// Checks values that would otherwise fail deep inside the first frame.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.grid.is_valid(),
            "grid must be at least 1x1, got {}x{}",
            self.grid.width,
            self.grid.height
        );
        anyhow::ensure!(
            self.grid.area().is_some(),
            "grid {}x{} is too large",
            self.grid.width,
            self.grid.height
        );
        anyhow::ensure!(
            u32::try_from(self.sample_count).is_ok(),
            "sample count {} is too large",
            self.sample_count
        );
        anyhow::ensure!(
            self.navigation.move_speed.is_finite() && self.navigation.look_sensitivity.is_finite(),
            "navigation speed and sensitivity must be finite"
        );
        anyhow::ensure!(
            self.initial_camera().is_some(),
            "initial camera pose is degenerate (target equals position, or view is parallel to up)"
        );
        Ok(())
    }
}
