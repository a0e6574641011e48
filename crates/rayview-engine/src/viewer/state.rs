use anyhow::Context;

use crate::camera::{CameraState, NavigationInput, Navigator};
use crate::compute::{marshal, ComputeBackend, ComputeError, FrameBuffer, FrameDispatcher, FrameParameters};
use crate::sampling::{SamplePolicy, SampleSet};

use super::config::ViewerConfig;

/// Everything the frame loop mutates: camera, samples and the dispatcher.
///
/// Field order is drop order: the dispatcher (and with it the backend) goes
/// last among the viewer's own state.
pub struct ViewerState<B: ComputeBackend> {
    navigator: Navigator,
    samples: SampleSet,
    policy: SamplePolicy,
    dispatcher: FrameDispatcher<B>,
}

impl<B: ComputeBackend> ViewerState<B> {
    /// Validates `config`, allocates the device buffers and draws the first sample set.
    pub fn new(backend: B, config: &ViewerConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let camera = config
            .initial_camera()
            .context("initial camera pose is degenerate")?;

        let dispatcher = FrameDispatcher::new(backend, config.grid, config.sample_count)
            .context("failed to allocate frame buffers")?;

        log::info!(
            "viewer ready: {}x{} grid, {} samples ({:?})",
            config.grid.width,
            config.grid.height,
            config.sample_count,
            config.sample_policy
        );

        Ok(Self {
            navigator: Navigator::new(camera, config.navigation),
            samples: SampleSet::generate(config.sample_count),
            policy: config.sample_policy,
            dispatcher,
        })
    }

    #[inline]
    pub fn camera(&self) -> &CameraState {
        self.navigator.camera()
    }

    #[inline]
    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    #[inline]
    pub fn dispatcher(&self) -> &FrameDispatcher<B> {
        &self.dispatcher
    }

    /// Runs one tick: navigate, marshal, dispatch, read back.
    ///
    /// The returned frame must go back through `release` before the next tick.
    pub fn tick(&mut self, dt: f32, input: &NavigationInput) -> Result<FrameBuffer, ComputeError> {
        let camera = self.navigator.advance(dt, input);

        if self.policy == SamplePolicy::PerFrame {
            self.samples.regenerate_with(&mut rand::thread_rng());
        }

        let params = FrameParameters {
            grid: self.dispatcher.grid(),
            camera,
            samples: &self.samples,
        };
        let args = marshal(&params, &self.dispatcher.bindings());
        self.dispatcher.render_frame(&args)
    }

    pub fn release(&mut self, frame: FrameBuffer) -> Result<(), ComputeError> {
        self.dispatcher.release(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::stub::{Call, StubBackend};
    use crate::compute::FrameStep;
    use crate::coords::{GridSize, Vec2, Vec3};
    use crate::present::to_rgba8;

    fn config(grid: GridSize) -> ViewerConfig {
        ViewerConfig { grid, ..Default::default() }
    }

    fn red_green() -> StubBackend {
        StubBackend::new(|x, _| if x == 0 { [1.0, 0.0, 0.0, 1.0] } else { [0.0, 1.0, 0.0, 1.0] })
    }

    // ── frame path ────────────────────────────────────────────────────────

    #[test]
    fn tick_produces_presentable_bytes() {
        let mut v = ViewerState::new(red_green(), &config(GridSize::new(2, 1))).unwrap();
        let frame = v.tick(0.016, &NavigationInput::default()).unwrap();
        assert_eq!(to_rgba8(&frame), vec![255, 0, 0, 255, 0, 255, 0, 255]);
        v.release(frame).unwrap();
    }

    #[test]
    fn consecutive_ticks_need_release() {
        let mut v = ViewerState::new(red_green(), &config(GridSize::new(2, 1))).unwrap();
        let idle = NavigationInput::default();

        let first = v.tick(0.016, &idle).unwrap();
        assert_eq!(v.tick(0.016, &idle).unwrap_err(), ComputeError::OutputStillMapped);
        v.release(first).unwrap();

        let second = v.tick(0.016, &idle).unwrap();
        v.release(second).unwrap();
    }

    #[test]
    fn idle_ticks_keep_the_initial_pose() {
        let cfg = config(GridSize::new(2, 1));
        let start = cfg.initial_camera().unwrap();
        let mut v = ViewerState::new(red_green(), &cfg).unwrap();
        for _ in 0..5 {
            let f = v.tick(0.016, &NavigationInput::default()).unwrap();
            v.release(f).unwrap();
        }
        assert_eq!(*v.camera(), start);
    }

    #[test]
    fn input_moves_the_camera_before_dispatch() {
        let mut v = ViewerState::new(red_green(), &config(GridSize::new(2, 1))).unwrap();
        let start = *v.camera();
        let input = NavigationInput {
            strafe_forward: 1.0,
            look: Vec2::new(5.0, 0.0),
            ..Default::default()
        };
        let f = v.tick(0.5, &input).unwrap();
        v.release(f).unwrap();

        assert_ne!(v.camera().position, start.position);
        assert_ne!(v.camera().direction, start.direction);
    }

    // ── sampling policy ───────────────────────────────────────────────────

    #[test]
    fn samples_stay_fixed_by_default() {
        let mut v = ViewerState::new(red_green(), &config(GridSize::new(2, 1))).unwrap();
        let before = v.samples().clone();
        let f = v.tick(0.016, &NavigationInput::default()).unwrap();
        v.release(f).unwrap();
        assert_eq!(v.samples(), &before);
    }

    #[test]
    fn per_frame_policy_redraws_samples_and_keeps_count() {
        let cfg = ViewerConfig {
            grid: GridSize::new(2, 1),
            sample_count: 64,
            sample_policy: SamplePolicy::PerFrame,
            ..Default::default()
        };
        let mut v = ViewerState::new(red_green(), &cfg).unwrap();
        let before = v.samples().clone();
        let f = v.tick(0.016, &NavigationInput::default()).unwrap();
        v.release(f).unwrap();

        assert_eq!(v.samples().len(), 64);
        assert_ne!(v.samples(), &before);
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn backend_failure_surfaces_from_tick() {
        let mut v =
            ViewerState::new(red_green().failing_at(FrameStep::Wait), &config(GridSize::new(2, 1)))
                .unwrap();
        let err = v.tick(0.016, &NavigationInput::default()).unwrap_err();
        assert_eq!(err.to_string(), "wait for device failed: injected failure");
    }

    #[test]
    fn degenerate_config_never_allocates() {
        let backend = red_green();
        let log = backend.log();
        let cfg = ViewerConfig {
            initial_position: Vec3::ZERO,
            initial_target: Vec3::ZERO,
            ..config(GridSize::new(2, 1))
        };
        assert!(ViewerState::new(backend, &cfg).is_err());
        assert!(!log.borrow().iter().any(|c| matches!(c, Call::Create(_))));
    }

    #[test]
    fn dropping_the_viewer_frees_both_buffers() {
        let backend = red_green();
        let log = backend.log();
        let v = ViewerState::new(backend, &config(GridSize::new(2, 1))).unwrap();
        let bindings = v.dispatcher().bindings();
        drop(v);

        let calls = log.borrow();
        assert_eq!(
            &calls[calls.len() - 2..],
            &[Call::Destroy(bindings.samples), Call::Destroy(bindings.output)]
        );
    }
}
