use anyhow::Result;

use rayview_engine::compute::{ProgramSource, WgpuBackend};
use rayview_engine::core::{App, AppControl, FrameCtx};
use rayview_engine::present::{check_frame_limits, Presenter};
use rayview_engine::viewer::{navigation_input, quit_requested, ViewerConfig, ViewerState};

const BUNDLED_SCENE: &str = include_str!("../shaders/scene.wgsl");

/// Shown behind the frame quad; only visible while the first frame is pending.
const CLEAR: wgpu::Color = wgpu::Color::BLACK;

/// Loads the configured compute program, or the bundled scene.
pub fn program_source(config: &ViewerConfig) -> Result<ProgramSource> {
    match &config.program {
        Some(path) => ProgramSource::from_path(path),
        None => Ok(ProgramSource::from_wgsl("bundled scene", BUNDLED_SCENE)),
    }
}

/// Drives `ViewerState` from the window runtime.
///
/// The backend needs the device, so it is built on the first frame. Any error
/// is logged once and ends the loop.
pub struct ViewerApp {
    config: ViewerConfig,
    program: ProgramSource,

    state: Option<ViewerState<WgpuBackend>>,
    presenter: Presenter,
    failed: bool,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig) -> Result<Self> {
        let program = program_source(&config)?;
        Ok(Self {
            config,
            program,
            state: None,
            presenter: Presenter::new(),
            failed: false,
        })
    }

    /// Whether the loop ended on an error rather than a quit request.
    pub fn failed(&self) -> bool {
        self.failed
    }

    fn fail(&mut self, err: anyhow::Error) -> AppControl {
        if !self.failed {
            log::error!("{err:#}");
            self.failed = true;
        }
        AppControl::Exit
    }

    fn start(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<ViewerState<WgpuBackend>> {
        check_frame_limits(self.config.grid, &device.limits())?;
        let backend = WgpuBackend::new(device, queue, &self.program)?;
        ViewerState::new(backend, &self.config)
    }
}

impl App for ViewerApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.failed {
            return AppControl::Exit;
        }
        if quit_requested(ctx.input_frame) {
            log::info!("quit requested");
            return AppControl::Exit;
        }

        if self.state.is_none() {
            match self.start(ctx.gpu.device(), ctx.gpu.queue()) {
                Ok(state) => {
                    let adapter = ctx.gpu.adapter_info();
                    ctx.window.set_title(&format!("{} ({})", self.config.title, adapter.name));
                    self.state = Some(state);
                }
                Err(e) => return self.fail(e.context("failed to start the viewer")),
            }
        }
        let Some(state) = self.state.as_mut() else {
            return AppControl::Exit;
        };

        log::trace!(
            "frame {} dt {:.2} ms",
            ctx.time.frame_index,
            ctx.time.dt * 1000.0
        );

        let input = navigation_input(ctx.input, ctx.input_frame);
        let frame = match state.tick(ctx.time.dt, &input) {
            Ok(frame) => frame,
            Err(e) => return self.fail(e.into()),
        };

        let presenter = &mut self.presenter;
        let control = ctx.render(CLEAR, |r, t| presenter.present(r, t, &frame));

        if let Err(e) = state.release(frame) {
            return self.fail(e.into());
        }
        if control == AppControl::Exit {
            // The surface error was logged where it happened.
            self.failed = true;
            return AppControl::Exit;
        }
        AppControl::Continue
    }

    fn on_exit(&mut self) {
        if let Some(state) = self.state.take() {
            log::debug!(
                "releasing viewer after {} frames",
                state.dispatcher().frames_rendered()
            );
        }
    }
}
