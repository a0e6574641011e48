mod app;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rayview_engine::camera::NavigationConfig;
use rayview_engine::coords::GridSize;
use rayview_engine::device::GpuInit;
use rayview_engine::logging::{init_logging, LoggingConfig};
use rayview_engine::sampling::SamplePolicy;
use rayview_engine::viewer::ViewerConfig;
use rayview_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use app::ViewerApp;

/// Real-time GPU ray-traced scene viewer.
#[derive(Debug, Parser)]
#[command(name = "rayview", version, about)]
struct Args {
    /// Compute grid width in pixels (also the window width).
    #[arg(long, default_value_t = 1060)]
    width: u32,

    /// Compute grid height in pixels (also the window height).
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Sub-pixel samples per pixel.
    #[arg(long, default_value_t = 16)]
    samples: usize,

    /// Draw a new sample set every frame instead of once at startup.
    #[arg(long)]
    resample: bool,

    /// WGSL compute program to run instead of the bundled scene.
    #[arg(long, value_name = "PATH")]
    program: Option<PathBuf>,

    /// Strafe speed in world units per second.
    #[arg(long, default_value_t = 4.0)]
    speed: f32,

    /// Look sensitivity in degrees per pixel of mouse motion.
    #[arg(long, default_value_t = 0.1)]
    sensitivity: f32,

    /// Log filter, `env_logger` syntax. Overrides RUST_LOG.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,

    /// Leave the cursor free instead of hiding and locking it.
    #[arg(long)]
    no_grab: bool,
}

impl Args {
    fn viewer_config(&self) -> ViewerConfig {
        ViewerConfig {
            grid: GridSize::new(self.width, self.height),
            sample_count: self.samples,
            sample_policy: if self.resample {
                SamplePolicy::PerFrame
            } else {
                SamplePolicy::Once
            },
            navigation: NavigationConfig {
                move_speed: self.speed,
                look_sensitivity: self.sensitivity.to_radians(),
            },
            program: self.program.clone(),
            grab_cursor: !self.no_grab,
            ..Default::default()
        }
    }
}

fn print_banner(config: &ViewerConfig) {
    let program = match &config.program {
        Some(path) => path.display().to_string(),
        None => "bundled scene".to_string(),
    };

    println!();
    println!("  ╔════════════════════════════════════════╗");
    println!("  ║            RAYVIEW  v{:<18}║", env!("CARGO_PKG_VERSION"));
    println!("  ║   wgpu compute  ·  real-time tracing   ║");
    println!("  ╠════════════════════════════════════════╣");
    println!("  ║  grid     {:<29}║", format!("{}x{}", config.grid.width, config.grid.height));
    println!("  ║  samples  {:<29}║", format!("{} ({:?})", config.sample_count, config.sample_policy));
    println!("  ║  program  {:<29}║", truncate(&program, 29));
    println!("  ╠════════════════════════════════════════╣");
    println!("  ║  WASD / arrows  move    mouse  look    ║");
    println!("  ║  Esc            quit                   ║");
    println!("  ╚════════════════════════════════════════╝");
    println!();
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let tail: String = s.chars().rev().take(max - 1).collect::<Vec<_>>().into_iter().rev().collect();
    format!("…{tail}")
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        ..Default::default()
    });

    let config = args.viewer_config();
    if let Err(e) = config.validate() {
        log::error!("invalid configuration: {e:#}");
        return ExitCode::FAILURE;
    }

    print_banner(&config);

    let app = match ViewerApp::new(config.clone()) {
        Ok(app) => app,
        Err(e) => {
            log::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    let runtime_config = RuntimeConfig {
        title: config.title.clone(),
        initial_size: LogicalSize::new(f64::from(config.grid.width), f64::from(config.grid.height)),
        grab_cursor: config.grab_cursor,
    };

    match Runtime::run(runtime_config, GpuInit::default(), app) {
        Ok(app) if app.failed() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
