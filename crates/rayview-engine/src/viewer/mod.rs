//! The per-tick pipeline tying camera, sampling, compute and input together.
//!
//! Input -> `Navigator` -> `marshal` -> `FrameDispatcher` -> presentation.

mod config;
mod controls;
mod state;

pub use config::ViewerConfig;
pub use controls::{navigation_input, quit_requested, QUIT_KEY};
pub use state::ViewerState;
