//! Camera navigation.
//!
//! `CameraState` is the pose handed to the compute program each frame.
//! `Navigator` owns it and applies one tick of strafe + look input.

mod navigator;
mod state;

pub use navigator::{NavigationConfig, NavigationInput, Navigator};
pub use state::CameraState;
