//! rayview engine crate.
//!
//! Streams frames from a GPU compute program to a window while the user flies
//! a camera through the scene. Owns the platform + GPU runtime pieces and the
//! per-frame orchestration: navigation, parameter marshalling, synchronous
//! dispatch-and-readback and presentation.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod camera;
pub mod sampling;
pub mod compute;
pub mod present;
pub mod render;
pub mod viewer;
