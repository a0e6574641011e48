//! Contract between the runtime loop and the application.
//!
//! The runtime owns the window, GPU context, input and clock; the app sees
//! them through `FrameCtx` once per frame.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{grab_cursor, release_cursor, FrameCtx, WindowCtx};
