//! Render pass plumbing shared by everything that draws to the surface.
//!
//! `core::FrameCtx::render` clears the surface, hands a `RenderCtx` and
//! `RenderTarget` to the caller, then submits and presents.

mod ctx;

pub use ctx::{RenderCtx, RenderTarget};
