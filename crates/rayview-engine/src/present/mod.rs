//! Presentation of computed frames.
//!
//! `to_rgba8` converts the float output to bytes; `Presenter` uploads it and
//! draws one quad
//! centered on the surface.

mod convert;
mod presenter;

pub use convert::{channel_to_u8, to_rgba8, RGBA8_PIXEL_BYTES};
pub use presenter::{check_frame_limits, frame_texture_format, letterbox, FitRect, Presenter};
