use crate::compute::FrameBuffer;

/// Bytes per converted pixel.
pub const RGBA8_PIXEL_BYTES: usize = 4;

/// Maps one linear channel value to a byte: `round(clamp(v, 0, 1) * 255)`.
///
/// NaN maps to 0.
#[inline]
pub fn channel_to_u8(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Converts a frame to tightly packed RGBA8, row-major, row 0 first.
///
/// Alpha is taken from the frame data, not forced opaque.
pub fn to_rgba8(frame: &FrameBuffer) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.pixels().len() * RGBA8_PIXEL_BYTES);
    for px in frame.pixels() {
        out.extend(px.iter().map(|&c| channel_to_u8(c)));
    }
    out
}
