use rand::Rng;

use crate::coords::Vec2;

/// Resolution of the jitter grid: each coordinate is one of `k / JITTER_STEPS`.
pub const JITTER_STEPS: u32 = 10;

/// When the sample offsets are regenerated.
///
/// The count never changes; the device buffer is sized once.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum SamplePolicy {
    /// Generate once at startup and re-upload the same offsets every frame.
    #[default]
    Once,
    /// Draw fresh offsets before every frame.
    PerFrame,
}

/// Fixed-size set of jittered 2D offsets in `[0, 1)^2`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    offsets: Vec<[f32; 2]>,
}

impl SampleSet {
    /// Generates `count` offsets from the thread-local RNG.
    pub fn generate(count: usize) -> Self {
        Self::generate_with(count, &mut rand::thread_rng())
    }

    /// Generates `count` offsets from `rng`.
    pub fn generate_with<R: Rng>(count: usize, rng: &mut R) -> Self {
        let offsets = (0..count)
            .map(|_| [jitter(rng), jitter(rng)])
            .collect();
        Self { offsets }
    }

    /// Redraws every offset in place, keeping the count.
    pub fn regenerate_with<R: Rng>(&mut self, rng: &mut R) {
        for o in &mut self.offsets {
            *o = [jitter(rng), jitter(rng)];
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.offsets.iter().map(|&[x, y]| Vec2::new(x, y))
    }

    /// Packed `[x0, y0, x1, y1, ...]` as raw bytes, matching `array<vec2<f32>>`.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.offsets)
    }

    /// Size in bytes of the device buffer needed for `count` offsets.
    #[inline]
    pub const fn byte_size(count: usize) -> u64 {
        (count * std::mem::size_of::<[f32; 2]>()) as u64
    }
}

fn jitter<R: Rng>(rng: &mut R) -> f32 {
    rng.gen_range(0..JITTER_STEPS) as f32 / JITTER_STEPS as f32
}
