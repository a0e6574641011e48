use crate::coords::GridSize;
use crate::sampling::SampleSet;

use super::args::{slot, BackendArguments, FrameBindings};
use super::backend::{BufferAccess, BufferHandle, ComputeBackend};
use super::error::ComputeError;

/// Bytes per output pixel (`vec4<f32>`).
pub const OUTPUT_PIXEL_BYTES: u64 = std::mem::size_of::<[f32; 4]>() as u64;

/// Host copy of one mapped output buffer.
///
/// While a `FrameBuffer` is alive the device output buffer stays mapped;
/// hand it back with `FrameDispatcher::release` before the next dispatch.
#[derive(Debug)]
pub struct FrameBuffer {
    grid: GridSize,
    pixels: Vec<[f32; 4]>,
    ticket: u64,
}

impl FrameBuffer {
    #[inline]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// RGBA values in row-major order.
    #[inline]
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.grid.width || y >= self.grid.height {
            return None;
        }
        self.pixels.get(self.grid.index(x, y) as usize).copied()
    }

    /// Sequence number of the dispatch that produced this frame.
    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.ticket
    }
}

/// Synchronous dispatch-and-readback over a `ComputeBackend`.
///
/// Owns the output and sample buffers for its lifetime. Single-buffered: at
/// most one `FrameBuffer` is mapped at a time.
pub struct FrameDispatcher<B: ComputeBackend> {
    backend: B,
    grid: GridSize,
    work_items: u32,
    sample_count: usize,
    output: BufferHandle,
    samples: BufferHandle,
    mapped: Option<u64>,
    frames: u64,
}

impl<B: ComputeBackend> FrameDispatcher<B> {
    /// Allocates the output buffer (`grid.area()` RGBA pixels) and the sample
    /// buffer (`sample_count` offsets).
    ///
    /// A grid area or sample count that does not fit the entry point's `u32`
    /// arguments is rejected before anything is allocated.
    pub fn new(mut backend: B, grid: GridSize, sample_count: usize) -> Result<Self, ComputeError> {
        let work_items = grid.area().ok_or(ComputeError::TooLarge {
            what: "grid area",
            value: u64::from(grid.width) * u64::from(grid.height),
            max: u64::from(u32::MAX),
        })?;
        if u32::try_from(sample_count).is_err() {
            return Err(ComputeError::TooLarge {
                what: "sample count",
                value: sample_count as u64,
                max: u64::from(u32::MAX),
            });
        }

        let output = backend.create_buffer(
            "rayview output",
            u64::from(work_items) * OUTPUT_PIXEL_BYTES,
            BufferAccess::DeviceWrite,
        )?;

        let samples = match backend.create_buffer(
            "rayview samples",
            SampleSet::byte_size(sample_count),
            BufferAccess::HostWrite,
        ) {
            Ok(s) => s,
            Err(e) => {
                backend.destroy_buffer(output);
                return Err(e);
            }
        };

        log::debug!(
            "dispatcher ready: {}x{} grid, {} samples",
            grid.width,
            grid.height,
            sample_count
        );

        Ok(Self {
            backend,
            grid,
            work_items,
            sample_count,
            output,
            samples,
            mapped: None,
            frames: 0,
        })
    }

    #[inline]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    #[inline]
    pub fn bindings(&self) -> FrameBindings {
        FrameBindings {
            output: self.output,
            samples: self.samples,
        }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Frames successfully read back so far.
    #[inline]
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// True while a `FrameBuffer` is outstanding.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    /// Renders one frame and returns the mapped output.
    ///
    /// Blocks until the device has finished. Fails without touching the
    /// backend if the previous frame has not been released.
    pub fn render_frame(&mut self, args: &BackendArguments<'_>) -> Result<FrameBuffer, ComputeError> {
        if self.mapped.is_some() {
            return Err(ComputeError::OutputStillMapped);
        }

        self.validate(args)?;

        for (index, arg) in args.args().iter().enumerate() {
            self.backend.bind_argument(index, arg)?;
        }

        // Samples must land before the dispatch that reads them.
        self.backend.write_buffer(self.samples, args.sample_data())?;

        self.backend.dispatch(self.work_items)?;
        self.backend.wait_idle()?;

        let bytes = self.backend.read_buffer(self.output)?;
        self.frames += 1;
        self.mapped = Some(self.frames);

        let expected = self.output_bytes();
        if bytes.len() as u64 != expected {
            self.unmap_output();
            return Err(ComputeError::SizeMismatch {
                what: "output readback bytes",
                expected,
                found: bytes.len() as u64,
            });
        }

        log::trace!("frame {} read back ({} bytes)", self.frames, bytes.len());

        Ok(FrameBuffer {
            grid: self.grid,
            pixels: bytes
                .chunks_exact(OUTPUT_PIXEL_BYTES as usize)
                .map(bytemuck::pod_read_unaligned)
                .collect(),
            ticket: self.frames,
        })
    }

    /// Returns a frame's output buffer to the backend.
    pub fn release(&mut self, frame: FrameBuffer) -> Result<(), ComputeError> {
        match self.mapped {
            Some(ticket) if ticket == frame.ticket => {
                self.mapped = None;
                self.backend.release_buffer(self.output)
            }
            _ => Err(ComputeError::UnknownFrame),
        }
    }

    fn output_bytes(&self) -> u64 {
        u64::from(self.work_items) * OUTPUT_PIXEL_BYTES
    }

    fn unmap_output(&mut self) {
        if self.mapped.take().is_some() {
            if let Err(e) = self.backend.release_buffer(self.output) {
                log::warn!("failed to unmap output buffer: {e}");
            }
        }
    }

    fn validate(&self, args: &BackendArguments<'_>) -> Result<(), ComputeError> {
        args.check_signature()?;

        if args.buffer_at(slot::OUTPUT) != Some(self.output) {
            return Err(ComputeError::ForeignBuffer { index: slot::OUTPUT });
        }
        if args.buffer_at(slot::SAMPLES) != Some(self.samples) {
            return Err(ComputeError::ForeignBuffer { index: slot::SAMPLES });
        }

        let checks = [
            ("grid width", self.grid.width as u64, args.u32_at(slot::WIDTH)),
            ("grid height", self.grid.height as u64, args.u32_at(slot::HEIGHT)),
            ("sample count", self.sample_count as u64, args.u32_at(slot::SAMPLE_COUNT)),
        ];
        for (what, expected, found) in checks {
            let found = found.map_or(0, u64::from);
            if found != expected {
                return Err(ComputeError::SizeMismatch { what, expected, found });
            }
        }

        let expected = SampleSet::byte_size(self.sample_count);
        let found = args.sample_data().len() as u64;
        if found != expected {
            return Err(ComputeError::SizeMismatch {
                what: "sample data bytes",
                expected,
                found,
            });
        }

        Ok(())
    }
}

impl<B: ComputeBackend> Drop for FrameDispatcher<B> {
    fn drop(&mut self) {
        self.unmap_output();
        // Reverse of allocation order.
        self.backend.destroy_buffer(self.samples);
        self.backend.destroy_buffer(self.output);
    }
}
