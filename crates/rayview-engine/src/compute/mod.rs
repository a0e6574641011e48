//! Compute side of the frame loop.
//!
//! `args` packs per-frame state into the entry-point argument list,
//! `dispatch` drives one synchronous dispatch-and-readback over any
//! `ComputeBackend`, and `wgpu_backend` is the GPU implementation.

mod args;
mod backend;
mod dispatch;
mod error;
mod wgpu_backend;

#[cfg(test)]
pub(crate) mod stub;

pub use args::{
    marshal, slot, ArgKind, BackendArguments, FrameBindings, FrameParameters, KernelArg,
    ARG_COUNT, KERNEL_SIGNATURE,
};
pub use backend::{BufferAccess, BufferHandle, ComputeBackend};
pub use dispatch::{FrameBuffer, FrameDispatcher, OUTPUT_PIXEL_BYTES};
pub use error::{ComputeError, FrameStep};
pub use wgpu_backend::{ProgramSource, WgpuBackend, ENTRY_POINT, WORKGROUP_SIZE};
