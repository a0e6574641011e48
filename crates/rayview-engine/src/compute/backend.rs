use super::args::KernelArg;
use super::error::ComputeError;

/// Opaque handle to a device buffer owned by a `ComputeBackend`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferHandle(u32);

impl BufferHandle {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }
}

/// Which side writes a buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferAccess {
    /// Written by the program, read back by the host.
    DeviceWrite,
    /// Written by the host, read by the program.
    HostWrite,
}

/// Capability surface the frame dispatcher needs from a compute backend.
///
/// The backend owns one compiled program; arguments are bound to it by index.
/// Host access to buffers follows an exclusive map/unmap protocol:
/// - `write_buffer` acquires write access, copies, and releases before returning
/// - `read_buffer` blocks until the buffer is mapped for reading; it stays
///   mapped until `release_buffer`
pub trait ComputeBackend {
    fn create_buffer(
        &mut self,
        label: &str,
        size: u64,
        access: BufferAccess,
    ) -> Result<BufferHandle, ComputeError>;

    fn bind_argument(&mut self, index: usize, arg: &KernelArg) -> Result<(), ComputeError>;

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), ComputeError>;

    /// Enqueues one invocation of `work_items` independent work items.
    fn dispatch(&mut self, work_items: u32) -> Result<(), ComputeError>;

    /// Blocks until all enqueued work has completed.
    fn wait_idle(&mut self) -> Result<(), ComputeError>;

    fn read_buffer(&mut self, buffer: BufferHandle) -> Result<Vec<u8>, ComputeError>;

    fn release_buffer(&mut self, buffer: BufferHandle) -> Result<(), ComputeError>;

    /// Frees a buffer. Unknown handles are ignored.
    fn destroy_buffer(&mut self, buffer: BufferHandle);
}
