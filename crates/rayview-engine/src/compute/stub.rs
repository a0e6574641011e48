//! CPU stand-in for a compute backend.
//!
//! Runs a closure per work item and records every call so tests can check
//! ordering and teardown without a GPU.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::args::{slot, KernelArg, ARG_COUNT};
use super::backend::{BufferAccess, BufferHandle, ComputeBackend};
use super::error::{ComputeError, FrameStep};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Create(BufferHandle),
    Bind(usize),
    Write(BufferHandle),
    Dispatch(u32),
    Wait,
    Read(BufferHandle),
    Release(BufferHandle),
    Destroy(BufferHandle),
}

struct StubBuffer {
    data: Vec<u8>,
    access: BufferAccess,
    mapped: bool,
}

pub(crate) struct StubBackend {
    shade: Box<dyn Fn(u32, u32) -> [f32; 4]>,
    buffers: HashMap<BufferHandle, StubBuffer>,
    bound: [Option<KernelArg>; ARG_COUNT],
    next_id: u32,
    fail_at: Option<FrameStep>,
    creates_before_failure: u32,
    log: Rc<RefCell<Vec<Call>>>,
}

impl StubBackend {
    /// `shade(x, y)` produces the colour of pixel `(x, y)`.
    pub(crate) fn new(shade: impl Fn(u32, u32) -> [f32; 4] + 'static) -> Self {
        Self {
            shade: Box::new(shade),
            buffers: HashMap::new(),
            bound: [None; ARG_COUNT],
            next_id: 1,
            fail_at: None,
            creates_before_failure: 0,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Makes the first call belonging to `step` fail.
    pub(crate) fn failing_at(mut self, step: FrameStep) -> Self {
        self.fail_at = Some(step);
        self
    }

    /// With `failing_at(CreateBuffer)`, lets `n` allocations succeed first.
    pub(crate) fn after_creates(mut self, n: u32) -> Self {
        self.creates_before_failure = n;
        self
    }

    /// Shared call log; outlives the backend.
    pub(crate) fn log(&self) -> Rc<RefCell<Vec<Call>>> {
        Rc::clone(&self.log)
    }

    pub(crate) fn contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    fn check(&self, step: FrameStep) -> Result<(), ComputeError> {
        if self.fail_at == Some(step) {
            Err(ComputeError::backend(step, "injected failure"))
        } else {
            Ok(())
        }
    }

    fn bound_u32(&self, index: usize) -> u32 {
        match self.bound[index] {
            Some(KernelArg::U32(v)) => v,
            _ => 0,
        }
    }
}

impl ComputeBackend for StubBackend {
    fn create_buffer(
        &mut self,
        _label: &str,
        size: u64,
        access: BufferAccess,
    ) -> Result<BufferHandle, ComputeError> {
        if self.creates_before_failure == 0 {
            self.check(FrameStep::CreateBuffer)?;
        } else {
            self.creates_before_failure -= 1;
        }

        let handle = BufferHandle::new(self.next_id);
        self.next_id += 1;
        self.buffers.insert(
            handle,
            StubBuffer {
                data: vec![0; size as usize],
                access,
                mapped: false,
            },
        );
        self.log.borrow_mut().push(Call::Create(handle));
        Ok(handle)
    }

    fn bind_argument(&mut self, index: usize, arg: &KernelArg) -> Result<(), ComputeError> {
        self.check(FrameStep::Bind)?;
        let slot = self
            .bound
            .get_mut(index)
            .ok_or_else(|| ComputeError::backend(FrameStep::Bind, "no such argument"))?;
        *slot = Some(*arg);
        self.log.borrow_mut().push(Call::Bind(index));
        Ok(())
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), ComputeError> {
        self.check(FrameStep::WriteSamples)?;
        let b = self
            .buffers
            .get_mut(&buffer)
            .filter(|b| b.access == BufferAccess::HostWrite && !b.mapped)
            .ok_or_else(|| ComputeError::backend(FrameStep::WriteSamples, "buffer not writable"))?;
        if data.len() > b.data.len() {
            return Err(ComputeError::backend(FrameStep::WriteSamples, "data larger than buffer"));
        }
        b.data[..data.len()].copy_from_slice(data);
        self.log.borrow_mut().push(Call::Write(buffer));
        Ok(())
    }

    fn dispatch(&mut self, work_items: u32) -> Result<(), ComputeError> {
        self.check(FrameStep::Enqueue)?;
        let width = self.bound_u32(slot::WIDTH).max(1);
        let Some(KernelArg::Buffer(output)) = self.bound[slot::OUTPUT] else {
            return Err(ComputeError::backend(FrameStep::Enqueue, "output not bound"));
        };

        let pixels: Vec<[f32; 4]> = (0..work_items)
            .map(|i| (self.shade)(i % width, i / width))
            .collect();

        let out = self
            .buffers
            .get_mut(&output)
            .filter(|b| !b.mapped)
            .ok_or_else(|| ComputeError::backend(FrameStep::Enqueue, "output unavailable"))?;
        let bytes: &[u8] = bytemuck::cast_slice(&pixels);
        let n = bytes.len().min(out.data.len());
        out.data[..n].copy_from_slice(&bytes[..n]);

        self.log.borrow_mut().push(Call::Dispatch(work_items));
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<(), ComputeError> {
        self.check(FrameStep::Wait)?;
        self.log.borrow_mut().push(Call::Wait);
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferHandle) -> Result<Vec<u8>, ComputeError> {
        self.check(FrameStep::MapOutput)?;
        let b = self
            .buffers
            .get_mut(&buffer)
            .filter(|b| b.access == BufferAccess::DeviceWrite && !b.mapped)
            .ok_or_else(|| ComputeError::backend(FrameStep::MapOutput, "buffer not mappable"))?;
        b.mapped = true;
        self.log.borrow_mut().push(Call::Read(buffer));
        Ok(b.data.clone())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) -> Result<(), ComputeError> {
        self.check(FrameStep::Unmap)?;
        let b = self
            .buffers
            .get_mut(&buffer)
            .filter(|b| b.mapped)
            .ok_or_else(|| ComputeError::backend(FrameStep::Unmap, "buffer not mapped"))?;
        b.mapped = false;
        self.log.borrow_mut().push(Call::Release(buffer));
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.log.borrow_mut().push(Call::Destroy(buffer));
        }
    }
}
