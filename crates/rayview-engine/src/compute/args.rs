//! Frame parameter marshalling.
//!
//! Packs camera and sampling state into the fixed argument list of the compute
//! entry point. Order and kinds never change:
//!
//! | slot | argument        | kind   |
//! |------|-----------------|--------|
//! | 0    | output buffer   | buffer |
//! | 1    | grid width      | u32    |
//! | 2    | grid height     | u32    |
//! | 3    | camera position | float3 |
//! | 4    | look target     | float3 |
//! | 5    | up vector       | float3 |
//! | 6    | sample count    | u32    |
//! | 7    | sample buffer   | buffer |

use std::fmt;

use crate::camera::CameraState;
use crate::coords::GridSize;
use crate::sampling::SampleSet;

use super::backend::BufferHandle;
use super::error::ComputeError;

/// Argument slots of the compute entry point.
pub mod slot {
    pub const OUTPUT: usize = 0;
    pub const WIDTH: usize = 1;
    pub const HEIGHT: usize = 2;
    pub const POSITION: usize = 3;
    pub const LOOK_AT: usize = 4;
    pub const UP: usize = 5;
    pub const SAMPLE_COUNT: usize = 6;
    pub const SAMPLES: usize = 7;
}

pub const ARG_COUNT: usize = 8;

/// Kinds expected by the entry point, by slot.
pub const KERNEL_SIGNATURE: [ArgKind; ARG_COUNT] = [
    ArgKind::Buffer,
    ArgKind::U32,
    ArgKind::U32,
    ArgKind::Float3,
    ArgKind::Float3,
    ArgKind::Float3,
    ArgKind::U32,
    ArgKind::Buffer,
];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ArgKind {
    Buffer,
    U32,
    Float3,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgKind::Buffer => "buffer",
            ArgKind::U32 => "u32",
            ArgKind::Float3 => "float3",
        })
    }
}

/// One bound argument value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum KernelArg {
    Buffer(BufferHandle),
    U32(u32),
    Float3([f32; 3]),
}

impl KernelArg {
    #[inline]
    pub fn kind(&self) -> ArgKind {
        match self {
            KernelArg::Buffer(_) => ArgKind::Buffer,
            KernelArg::U32(_) => ArgKind::U32,
            KernelArg::Float3(_) => ArgKind::Float3,
        }
    }
}

/// Per-frame inputs to the marshaller. Rebuilt every tick.
#[derive(Debug, Copy, Clone)]
pub struct FrameParameters<'a> {
    pub grid: GridSize,
    pub camera: CameraState,
    pub samples: &'a SampleSet,
}

/// Device buffers the arguments refer to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameBindings {
    pub output: BufferHandle,
    pub samples: BufferHandle,
}

/// Complete argument set for one dispatch, plus the sample data to upload.
#[derive(Debug, Clone)]
pub struct BackendArguments<'a> {
    args: [KernelArg; ARG_COUNT],
    sample_data: &'a [u8],
}

impl<'a> BackendArguments<'a> {
    /// Wraps an arbitrary argument list. The dispatcher validates it.
    pub fn from_raw(args: [KernelArg; ARG_COUNT], sample_data: &'a [u8]) -> Self {
        Self { args, sample_data }
    }

    #[inline]
    pub fn args(&self) -> &[KernelArg; ARG_COUNT] {
        &self.args
    }

    #[inline]
    pub fn sample_data(&self) -> &'a [u8] {
        self.sample_data
    }

    pub fn u32_at(&self, index: usize) -> Option<u32> {
        match self.args.get(index) {
            Some(KernelArg::U32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn buffer_at(&self, index: usize) -> Option<BufferHandle> {
        match self.args.get(index) {
            Some(KernelArg::Buffer(b)) => Some(*b),
            _ => None,
        }
    }

    /// Checks every slot against `KERNEL_SIGNATURE`.
    pub fn check_signature(&self) -> Result<(), ComputeError> {
        for (index, (arg, expected)) in self.args.iter().zip(KERNEL_SIGNATURE).enumerate() {
            let found = arg.kind();
            if found != expected {
                return Err(ComputeError::ArgumentLayout {
                    index,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// Builds the argument list for one frame.
pub fn marshal<'a>(params: &FrameParameters<'a>, bindings: &FrameBindings) -> BackendArguments<'a> {
    let camera = &params.camera;
    BackendArguments {
        args: [
            KernelArg::Buffer(bindings.output),
            KernelArg::U32(params.grid.width),
            KernelArg::U32(params.grid.height),
            KernelArg::Float3(camera.position.to_array()),
            KernelArg::Float3(camera.look_target().to_array()),
            KernelArg::Float3(camera.up.to_array()),
            // Saturates rather than wraps, so an oversized set can never pass
            // the dispatcher's sample count check.
            KernelArg::U32(u32::try_from(params.samples.len()).unwrap_or(u32::MAX)),
            KernelArg::Buffer(bindings.samples),
        ],
        sample_data: params.samples.as_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixture() -> (CameraState, SampleSet, FrameBindings) {
        let camera = CameraState::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Z, Vec3::Y).unwrap();
        let samples = SampleSet::generate_with(16, &mut StdRng::seed_from_u64(7));
        let bindings = FrameBindings {
            output: BufferHandle::new(1),
            samples: BufferHandle::new(2),
        };
        (camera, samples, bindings)
    }

    #[test]
    fn marshalled_arguments_follow_entry_point_order() {
        let (camera, samples, bindings) = fixture();
        let params = FrameParameters {
            grid: GridSize::new(1060, 600),
            camera,
            samples: &samples,
        };
        let args = marshal(&params, &bindings);

        assert_eq!(
            args.args(),
            &[
                KernelArg::Buffer(BufferHandle::new(1)),
                KernelArg::U32(1060),
                KernelArg::U32(600),
                KernelArg::Float3([1.0, 2.0, 3.0]),
                KernelArg::Float3([1.0, 2.0, 4.0]),
                KernelArg::Float3([0.0, 1.0, 0.0]),
                KernelArg::U32(16),
                KernelArg::Buffer(BufferHandle::new(2)),
            ]
        );
        assert!(args.check_signature().is_ok());
    }

    #[test]
    fn look_slot_carries_target_point_not_direction() {
        let (camera, samples, bindings) = fixture();
        let params = FrameParameters { grid: GridSize::new(2, 1), camera, samples: &samples };
        let args = marshal(&params, &bindings);
        assert_eq!(args.args()[slot::LOOK_AT], KernelArg::Float3(camera.look_target().to_array()));
        assert_ne!(args.args()[slot::LOOK_AT], KernelArg::Float3(camera.direction.to_array()));
    }

    #[test]
    fn sample_data_matches_sample_set() {
        let (camera, samples, bindings) = fixture();
        let params = FrameParameters { grid: GridSize::new(2, 1), camera, samples: &samples };
        let args = marshal(&params, &bindings);
        assert_eq!(args.sample_data(), samples.as_bytes());
        assert_eq!(args.u32_at(slot::SAMPLE_COUNT), Some(16));
    }

    #[test]
    fn swapped_slots_fail_signature_check() {
        let (camera, samples, bindings) = fixture();
        let params = FrameParameters { grid: GridSize::new(2, 1), camera, samples: &samples };
        let mut raw = *marshal(&params, &bindings).args();
        raw.swap(slot::WIDTH, slot::POSITION);

        let err = BackendArguments::from_raw(raw, samples.as_bytes())
            .check_signature()
            .unwrap_err();
        assert_eq!(
            err,
            ComputeError::ArgumentLayout {
                index: slot::WIDTH,
                expected: ArgKind::U32,
                found: ArgKind::Float3,
            }
        );
    }

    #[test]
    fn typed_accessors_reject_wrong_kind() {
        let (camera, samples, bindings) = fixture();
        let params = FrameParameters { grid: GridSize::new(2, 1), camera, samples: &samples };
        let args = marshal(&params, &bindings);
        assert_eq!(args.u32_at(slot::OUTPUT), None);
        assert_eq!(args.buffer_at(slot::WIDTH), None);
        assert_eq!(args.buffer_at(slot::SAMPLES), Some(BufferHandle::new(2)));
        assert_eq!(args.u32_at(99), None);
    }
}
