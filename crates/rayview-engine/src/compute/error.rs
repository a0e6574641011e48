use std::fmt;

use super::args::ArgKind;

/// Stage of the per-frame protocol that failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStep {
    CreateBuffer,
    Bind,
    WriteSamples,
    Enqueue,
    Wait,
    MapOutput,
    Unmap,
}

impl fmt::Display for FrameStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameStep::CreateBuffer => "create buffer",
            FrameStep::Bind => "bind argument",
            FrameStep::WriteSamples => "write sample buffer",
            FrameStep::Enqueue => "enqueue dispatch",
            FrameStep::Wait => "wait for device",
            FrameStep::MapOutput => "map output buffer",
            FrameStep::Unmap => "unmap buffer",
        };
        f.write_str(name)
    }
}

/// Compute-side failure.
///
/// Every variant is fatal to the viewer loop; `is_configuration` separates
/// layout/size mistakes from failures reported by the backend itself.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputeError {
    /// Argument at `index` does not match the entry-point signature.
    ArgumentLayout {
        index: usize,
        expected: ArgKind,
        found: ArgKind,
    },

    /// A buffer argument refers to a buffer the dispatcher did not allocate.
    ForeignBuffer { index: usize },

    /// A buffer or count disagrees with what was allocated.
    SizeMismatch {
        what: &'static str,
        expected: u64,
        found: u64,
    },

    /// A grid or count exceeds what the entry point can address.
    TooLarge {
        what: &'static str,
        value: u64,
        max: u64,
    },

    /// `render_frame` was called while the previous frame is still mapped.
    OutputStillMapped,

    /// A frame released to a dispatcher that did not produce it, or twice.
    UnknownFrame,

    /// The backend rejected an operation.
    Backend { step: FrameStep, message: String },
}

impl ComputeError {
    pub(crate) fn backend(step: FrameStep, message: impl Into<String>) -> Self {
        ComputeError::Backend {
            step,
            message: message.into(),
        }
    }

    /// True for argument layout and buffer size mismatches.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ComputeError::ArgumentLayout { .. }
                | ComputeError::ForeignBuffer { .. }
                | ComputeError::SizeMismatch { .. }
                | ComputeError::TooLarge { .. }
        )
    }
}

impl fmt::Display for ComputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeError::ArgumentLayout {
                index,
                expected,
                found,
            } => write!(
                f,
                "configuration error: kernel argument {index} expects {expected}, got {found}"
            ),
            ComputeError::ForeignBuffer { index } => write!(
                f,
                "configuration error: kernel argument {index} refers to an unknown buffer"
            ),
            ComputeError::SizeMismatch {
                what,
                expected,
                found,
            } => write!(
                f,
                "configuration error: {what} is {found}, expected {expected}"
            ),
            ComputeError::TooLarge { what, value, max } => write!(
                f,
                "configuration error: {what} is {value}, at most {max} is supported"
            ),
            ComputeError::OutputStillMapped => f.write_str(
                "output buffer is still mapped; release the previous frame before dispatching",
            ),
            ComputeError::UnknownFrame => {
                f.write_str("released frame does not belong to the current dispatch")
            }
            ComputeError::Backend { step, message } => write!(f, "{step} failed: {message}"),
        }
    }
}

impl std::error::Error for ComputeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_failing_step() {
        let e = ComputeError::backend(FrameStep::Wait, "device lost");
        assert_eq!(e.to_string(), "wait for device failed: device lost");
        assert!(!e.is_configuration());
    }

    #[test]
    fn layout_errors_are_configuration() {
        let e = ComputeError::ArgumentLayout {
            index: 3,
            expected: ArgKind::Float3,
            found: ArgKind::U32,
        };
        assert!(e.is_configuration());
        assert_eq!(
            e.to_string(),
            "configuration error: kernel argument 3 expects float3, got u32"
        );
    }
}
