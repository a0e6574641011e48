//! Sub-pixel sample offsets consumed by the compute program.

mod sample_set;

pub use sample_set::{SamplePolicy, SampleSet, JITTER_STEPS};
