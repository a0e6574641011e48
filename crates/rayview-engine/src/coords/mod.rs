//! Coordinate and geometry types shared by the camera, sampler and renderers.
//!
//! World space is the space the compute program renders in: +Y is the
//! reference up axis, the camera basis is left-handed (screen right is
//! `up x direction`).

mod grid;
mod vec2;
mod vec3;

pub use grid::GridSize;
pub use vec2::Vec2;
pub use vec3::Vec3;
