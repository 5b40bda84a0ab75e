//! WebGPU rendering module
//!
//! The scene is built as flat-colored triangles in viewport pixels
//! ([`shapes::scene`]) and mapped to clip space by [`RenderState`].

pub mod pipeline;
pub mod shapes;
pub mod vertex;

pub use pipeline::{RenderError, RenderState};
pub use vertex::Vertex;
