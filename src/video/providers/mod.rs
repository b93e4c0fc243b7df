//! Remote backends for video generation.

#[cfg(feature = "vertex")]
mod vertex;

#[cfg(feature = "vertex")]
pub use vertex::{VertexVeoProvider, VertexVeoProviderBuilder};
