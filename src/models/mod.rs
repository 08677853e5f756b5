//! # Embedding Models
//!
//! ONNX vision encoder, the offline fallback descriptor, and the provider
//! that switches between them.

pub mod fallback;
pub mod provider;
pub mod vision;

pub use fallback::FallbackDescriptor;
pub use provider::{EmbedderState, EmbeddingProvider, EncoderLoader, SharedEncoder};
pub use vision::{ImageEncoder, VisionModel};
