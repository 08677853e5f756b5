//! Core domain types

pub mod catalog;
pub mod embedding;
pub mod error;
pub mod hash;

pub use catalog::{CatalogItem, PartId};
pub use embedding::{cosine_similarity, Embedding, EmbeddingMode, Signature};
pub use error::{
	AssetResolutionError, CatalogLoadError, DimensionMismatch, EmbeddingError, EmbeddingInitError,
	IndexPersistenceError,
};
pub use hash::UrlHash;
