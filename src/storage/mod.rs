//! Catalog, image assets and the persisted embedding index

pub mod assets;
pub mod atomic;
pub mod catalog;
pub mod index;

pub use assets::{is_remote, HttpTransport, RemoteAssetFetcher, Transport};
pub use catalog::{Catalog, VinMatch};
pub use index::{EmbeddingIndex, IndexStore, IndexedEntry};
