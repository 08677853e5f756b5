//! Embedding index and its advisory on-disk copy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::{
	CatalogItem, DimensionMismatch, Embedding, EmbeddingMode, IndexPersistenceError, Signature,
};
use crate::ui;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One embedded image of one part.
///
/// Serialized flat: every catalog field, with `image` set to the specific
/// reference that produced `embedding`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEntry {
	#[serde(flatten)]
	pub item: CatalogItem,
	pub embedding: Vec<f32>,
}

impl IndexedEntry {
	pub fn new(item: &CatalogItem, reference: &str, embedding: Embedding) -> Self {
		Self {
			item: item.with_image(reference),
			embedding: embedding.into_vec(),
		}
	}

	pub fn image(&self) -> &str {
		self.item.image.as_deref().unwrap_or_default()
	}
}

/// Homogeneous set of embeddings: one mode, one dimensionality
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
	signature: Option<Signature>,
	entries: Vec<IndexedEntry>,
	built_at: Option<DateTime<Utc>>,
}

impl EmbeddingIndex {
	pub fn empty() -> Self {
		Self {
			built_at: Some(Utc::now()),
			..Self::default()
		}
	}

	pub fn from_entries(mode: EmbeddingMode, entries: Vec<IndexedEntry>) -> Result<Self, DimensionMismatch> {
		let Some(first) = entries.first() else {
			return Ok(Self::empty());
		};

		let expected = Signature {
			mode,
			dimensions: first.embedding.len(),
		};
		if let Some(bad) = entries.iter().find(|e| e.embedding.len() != expected.dimensions) {
			return Err(DimensionMismatch {
				expected,
				found: Signature {
					mode,
					dimensions: bad.embedding.len(),
				},
			});
		}

		Ok(Self {
			signature: Some(expected),
			entries,
			built_at: Some(Utc::now()),
		})
	}

	pub fn signature(&self) -> Option<Signature> {
		self.signature
	}

	pub fn entries(&self) -> &[IndexedEntry] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn built_at(&self) -> Option<DateTime<Utc>> {
		self.built_at
	}
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
	version: String,
	mode: Option<EmbeddingMode>,
	dimensions: usize,
	built_at: Option<DateTime<Utc>>,
	entries: Vec<IndexedEntry>,
}

/// Persisted copy of the index, written with write-then-rename
#[derive(Debug, Clone)]
pub struct IndexStore {
	path: PathBuf,
}

impl IndexStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn save(&self, index: &EmbeddingIndex) -> Result<(), IndexPersistenceError> {
		let file = IndexFile {
			version: VERSION.to_string(),
			mode: index.signature.map(|s| s.mode),
			dimensions: index.signature.map(|s| s.dimensions).unwrap_or(0),
			built_at: index.built_at,
			entries: index.entries.clone(),
		};
		let bytes = serde_json::to_vec_pretty(&file)?;
		super::atomic::write_atomic(&self.path, &bytes).map_err(|source| IndexPersistenceError::Io {
			path: self.path.clone(),
			source,
		})
	}

	/// Load a previously saved index.
	///
	/// `Ok(None)` when there is nothing worth using: no file, or no entries.
	pub fn load(&self) -> Result<Option<EmbeddingIndex>, IndexPersistenceError> {
		if !self.path.exists() {
			return Ok(None);
		}

		let bytes = std::fs::read(&self.path).map_err(|source| IndexPersistenceError::Io {
			path: self.path.clone(),
			source,
		})?;
		let file: IndexFile = serde_json::from_slice(&bytes)?;

		if file.entries.is_empty() {
			return Ok(None);
		}
		if file.version != VERSION {
			ui::debug(&format!("Index file written by v{}, running v{}", file.version, VERSION));
		}

		let mode = file
			.mode
			.ok_or_else(|| IndexPersistenceError::Invalid("entries present but no mode stamp".into()))?;
		let index = EmbeddingIndex::from_entries(mode, file.entries)
			.map_err(|e| IndexPersistenceError::Invalid(e.to_string()))?;

		if let Some(sig) = index.signature {
			if sig.dimensions != file.dimensions {
				return Err(IndexPersistenceError::Invalid(format!(
					"stamped {} dimensions but entries have {}",
					file.dimensions, sig.dimensions
				)));
			}
		}

		Ok(Some(EmbeddingIndex {
			built_at: file.built_at,
			..index
		}))
	}
}
