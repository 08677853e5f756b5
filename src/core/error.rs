//! Error taxonomy
//!
//! Only [`CatalogLoadError`] is fatal. Everything else is isolated to one
//! image or one request and degrades toward fewer results.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::Signature;

#[derive(Debug, Error)]
pub enum CatalogLoadError {
	#[error("Failed to read catalog {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Catalog {} is not a JSON array", path.display())]
	NotAnArray { path: PathBuf },

	#[error("Malformed catalog {}: {source}", path.display())]
	Malformed {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("Duplicate part id {0} in catalog")]
	DuplicateId(String),
}

/// Primary encoder could not be brought up; the provider stays on fallback
#[derive(Debug, Error)]
#[error("Primary encoder unavailable: {0}")]
pub struct EmbeddingInitError(pub String);

#[derive(Debug, Error)]
pub enum EmbeddingError {
	#[error("Image not found: {}", .0.display())]
	NotFound(PathBuf),

	#[error("Failed to decode {}: {reason}", path.display())]
	Decode { path: PathBuf, reason: String },

	#[error("Embedding timed out after {0:?}")]
	Timeout(Duration),

	#[error("Embedding worker failed: {0}")]
	Worker(String),
}

#[derive(Debug, Error)]
pub enum AssetResolutionError {
	#[error("Invalid image URL {url}: {reason}")]
	InvalidUrl { url: String, reason: String },

	#[error("HTTP {status} for {url}")]
	Status { url: String, status: u16 },

	#[error("Transport error for {url}: {reason}")]
	Transport { url: String, reason: String },

	#[error("Download of {url} timed out after {after:?}")]
	Timeout { url: String, after: Duration },

	#[error("Failed to store download at {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Image file missing: {}", .0.display())]
	Missing(PathBuf),
}

#[derive(Debug, Error)]
pub enum IndexPersistenceError {
	#[error("Index file I/O at {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Index serialization failed: {0}")]
	Serialize(#[from] serde_json::Error),

	#[error("Index file rejected: {0}")]
	Invalid(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Embedding mismatch: expected {expected}, found {found}")]
pub struct DimensionMismatch {
	pub expected: Signature,
	pub found: Signature,
}
