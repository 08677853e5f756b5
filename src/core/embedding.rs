//! Embedding vectors tagged with the mode that produced them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which encoder produced an embedding
///
/// Vectors from different modes live in unrelated spaces (and usually have
/// different lengths), so they must never be compared with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
	Primary,
	Fallback,
}

impl fmt::Display for EmbeddingMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EmbeddingMode::Primary => write!(f, "primary"),
			EmbeddingMode::Fallback => write!(f, "fallback"),
		}
	}
}

/// Mode and dimensionality stamp shared by every vector of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
	pub mode: EmbeddingMode,
	pub dimensions: usize,
}

impl fmt::Display for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}d", self.mode, self.dimensions)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
	values: Vec<f32>,
	mode: EmbeddingMode,
}

impl Embedding {
	pub fn new(values: Vec<f32>, mode: EmbeddingMode) -> Self {
		Self { values, mode }
	}

	pub fn as_slice(&self) -> &[f32] {
		&self.values
	}

	pub fn into_vec(self) -> Vec<f32> {
		self.values
	}

	pub fn mode(&self) -> EmbeddingMode {
		self.mode
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn signature(&self) -> Signature {
		Signature {
			mode: self.mode,
			dimensions: self.values.len(),
		}
	}

	/// Cosine similarity [-1.0, 1.0]
	pub fn similarity(&self, other: &[f32]) -> f32 {
		cosine_similarity(&self.values, other)
	}
}

/// Cosine of the angle between two vectors of equal length.
///
/// Zero vectors score 0.0. Callers must check lengths first; extra trailing
/// elements of the longer slice are ignored.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	let mut dot = 0.0f32;
	let mut norm_a = 0.0f32;
	let mut norm_b = 0.0f32;

	for (x, y) in a.iter().zip(b.iter()) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	let denom = norm_a.sqrt() * norm_b.sqrt();
	if denom > 0.0 {
		dot / denom
	} else {
		0.0
	}
}
