//! Cosine ranking of a query against the index

use std::cmp::Ordering;

use crate::core::{DimensionMismatch, Embedding};
use crate::storage::{EmbeddingIndex, IndexedEntry};
use crate::ui;

#[derive(Debug, Clone)]
pub struct RankedEntry<'a> {
	pub entry: &'a IndexedEntry,
	pub score: f32,
}

/// Top `k` entries by cosine similarity, best first.
///
/// Ties keep index order. A query from a different mode or with a different
/// length than the index is refused outright.
pub fn rank<'a>(
	query: &Embedding,
	index: &'a EmbeddingIndex,
	k: usize,
) -> Result<Vec<RankedEntry<'a>>, DimensionMismatch> {
	let Some(expected) = index.signature() else {
		return Ok(Vec::new());
	};
	if expected != query.signature() {
		return Err(DimensionMismatch {
			expected,
			found: query.signature(),
		});
	}

	let mut scored: Vec<RankedEntry<'a>> = index
		.entries()
		.iter()
		.filter(|entry| {
			let fits = entry.embedding.len() == expected.dimensions;
			if !fits {
				ui::warn(&format!(
					"Ignoring {} [{}]: {} values in a {} index",
					entry.item.label(),
					entry.image(),
					entry.embedding.len(),
					expected
				));
			}
			fits
		})
		.map(|entry| RankedEntry {
			entry,
			score: query.similarity(&entry.embedding),
		})
		.collect();

	// sort_by is stable
	scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
	scored.truncate(k);
	Ok(scored)
}
