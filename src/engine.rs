//! Search engine: catalog, index builder and embedder wired together

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;

use crate::config::Settings;
use crate::core::{CatalogItem, Embedding};
use crate::models::{EmbeddingProvider, FallbackDescriptor};
use crate::processing::{rank, IndexBuilder, RankedEntry};
use crate::runtime::Provider;
use crate::storage::{Catalog, EmbeddingIndex, HttpTransport, IndexStore, RemoteAssetFetcher, Transport};
use crate::ui;

const DEGRADED_WARNING: &str = "Embeddings are not available; showing sample parts instead of matches";

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
	pub provider: Provider,
	pub fallback_only: bool,
	pub model_path: Option<PathBuf>,
}

/// One search result: the full catalog record plus its score when ranked
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
	#[serde(flatten)]
	pub item: CatalogItem,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub score: Option<f32>,
}

impl From<RankedEntry<'_>> for SearchHit {
	fn from(ranked: RankedEntry<'_>) -> Self {
		Self {
			item: ranked.entry.item.clone(),
			score: Some(ranked.score),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
	pub results: Vec<SearchHit>,
	pub degraded: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub warning: Option<String>,
}

pub struct Engine {
	settings: Settings,
	catalog: Arc<Catalog>,
	provider: EmbeddingProvider,
	builder: Arc<IndexBuilder>,
}

impl Engine {
	/// Load the catalog and prepare everything a search needs.
	///
	/// Only a broken catalog fails here; a missing model or a bad persisted
	/// index is logged and worked around.
	pub fn open(settings: Settings, options: EngineOptions) -> Result<Self> {
		let parts_file = settings.parts_file();
		let catalog = Catalog::load(&parts_file)
			.with_context(|| format!("Cannot start without a catalog ({})", parts_file.display()))?;
		ui::debug(&format!("Loaded {} parts from {}", catalog.len(), parts_file.display()));

		settings
			.ensure_dirs()
			.with_context(|| format!("Failed to prepare directories under {}", settings.root.display()))?;

		let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(settings.fetch_timeout)?);
		let fallback = FallbackDescriptor::new(settings.fallback_size, settings.fallback_dims);
		let provider = if options.fallback_only {
			ui::info("Fallback descriptor only; vision model disabled");
			EmbeddingProvider::fallback_only(fallback, settings.embed_timeout)
		} else {
			EmbeddingProvider::onnx(options.model_path, options.provider, fallback, settings.embed_timeout)
		};

		Ok(Self::with_parts(settings, catalog, provider, transport))
	}

	/// Assemble an engine from ready-made parts and warm-start from disk
	pub fn with_parts(
		settings: Settings,
		catalog: Catalog,
		provider: EmbeddingProvider,
		transport: Arc<dyn Transport>,
	) -> Self {
		let catalog = Arc::new(catalog);
		let fetcher = Arc::new(RemoteAssetFetcher::new(
			settings.public_dir(),
			settings.images_dir(),
			transport,
		));
		let store = IndexStore::new(settings.index_file());
		let builder = IndexBuilder::new(catalog.clone(), fetcher, provider.clone(), Some(store.clone()));

		match store.load() {
			Ok(Some(index)) => {
				let sig = index.signature().map(|s| s.to_string()).unwrap_or_default();
				let index = builder.install(index);
				ui::info(&format!("Loaded {} indexed images ({}) from {}", index.len(), sig, store.path().display()));
			}
			Ok(None) => ui::debug("No persisted index; building on first search"),
			Err(e) => ui::warn(&format!("Ignoring persisted index {}: {}", store.path().display(), e)),
		}

		Self {
			settings,
			catalog,
			provider,
			builder: Arc::new(builder),
		}
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn catalog(&self) -> &Catalog {
		&self.catalog
	}

	pub fn builder(&self) -> &IndexBuilder {
		&self.builder
	}

	pub async fn search_by_path(&self, path: &Path) -> Result<SearchResponse> {
		let bytes = tokio::fs::read(path)
			.await
			.with_context(|| format!("Failed to read {}", path.display()))?;
		Ok(self.search_by_image(&bytes).await)
	}

	/// Rank catalog images against an uploaded photo.
	///
	/// Never fails: anything that prevents a ranking yields the degraded
	/// response with sample parts.
	pub async fn search_by_image(&self, bytes: &[u8]) -> SearchResponse {
		let mut index = self.builder.get_or_build().await;

		let mut query = match self.embed_upload(bytes).await {
			Ok(query) => query,
			Err(e) => {
				ui::warn(&format!("Could not embed the uploaded image: {:#}", e));
				return self.degraded();
			}
		};

		let Some(expected) = index.signature() else {
			ui::warn("Index is empty; returning sample parts");
			return self.degraded();
		};

		if expected != query.signature() {
			ui::error(&format!(
				"Query embedding is {} but the index is {}; rebuilding",
				query.signature(),
				expected
			));
			index = self.builder.rebuild_if_stale(&index).await;

			if index.signature() != Some(query.signature()) {
				query = match self.embed_upload(bytes).await {
					Ok(query) => query,
					Err(e) => {
						ui::warn(&format!("Could not embed the uploaded image: {:#}", e));
						return self.degraded();
					}
				};
			}
		}

		self.ranked(&query, &index)
	}

	fn ranked(&self, query: &Embedding, index: &EmbeddingIndex) -> SearchResponse {
		match rank(query, index, self.settings.limit) {
			Ok(ranked) if !ranked.is_empty() => SearchResponse {
				results: ranked.into_iter().map(SearchHit::from).collect(),
				degraded: false,
				warning: None,
			},
			Ok(_) => self.degraded(),
			Err(e) => {
				ui::error(&format!("Ranking refused: {}", e));
				self.degraded()
			}
		}
	}

	fn degraded(&self) -> SearchResponse {
		SearchResponse {
			results: self
				.catalog
				.sample(self.settings.limit)
				.iter()
				.cloned()
				.map(|item| SearchHit { item, score: None })
				.collect(),
			degraded: true,
			warning: Some(DEGRADED_WARNING.to_string()),
		}
	}

	/// Embed bytes through a temp file in `uploads/` that is removed afterwards
	async fn embed_upload(&self, bytes: &[u8]) -> Result<Embedding> {
		let path = stage_upload(self.settings.uploads_dir(), bytes.to_vec()).await?;
		let result = self.provider.embed(&path).await;

		let shown = path.display().to_string();
		if let Err(e) = path.close() {
			ui::warn(&format!("Failed to remove upload {}: {}", shown, e));
		}

		Ok(result?)
	}
}

/// Write an upload to a fresh temp file on the blocking pool; the file goes away with the returned path
async fn stage_upload(uploads: PathBuf, bytes: Vec<u8>) -> Result<TempPath> {
	tokio::task::spawn_blocking(move || -> Result<TempPath> {
		let mut upload = tempfile::Builder::new()
			.prefix("query-")
			.tempfile_in(&uploads)
			.with_context(|| format!("Failed to create upload file in {}", uploads.display()))?;
		upload.write_all(&bytes).context("Failed to write upload")?;
		upload.flush().context("Failed to write upload")?;
		Ok(upload.into_temp_path())
	})
	.await
	.context("Upload writer panicked")?
}
