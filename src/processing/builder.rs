//! Embedding index construction
//!
//! Builds are coalesced: concurrent callers wait on one gate and share the
//! result. Once built, the index is handed out as an `Arc` and never locked.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::core::{AssetResolutionError, CatalogItem, Embedding, EmbeddingError, EmbeddingMode};
use crate::models::EmbeddingProvider;
use crate::storage::{Catalog, EmbeddingIndex, IndexStore, IndexedEntry, RemoteAssetFetcher};
use crate::ui;

#[derive(Debug, Error)]
enum Skip {
	#[error(transparent)]
	Asset(#[from] AssetResolutionError),

	#[error(transparent)]
	Embedding(#[from] EmbeddingError),

	#[error("empty embedding")]
	Empty,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BuildStats {
	pub items: usize,
	pub images: usize,
	pub indexed: usize,
	pub skipped: usize,
	pub restarted: bool,
}

pub struct IndexBuilder {
	catalog: Arc<Catalog>,
	fetcher: Arc<RemoteAssetFetcher>,
	provider: EmbeddingProvider,
	store: Option<IndexStore>,
	current: RwLock<Option<Arc<EmbeddingIndex>>>,
	gate: tokio::sync::Mutex<()>,
	builds: AtomicUsize,
	last_stats: RwLock<Option<BuildStats>>,
}

impl IndexBuilder {
	pub fn new(
		catalog: Arc<Catalog>,
		fetcher: Arc<RemoteAssetFetcher>,
		provider: EmbeddingProvider,
		store: Option<IndexStore>,
	) -> Self {
		Self {
			catalog,
			fetcher,
			provider,
			store,
			current: RwLock::new(None),
			gate: tokio::sync::Mutex::new(()),
			builds: AtomicUsize::new(0),
			last_stats: RwLock::new(None),
		}
	}

	/// The index held in memory, if any
	pub fn current(&self) -> Option<Arc<EmbeddingIndex>> {
		self.current.read().clone()
	}

	/// Seed the builder with an index from elsewhere (the persisted copy)
	pub fn install(&self, index: EmbeddingIndex) -> Arc<EmbeddingIndex> {
		let index = Arc::new(index);
		*self.current.write() = Some(index.clone());
		index
	}

	/// Number of builds performed by this builder
	pub fn builds(&self) -> usize {
		self.builds.load(Ordering::SeqCst)
	}

	pub fn last_stats(&self) -> Option<BuildStats> {
		*self.last_stats.read()
	}

	/// Return the in-memory index, building it first if there is none
	pub async fn get_or_build(&self) -> Arc<EmbeddingIndex> {
		if let Some(index) = self.current() {
			return index;
		}

		let _gate = self.gate.lock().await;
		if let Some(index) = self.current() {
			return index;
		}
		self.build_and_install().await
	}

	/// Discard the in-memory index and build a fresh one
	pub async fn rebuild(&self) -> Arc<EmbeddingIndex> {
		let _gate = self.gate.lock().await;
		self.build_and_install().await
	}

	/// Rebuild unless someone already replaced `stale` while we waited
	pub async fn rebuild_if_stale(&self, stale: &Arc<EmbeddingIndex>) -> Arc<EmbeddingIndex> {
		let _gate = self.gate.lock().await;
		if let Some(index) = self.current() {
			if !Arc::ptr_eq(&index, stale) {
				return index;
			}
		}
		self.build_and_install().await
	}

	async fn build_and_install(&self) -> Arc<EmbeddingIndex> {
		let start = Instant::now();
		let (index, stats) = self.build().await;
		self.builds.fetch_add(1, Ordering::SeqCst);
		*self.last_stats.write() = Some(stats);

		let index = Arc::new(index);
		*self.current.write() = Some(index.clone());

		ui::success(&format!(
			"Indexed {} images from {} parts in {:.1}s ({} skipped)",
			stats.indexed,
			stats.items,
			start.elapsed().as_secs_f32(),
			stats.skipped
		));

		self.persist(index.clone()).await;
		index
	}

	async fn persist(&self, index: Arc<EmbeddingIndex>) {
		let Some(store) = self.store.clone() else { return };

		let path = store.path().to_path_buf();
		match tokio::task::spawn_blocking(move || store.save(&index)).await {
			Ok(Ok(())) => ui::debug(&format!("Saved index to {}", path.display())),
			Ok(Err(e)) => ui::warn(&format!("Failed to save index: {}", e)),
			Err(e) => ui::warn(&format!("Failed to save index: {}", e)),
		}
	}

	async fn build(&self) -> (EmbeddingIndex, BuildStats) {
		ui::info(&format!("Building embeddings for {} parts...", self.catalog.len()));
		let mut restarted = false;

		'build: loop {
			let mut stats = BuildStats {
				restarted,
				..BuildStats::default()
			};
			let mut entries: Vec<IndexedEntry> = Vec::new();
			let mut mode: Option<EmbeddingMode> = None;

			for item in self.catalog.items() {
				let refs = item.image_refs();
				if refs.is_empty() {
					ui::debug(&format!("No images for {}", item.label()));
					continue;
				}
				stats.items += 1;

				for reference in refs {
					stats.images += 1;

					let embedding = match self.embed_reference(reference).await {
						Ok(embedding) => embedding,
						Err(reason) => {
							ui::warn(&format!("Skipping {} [{}]: {}", item.label(), reference, reason));
							stats.skipped += 1;
							continue;
						}
					};

					match mode {
						None => mode = Some(embedding.mode()),
						Some(current) if current != embedding.mode() => {
							if !restarted {
								ui::warn(&format!(
									"Embedder switched from {} to {} mid-build; starting over",
									current,
									embedding.mode()
								));
								restarted = true;
								continue 'build;
							}
							ui::error(&format!(
								"Skipping {} [{}]: {} embedding in a {} index",
								item.label(),
								reference,
								embedding.mode(),
								current
							));
							stats.skipped += 1;
							continue;
						}
						Some(_) => {}
					}

					if let Some(first) = entries.first() {
						if first.embedding.len() != embedding.len() {
							ui::error(&format!(
								"Skipping {} [{}]: {} values, index has {}",
								item.label(),
								reference,
								embedding.len(),
								first.embedding.len()
							));
							stats.skipped += 1;
							continue;
						}
					}

					ui::debug(&format!("Embedded {} [{}] dim={}", item.label(), reference, embedding.len()));
					entries.push(IndexedEntry::new(item, reference, embedding));
				}
			}

			stats.indexed = entries.len();
			let index = match mode {
				Some(mode) => EmbeddingIndex::from_entries(mode, entries).unwrap_or_else(|e| {
					ui::error(&format!("Discarding inconsistent index: {}", e));
					EmbeddingIndex::empty()
				}),
				None => EmbeddingIndex::empty(),
			};
			return (index, stats);
		}
	}

	async fn embed_reference(&self, reference: &str) -> Result<Embedding, Skip> {
		let path = self.fetcher.resolve(reference).await?;
		if !path.exists() {
			return Err(AssetResolutionError::Missing(path).into());
		}

		let embedding = self.provider.embed(&path).await?;
		if embedding.is_empty() {
			return Err(Skip::Empty);
		}
		Ok(embedding)
	}
}

/// Catalog items that contribute at least one image reference
pub fn indexable(catalog: &Catalog) -> impl Iterator<Item = &CatalogItem> {
	catalog.items().iter().filter(|item| !item.image_refs().is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::core::PartId;
	use crate::models::{FallbackDescriptor, ImageEncoder};
	use crate::storage::Transport;
	use futures::future::BoxFuture;
	use image::DynamicImage;
	use std::path::PathBuf;
	use std::time::Duration;
	use tempfile::TempDir;
	use url::Url;

	struct CountingTransport {
		calls: AtomicUsize,
	}

	impl Transport for CountingTransport {
		fn fetch<'a>(&'a self, _url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>, AssetResolutionError>> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);
				let mut bytes = Vec::new();
				DynamicImage::ImageRgb8(image::RgbImage::from_pixel(12, 12, image::Rgb([200, 10, 10])))
					.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
					.unwrap();
				Ok(bytes)
			})
		}
	}

	/// Succeeds once, then fails forever
	struct FlakyEncoder {
		calls: usize,
	}

	impl ImageEncoder for FlakyEncoder {
		fn encode(&mut self, _image: &DynamicImage) -> anyhow::Result<Vec<f32>> {
			self.calls += 1;
			if self.calls == 1 {
				Ok(vec![1.0, 2.0, 3.0])
			} else {
				anyhow::bail!("device lost")
			}
		}
	}

	struct Fixture {
		dir: TempDir,
		transport: Arc<CountingTransport>,
	}

	impl Fixture {
		fn new() -> Self {
			Self {
				dir: TempDir::new().unwrap(),
				transport: Arc::new(CountingTransport { calls: AtomicUsize::new(0) }),
			}
		}

		fn public(&self) -> PathBuf {
			self.dir.path().join("public")
		}

		fn write_image(&self, reference: &str, shade: u8) {
			let path = self.public().join(reference.trim_start_matches('/'));
			std::fs::create_dir_all(path.parent().unwrap()).unwrap();
			image::RgbImage::from_fn(24, 16, |x, _| image::Rgb([shade, (x * 10) as u8, 255 - shade]))
				.save(path)
				.unwrap();
		}

		fn builder(&self, items: Vec<CatalogItem>, provider: EmbeddingProvider) -> IndexBuilder {
			let fetcher = RemoteAssetFetcher::new(self.public(), self.public().join("images"), self.transport.clone());
			IndexBuilder::new(
				Arc::new(Catalog::from_items(items).unwrap()),
				Arc::new(fetcher),
				provider,
				Some(IndexStore::new(self.dir.path().join("data").join("embeddings.json"))),
			)
		}

		fn index_file(&self) -> PathBuf {
			self.dir.path().join("data").join("embeddings.json")
		}
	}

	fn part(id: i64, image: &str) -> CatalogItem {
		let mut item = CatalogItem::new(PartId::Number(id), format!("Part {}", id));
		item.image = Some(image.to_string());
		item
	}

	fn fallback() -> EmbeddingProvider {
		EmbeddingProvider::fallback_only(FallbackDescriptor::default(), Duration::from_secs(30))
	}

	fn ids(index: &EmbeddingIndex) -> Vec<String> {
		index.entries().iter().map(|e| e.item.id.to_string()).collect()
	}

	#[tokio::test]
	async fn missing_image_skips_only_that_item() {
		let fx = Fixture::new();
		fx.write_image("/images/one.png", 10);
		fx.write_image("/images/three.png", 200);
		let builder = fx.builder(
			vec![part(1, "/images/one.png"), part(2, "/images/two.png"), part(3, "/images/three.png")],
			fallback(),
		);

		let index = builder.get_or_build().await;

		assert_eq!(ids(&index), vec!["1", "3"]);
		let stats = builder.last_stats().unwrap();
		assert_eq!(stats.images, 3);
		assert_eq!(stats.skipped, 1);
	}

	#[tokio::test]
	async fn second_call_returns_the_same_index_without_io() {
		let fx = Fixture::new();
		fx.write_image("/images/one.png", 10);
		let builder = fx.builder(
			vec![part(1, "/images/one.png"), part(2, "https://cdn.example.com/two.png")],
			fallback(),
		);

		let first = builder.get_or_build().await;
		let calls_after_first = fx.transport.calls.load(Ordering::SeqCst);
		let second = builder.get_or_build().await;

		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(calls_after_first, 1);
		assert_eq!(fx.transport.calls.load(Ordering::SeqCst), 1);
		assert_eq!(builder.builds(), 1);
		assert_eq!(first.len(), 2);
	}

	#[tokio::test]
	async fn concurrent_first_calls_share_one_build() {
		let fx = Fixture::new();
		fx.write_image("/images/one.png", 10);
		let builder = fx.builder(vec![part(1, "/images/one.png")], fallback());

		let (a, b) = tokio::join!(builder.get_or_build(), builder.get_or_build());

		assert!(Arc::ptr_eq(&a, &b));
		assert_eq!(builder.builds(), 1);
	}

	#[tokio::test]
	async fn nothing_embeddable_yields_an_empty_index() {
		let fx = Fixture::new();
		let mut no_images = CatalogItem::new(PartId::Number(9), "Gasket");
		no_images.images = Vec::new();
		let builder = fx.builder(vec![no_images, part(2, "/images/absent.png")], fallback());

		let index = builder.get_or_build().await;
		assert!(index.is_empty());
		assert!(index.signature().is_none());
	}

	#[tokio::test]
	async fn plural_images_each_get_an_entry() {
		let fx = Fixture::new();
		fx.write_image("/images/a.png", 30);
		fx.write_image("/images/b.png", 90);
		let mut item = CatalogItem::new(PartId::Number(4), "Headlight");
		item.image = Some("/images/ignored.png".into());
		item.images = vec!["/images/a.png".into(), "/images/b.png".into()];
		let builder = fx.builder(vec![item], fallback());

		let index = builder.get_or_build().await;
		let images: Vec<&str> = index.entries().iter().map(|e| e.image()).collect();
		assert_eq!(images, vec!["/images/a.png", "/images/b.png"]);
	}

	#[tokio::test]
	async fn built_index_is_persisted() {
		let fx = Fixture::new();
		fx.write_image("/images/one.png", 10);
		let builder = fx.builder(vec![part(1, "/images/one.png")], fallback());

		let built = builder.get_or_build().await;
		let loaded = IndexStore::new(fx.index_file()).load().unwrap().unwrap();
		assert_eq!(loaded.entries(), built.entries());
	}

	#[tokio::test]
	async fn rebuild_replaces_the_index() {
		let fx = Fixture::new();
		fx.write_image("/images/one.png", 10);
		let builder = fx.builder(vec![part(1, "/images/one.png")], fallback());

		let first = builder.get_or_build().await;
		let second = builder.rebuild().await;
		assert!(!Arc::ptr_eq(&first, &second));
		assert_eq!(builder.builds(), 2);

		let third = builder.rebuild_if_stale(&first).await;
		assert!(Arc::ptr_eq(&second, &third));
		assert_eq!(builder.builds(), 2);
	}

	#[tokio::test]
	async fn mode_switch_mid_build_restarts_under_fallback() {
		let fx = Fixture::new();
		fx.write_image("/images/one.png", 10);
		fx.write_image("/images/two.png", 120);
		let provider = EmbeddingProvider::new(
			Box::new(|| -> anyhow::Result<Box<dyn ImageEncoder>> { Ok(Box::new(FlakyEncoder { calls: 0 })) }),
			FallbackDescriptor::default(),
			Duration::from_secs(30),
		);
		let builder = fx.builder(vec![part(1, "/images/one.png"), part(2, "/images/two.png")], provider);

		let index = builder.get_or_build().await;

		assert_eq!(index.len(), 2);
		assert_eq!(index.signature().unwrap().mode, EmbeddingMode::Fallback);
		assert_eq!(index.signature().unwrap().dimensions, 256);
		assert!(builder.last_stats().unwrap().restarted);
	}

	#[test]
	fn indexable_skips_parts_without_images() {
		let mut bare = CatalogItem::new(PartId::Number(2), "Clip");
		bare.image = None;
		let catalog = Catalog::from_items(vec![part(1, "/images/a.png"), bare]).unwrap();
		assert_eq!(indexable(&catalog).count(), 1);
	}
}
