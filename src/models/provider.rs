//! Embedding provider: primary encoder with a permanent fallback switch

use image::DynamicImage;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::fallback::FallbackDescriptor;
use super::vision::{ImageEncoder, VisionModel};
use crate::core::{Embedding, EmbeddingError, EmbeddingInitError, EmbeddingMode};
use crate::runtime::Provider;
use crate::ui;

/// Builds the primary encoder; called at most once per provider
pub type EncoderLoader = Box<dyn Fn() -> anyhow::Result<Box<dyn ImageEncoder>> + Send + Sync>;

/// Lifecycle of the primary encoder within one provider.
///
/// Transitions only move forward: `Uninitialized -> Primary -> Fallback`
/// or `Uninitialized -> Fallback`. Nothing leaves `Fallback`.
pub enum EmbedderState {
	Uninitialized,
	Primary(SharedEncoder),
	Fallback,
}

/// The encoder sits behind its own lock so a slow inference never holds the state lock
pub type SharedEncoder = Arc<Mutex<Box<dyn ImageEncoder>>>;

impl EmbedderState {
	pub fn mode(&self) -> Option<EmbeddingMode> {
		match self {
			EmbedderState::Uninitialized => None,
			EmbedderState::Primary(_) => Some(EmbeddingMode::Primary),
			EmbedderState::Fallback => Some(EmbeddingMode::Fallback),
		}
	}
}

struct Inner {
	state: Mutex<EmbedderState>,
	loader: Option<EncoderLoader>,
	fallback: FallbackDescriptor,
	timeout: Duration,
	demoted: AtomicBool,
}

/// Cheap to clone; clones share one state
#[derive(Clone)]
pub struct EmbeddingProvider {
	inner: Arc<Inner>,
}

impl EmbeddingProvider {
	pub fn new(loader: EncoderLoader, fallback: FallbackDescriptor, timeout: Duration) -> Self {
		Self::with_state(EmbedderState::Uninitialized, Some(loader), fallback, timeout)
	}

	/// Never touches the vision model
	pub fn fallback_only(fallback: FallbackDescriptor, timeout: Duration) -> Self {
		Self::with_state(EmbedderState::Fallback, None, fallback, timeout)
	}

	/// Provider backed by the ONNX vision model at `model_path`
	pub fn onnx(
		model_path: Option<PathBuf>,
		provider: Provider,
		fallback: FallbackDescriptor,
		timeout: Duration,
	) -> Self {
		let loader: EncoderLoader = Box::new(move || -> anyhow::Result<Box<dyn ImageEncoder>> {
			let path = model_path.clone().ok_or_else(|| {
				anyhow::anyhow!("Vision model not found. Ensure {} exists", crate::config::VISION_MODEL)
			})?;
			ui::debug(&format!("Loading vision model: {}", path.display()));
			Ok(Box::new(VisionModel::load(&path, provider)?))
		});
		Self::new(loader, fallback, timeout)
	}

	fn with_state(
		state: EmbedderState,
		loader: Option<EncoderLoader>,
		fallback: FallbackDescriptor,
		timeout: Duration,
	) -> Self {
		Self {
			inner: Arc::new(Inner {
				state: Mutex::new(state),
				loader,
				fallback,
				timeout,
				demoted: AtomicBool::new(false),
			}),
		}
	}

	/// Current mode, `None` before the first embedding
	pub fn mode(&self) -> Option<EmbeddingMode> {
		if self.is_demoted() {
			return Some(EmbeddingMode::Fallback);
		}
		self.inner.state.lock().mode()
	}

	/// Embed an image file without leaving the current thread
	pub fn embed_blocking(&self, path: &Path) -> Result<Embedding, EmbeddingError> {
		if !path.exists() {
			return Err(EmbeddingError::NotFound(path.to_path_buf()));
		}
		let decode_err = |reason: String| EmbeddingError::Decode {
			path: path.to_path_buf(),
			reason,
		};
		// Uploads and some downloads carry no meaningful extension
		let image = image::ImageReader::open(path)
			.and_then(|reader| reader.with_guessed_format())
			.map_err(|e| decode_err(e.to_string()))?
			.decode()
			.map_err(|e| decode_err(e.to_string()))?;
		Ok(self.embed_image(&image, path))
	}

	/// Embed on the blocking pool, bounded by the configured timeout.
	///
	/// A timeout skips this image and demotes the provider to fallback.
	pub async fn embed(&self, path: &Path) -> Result<Embedding, EmbeddingError> {
		let provider = self.clone();
		let owned = path.to_path_buf();
		let timeout = self.inner.timeout;

		let task = tokio::task::spawn_blocking(move || provider.embed_blocking(&owned));
		match tokio::time::timeout(timeout, task).await {
			Ok(Ok(result)) => result,
			Ok(Err(join)) => Err(EmbeddingError::Worker(join.to_string())),
			Err(_) => {
				if !self.inner.demoted.swap(true, Ordering::Relaxed) {
					ui::warn(&format!(
						"Embedding {} timed out; switching to fallback descriptor",
						path.display()
					));
				}
				// The loader may still hold the state lock; the flag alone is enough
				if let Some(mut state) = self.inner.state.try_lock() {
					*state = EmbedderState::Fallback;
				}
				Err(EmbeddingError::Timeout(timeout))
			}
		}
	}

	fn embed_image(&self, image: &DynamicImage, path: &Path) -> Embedding {
		if self.is_demoted() {
			return self.describe(image);
		}

		let encoder = {
			let mut state = self.inner.state.lock();
			if matches!(*state, EmbedderState::Uninitialized) {
				*state = self.initialize();
			}
			match &*state {
				EmbedderState::Primary(encoder) => Some(encoder.clone()),
				_ => None,
			}
		};
		let Some(encoder) = encoder else {
			return self.describe(image);
		};

		let result = {
			let mut encoder = encoder.lock();
			// A call that waited behind a timed-out one must not use the encoder
			if self.is_demoted() {
				None
			} else {
				Some(encoder.encode(image))
			}
		};
		let Some(result) = result else {
			return self.describe(image);
		};

		match result {
			Ok(values) if !values.is_empty() => return Embedding::new(values, EmbeddingMode::Primary),
			Ok(_) => ui::warn(&format!(
				"Vision model returned an empty vector for {}; switching to fallback",
				path.display()
			)),
			Err(e) => ui::warn(&format!(
				"Vision model failed on {}: {:#}; switching to fallback",
				path.display(),
				e
			)),
		}
		*self.inner.state.lock() = EmbedderState::Fallback;

		self.describe(image)
	}

	fn describe(&self, image: &DynamicImage) -> Embedding {
		Embedding::new(self.inner.fallback.describe(image), EmbeddingMode::Fallback)
	}

	fn is_demoted(&self) -> bool {
		self.inner.demoted.load(Ordering::Relaxed)
	}

	fn initialize(&self) -> EmbedderState {
		let Some(loader) = self.inner.loader.as_ref() else {
			return EmbedderState::Fallback;
		};

		match loader() {
			Ok(encoder) => {
				ui::success("Vision model loaded");
				EmbedderState::Primary(Arc::new(Mutex::new(encoder)))
			}
			Err(e) => {
				let err = EmbeddingInitError(format!("{:#}", e));
				ui::warn(&format!("{}; using fallback descriptor", err));
				EmbedderState::Fallback
			}
		}
	}
}
