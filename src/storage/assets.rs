//! Catalog image resolution: local paths and cached remote downloads

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::{DEFAULT_REMOTE_EXT, REMOTE_PREFIX, USER_AGENT};
use crate::core::{AssetResolutionError, UrlHash};
use crate::ui;

/// Fetches the body of a remote image
pub trait Transport: Send + Sync {
	fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>, AssetResolutionError>>;
}

/// `reqwest`-backed transport with a per-request timeout
pub struct HttpTransport {
	client: reqwest::Client,
	timeout: Duration,
}

impl HttpTransport {
	pub fn new(timeout: Duration) -> anyhow::Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.user_agent(USER_AGENT)
			.build()
			.map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
		Ok(Self { client, timeout })
	}

	fn classify(&self, url: &Url, err: reqwest::Error) -> AssetResolutionError {
		if err.is_timeout() {
			AssetResolutionError::Timeout {
				url: url.to_string(),
				after: self.timeout,
			}
		} else {
			AssetResolutionError::Transport {
				url: url.to_string(),
				reason: err.to_string(),
			}
		}
	}
}

impl Transport for HttpTransport {
	fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>, AssetResolutionError>> {
		Box::pin(async move {
			let response = self
				.client
				.get(url.clone())
				.send()
				.await
				.map_err(|e| self.classify(url, e))?;

			let status = response.status();
			if !status.is_success() {
				return Err(AssetResolutionError::Status {
					url: url.to_string(),
					status: status.as_u16(),
				});
			}

			let body = response.bytes().await.map_err(|e| self.classify(url, e))?;
			Ok(body.to_vec())
		})
	}
}

pub fn is_remote(reference: &str) -> bool {
	reference.starts_with("http://") || reference.starts_with("https://")
}

/// Resolves image references to files under the public asset root.
///
/// Remote URLs are downloaded once into `cache_dir` under a name derived
/// from the URL hash; an existing file with that name is reused forever.
pub struct RemoteAssetFetcher {
	public_root: PathBuf,
	cache_dir: PathBuf,
	transport: Arc<dyn Transport>,
	memo: Mutex<HashMap<String, PathBuf>>,
}

impl RemoteAssetFetcher {
	pub fn new(public_root: PathBuf, cache_dir: PathBuf, transport: Arc<dyn Transport>) -> Self {
		Self {
			public_root,
			cache_dir,
			transport,
			memo: Mutex::new(HashMap::new()),
		}
	}

	/// Local path for a reference relative to the public root; existence is not checked
	pub fn local_path(&self, reference: &str) -> PathBuf {
		self.public_root.join(reference.trim_start_matches(['/', '\\']))
	}

	/// Deterministic cache location for a remote URL
	pub fn cache_path(&self, url: &Url) -> PathBuf {
		let hash = UrlHash::compute(url.as_str());
		let ext = Path::new(url.path())
			.extension()
			.and_then(|e| e.to_str())
			.filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
			.unwrap_or(DEFAULT_REMOTE_EXT);
		self.cache_dir.join(format!("{}{}.{}", REMOTE_PREFIX, hash, ext))
	}

	pub async fn resolve(&self, reference: &str) -> Result<PathBuf, AssetResolutionError> {
		if is_remote(reference) {
			self.download(reference).await
		} else {
			Ok(self.local_path(reference))
		}
	}

	async fn download(&self, raw: &str) -> Result<PathBuf, AssetResolutionError> {
		if let Some(path) = self.memo.lock().get(raw) {
			return Ok(path.clone());
		}

		let url = Url::parse(raw).map_err(|e| AssetResolutionError::InvalidUrl {
			url: raw.to_string(),
			reason: e.to_string(),
		})?;
		let dest = self.cache_path(&url);

		if dest.exists() {
			ui::debug(&format!("Cached: {} -> {}", raw, dest.display()));
			self.memo.lock().insert(raw.to_string(), dest.clone());
			return Ok(dest);
		}

		ui::info(&format!("Downloading {} [{}]", raw, UrlHash::compute(url.as_str()).short()));
		ui::debug(&format!("Download target: {}", dest.display()));
		let body = self.transport.fetch(&url).await?;

		let target = dest.clone();
		tokio::task::spawn_blocking(move || super::atomic::write_atomic(&target, &body))
			.await
			.map_err(|e| AssetResolutionError::Io {
				path: dest.clone(),
				source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
			})?
			.map_err(|source| AssetResolutionError::Io {
				path: dest.clone(),
				source,
			})?;

		self.memo.lock().insert(raw.to_string(), dest.clone());
		Ok(dest)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tempfile::TempDir;

	struct FakeTransport {
		calls: AtomicUsize,
		status: u16,
	}

	impl FakeTransport {
		fn new(status: u16) -> Arc<Self> {
			Arc::new(Self {
				calls: AtomicUsize::new(0),
				status,
			})
		}
	}

	impl Transport for FakeTransport {
		fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>, AssetResolutionError>> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);
				if self.status == 200 {
					Ok(b"image-bytes".to_vec())
				} else {
					Err(AssetResolutionError::Status {
						url: url.to_string(),
						status: self.status,
					})
				}
			})
		}
	}

	fn fetcher(dir: &TempDir, transport: Arc<FakeTransport>) -> RemoteAssetFetcher {
		let public = dir.path().join("public");
		RemoteAssetFetcher::new(public.clone(), public.join("images"), transport)
	}

	#[tokio::test]
	async fn same_url_is_downloaded_once() {
		let dir = TempDir::new().unwrap();
		let transport = FakeTransport::new(200);
		let fetcher = fetcher(&dir, transport.clone());
		let url = "https://cdn.example.com/parts/caliper.png";

		let first = fetcher.resolve(url).await.unwrap();
		let second = fetcher.resolve(url).await.unwrap();

		assert_eq!(first, second);
		assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
		assert_eq!(std::fs::read(&first).unwrap(), b"image-bytes");
		let name = first.file_name().unwrap().to_str().unwrap();
		assert!(name.starts_with("remote-") && name.ends_with(".png"), "{}", name);
	}

	#[tokio::test]
	async fn existing_download_skips_network() {
		let dir = TempDir::new().unwrap();
		let transport = FakeTransport::new(200);
		let fetcher = fetcher(&dir, transport.clone());
		let url = "https://cdn.example.com/parts/pump.jpg";

		let dest = fetcher.cache_path(&Url::parse(url).unwrap());
		std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
		std::fs::write(&dest, b"from an earlier run").unwrap();

		assert_eq!(fetcher.resolve(url).await.unwrap(), dest);
		assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn http_failure_is_typed_and_leaves_no_file() {
		let dir = TempDir::new().unwrap();
		let transport = FakeTransport::new(404);
		let fetcher = fetcher(&dir, transport.clone());
		let url = "https://cdn.example.com/gone.jpg";

		match fetcher.resolve(url).await {
			Err(AssetResolutionError::Status { status, .. }) => assert_eq!(status, 404),
			other => panic!("expected HTTP status error, got {:?}", other),
		}
		assert!(!fetcher.cache_path(&Url::parse(url).unwrap()).exists());
	}

	#[tokio::test]
	async fn malformed_url_is_rejected_without_network() {
		let dir = TempDir::new().unwrap();
		let transport = FakeTransport::new(200);
		let fetcher = fetcher(&dir, transport.clone());

		let err = fetcher.resolve("https://").await.unwrap_err();
		assert!(matches!(err, AssetResolutionError::InvalidUrl { .. }));
		assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn local_references_join_the_public_root() {
		let dir = TempDir::new().unwrap();
		let fetcher = fetcher(&dir, FakeTransport::new(200));
		let resolved = fetcher.resolve("/images/brake-pad.jpg").await.unwrap();
		assert_eq!(resolved, dir.path().join("public").join("images").join("brake-pad.jpg"));
	}

	#[test]
	fn cache_name_is_derived_from_the_url_hash() {
		let dir = TempDir::new().unwrap();
		let fetcher = fetcher(&dir, FakeTransport::new(200));
		let url = Url::parse("https://cdn.example.com/parts/rotor.png").unwrap();

		let hash = UrlHash::compute(url.as_str());
		let name = fetcher.cache_path(&url).file_name().unwrap().to_string_lossy().to_string();
		assert_eq!(name, format!("remote-{}.png", hash));
		assert!(name.starts_with(&format!("remote-{}", hash.short())));
	}

	#[test]
	fn extension_defaults_to_jpg() {
		let dir = TempDir::new().unwrap();
		let fetcher = fetcher(&dir, FakeTransport::new(200));

		let bare = fetcher.cache_path(&Url::parse("https://cdn.example.com/img/12345").unwrap());
		assert_eq!(bare.extension().unwrap(), "jpg");

		let query = fetcher.cache_path(&Url::parse("https://cdn.example.com/a.webp?w=300").unwrap());
		assert_eq!(query.extension().unwrap(), "webp");
	}
}
