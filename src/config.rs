//! Application configuration and constants

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

static CUSTOM_MODEL_DIR: OnceLock<PathBuf> = OnceLock::new();
static CUSTOM_VISION: OnceLock<PathBuf> = OnceLock::new();

// === Model Files ===
pub const VISION_MODEL: &str = "vit_base_patch16_224.onnx";

// === Model Parameters ===
pub const INPUT_SIZE: u32 = 224;
pub const PIXEL_MEAN: f32 = 0.5;
pub const PIXEL_STD: f32 = 0.5;

// === Fallback Descriptor ===
pub const FALLBACK_SIZE: u32 = 64;
pub const FALLBACK_DIMS: usize = 256;

// === Layout (relative to the project root) ===
pub const DATA_DIR: &str = "data";
pub const PUBLIC_DIR: &str = "public";
pub const IMAGES_DIR: &str = "images";
pub const UPLOADS_DIR: &str = "uploads";
pub const PARTS_FILE: &str = "parts.json";
pub const INDEX_FILE: &str = "embeddings.json";
pub const REMOTE_PREFIX: &str = "remote-";
pub const DEFAULT_REMOTE_EXT: &str = "jpg";

// === Search Defaults ===
pub const DEFAULT_LIMIT: usize = 6;
pub const VIN_LENGTH: usize = 17;
pub const VIN_MATCHES: usize = 12;

// === Timeouts ===
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
pub const EMBED_TIMEOUT: Duration = Duration::from_secs(60);

pub const USER_AGENT: &str = concat!("partlens/", env!("CARGO_PKG_VERSION"));

pub fn set_model_dir(path: PathBuf) {
    let _ = CUSTOM_MODEL_DIR.set(path);
}

pub fn set_vision_model(path: PathBuf) {
    let _ = CUSTOM_VISION.set(path);
}

/// Get models directory (custom, PARTLENS_MODELS_DIR env var, or next to executable)
pub fn models_dir() -> Option<PathBuf> {
    if let Some(custom) = CUSTOM_MODEL_DIR.get() {
        crate::ui::debug(&format!("Using custom model dir: {}", custom.display()));
        return Some(custom.clone());
    }

    if let Ok(env_path) = std::env::var("PARTLENS_MODELS_DIR") {
        let path = PathBuf::from(&env_path);
        if path.is_dir() {
            crate::ui::debug(&format!("Using PARTLENS_MODELS_DIR: {}", env_path));
            return Some(path);
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let models = dir.join("models");
            if models.is_dir() {
                crate::ui::debug(&format!("Found models at: {}", models.display()));
                return Some(models);
            }
        }
    }

    None
}

pub fn get_vision_model_path() -> Option<PathBuf> {
    if let Some(custom) = CUSTOM_VISION.get() {
        return Some(custom.clone());
    }
    models_dir().map(|d| d.join(VISION_MODEL))
}

/// Filesystem layout and tunables for one engine instance
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub limit: usize,
    pub fetch_timeout: Duration,
    pub embed_timeout: Duration,
    pub fallback_size: u32,
    pub fallback_dims: usize,
}

impl Settings {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            limit: DEFAULT_LIMIT,
            fetch_timeout: FETCH_TIMEOUT,
            embed_timeout: EMBED_TIMEOUT,
            fallback_size: FALLBACK_SIZE,
            fallback_dims: FALLBACK_DIMS,
        }
    }

    /// Root from PARTLENS_ROOT, or the given default
    pub fn from_env_or(default_root: &Path) -> Self {
        match std::env::var("PARTLENS_ROOT") {
            Ok(root) if !root.trim().is_empty() => Self::new(root),
            _ => Self::new(default_root),
        }
    }

    pub fn parts_file(&self) -> PathBuf {
        self.root.join(DATA_DIR).join(PARTS_FILE)
    }

    pub fn index_file(&self) -> PathBuf {
        self.root.join(DATA_DIR).join(INDEX_FILE)
    }

    pub fn public_dir(&self) -> PathBuf {
        self.root.join(PUBLIC_DIR)
    }

    /// Where remote catalog images are cached
    pub fn images_dir(&self) -> PathBuf {
        self.public_dir().join(IMAGES_DIR)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.root.join(DATA_DIR))?;
        std::fs::create_dir_all(self.images_dir())?;
        std::fs::create_dir_all(self.uploads_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vision_override_wins_over_model_dir() {
        let file = PathBuf::from("/opt/partlens/custom-vit.onnx");
        set_vision_model(file.clone());
        assert_eq!(get_vision_model_path(), Some(file));
    }

    #[test]
    fn settings_paths_follow_the_root() {
        let settings = Settings::new("/srv/parts");
        assert_eq!(settings.parts_file(), Path::new("/srv/parts/data/parts.json"));
        assert_eq!(settings.images_dir(), Path::new("/srv/parts/public/images"));
        assert_eq!(settings.uploads_dir(), Path::new("/srv/parts/uploads"));
    }
}
