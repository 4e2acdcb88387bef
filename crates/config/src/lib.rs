//! Configuration loading and validation.
//!
//! Values are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults,
//! 2. a config file (`.toml`, `.yaml`/`.yml` or `.json`),
//! 3. environment variables prefixed with `BRICK_`, using `__` to reach into
//!    sections (`BRICK_UPLOAD__CONCURRENCY=2`).
//!
//! ```toml
//! [storage]
//! type = "http"
//! handle_upload_url = "https://app.example.com/api/upload"
//!
//! [upload]
//! concurrency = 3
//! access = "public"
//!
//! [upload.images]
//! max_file_bytes = 104857600
//! max_items = 20
//! ```

pub mod error;
mod storage;
mod upload;

pub use crate::storage::StorageConfig;
pub use crate::upload::UploadConfig;
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "BRICK_";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub upload: UploadConfig,
}

impl Config {
    /// Platform config file location, e.g. `~/.config/brick/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "brick").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load, merge and validate the configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used if a file is there.
    #[tracing::instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.display().to_string())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|path| path.is_file()),
        };
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = &file {
            tracing::debug!(file = %file.display(), "Reading config file");
            figment = merge_file(figment, file)?;
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(&figment)
    }

    /// Load from a single file, ignoring the environment.
    pub fn from_file(path: &Path) -> Result<Self> {
        let figment = merge_file(Figment::from(Serialized::defaults(Self::default())), path)?;
        Self::extract(&figment)
    }

    fn extract(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|err| ErrorKind::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.upload.validate()
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let ext = path.extension().map(|ext| ext.to_string_lossy().to_lowercase()).unwrap_or_default();
    Ok(match ext.as_str() {
        "toml" => figment.merge(Toml::file_exact(path)),
        "yaml" | "yml" => figment.merge(Yaml::file_exact(path)),
        "json" => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.display().to_string())),
    })
}
