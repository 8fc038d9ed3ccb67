//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `LUMEN_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file is never fatal: defaults are used
//! and the error is handed back for the caller to log.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LUMEN_ROOT_FOLDER";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_IMAGE_SEARCH_TOP_K: u32 = 10;
pub const DEFAULT_FREE_DAILY_SEARCHES: u32 = 3;

const DATABASE_FILE: &str = "lumen.db";
const UPLOADS_DIR: &str = "uploads";

/// Contents of `config.toml`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    /// External image-similarity search endpoint
    pub image_search_url: Option<String>,
    pub image_search_top_k: Option<u32>,
    pub free_daily_searches: Option<u32>,
}

impl TomlConfig {
    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the platform config file, falling back to defaults
    ///
    /// A broken file is reported alongside the defaults so the caller can
    /// log it once logging is configured from the result.
    pub fn load() -> (Self, Option<Error>) {
        match config_file_path() {
            Some(path) => match Self::from_file(&path) {
                Ok(config) => (config, None),
                Err(e) => (Self::default(), Some(e)),
            },
            None => (Self::default(), None),
        }
    }
}

/// Locate the platform config file, if one exists
///
/// Linux checks `~/.config/lumen/config.toml` then `/etc/lumen/config.toml`.
pub fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("lumen").join("config.toml"));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/lumen/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve the root folder following the priority order above
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/lumen (or /var/lib/lumen for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("lumen"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/lumen"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("lumen"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/lumen"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("lumen"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\lumen"))
    } else {
        PathBuf::from("./lumen_data")
    }
}

/// Creates the root folder layout and derives paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create root and upload directories if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.images_path())?;
        std::fs::create_dir_all(self.videos_path())?;
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.root_folder.join(UPLOADS_DIR)
    }

    pub fn images_path(&self) -> PathBuf {
        self.uploads_path().join("images")
    }

    pub fn videos_path(&self) -> PathBuf {
        self.uploads_path().join("videos")
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub image_search_url: Option<String>,
    pub image_search_top_k: u32,
    pub free_daily_searches: u32,
}

impl ServiceConfig {
    /// Merge command-line values over the TOML file over defaults
    pub fn resolve(cli_root: Option<&Path>, cli_port: Option<u16>, toml: TomlConfig) -> Self {
        let root_folder = resolve_root_folder(cli_root, &toml);
        Self {
            root_folder,
            host: toml.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli_port.or(toml.port).unwrap_or(DEFAULT_PORT),
            log_level: toml.log_level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            image_search_url: toml.image_search_url.filter(|url| !url.trim().is_empty()),
            image_search_top_k: toml.image_search_top_k.unwrap_or(DEFAULT_IMAGE_SEARCH_TOP_K),
            free_daily_searches: toml
                .free_daily_searches
                .unwrap_or(DEFAULT_FREE_DAILY_SEARCHES),
        }
    }

    pub fn for_root(root_folder: PathBuf) -> Self {
        Self::resolve(Some(&root_folder), None, TomlConfig::default())
    }

    pub fn folders(&self) -> RootFolderInitializer {
        RootFolderInitializer::new(self.root_folder.clone())
    }
}
