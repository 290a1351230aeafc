//! Configuration Module
//!
//! Handles loading server configuration from environment variables and
//! building the configured default store.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{CacheError, Result};
use crate::store::{FileStore, MemoryObjectBackend, MemoryStore, Store, VersionedStore};

// == Backend Kind ==
/// Which store backs the default caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process map
    Memory,
    /// Directory tree under `cache_dir`
    File,
    /// In-process memory-object backend with versioned-key invalidation
    Object,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "file" => Ok(BackendKind::File),
            "object" | "memcached" => Ok(BackendKind::Object),
            other => Err(CacheError::InvalidConfig(format!(
                "Unknown cache backend '{}', expected memory, file or object",
                other
            ))),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store backing the default caches
    pub backend: BackendKind,
    /// Root directory for the file backend
    pub cache_dir: PathBuf,
    /// Prefix applied to every cache name
    pub global_namespace: String,
    /// Whether caches start enabled
    pub caches_enabled: bool,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory`, `file` or `object` (default: memory)
    /// - `CACHE_DIR` - File backend root (default: ./cache)
    /// - `GLOBAL_NAMESPACE` - Cache name prefix (default: empty)
    /// - `CACHE_ENABLED` - Start caches enabled (default: true)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    ///
    /// An unrecognised backend name is an error rather than a silent default.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let backend = match env::var("CACHE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };

        Ok(Self {
            backend,
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            global_namespace: env::var("GLOBAL_NAMESPACE").unwrap_or(defaults.global_namespace),
            caches_enabled: env::var("CACHE_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.caches_enabled),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        })
    }

    // == Build Store ==
    /// Instantiates the configured default store.
    pub fn build_store(&self) -> Arc<dyn Store> {
        match self.backend {
            BackendKind::Memory => Arc::new(MemoryStore::new()),
            BackendKind::File => Arc::new(FileStore::new(self.cache_dir.clone())),
            BackendKind::Object => Arc::new(VersionedStore::new(MemoryObjectBackend::new())),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            cache_dir: PathBuf::from("./cache"),
            global_namespace: String::new(),
            caches_enabled: true,
            server_port: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.cache_dir, PathBuf::from("./cache"));
        assert!(config.global_namespace.is_empty());
        assert!(config.caches_enabled);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!(" FILE ".parse::<BackendKind>().unwrap(), BackendKind::File);
        assert_eq!("memcached".parse::<BackendKind>().unwrap(), BackendKind::Object);
        assert!(matches!(
            "redis".parse::<BackendKind>(),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_build_store_per_backend() {
        let tmp = tempfile::TempDir::new().unwrap();
        for backend in [BackendKind::Memory, BackendKind::File, BackendKind::Object] {
            let config = Config {
                backend,
                cache_dir: tmp.path().to_path_buf(),
                ..Config::default()
            };
            let store = config.build_store();

            store.write("ns>>resource::k", b"v").unwrap();
            assert_eq!(store.read("ns>>resource::k").unwrap(), Some(b"v".to_vec()));
        }
    }
}
