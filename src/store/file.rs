//! File Store
//!
//! Keeps every entry in its own file under a root directory. Namespaces map
//! to subdirectories, which makes namespace-wide removal a directory walk
//! that never touches other namespaces.
//!
//! Namespace segments are escaped one-to-one, so distinct namespaces never
//! share a directory. Directories the store itself names (`_global` and the
//! `_resource`/`_meta` tag directories) start with an underscore that no
//! escaped segment can begin with.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::cache::{NAMESPACE_SEPARATOR, SEPARATOR};
use crate::error::Result;
use crate::store::Store;

const FILE_EXTENSION: &str = "cache";

/// Holds keys without a namespace.
const GLOBAL_DIR: &str = "_global";

// == File Store ==
/// Directory-tree store.
///
/// `app::users>>resource::42` lands at `<root>/app/users/_resource/<md5("42")>.cache`
/// and `resource::42` at `<root>/_global/_resource/<md5("42")>.cache`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        let mut dir = self.root.clone();
        if !namespace.is_empty() {
            for segment in namespace.split(SEPARATOR) {
                dir.push(escape_segment(segment));
            }
        }
        dir
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        let (mut path, rest) = match key.find(NAMESPACE_SEPARATOR) {
            Some(idx) if idx > 0 => (
                self.namespace_dir(&key[..idx]),
                &key[idx + NAMESPACE_SEPARATOR.len()..],
            ),
            _ => (self.root.join(GLOBAL_DIR), key),
        };

        let base = match rest.split_once(SEPARATOR) {
            Some((tag, base)) if !tag.is_empty() => {
                path.push(format!("_{}", escape_segment(tag)));
                base
            }
            _ => rest,
        };

        path.push(format!("{:x}.{}", md5::compute(base), FILE_EXTENSION));
        path
    }
}

/// Escapes every byte outside `[A-Za-z0-9-]` as `_XX` (upper-case hex).
///
/// Injective: `a.b` becomes `a_2Eb` and `a_b` becomes `a_5Fb`. The empty
/// segment maps to a lone `_`, which no other input produces.
fn escape_segment(segment: &str) -> String {
    if segment.is_empty() {
        return "_".to_string();
    }

    let mut escaped = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            escaped.push(char::from(byte));
        } else {
            escaped.push_str(&format!("_{:02X}", byte));
        }
    }
    escaped
}

impl Store for FileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.key_to_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.key_to_path(key).is_file())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.key_to_path(key);
        let dir = path.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(dir)?;

        // Readers see either the old file or the new one, never a partial write.
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(value)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.key_to_path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn remove_all(&self, namespace: &str) -> Result<()> {
        let dir = self.namespace_dir(namespace);
        if !dir.is_dir() {
            return Ok(());
        }

        let mut removed = 0usize;
        for entry in WalkDir::new(&dir) {
            let entry = entry.map_err(std::io::Error::from)?;
            let is_cache_file = entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == FILE_EXTENSION);
            if !is_cache_file {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        debug!(namespace, removed, dir = %dir.display(), "Removed namespace from file store");
        Ok(())
    }
}
