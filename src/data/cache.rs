//! On-disk JSON cache for remote payloads.
//!
//! Layout:
//!
//! ```text
//! <root>/entities.json
//! <root>/reference/<entity_id>.json
//! ```

use std::fs::{File, create_dir_all};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn entities_path(&self) -> PathBuf {
        self.root.join("entities.json")
    }

    pub fn reference_path(&self, entity_id: &str) -> PathBuf {
        self.root.join("reference").join(format!("{}.json", file_stem(entity_id)))
    }

    pub fn read(&self, path: &Path) -> Option<Value> {
        let file = File::open(path).ok()?;
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable cache file");
                None
            }
        }
    }

    pub fn write(&self, path: &Path, value: &Value) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent)
                .map_err(|e| AppError::io(format_args!("Failed to create cache dir '{}'", parent.display()), e))?;
        }
        let file = File::create(path)
            .map_err(|e| AppError::io(format_args!("Failed to create cache file '{}'", path.display()), e))?;
        serde_json::to_writer(file, value)
            .map_err(|e| AppError::new(4, format!("Failed to write cache file '{}': {e}", path.display())))
    }
}

/// Entity ids are opaque; keep only characters that are safe in a file name.
pub fn file_stem(entity_id: &str) -> String {
    entity_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_then_read_reference() {
        let root = std::env::temp_dir().join(format!("mpi-cache-test-{}", std::process::id()));
        let cache = DiskCache::new(&root);
        let path = cache.reference_path("abc/1");
        assert!(path.ends_with("reference/abc_1.json"));

        cache.write(&path, &json!({ "future_daily": {} })).unwrap();
        assert_eq!(cache.read(&path), Some(json!({ "future_daily": {} })));
        assert_eq!(cache.read(&cache.entities_path()), None);

        std::fs::remove_dir_all(&root).ok();
    }
}
