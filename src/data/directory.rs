//! Reference datasets from a local directory.
//!
//! `<dir>/<entity_id>.json` is the entity's own dataset; `<dir>/shared.json`,
//! when present, approximates the market for entities without one.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::data::cache::file_stem;
use crate::data::provider::ReferenceProvider;
use crate::data::reference::ReferenceDataset;
use crate::error::ProviderError;

const SHARED_FILE: &str = "shared.json";

#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    dir: PathBuf,
}

impl DirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read(path: &Path) -> Result<Option<Arc<ReferenceDataset>>, ProviderError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ProviderError::Unavailable(format!("{}: {e}", path.display())));
            }
        };
        let value: Value = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ProviderError::Malformed(format!("{}: {e}", path.display())))?;
        let dataset = ReferenceDataset::from_value(&value)?;
        Ok(Some(Arc::new(dataset)))
    }
}

impl ReferenceProvider for DirectoryProvider {
    fn fetch_reference(&self, entity_id: &str) -> Result<Option<Arc<ReferenceDataset>>, ProviderError> {
        let own = self.dir.join(format!("{}.json", file_stem(entity_id)));
        match Self::read(&own)? {
            Some(dataset) => Ok(Some(dataset)),
            None => Self::read(&self.dir.join(SHARED_FILE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_shared_dataset() {
        let dir = std::env::temp_dir().join(format!("mpi-dir-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("L1.json"),
            r#"{"future_daily": {"1": {"dates": ["2025-08-08"], "values": [[70.5]]}}}"#,
        )
        .unwrap();

        let provider = DirectoryProvider::new(&dir);
        assert!(provider.fetch_reference("L1").unwrap().is_some());
        assert!(provider.fetch_reference("L2").unwrap().is_none());

        std::fs::write(dir.join(SHARED_FILE), r#"{"historical_monthly": {}}"#).unwrap();
        assert!(provider.fetch_reference("L2").unwrap().is_some());

        std::fs::write(dir.join("L3.json"), "not json").unwrap();
        assert!(matches!(
            provider.fetch_reference("L3"),
            Err(ProviderError::Malformed(_))
        ));

        std::fs::remove_dir_all(&dir).ok();
    }
}
