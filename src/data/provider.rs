//! Boundaries to the retrieval collaborators.
//!
//! The index engine only ever sees these two traits; where the data actually
//! comes from (files, HTTP, cache, synthetic samples) lives behind them.

use std::sync::Arc;

use crate::data::reference::ReferenceDataset;
use crate::domain::Entity;
use crate::error::{AppError, ProviderError};

/// An entity that failed shape validation at ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    /// Zero-based position in the source array.
    pub index: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Entities plus what was dropped on the way in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestedEntities {
    pub entities: Vec<Entity>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Supplies the entity collection for a run.
///
/// A malformed top-level payload is an `Err`; a malformed single entity is a
/// `RowError` in an otherwise successful result.
pub trait EntitySource {
    fn name(&self) -> &str;
    fn fetch_entities(&self) -> Result<IngestedEntities, AppError>;
}

/// Supplies the reference dataset used as an entity's market baseline.
///
/// `Ok(None)` means "nothing for this entity"; both that and `Err` are
/// non-fatal for the engine.
pub trait ReferenceProvider: Send + Sync {
    fn fetch_reference(&self, entity_id: &str) -> Result<Option<Arc<ReferenceDataset>>, ProviderError>;
}

/// In-memory provider: one dataset approximating the market for every entity.
#[derive(Debug, Clone)]
pub struct StaticReferenceProvider {
    dataset: Arc<ReferenceDataset>,
}

impl StaticReferenceProvider {
    pub fn shared(dataset: ReferenceDataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
        }
    }
}

impl ReferenceProvider for StaticReferenceProvider {
    fn fetch_reference(&self, _entity_id: &str) -> Result<Option<Arc<ReferenceDataset>>, ProviderError> {
        Ok(Some(Arc::clone(&self.dataset)))
    }
}

/// Provider that never has data. Used when no reference source is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReference;

impl ReferenceProvider for NoReference {
    fn fetch_reference(&self, _entity_id: &str) -> Result<Option<Arc<ReferenceDataset>>, ProviderError> {
        Ok(None)
    }
}
