//! Retrieval fallback chains.
//!
//! Sources are tried in order (typically live -> cache -> synthetic sample).
//! For entities the first source that returns at least one valid entity wins;
//! for reference data the first provider that has a dataset wins.

use std::sync::Arc;

use crate::data::provider::{EntitySource, IngestedEntities, ReferenceProvider};
use crate::data::reference::ReferenceDataset;
use crate::error::{AppError, ProviderError};

pub struct EntityChain {
    sources: Vec<Box<dyn EntitySource>>,
}

impl EntityChain {
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    pub fn then(mut self, source: impl EntitySource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl Default for EntityChain {
    fn default() -> Self {
        Self::new()
    }
}

impl EntitySource for EntityChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn fetch_entities(&self) -> Result<IngestedEntities, AppError> {
        let mut last_err = AppError::new(2, "No entity source configured.");
        for source in &self.sources {
            match source.fetch_entities() {
                Ok(ingest) if !ingest.entities.is_empty() => {
                    tracing::info!(
                        source = source.name(),
                        entities = ingest.entities.len(),
                        skipped = ingest.row_errors.len(),
                        "loaded entities"
                    );
                    return Ok(ingest);
                }
                Ok(_) => {
                    tracing::warn!(source = source.name(), "source returned no valid entities");
                    last_err = AppError::new(3, format!("Source '{}' returned no valid entities.", source.name()));
                }
                Err(err) => {
                    tracing::warn!(source = source.name(), error = %err, "entity source failed");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}

/// Reference providers tried in order.
///
/// `Ok(None)` and `Err` both move on to the next provider. When every provider
/// comes up empty the last error is reported, or `Ok(None)` if none failed.
pub struct ReferenceChain {
    providers: Vec<(&'static str, Box<dyn ReferenceProvider>)>,
}

impl ReferenceChain {
    pub fn new() -> Self {
        Self { providers: Vec::new() }
    }

    pub fn then(mut self, name: &'static str, provider: impl ReferenceProvider + 'static) -> Self {
        self.providers.push((name, Box::new(provider)));
        self
    }
}

impl Default for ReferenceChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceProvider for ReferenceChain {
    fn fetch_reference(&self, entity_id: &str) -> Result<Option<Arc<ReferenceDataset>>, ProviderError> {
        let mut last_err = None;
        for (name, provider) in &self.providers {
            match provider.fetch_reference(entity_id) {
                Ok(Some(dataset)) => return Ok(Some(dataset)),
                Ok(None) => {
                    tracing::debug!(provider = *name, entity = entity_id, "no reference data, trying next provider");
                }
                Err(err) => {
                    tracing::debug!(provider = *name, entity = entity_id, error = %err, "reference provider failed, trying next");
                    last_err = Some(err);
                }
            }
        }
        match last_err {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{NoReference, StaticReferenceProvider};
    use crate::domain::Entity;

    struct Fixed(&'static str, Result<usize, u8>);

    impl EntitySource for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn fetch_entities(&self) -> Result<IngestedEntities, AppError> {
            match self.1 {
                Ok(n) => Ok(IngestedEntities {
                    entities: (0..n).map(|i| Entity::new(format!("{}-{i}", self.0))).collect(),
                    row_errors: Vec::new(),
                    rows_read: n,
                }),
                Err(code) => Err(AppError::new(code, format!("{} down", self.0))),
            }
        }
    }

    #[test]
    fn first_successful_source_wins() {
        let chain = EntityChain::new()
            .then(Fixed("remote", Err(4)))
            .then(Fixed("cache", Ok(0)))
            .then(Fixed("sample", Ok(2)));
        let ingest = chain.fetch_entities().unwrap();
        assert_eq!(ingest.entities[0].id, "sample-0");
    }

    #[test]
    fn last_error_is_reported_when_all_fail() {
        let chain = EntityChain::new()
            .then(Fixed("remote", Err(4)))
            .then(Fixed("cache", Err(2)));
        assert_eq!(chain.fetch_entities().unwrap_err().exit_code(), 2);
        assert!(EntityChain::new().fetch_entities().is_err());
    }

    struct Down;

    impl ReferenceProvider for Down {
        fn fetch_reference(&self, entity_id: &str) -> Result<Option<Arc<ReferenceDataset>>, ProviderError> {
            Err(ProviderError::Timeout(entity_id.to_string()))
        }
    }

    #[test]
    fn reference_chain_falls_through_failures_and_gaps() {
        let chain = ReferenceChain::new()
            .then("remote", Down)
            .then("empty", NoReference)
            .then("static", StaticReferenceProvider::shared(ReferenceDataset::default()));
        assert!(chain.fetch_reference("L1").unwrap().is_some());
    }

    #[test]
    fn reference_chain_reports_last_error_or_nothing() {
        let failing = ReferenceChain::new().then("remote", Down).then("empty", NoReference);
        assert!(matches!(
            failing.fetch_reference("L1"),
            Err(ProviderError::Timeout(id)) if id == "L1"
        ));

        let empty = ReferenceChain::new().then("empty", NoReference);
        assert!(empty.fetch_reference("L1").unwrap().is_none());
    }
}
