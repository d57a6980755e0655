//! Data retrieval: reference dataset model plus the collaborators that
//! supply entities and reference datasets (files, HTTP, cache, samples).

pub mod cache;
pub mod chain;
pub mod directory;
pub mod provider;
pub mod reference;
pub mod remote;
pub mod sample;

pub use chain::{EntityChain, ReferenceChain};
pub use directory::DirectoryProvider;
pub use provider::{
    EntitySource, IngestedEntities, NoReference, ReferenceProvider, RowError, StaticReferenceProvider,
};
pub use reference::{CategoryBlock, ReferenceDataset};
pub use remote::RemoteClient;
pub use sample::{SampleConfig, SampleEntitySource, SampleReferenceProvider};
