//! Input/output helpers.
//!
//! - entity JSON ingest + validation (`ingest`)
//! - summary CSV / run JSON exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
