//! `mpi-index` library crate.
//!
//! The binary (`mpi`) is a thin wrapper around this library so that:
//!
//! - the index engine is testable without spawning processes
//! - providers can be swapped (files, HTTP, synthetic) without touching the engine

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod index;
pub mod io;
pub mod report;
