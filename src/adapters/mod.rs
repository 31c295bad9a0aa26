//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `sqlite`: SQLite for weekly records, alerts and forecast history
//! - `artifacts`: JSON model bundles with a SHA-256 manifest
//! - `dataset`: CSV loading for training data

pub mod artifacts;
pub mod dataset;
pub mod sqlite;

pub use artifacts::{ArtifactError, ArtifactStore};
pub use dataset::{load_csv, read_csv, DatasetError};
pub use sqlite::{SqliteStorage, StorageError};
