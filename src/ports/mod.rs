//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the scoring pipeline and its collaborators (fitted models,
//! historical data, persistence).

mod history;
mod regressor;
mod storage;

pub use history::HistoryProvider;
pub use regressor::Regressor;
pub use storage::Storage;
