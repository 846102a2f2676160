//! quizforge-store: Progress stores and quiz catalogs.
//!
//! Implements the `ProgressStore` and `QuizCatalog` traits from
//! `quizforge-core` in memory and on disk, and wires them into a
//! `QuizService` from configuration.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;

use quizforge_core::{QuizService, ScoringEngine};

pub use config::{load_config, load_config_from, AttemptSettings, QuizforgeConfig};
pub use error::CatalogError;
pub use file::JsonFileProgressStore;
pub use memory::{InMemoryCatalog, InMemoryProgressStore};

/// Load the catalog described by `config`: every quiz under `quiz_dir`,
/// plus any declared module counts.
pub fn load_catalog(config: &QuizforgeConfig) -> Result<InMemoryCatalog> {
    let mut catalog = InMemoryCatalog::from_directory(&config.quiz_dir)?;
    for (training_id, modules) in &config.trainings {
        catalog = catalog.with_training(training_id, *modules)?;
    }
    Ok(catalog)
}

/// Build a service backed by the JSON file store under `data_dir`.
pub fn create_service(config: &QuizforgeConfig) -> Result<QuizService> {
    let catalog = load_catalog(config)?;
    let store = JsonFileProgressStore::new(&config.data_dir);
    if !config.integrity.active_rules().is_empty() {
        tracing::info!(rules = ?config.integrity.active_rules(), "integrity rules enabled");
    }
    Ok(QuizService::new(Arc::new(catalog), Arc::new(store))
        .with_engine(ScoringEngine::new(config.integrity.clone()))
        .with_attempt_gate(config.attempt_gate()))
}
