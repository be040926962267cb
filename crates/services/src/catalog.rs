//! Loading question banks from JSON catalogs.

use std::path::Path;

use serde::Deserialize;

use quiz_core::StaticQuestionBank;
use quiz_core::model::{QuestionDraft, Tier};

use crate::error::CatalogError;

const BUNDLED_CATALOG: &str = include_str!("../assets/questions.json");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    easy: Vec<QuestionDraft>,
    medium: Vec<QuestionDraft>,
    hard: Vec<QuestionDraft>,
}

/// Parse a catalog of the form `{ "easy": [...], "medium": [...], "hard": [...] }`.
///
/// # Errors
///
/// Returns `CatalogError::Json` for malformed JSON and `CatalogError::Bank` when a
/// question fails validation or a tier is empty.
pub fn bank_from_json(raw: &str) -> Result<StaticQuestionBank, CatalogError> {
    let file: CatalogFile = serde_json::from_str(raw)?;
    Ok(StaticQuestionBank::from_drafts([
        (Tier::Easy, file.easy),
        (Tier::Medium, file.medium),
        (Tier::Hard, file.hard),
    ])?)
}

/// Read a catalog file from disk.
///
/// # Errors
///
/// Returns `CatalogError::Io` if the file cannot be read, or any parse error.
pub fn load_bank(path: &Path) -> Result<StaticQuestionBank, CatalogError> {
    let raw = std::fs::read_to_string(path)?;
    bank_from_json(&raw)
}

/// The catalog shipped with the crate: ten questions per tier.
///
/// # Errors
///
/// Returns `CatalogError` only if the bundled file is broken.
pub fn bundled_bank() -> Result<StaticQuestionBank, CatalogError> {
    bank_from_json(BUNDLED_CATALOG)
}
