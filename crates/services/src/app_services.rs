use std::path::Path;
use std::sync::Arc;

use quiz_core::QuestionBank;
use quiz_core::model::{HighScore, QuizRules};
use storage::repository::Storage;

use crate::Clock;
use crate::catalog::{bundled_bank, load_bank};
use crate::error::AppServicesError;
use crate::quiz::{QuizLoopService, QuizPersistence};

/// Assembles the quiz services over a storage backend.
#[derive(Clone)]
pub struct AppServices {
    rules: QuizRules,
    bank: Arc<dyn QuestionBank>,
    persistence: QuizPersistence,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// `catalog` replaces the bundled questions when given.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or catalog loading fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        rules: QuizRules,
        catalog: Option<&Path>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(&storage, clock, rules, catalog)
    }

    /// Build services over an existing storage aggregate.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Catalog` if the catalog cannot be loaded.
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        rules: QuizRules,
        catalog: Option<&Path>,
    ) -> Result<Self, AppServicesError> {
        let bank = match catalog {
            Some(path) => load_bank(path)?,
            None => bundled_bank()?,
        };
        Ok(Self {
            rules,
            bank: Arc::new(bank),
            persistence: QuizPersistence::new(clock, storage),
        })
    }

    /// Restore the saved session into a running quiz loop.
    pub async fn quiz(&self) -> QuizLoopService {
        QuizLoopService::resume(
            self.rules.clone(),
            Arc::clone(&self.bank),
            self.persistence.clone(),
        )
        .await
    }

    pub async fn high_score(&self) -> HighScore {
        self.persistence.load_high_score().await
    }

    /// Drop the saved session; the high score is kept.
    pub async fn reset_session(&self) {
        self.persistence.clear();
        self.persistence.flush().await;
    }
}
