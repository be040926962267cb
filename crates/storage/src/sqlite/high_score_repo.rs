use async_trait::async_trait;
use chrono::Utc;
use quiz_core::model::HighScore;

use crate::repository::{HIGH_SCORE_KEY, HighScoreRepository, StorageError, parse_high_score};

use super::SqliteRepository;
use super::kv;

#[async_trait]
impl HighScoreRepository for SqliteRepository {
    async fn get_high_score(&self) -> Result<Option<HighScore>, StorageError> {
        kv::get(&self.pool, HIGH_SCORE_KEY)
            .await?
            .map(|raw| parse_high_score(&raw))
            .transpose()
    }

    async fn raise_high_score(&self, score: HighScore) -> Result<(), StorageError> {
        // The score doubles as the row revision, so lower values never overwrite.
        kv::put_if_newer(
            &self.pool,
            HIGH_SCORE_KEY,
            &score.value().to_string(),
            i64::from(score.value()),
            Utc::now(),
        )
        .await
    }
}
