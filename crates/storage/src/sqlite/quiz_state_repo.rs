use async_trait::async_trait;

use crate::repository::{QUIZ_STATE_KEY, QuizStateRecord, QuizStateRepository, StorageError};

use super::SqliteRepository;
use super::kv;

#[async_trait]
impl QuizStateRepository for SqliteRepository {
    async fn load_state(&self) -> Result<Option<QuizStateRecord>, StorageError> {
        kv::get(&self.pool, QUIZ_STATE_KEY)
            .await?
            .map(|raw| QuizStateRecord::from_json(&raw))
            .transpose()
    }

    async fn save_state(&self, record: &QuizStateRecord) -> Result<(), StorageError> {
        let value = record.to_json()?;
        kv::put_if_newer(
            &self.pool,
            QUIZ_STATE_KEY,
            &value,
            kv::revision_to_i64(record.revision)?,
            record.saved_at,
        )
        .await
    }

    async fn clear_state(&self) -> Result<(), StorageError> {
        kv::delete(&self.pool, QUIZ_STATE_KEY).await
    }
}
