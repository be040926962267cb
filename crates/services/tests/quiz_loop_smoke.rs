use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::QuestionBank;
use quiz_core::model::{HighScore, Phase, QuizRules, Tier};
use quiz_core::time::fixed_now;
use services::catalog::bundled_bank;
use services::{Advance, Clock, QuizLoopService, QuizPersistence, TransitionError};
use storage::repository::{
    HighScoreRepository, InMemoryRepository, QUIZ_STATE_KEY, QuizStateRecord, QuizStateRepository,
    Storage, StorageError,
};

fn bank() -> Arc<dyn QuestionBank> {
    Arc::new(bundled_bank().unwrap())
}

async fn service_over(storage: &Storage) -> QuizLoopService {
    let persistence = QuizPersistence::new(Clock::fixed(fixed_now()), storage);
    QuizLoopService::resume(QuizRules::default(), bank(), persistence).await
}

async fn answer(service: &QuizLoopService, correct: bool) -> Advance {
    let question = service.snapshot().question.expect("a question is showing");
    let raw = if correct {
        question.correct_answer().to_owned()
    } else {
        "not the answer".to_owned()
    };
    let feedback = service.submit_answer(&raw).await.unwrap();
    assert_eq!(feedback.is_correct, correct);
    service.continue_quiz().await.unwrap()
}

async fn play_tier(service: &QuizLoopService, pattern: &[bool]) -> Advance {
    let mut last = None;
    for &correct in pattern {
        last = Some(answer(service, correct).await);
    }
    last.unwrap()
}

#[tokio::test(start_paused = true)]
async fn two_of_three_on_easy_promotes_to_medium() {
    let repo = InMemoryRepository::new();
    let storage = Storage::from_in_memory(repo.clone());
    let service = service_over(&storage).await;
    service.start().await;

    let advance = play_tier(&service, &[true, true, false]).await;
    assert_eq!(
        advance,
        Advance::LevelComplete {
            cleared: Tier::Easy,
            next: Tier::Medium,
            correct: 2
        }
    );

    let snapshot = service.snapshot();
    assert_eq!(snapshot.state.score(), 20);
    assert_eq!(snapshot.state.phase(), Phase::LevelComplete);
    assert_eq!(snapshot.state.tier(), Tier::Medium);

    service.shutdown().await;
    let saved = repo.load_state().await.unwrap().expect("session saved");
    assert_eq!(saved.phase, Phase::LevelComplete);
    assert_eq!(saved.current_tier, Tier::Medium);
    assert_eq!(saved.score, 20);
}

#[tokio::test(start_paused = true)]
async fn failing_hard_tier_ends_game_and_stores_high_score() {
    let repo = InMemoryRepository::new();
    let storage = Storage::from_in_memory(repo.clone());
    let service = service_over(&storage).await;
    service.start().await;

    for _ in 0..2 {
        play_tier(&service, &[true, true, true]).await;
        service.acknowledge_level_complete().await.unwrap();
    }
    assert_eq!(service.snapshot().state.tier(), Tier::Hard);

    let Advance::GameOver(over) = play_tier(&service, &[true, false, false]).await else {
        panic!("expected game over");
    };
    assert_eq!(over.final_score, 120);
    assert!(!over.cleared_all_tiers);
    assert!(over.new_high_score);

    // Stored before game over is published.
    assert_eq!(
        repo.get_high_score().await.unwrap(),
        Some(HighScore::new(120))
    );
    let snapshot = service.snapshot();
    assert_eq!(snapshot.state.phase(), Phase::GameOver);
    assert_eq!(snapshot.high_score, HighScore::new(120));
    assert!(!snapshot.cleared_all_tiers);
}

#[tokio::test(start_paused = true)]
async fn missing_every_easy_question_scores_zero() {
    let repo = InMemoryRepository::new();
    let storage = Storage::from_in_memory(repo.clone());
    let service = service_over(&storage).await;
    service.start().await;

    let Advance::GameOver(over) = play_tier(&service, &[false, false, false]).await else {
        panic!("expected game over");
    };
    assert_eq!(over.final_score, 0);
    assert_eq!(over.reached, Tier::Easy);
    assert!(!over.new_high_score);

    let snapshot = service.snapshot();
    assert_eq!(snapshot.state.phase(), Phase::GameOver);
    assert_eq!(snapshot.high_score, HighScore::default());
    assert_eq!(repo.get_high_score().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn lower_final_score_keeps_high_score() {
    let repo = InMemoryRepository::new();
    repo.raise_high_score(HighScore::new(500)).await.unwrap();
    let storage = Storage::from_in_memory(repo.clone());
    let service = service_over(&storage).await;
    assert_eq!(service.high_score(), HighScore::new(500));

    service.start().await;
    let Advance::GameOver(over) = play_tier(&service, &[false, false, true]).await else {
        panic!("expected game over");
    };
    assert_eq!(over.final_score, 10);
    assert!(!over.new_high_score);
    assert_eq!(
        repo.get_high_score().await.unwrap(),
        Some(HighScore::new(500))
    );
}

#[tokio::test(start_paused = true)]
async fn clearing_every_tier_is_reported() {
    let storage = Storage::in_memory();
    let service = service_over(&storage).await;
    service.start().await;

    for _ in 0..2 {
        play_tier(&service, &[true, false, true]).await;
        service.acknowledge_level_complete().await.unwrap();
    }
    let Advance::GameOver(over) = play_tier(&service, &[true, true, true]).await else {
        panic!("expected game over");
    };
    assert!(over.cleared_all_tiers);
    assert_eq!(over.final_score, 20 + 40 + 90);
    assert!(service.snapshot().cleared_all_tiers);
}

#[tokio::test(start_paused = true)]
async fn restart_discards_previous_progress() {
    let repo = InMemoryRepository::new();
    let storage = Storage::from_in_memory(repo.clone());
    let service = service_over(&storage).await;
    let first = service.start().await;
    answer(&service, true).await;
    answer(&service, true).await;

    let second = service.start().await;
    assert_ne!(first, second);
    service.shutdown().await;

    let saved = repo.load_state().await.unwrap().expect("session saved");
    assert_eq!(saved.playthrough_id, second.value());
    assert_eq!(saved.score, 0);
    assert_eq!(saved.current_tier, Tier::Easy);
    assert_eq!(saved.current_question_index, 0);
    assert!(saved.answer_log.is_empty());
    assert_eq!(saved.phase, Phase::InProgress);
    assert_eq!(saved.time_remaining, 30);
}

#[tokio::test(start_paused = true)]
async fn corrupt_session_resumes_as_not_started() {
    let repo = InMemoryRepository::new();
    repo.put_raw(QUIZ_STATE_KEY, "{\"currentTier\": 7").unwrap();
    let storage = Storage::from_in_memory(repo.clone());

    let service = service_over(&storage).await;
    assert_eq!(service.snapshot().state.phase(), Phase::NotStarted);
    assert!(service.snapshot().feedback.is_none());

    service.start().await;
    service.shutdown().await;
    assert!(repo.load_state().await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn session_resumes_where_it_was_left() {
    let repo = InMemoryRepository::new();
    let storage = Storage::from_in_memory(repo.clone());
    let service = service_over(&storage).await;
    service.start().await;
    answer(&service, true).await;
    service.submit_answer("not the answer").await.unwrap();
    let before = service.snapshot();
    service.shutdown().await;
    drop(service);

    let resumed = service_over(&storage).await;
    let snapshot = resumed.snapshot();
    assert_eq!(snapshot.state, before.state);
    let feedback = snapshot.feedback.expect("feedback still pending");
    assert!(!feedback.is_correct);
    assert_eq!(feedback.key, before.state.current_key());

    let advance = resumed.continue_quiz().await.unwrap();
    assert!(matches!(advance, Advance::NextQuestion { .. }));
    assert_eq!(resumed.snapshot().state.question_index(), 2);
}

#[tokio::test(start_paused = true)]
async fn saved_session_is_loaded_from_record() {
    let repo = InMemoryRepository::new();
    let storage = Storage::from_in_memory(repo.clone());
    let service = service_over(&storage).await;
    service.start().await;
    answer(&service, true).await;
    service.shutdown().await;

    let record: QuizStateRecord = repo.load_state().await.unwrap().unwrap();
    assert_eq!(record.current_question_index, 1);
    assert_eq!(record.answer_log.len(), 1);
    assert!(record.answer_log[0].correct);
}

#[tokio::test(start_paused = true)]
async fn invalid_transitions_leave_state_untouched() {
    let service = service_over(&Storage::in_memory()).await;

    assert!(matches!(
        service.submit_answer("x").await,
        Err(TransitionError::WrongPhase { .. })
    ));
    assert!(matches!(
        service.continue_quiz().await,
        Err(TransitionError::WrongPhase { .. })
    ));

    service.start().await;
    let before = service.snapshot().state;
    assert_eq!(
        service.time_expired().await,
        Err(TransitionError::TimeRemaining { remaining: 30 })
    );
    assert!(matches!(
        service.acknowledge_level_complete().await,
        Err(TransitionError::WrongPhase { .. })
    ));
    assert_eq!(service.snapshot().state, before);
}

struct BrokenStorage;

#[async_trait]
impl QuizStateRepository for BrokenStorage {
    async fn load_state(&self) -> Result<Option<QuizStateRecord>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn save_state(&self, _record: &QuizStateRecord) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn clear_state(&self) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[async_trait]
impl HighScoreRepository for BrokenStorage {
    async fn get_high_score(&self) -> Result<Option<HighScore>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn raise_high_score(&self, _score: HighScore) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[tokio::test(start_paused = true)]
async fn storage_failures_do_not_interrupt_play() {
    let broken = Arc::new(BrokenStorage);
    let storage = Storage {
        quiz_states: broken.clone(),
        high_scores: broken,
    };
    let service = service_over(&storage).await;
    assert_eq!(service.snapshot().state.phase(), Phase::NotStarted);

    service.start().await;
    let Advance::GameOver(over) = play_tier(&service, &[true, false, false]).await else {
        panic!("expected game over");
    };
    assert_eq!(over.final_score, 10);
    assert_eq!(service.snapshot().high_score, HighScore::new(10));
    service.shutdown().await;
}
