use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};

use quiz_core::model::{AnswerKey, Phase, Question, QuestionKind, Tier};
use services::{QuizLoopService, QuizSnapshot, TransitionError};

/// What the player is looking at. A change of screen triggers a full redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Title,
    Question(AnswerKey),
    Feedback(AnswerKey),
    LevelComplete(Tier),
    GameOver,
}

impl Screen {
    fn of(snapshot: &QuizSnapshot) -> Self {
        let state = &snapshot.state;
        match state.phase() {
            Phase::NotStarted => Screen::Title,
            Phase::InProgress if snapshot.feedback.is_some() => {
                Screen::Feedback(state.current_key())
            }
            Phase::InProgress => Screen::Question(state.current_key()),
            Phase::LevelComplete => Screen::LevelComplete(state.tier()),
            Phase::GameOver => Screen::GameOver,
        }
    }
}

/// Run the interactive loop until the player quits or stdin closes.
///
/// The session stays resumable; quitting only stops the countdown.
pub async fn play(quiz: QuizLoopService) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut updates = quiz.subscribe();

    let mut screen = Screen::of(&quiz.snapshot());
    print_screen(&quiz.snapshot())?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().eq_ignore_ascii_case("q") {
                    break;
                }
                handle_input(&quiz, screen, &line).await;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                let next = Screen::of(&snapshot);
                if next == screen {
                    print_clock(&snapshot)?;
                    continue;
                }
                screen = next;
                print_screen(&snapshot)?;
            }
        }
    }

    quiz.shutdown().await;
    println!("Progress saved. Bye!");
    Ok(())
}

async fn handle_input(quiz: &QuizLoopService, screen: Screen, line: &str) {
    let outcome = match screen {
        Screen::Title | Screen::GameOver => {
            quiz.start().await;
            Ok(())
        }
        Screen::Question(_) => {
            if line.trim().is_empty() {
                println!("Type an answer first (or q to quit).");
                return;
            }
            let Some(question) = quiz.snapshot().question else {
                return;
            };
            quiz.submit_answer(&resolve_answer(&question, line))
                .await
                .map(|_| ())
        }
        // Only a bare Enter moves on, so an answer typed as the clock ran out
        // does not skip the feedback.
        Screen::Feedback(_) if !line.trim().is_empty() => {
            if quiz.snapshot().feedback.is_some_and(|f| f.timed_out) {
                println!("Too late, time already ran out. Press Enter to continue.");
            } else {
                println!("Press Enter to continue.");
            }
            return;
        }
        Screen::Feedback(_) => quiz.continue_quiz().await.map(|_| ()),
        Screen::LevelComplete(_) => quiz.acknowledge_level_complete().await,
    };

    match outcome {
        Ok(()) => {}
        Err(TransitionError::FeedbackPending { .. }) => {
            println!("Too late, time already ran out. Press Enter to continue.");
        }
        Err(err) => println!("({err})"),
    }
}

/// Map terminal shorthand onto the answer text: option numbers for multiple
/// choice, `t`/`f` for true/false. Anything else is submitted as typed.
fn resolve_answer(question: &Question, input: &str) -> String {
    let trimmed = input.trim();
    match question.kind() {
        QuestionKind::MultipleChoice => trimmed
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| question.options().get(i))
            .cloned()
            .unwrap_or_else(|| input.to_owned()),
        QuestionKind::TrueFalse => match trimmed.to_ascii_lowercase().as_str() {
            "t" => "true".to_owned(),
            "f" => "false".to_owned(),
            _ => input.to_owned(),
        },
        QuestionKind::FreeText => input.to_owned(),
    }
}

fn print_screen(snapshot: &QuizSnapshot) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out)?;
    out.write_all(render(snapshot).as_bytes())?;
    out.flush()
}

fn print_clock(snapshot: &QuizSnapshot) -> io::Result<()> {
    let remaining = snapshot.state.time_remaining();
    if remaining > 0 && (remaining % 10 == 0 || remaining <= 5) {
        println!("  ... {remaining}s left");
    }
    Ok(())
}

fn render(snapshot: &QuizSnapshot) -> String {
    let state = &snapshot.state;
    let status = format!(
        "Score: {}   High score: {}\n",
        state.score(),
        snapshot.high_score
    );

    match Screen::of(snapshot) {
        Screen::Title => format!(
            "=== Trivia Quiz ===\nThree levels: easy (10 pts), medium (20 pts), hard (30 pts).\n\
             Get 2 of 3 right to move up. You have {}s per question.\n{status}\
             Press Enter to start, q to quit.\n",
            state.time_remaining()
        ),
        Screen::Question(_) => {
            let mut text = format!(
                "--- {} level | Question {} of {} | {}s left ---\n{status}",
                capitalize(state.tier().as_str()),
                snapshot.progress.display_position(),
                snapshot.progress.total,
                state.time_remaining(),
            );
            if let Some(question) = &snapshot.question {
                text.push_str(question.prompt());
                text.push('\n');
                match question.kind() {
                    QuestionKind::MultipleChoice => {
                        for (i, option) in question.options().iter().enumerate() {
                            text.push_str(&format!("  {}. {option}\n", i + 1));
                        }
                        text.push_str("Answer with a number or the option text:\n");
                    }
                    QuestionKind::TrueFalse => text.push_str("True or false? (t/f)\n"),
                    QuestionKind::FreeText => text.push_str("Type your answer:\n"),
                }
            }
            text
        }
        Screen::Feedback(_) => {
            let Some(feedback) = &snapshot.feedback else {
                return status;
            };
            let verdict = if feedback.is_correct {
                format!("Correct! +{} points", feedback.points_awarded)
            } else if feedback.timed_out {
                format!("Time's up! The answer was: {}", feedback.correct_answer)
            } else {
                format!("Wrong. The answer was: {}", feedback.correct_answer)
            };
            format!("{verdict}\n{status}Press Enter to continue.\n")
        }
        Screen::LevelComplete(next) => format!(
            "*** Level complete! ***\nNext up: {} level.\n{status}Press Enter to continue.\n",
            next.as_str()
        ),
        Screen::GameOver => {
            let headline = if snapshot.cleared_all_tiers {
                "You completed all levels!".to_owned()
            } else {
                format!("You reached the {} level.", state.tier().as_str())
            };
            format!(
                "=== Game over ===\n{headline}\nFinal score: {}\nHigh score: {}\n\
                 Press Enter to play again, q to quit.\n",
                state.score(),
                snapshot.high_score
            )
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
