use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("correct answer cannot be empty")]
    EmptyAnswer,

    #[error("multiple-choice questions need at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("correct answer {answer:?} is not one of the options")]
    AnswerNotInOptions { answer: String },

    #[error("true/false answer must be \"true\" or \"false\", got {0:?}")]
    InvalidTrueFalse(String),

    #[error("options are only allowed on multiple-choice questions")]
    UnexpectedOptions,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    #[serde(rename = "text-input", alias = "free-text")]
    FreeText,
}

/// Unvalidated question as it appears in a catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
}

impl QuestionDraft {
    /// Check the draft and turn it into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt or answer is blank, when a
    /// multiple-choice answer is not among its options, or when a true/false
    /// answer is neither `true` nor `false`.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if self.correct_answer.trim().is_empty() {
            return Err(QuestionError::EmptyAnswer);
        }

        let options = match (self.kind, self.options) {
            (QuestionKind::MultipleChoice, Some(options)) => {
                if options.len() < 2 {
                    return Err(QuestionError::TooFewOptions(options.len()));
                }
                let wanted = normalize(&self.correct_answer);
                if !options.iter().any(|o| normalize(o) == wanted) {
                    return Err(QuestionError::AnswerNotInOptions {
                        answer: self.correct_answer,
                    });
                }
                options
            }
            (QuestionKind::MultipleChoice, None) => return Err(QuestionError::TooFewOptions(0)),
            (_, Some(_)) => return Err(QuestionError::UnexpectedOptions),
            (QuestionKind::TrueFalse, None) => {
                let answer = normalize(&self.correct_answer);
                if answer != "true" && answer != "false" {
                    return Err(QuestionError::InvalidTrueFalse(self.correct_answer));
                }
                Vec::new()
            }
            (QuestionKind::FreeText, None) => Vec::new(),
        };

        Ok(Question {
            kind: self.kind,
            prompt: self.prompt,
            options,
            correct_answer: self.correct_answer,
        })
    }
}

/// A validated, immutable quiz question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    kind: QuestionKind,
    prompt: String,
    options: Vec<String>,
    correct_answer: String,
}

impl Question {
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Answer choices; empty unless the question is multiple-choice.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    /// Case-insensitive exact comparison against the correct answer.
    ///
    /// An empty submission is never correct.
    #[must_use]
    pub fn is_correct(&self, raw: &str) -> bool {
        !raw.is_empty() && normalize(raw) == normalize(&self.correct_answer)
    }
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mc(answer: &str) -> QuestionDraft {
        QuestionDraft {
            kind: QuestionKind::MultipleChoice,
            prompt: "Which of the following is a JavaScript framework?".into(),
            options: Some(vec!["React".into(), "CSS".into(), "HTML".into()]),
            correct_answer: answer.into(),
        }
    }

    #[test]
    fn multiple_choice_answer_must_be_an_option() {
        assert!(mc("react").validate().is_ok());
        let err = mc("Vue").validate().unwrap_err();
        assert!(matches!(err, QuestionError::AnswerNotInOptions { .. }));
    }

    #[test]
    fn answers_compare_case_insensitively() {
        let q = mc("React").validate().unwrap();
        assert!(q.is_correct("REACT"));
        assert!(q.is_correct("react"));
        assert!(!q.is_correct("react "));
        assert!(!q.is_correct(""));
    }

    #[test]
    fn true_false_rejects_other_answers() {
        let draft = QuestionDraft {
            kind: QuestionKind::TrueFalse,
            prompt: "HTML is a programming language.".into(),
            options: None,
            correct_answer: "maybe".into(),
        };
        assert!(matches!(
            draft.validate(),
            Err(QuestionError::InvalidTrueFalse(_))
        ));
    }

    #[test]
    fn free_text_with_options_is_rejected() {
        let draft = QuestionDraft {
            kind: QuestionKind::FreeText,
            prompt: "What does DOM stand for?".into(),
            options: Some(vec!["a".into(), "b".into()]),
            correct_answer: "Document Object Model".into(),
        };
        assert_eq!(draft.validate(), Err(QuestionError::UnexpectedOptions));
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let mut draft = mc("React");
        draft.prompt = "   ".into();
        assert_eq!(draft.validate(), Err(QuestionError::EmptyPrompt));
    }
}
