use thiserror::Error;

use crate::api::models::{AnswerRecord, Question, QuestionType};

pub const MAX_RATING: u8 = 5;

/// The user's current value for one question. The variant kind always
/// matches the question's type; `set` rejects anything else.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    Text(String),
    /// `None` until the user picks an option.
    Choice(Option<i64>),
    /// 0 means unanswered.
    Rating(u8),
}

impl AnswerValue {
    pub fn default_for(question_type: QuestionType) -> AnswerValue {
        match question_type {
            QuestionType::Text => AnswerValue::Text(String::new()),
            QuestionType::MultipleChoice => AnswerValue::Choice(None),
            QuestionType::Rating => AnswerValue::Rating(0),
        }
    }

    pub fn is_answered(&self) -> bool {
        match self {
            AnswerValue::Text(text) => !text.is_empty(),
            AnswerValue::Choice(selected) => selected.is_some(),
            AnswerValue::Rating(value) => *value > 0,
        }
    }

    fn matches(&self, question_type: QuestionType) -> bool {
        matches!(
            (self, question_type),
            (AnswerValue::Text(_), QuestionType::Text)
                | (AnswerValue::Choice(_), QuestionType::MultipleChoice)
                | (AnswerValue::Rating(_), QuestionType::Rating)
        )
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum AnswerError {
    #[error("question {0} is not part of this survey")]
    UnknownQuestion(i64),
    #[error("question {position} in the survey definition has no id")]
    MissingQuestionId { position: usize },
    #[error("value kind does not match the {expected:?} question {question_id}")]
    KindMismatch {
        question_id: i64,
        expected: QuestionType,
    },
    #[error("rating {0} is outside 0..={MAX_RATING}")]
    RatingOutOfRange(u8),
}

#[derive(Debug, Clone, PartialEq)]
struct AnswerEntry {
    question_id: i64,
    question_type: QuestionType,
    value: AnswerValue,
}

/// Ordered mapping from question id to the user's current answer.
///
/// Exactly one entry exists per question, created with the type-appropriate
/// default when the session starts and overwritten in place afterwards.
/// Writes are all-or-nothing: a rejected value leaves the entry untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerStore {
    entries: Vec<AnswerEntry>,
}

impl AnswerStore {
    pub fn for_questions(questions: &[Question]) -> Result<AnswerStore, AnswerError> {
        let mut entries = Vec::with_capacity(questions.len());
        for (position, question) in questions.iter().enumerate() {
            let question_id = question
                .id
                .ok_or(AnswerError::MissingQuestionId { position })?;
            entries.push(AnswerEntry {
                question_id,
                question_type: question.question_type,
                value: AnswerValue::default_for(question.question_type),
            });
        }
        Ok(AnswerStore { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, question_id: i64) -> Option<&AnswerValue> {
        self.entries
            .iter()
            .find(|entry| entry.question_id == question_id)
            .map(|entry| &entry.value)
    }

    /// Overwrite the answer for one question. No required-field policy is
    /// applied here; an unanswered question may stay unanswered until
    /// submission.
    pub fn set(&mut self, question_id: i64, value: AnswerValue) -> Result<(), AnswerError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.question_id == question_id)
            .ok_or(AnswerError::UnknownQuestion(question_id))?;

        if !value.matches(entry.question_type) {
            return Err(AnswerError::KindMismatch {
                question_id,
                expected: entry.question_type,
            });
        }
        if let AnswerValue::Rating(rating) = value {
            if rating > MAX_RATING {
                return Err(AnswerError::RatingOutOfRange(rating));
            }
        }

        entry.value = value;
        Ok(())
    }

    pub fn answered_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value.is_answered())
            .count()
    }

    /// Build the submission rows in question order, following the backend
    /// contract: choice rows carry the option id and an empty text, text
    /// rows carry the raw string, rating rows carry the number as text.
    pub fn to_records(&self) -> Vec<AnswerRecord> {
        self.entries
            .iter()
            .map(|entry| match entry.question_type {
                QuestionType::MultipleChoice => {
                    let selected = match entry.value {
                        AnswerValue::Choice(selected) => selected,
                        _ => None,
                    };
                    AnswerRecord {
                        question_id: entry.question_id,
                        answer_text: String::new(),
                        selected_option_id: selected,
                    }
                }
                QuestionType::Text => {
                    let text = match &entry.value {
                        AnswerValue::Text(text) => text.clone(),
                        _ => String::new(),
                    };
                    AnswerRecord {
                        question_id: entry.question_id,
                        answer_text: text,
                        selected_option_id: None,
                    }
                }
                QuestionType::Rating => {
                    let rating = match entry.value {
                        AnswerValue::Rating(rating) => rating,
                        _ => 0,
                    };
                    AnswerRecord {
                        question_id: entry.question_id,
                        answer_text: rating.to_string(),
                        selected_option_id: None,
                    }
                }
            })
            .collect()
    }
}
