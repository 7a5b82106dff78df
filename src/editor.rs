//! Admin-side survey authoring: a mutable draft that is validated and
//! assembled into the backend DTO on save.

use log::info;
use thiserror::Error;

use crate::api::models::{Question, QuestionOption, QuestionType, Survey};
use crate::api::{ApiClient, ApiError};

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("draft is invalid: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("index {index} is out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionDraft {
    pub id: Option<i64>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub id: Option<i64>,
    pub text: String,
    pub question_type: QuestionType,
    pub options: Vec<OptionDraft>,
}

impl QuestionDraft {
    pub fn new(question_type: QuestionType) -> QuestionDraft {
        let options = match question_type {
            // A fresh choice question starts with two empty option slots,
            // the minimum a valid question needs.
            QuestionType::MultipleChoice => vec![
                OptionDraft { id: None, text: String::new() },
                OptionDraft { id: None, text: String::new() },
            ],
            _ => Vec::new(),
        };
        QuestionDraft {
            id: None,
            text: String::new(),
            question_type,
            options,
        }
    }
}

/// An in-progress survey definition. Questions keep their list order; the
/// wire `orderNumber`s are assigned only when the payload is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyDraft {
    pub survey_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub duration_minutes: i32,
    questions: Vec<QuestionDraft>,
}

impl SurveyDraft {
    pub fn new() -> SurveyDraft {
        SurveyDraft {
            survey_id: None,
            title: String::new(),
            description: String::new(),
            category_id: None,
            duration_minutes: 0,
            questions: Vec::new(),
        }
    }

    /// Load an existing survey for editing, keeping backend ids so the
    /// update round-trips.
    pub fn from_survey(survey: &Survey) -> SurveyDraft {
        SurveyDraft {
            survey_id: survey.id,
            title: survey.title.clone(),
            description: survey.description.clone(),
            category_id: survey.category_id,
            duration_minutes: survey.duration_minutes,
            questions: survey
                .questions
                .iter()
                .map(|question| QuestionDraft {
                    id: question.id,
                    text: question.question_text.clone(),
                    question_type: question.question_type,
                    options: question
                        .options
                        .iter()
                        .map(|option| OptionDraft {
                            id: option.id,
                            text: option.option_text.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn questions(&self) -> &[QuestionDraft] {
        &self.questions
    }

    pub fn add_question(&mut self, question_type: QuestionType) -> &mut QuestionDraft {
        self.questions.push(QuestionDraft::new(question_type));
        let last = self.questions.len() - 1;
        &mut self.questions[last]
    }

    pub fn question_mut(&mut self, index: usize) -> Result<&mut QuestionDraft, EditorError> {
        let len = self.questions.len();
        self.questions
            .get_mut(index)
            .ok_or(EditorError::IndexOutOfRange { index, len })
    }

    pub fn remove_question(&mut self, index: usize) -> Result<QuestionDraft, EditorError> {
        if index >= self.questions.len() {
            return Err(EditorError::IndexOutOfRange {
                index,
                len: self.questions.len(),
            });
        }
        Ok(self.questions.remove(index))
    }

    /// Move one question to a new position, shifting the rest. Replaces
    /// the drag-and-drop index splicing of the original editor.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), EditorError> {
        let len = self.questions.len();
        if from >= len || to >= len {
            return Err(EditorError::IndexOutOfRange {
                index: from.max(to),
                len,
            });
        }
        let question = self.questions.remove(from);
        self.questions.insert(to, question);
        Ok(())
    }

    /// Authoring-side validation, reporting every problem at once.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Title is required".to_string());
        }
        if self.description.trim().is_empty() {
            errors.push("Description is required".to_string());
        }
        if self.category_id.is_none() {
            errors.push("Category is required".to_string());
        }
        if self.duration_minutes < 1 {
            errors.push("Valid duration is required".to_string());
        }
        if self.questions.is_empty() {
            errors.push("At least one question is required".to_string());
        }

        for (index, question) in self.questions.iter().enumerate() {
            if question.text.trim().is_empty() {
                errors.push(format!("Question {} text is required", index + 1));
            }
            if question.question_type == QuestionType::MultipleChoice {
                let filled = question
                    .options
                    .iter()
                    .filter(|option| !option.text.trim().is_empty())
                    .count();
                if filled < 2 {
                    errors.push(format!(
                        "Question {} needs at least 2 options",
                        index + 1
                    ));
                }
                for (option_index, option) in question.options.iter().enumerate() {
                    if option.text.trim().is_empty() {
                        errors.push(format!(
                            "Option {} in question {} is required",
                            option_index + 1,
                            index + 1
                        ));
                    }
                }
            }
        }

        errors
    }

    /// Assemble the wire DTO, assigning order numbers from list positions.
    pub fn to_payload(&self) -> Result<Survey, EditorError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(EditorError::Invalid(errors));
        }

        Ok(Survey {
            id: self.survey_id,
            title: self.title.clone(),
            description: self.description.clone(),
            category_id: self.category_id,
            duration_minutes: self.duration_minutes,
            response_count: None,
            questions: self
                .questions
                .iter()
                .enumerate()
                .map(|(index, question)| Question {
                    id: question.id,
                    question_text: question.text.clone(),
                    question_type: question.question_type,
                    order_number: Some(index as i32 + 1),
                    options: question
                        .options
                        .iter()
                        .enumerate()
                        .map(|(option_index, option)| QuestionOption {
                            id: option.id,
                            option_text: option.text.clone(),
                            order_number: Some(option_index as i32 + 1),
                        })
                        .collect(),
                })
                .collect(),
            created_at: None,
            updated_at: None,
        })
    }

    /// Create or update through the backend, depending on whether the
    /// draft was loaded from an existing survey.
    pub async fn save(&self, api: &ApiClient) -> Result<Survey, EditorError> {
        let payload = self.to_payload()?;
        let saved = match self.survey_id {
            Some(survey_id) => api.update_survey(survey_id, &payload).await?,
            None => api.create_survey(&payload).await?,
        };
        info!(
            "💾 Saved survey '{}' ({} questions)",
            saved.title,
            saved.questions.len()
        );
        Ok(saved)
    }
}

impl Default for SurveyDraft {
    fn default() -> Self {
        SurveyDraft::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> SurveyDraft {
        let mut draft = SurveyDraft::new();
        draft.title = "Office climate".to_string();
        draft.description = "Yearly pulse".to_string();
        draft.category_id = Some(2);
        draft.duration_minutes = 5;

        let q1 = draft.add_question(QuestionType::Text);
        q1.text = "How are things?".to_string();

        let q2 = draft.add_question(QuestionType::MultipleChoice);
        q2.text = "Office or remote?".to_string();
        q2.options[0].text = "Office".to_string();
        q2.options[1].text = "Remote".to_string();

        let q3 = draft.add_question(QuestionType::Rating);
        q3.text = "Rate the coffee".to_string();

        draft
    }

    #[test]
    fn validation_reports_every_issue() {
        let mut draft = SurveyDraft::new();
        draft.add_question(QuestionType::MultipleChoice);

        let errors = draft.validate();
        assert!(errors.contains(&"Title is required".to_string()));
        assert!(errors.contains(&"Description is required".to_string()));
        assert!(errors.contains(&"Category is required".to_string()));
        assert!(errors.contains(&"Valid duration is required".to_string()));
        assert!(errors.contains(&"Question 1 text is required".to_string()));
        assert!(errors.contains(&"Question 1 needs at least 2 options".to_string()));
    }

    #[test]
    fn valid_draft_passes() {
        assert!(valid_draft().validate().is_empty());
    }

    #[test]
    fn reorder_moves_one_question_and_keeps_the_rest_in_order() {
        let mut draft = valid_draft();
        draft.reorder(2, 0).unwrap();

        let texts: Vec<&str> = draft
            .questions()
            .iter()
            .map(|question| question.text.as_str())
            .collect();
        assert_eq!(
            texts,
            vec!["Rate the coffee", "How are things?", "Office or remote?"]
        );

        assert!(matches!(
            draft.reorder(0, 9),
            Err(EditorError::IndexOutOfRange { index: 9, len: 3 })
        ));
    }

    #[test]
    fn payload_assigns_sequential_order_numbers() {
        let payload = valid_draft().to_payload().unwrap();
        let orders: Vec<Option<i32>> = payload
            .questions
            .iter()
            .map(|question| question.order_number)
            .collect();
        assert_eq!(orders, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(payload.questions[1].options[1].order_number, Some(2));
    }

    #[test]
    fn invalid_draft_cannot_build_a_payload() {
        let draft = SurveyDraft::new();
        assert!(matches!(draft.to_payload(), Err(EditorError::Invalid(_))));
    }
}
