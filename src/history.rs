//! Response-history view assembly: joins a user's submissions with the
//! survey definitions and category names they refer to.

use std::collections::{BTreeSet, HashMap};

use futures::future::join_all;
use log::warn;

use crate::api::models::{Survey, SurveyCategory, SurveyResponse};
use crate::api::{self, ApiClient};

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub response: SurveyResponse,
    pub survey_title: String,
    pub category_name: String,
    pub duration_minutes: Option<i32>,
}

/// Load everything the history view needs in one call: the responses, the
/// category list, and each referenced survey (fetched concurrently).
///
/// A survey that can no longer be fetched degrades that entry to a
/// placeholder instead of failing the whole view.
pub async fn load_user_history(api: &ApiClient, user_id: i64) -> api::Result<Vec<HistoryEntry>> {
    let responses = api.user_responses(user_id).await?;
    let categories = api.categories().await?;

    let survey_ids: BTreeSet<i64> = responses.iter().map(|response| response.survey_id).collect();
    let fetches = join_all(survey_ids.iter().map(|&survey_id| api.survey(survey_id))).await;

    let mut surveys = Vec::new();
    for (survey_id, fetched) in survey_ids.iter().zip(fetches) {
        match fetched {
            Ok(survey) => surveys.push(survey),
            Err(err) => warn!("Survey {} missing from history view: {}", survey_id, err),
        }
    }

    Ok(assemble(responses, &surveys, &categories))
}

/// Pure join of responses, surveys, and categories, newest first.
pub fn assemble(
    responses: Vec<SurveyResponse>,
    surveys: &[Survey],
    categories: &[SurveyCategory],
) -> Vec<HistoryEntry> {
    let surveys_by_id: HashMap<i64, &Survey> = surveys
        .iter()
        .filter_map(|survey| survey.id.map(|id| (id, survey)))
        .collect();
    let category_names: HashMap<i64, &str> = categories
        .iter()
        .map(|category| (category.id, category.name.as_str()))
        .collect();

    let mut entries: Vec<HistoryEntry> = responses
        .into_iter()
        .map(|response| {
            let survey = surveys_by_id.get(&response.survey_id);
            let survey_title = survey
                .map(|survey| survey.title.clone())
                .unwrap_or_else(|| "Unknown survey".to_string());
            let category_name = survey
                .and_then(|survey| survey.category_id)
                .and_then(|category_id| category_names.get(&category_id).copied())
                .unwrap_or("Uncategorized")
                .to_string();
            let duration_minutes = survey.map(|survey| survey.duration_minutes);

            HistoryEntry {
                response,
                survey_title,
                category_name,
                duration_minutes,
            }
        })
        .collect();

    // Newest first; entries without a completion timestamp go last.
    entries.sort_by(|a, b| b.response.completed_at.cmp(&a.response.completed_at));
    entries
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn response(id: i64, survey_id: i64, day: u32) -> SurveyResponse {
        SurveyResponse {
            id: Some(id),
            survey_id,
            user_id: 42,
            started_at: None,
            completed_at: NaiveDate::from_ymd_opt(2024, 3, day)
                .and_then(|date| date.and_hms_opt(12, 0, 0)),
            answers: Vec::new(),
        }
    }

    fn survey(id: i64, title: &str, category_id: Option<i64>) -> Survey {
        Survey {
            id: Some(id),
            title: title.to_string(),
            description: String::new(),
            category_id,
            duration_minutes: 10,
            response_count: None,
            questions: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn joins_titles_and_categories_newest_first() {
        let surveys = vec![survey(1, "Climate", Some(7)), survey(2, "Coffee", None)];
        let categories = vec![SurveyCategory {
            id: 7,
            name: "Workplace".to_string(),
            description: None,
        }];
        let responses = vec![response(10, 1, 1), response(11, 2, 5)];

        let entries = assemble(responses, &surveys, &categories);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].survey_title, "Coffee");
        assert_eq!(entries[0].category_name, "Uncategorized");
        assert_eq!(entries[1].survey_title, "Climate");
        assert_eq!(entries[1].category_name, "Workplace");
    }

    #[test]
    fn missing_survey_degrades_to_placeholder() {
        let entries = assemble(vec![response(10, 99, 1)], &[], &[]);
        assert_eq!(entries[0].survey_title, "Unknown survey");
        assert_eq!(entries[0].category_name, "Uncategorized");
        assert_eq!(entries[0].duration_minutes, None);
    }
}
