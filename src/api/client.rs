use log::{debug, info};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::AppConfig;

use super::models::{
    AuthResponse, CategoryStats, DashboardStats, ErrorBody, LoginRequest, ManagedUser, Ranking,
    RegisterRequest, ResponseDetail, SubmitRequest, Survey, SurveyCategory, SurveyResponse,
    SurveyStats, UserAccount, UserProfile, UserUpdate,
};
use super::{ApiError, Result};

/// Typed client for the survey backend's REST API.
///
/// One instance is shared across the whole application; `reqwest::Client`
/// pools connections internally so cloning is cheap.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(ApiClient {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        ApiClient {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    // Auth

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        info!("Logging in as '{}'", request.username);
        self.post_json("/auth/login", request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        info!("Registering new account '{}'", request.username);
        self.post_json("/auth/register", request).await
    }

    // Categories

    pub async fn categories(&self) -> Result<Vec<SurveyCategory>> {
        self.get_json("/categories").await
    }

    // Surveys

    pub async fn surveys(&self) -> Result<Vec<Survey>> {
        self.get_json("/surveys").await
    }

    pub async fn surveys_by_category(&self, category_id: i64) -> Result<Vec<Survey>> {
        self.get_json(&format!("/surveys/category/{}", category_id)).await
    }

    pub async fn survey(&self, survey_id: i64) -> Result<Survey> {
        self.get_json(&format!("/surveys/{}", survey_id)).await
    }

    pub async fn create_survey(&self, survey: &Survey) -> Result<Survey> {
        info!("Creating survey '{}'", survey.title);
        self.post_json("/surveys", survey).await
    }

    pub async fn update_survey(&self, survey_id: i64, survey: &Survey) -> Result<Survey> {
        info!("Updating survey {} ('{}')", survey_id, survey.title);
        let response = self
            .client
            .put(self.url(&format!("/surveys/{}", survey_id)))
            .json(survey)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    pub async fn delete_survey(&self, survey_id: i64) -> Result<()> {
        info!("Deleting survey {}", survey_id);
        let response = self
            .client
            .delete(self.url(&format!("/surveys/{}", survey_id)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // Responses

    pub async fn submit_responses(
        &self,
        survey_id: i64,
        request: &SubmitRequest,
    ) -> Result<SurveyResponse> {
        info!(
            "Submitting {} answers for survey {} (user {})",
            request.answers.len(),
            survey_id,
            request.user_id
        );
        self.post_json(&format!("/surveys/{}/submit", survey_id), request)
            .await
    }

    pub async fn user_responses(&self, user_id: i64) -> Result<Vec<SurveyResponse>> {
        self.get_json(&format!("/surveys/responses/user/{}", user_id)).await
    }

    pub async fn has_completed_survey(&self, survey_id: i64, user_id: i64) -> Result<bool> {
        self.get_json(&format!("/surveys/{}/user/{}/completed", survey_id, user_id))
            .await
    }

    pub async fn survey_responses(&self, survey_id: i64) -> Result<Vec<ResponseDetail>> {
        self.get_json(&format!("/surveys/{}/responses", survey_id)).await
    }

    // Rankings and statistics

    pub async fn rankings(&self) -> Result<Vec<Ranking>> {
        self.get_json("/rankings").await
    }

    pub async fn category_stats(&self) -> Result<Vec<CategoryStats>> {
        self.get_json("/surveys/stats/categories").await
    }

    pub async fn dashboard_stats(&self, user_id: i64) -> Result<DashboardStats> {
        self.get_json(&format!("/surveys/stats/{}", user_id)).await
    }

    pub async fn user_survey_stats(&self, user_id: i64) -> Result<SurveyStats> {
        self.get_json(&format!("/surveys/user-stats/{}", user_id)).await
    }

    // Users

    pub async fn user(&self, user_id: i64) -> Result<UserAccount> {
        self.get_json(&format!("/users/{}", user_id)).await
    }

    pub async fn users(&self) -> Result<Vec<UserAccount>> {
        self.get_json("/users").await
    }

    pub async fn managed_users(&self) -> Result<Vec<ManagedUser>> {
        self.get_json("/admin/users").await
    }

    pub async fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<ManagedUser> {
        info!("Updating user {} (role {})", user_id, update.role);
        let response = self
            .client
            .put(self.url(&format!("/admin/users/{}", user_id)))
            .json(update)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<()> {
        info!("Deleting user {}", user_id);
        let response = self
            .client
            .delete(self.url(&format!("/admin/users/{}", user_id)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn user_profiles(&self) -> Result<Vec<UserProfile>> {
        self.get_json("/admin/users/profiles").await
    }

    // Plumbing

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(Self::check(response).await?).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        debug!("POST {}", path);
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(Self::check(response).await?).await
    }

    /// Convert a non-2xx response into `ApiError::Server`, pulling the
    /// human-readable message out of the body when the backend sent one.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request rejected")
                    .to_string()
            });

        Err(ApiError::Server { status, message })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        Ok(response.json::<T>().await?)
    }
}
