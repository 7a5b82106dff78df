//! The timed survey-taking session: answer storage, navigation, countdown,
//! and the submission state machine.

pub mod answers;
pub mod cursor;
pub mod session;
pub mod timer;

pub use answers::{AnswerError, AnswerStore, AnswerValue};
pub use cursor::{Advance, Cursor};
pub use session::{SessionError, SurveySession};
pub use timer::{CountdownTimer, TimerEvent};

use std::future::Future;

use crate::api::models::{SubmitRequest, Survey, SurveyResponse};
use crate::api::{self, ApiClient};

/// What caused a submission to be built and sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionTrigger {
    Manual,
    Timeout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// Walking the questions; answers may be edited.
    Active,
    /// The user finished the last question and the confirmation gate is open.
    Confirming,
    /// A submission has been triggered; retryable if the request failed.
    Submitting(SubmissionTrigger),
    /// Terminal.
    Submitted(SubmissionTrigger),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The countdown reached zero before a manual submission.
    Expired,
    Submitted {
        trigger: SubmissionTrigger,
    },
    SubmissionFailed {
        trigger: SubmissionTrigger,
        message: String,
    },
}

/// The backend collaborator a session talks to. The production
/// implementation is [`ApiClient`]; tests drive the session with a double.
pub trait SurveyBackend: Send + Sync + 'static {
    fn fetch_survey(&self, survey_id: i64) -> impl Future<Output = api::Result<Survey>> + Send;

    fn submit_responses(
        &self,
        survey_id: i64,
        request: SubmitRequest,
    ) -> impl Future<Output = api::Result<SurveyResponse>> + Send;
}

impl SurveyBackend for ApiClient {
    fn fetch_survey(&self, survey_id: i64) -> impl Future<Output = api::Result<Survey>> + Send {
        self.survey(survey_id)
    }

    fn submit_responses(
        &self,
        survey_id: i64,
        request: SubmitRequest,
    ) -> impl Future<Output = api::Result<SurveyResponse>> + Send {
        async move { ApiClient::submit_responses(self, survey_id, &request).await }
    }
}
