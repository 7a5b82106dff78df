use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::models::{Question, SubmitRequest, Survey};
use crate::api::ApiError;

use super::answers::{AnswerError, AnswerStore, AnswerValue};
use super::cursor::{Advance, Cursor};
use super::timer::CountdownTimer;
use super::{SessionEvent, SessionPhase, SubmissionTrigger, SurveyBackend};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to load survey: {0}")]
    Fetch(#[source] ApiError),
    #[error("submission failed: {0}")]
    Submit(#[source] ApiError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error("operation not valid while {0:?}")]
    InvalidPhase(SessionPhase),
    #[error("a submission request is already outstanding")]
    SubmissionInFlight,
}

struct SessionState {
    phase: SessionPhase,
    cursor: Cursor,
    answers: AnswerStore,
}

/// One user's attempt at one survey: the orchestrating state machine.
///
/// Owns the answer store, the navigation cursor, and the countdown timer.
/// Both submission paths (manual confirmation and countdown expiry) funnel
/// into one guarded `submit`, so exactly one payload is ever sent; a failed
/// request keeps the answers intact and stays retryable. Dropping the
/// session releases the timer and the expiry listener in any phase.
pub struct SurveySession<B: SurveyBackend> {
    id: Uuid,
    backend: Arc<B>,
    survey: Survey,
    survey_id: i64,
    user_id: i64,
    state: Mutex<SessionState>,
    // Forbids a second request while one is outstanding (stray late tick,
    // double click, premature retry).
    in_flight: AtomicBool,
    timer: CountdownTimer,
    events: mpsc::UnboundedSender<SessionEvent>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<B: SurveyBackend> SurveySession<B> {
    /// Fetch the survey definition and start the session clock.
    ///
    /// On success the session is `Active`: the answer store holds one
    /// default entry per question, the cursor sits on the first question,
    /// and the countdown runs with `durationMinutes * 60` seconds. Expiry
    /// auto-submits whatever has been answered so far.
    pub async fn begin(
        backend: Arc<B>,
        survey_id: i64,
        user_id: i64,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>), SessionError> {
        let survey = backend
            .fetch_survey(survey_id)
            .await
            .map_err(SessionError::Fetch)?;

        let answers = AnswerStore::for_questions(&survey.questions)?;
        let cursor = Cursor::new(survey.questions.len());
        let total_seconds = u64::from(survey.duration_minutes.max(0) as u32) * 60;
        let (timer, mut expired) = CountdownTimer::start(total_seconds);
        let (events, event_receiver) = mpsc::unbounded_channel();

        let session = Arc::new(SurveySession {
            id: Uuid::new_v4(),
            backend,
            survey_id,
            user_id,
            state: Mutex::new(SessionState {
                phase: SessionPhase::Active,
                cursor,
                answers,
            }),
            in_flight: AtomicBool::new(false),
            timer,
            events,
            survey,
            listener: Mutex::new(None),
        });

        info!(
            "📋 Session {} active: '{}' ({} questions, {}s budget)",
            session.id,
            session.survey.title,
            session.survey.questions.len(),
            total_seconds
        );

        // The listener holds only a weak handle; tearing the session down
        // must not be kept alive by its own expiry path.
        let weak = Arc::downgrade(&session);
        let listener = tokio::spawn(async move {
            if expired.recv().await.is_some() {
                if let Some(session) = weak.upgrade() {
                    session.handle_expiry().await;
                }
            }
        });
        *session.listener.lock() = Some(listener);

        Ok((session, event_receiver))
    }

    // Read surface for the presentation layer.

    pub fn survey(&self) -> &Survey {
        &self.survey
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.lock().phase.clone()
    }

    pub fn current_index(&self) -> usize {
        self.state.lock().cursor.index()
    }

    pub fn question_count(&self) -> usize {
        self.survey.questions.len()
    }

    pub fn current_question(&self) -> Option<&Question> {
        let index = self.state.lock().cursor.index();
        self.survey.questions.get(index)
    }

    pub fn current_answer(&self) -> Option<AnswerValue> {
        let state = self.state.lock();
        let question = self.survey.questions.get(state.cursor.index())?;
        question.id.and_then(|id| state.answers.get(id).cloned())
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.timer.remaining_seconds()
    }

    // Navigation and answering. All of these leave the answer store alone
    // except answer_current, and none of them can submit by themselves.

    /// Overwrite the answer for the question under the cursor.
    pub fn answer_current(&self, value: AnswerValue) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if state.phase != SessionPhase::Active {
            return Err(SessionError::InvalidPhase(state.phase.clone()));
        }
        let question_id = self
            .survey
            .questions
            .get(state.cursor.index())
            .and_then(|question| question.id)
            .ok_or(AnswerError::MissingQuestionId {
                position: state.cursor.index(),
            })?;
        state.answers.set(question_id, value)?;
        Ok(())
    }

    /// Move forward; on the last question this opens the confirmation gate
    /// instead of moving.
    pub fn next(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if state.phase != SessionPhase::Active {
            return Err(SessionError::InvalidPhase(state.phase.clone()));
        }
        if let Advance::AtEnd = state.cursor.advance() {
            info!("Session {}: last question reached, confirming", self.id);
            state.phase = SessionPhase::Confirming;
        }
        Ok(())
    }

    /// Move back one question; a no-op on the first.
    pub fn previous(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if state.phase != SessionPhase::Active {
            return Err(SessionError::InvalidPhase(state.phase.clone()));
        }
        state.cursor.retreat();
        Ok(())
    }

    /// Close the confirmation gate and go back to editing answers. The
    /// cursor stays on the last question.
    pub fn cancel_confirm(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if state.phase != SessionPhase::Confirming {
            return Err(SessionError::InvalidPhase(state.phase.clone()));
        }
        state.phase = SessionPhase::Active;
        Ok(())
    }

    // Submission.

    /// Confirm the gate and submit manually.
    pub async fn confirm(&self) -> Result<(), SessionError> {
        self.submit(SubmissionTrigger::Manual).await
    }

    /// Re-send the payload after a failed submission. The answer store has
    /// not changed in the meantime, so the payload is identical.
    pub async fn retry(&self) -> Result<(), SessionError> {
        let (payload, trigger) = {
            let state = self.state.lock();
            let trigger = match state.phase {
                SessionPhase::Submitting(trigger) => trigger,
                ref phase => return Err(SessionError::InvalidPhase(phase.clone())),
            };
            if self.in_flight.swap(true, Ordering::SeqCst) {
                return Err(SessionError::SubmissionInFlight);
            }
            (self.build_payload(&state), trigger)
        };
        info!("🔁 Session {}: retrying submission", self.id);
        self.send(payload, trigger).await
    }

    async fn handle_expiry(self: Arc<Self>) {
        warn!("⏰ Session {}: time expired, forcing submission", self.id);
        let _ = self.events.send(SessionEvent::Expired);
        // Failure is surfaced through the event channel; the session stays
        // retryable.
        let _ = self.submit(SubmissionTrigger::Timeout).await;
    }

    /// The single submission path shared by both triggers. Whichever
    /// trigger gets here first moves the phase to Submitting; the loser
    /// sees a terminal phase and becomes a no-op.
    async fn submit(&self, trigger: SubmissionTrigger) -> Result<(), SessionError> {
        let payload = {
            let mut state = self.state.lock();
            match (&state.phase, trigger) {
                (SessionPhase::Confirming, _) => {}
                (SessionPhase::Active, SubmissionTrigger::Timeout) => {}
                (SessionPhase::Submitting(_), _) | (SessionPhase::Submitted(_), _) => {
                    info!(
                        "Session {}: {:?} trigger suppressed, submission already underway",
                        self.id, trigger
                    );
                    return Ok(());
                }
                (phase, _) => return Err(SessionError::InvalidPhase(phase.clone())),
            }
            // Phase transition and flag are claimed under one lock, so two
            // triggers in the same event-loop turn cannot both build a
            // payload.
            self.in_flight.store(true, Ordering::SeqCst);
            state.phase = SessionPhase::Submitting(trigger);
            self.build_payload(&state)
        };
        self.send(payload, trigger).await
    }

    fn build_payload(&self, state: &SessionState) -> SubmitRequest {
        SubmitRequest {
            survey_id: self.survey_id,
            user_id: self.user_id,
            answers: state.answers.to_records(),
        }
    }

    async fn send(&self, payload: SubmitRequest, trigger: SubmissionTrigger) -> Result<(), SessionError> {
        info!(
            "📤 Session {}: submitting {} answers ({:?})",
            self.id,
            payload.answers.len(),
            trigger
        );

        match self.backend.submit_responses(self.survey_id, payload).await {
            Ok(_) => {
                self.timer.cancel();
                self.state.lock().phase = SessionPhase::Submitted(trigger);
                self.in_flight.store(false, Ordering::SeqCst);
                info!("✅ Session {}: submitted ({:?})", self.id, trigger);
                let _ = self.events.send(SessionEvent::Submitted { trigger });
                Ok(())
            }
            Err(err) => {
                // Stay in Submitting: the answers are untouched and the
                // same payload can be retried.
                self.in_flight.store(false, Ordering::SeqCst);
                error!("❌ Session {}: submission failed: {}", self.id, err);
                let _ = self.events.send(SessionEvent::SubmissionFailed {
                    trigger,
                    message: err.to_string(),
                });
                Err(SessionError::Submit(err))
            }
        }
    }
}

impl<B: SurveyBackend> Drop for SurveySession<B> {
    fn drop(&mut self) {
        self.timer.cancel();
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
        info!("🧹 Session {} torn down", self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::api::models::{QuestionType, SurveyResponse};
    use crate::api::{self, StatusCode};

    struct StubBackend {
        survey: Survey,
        submissions: Mutex<Vec<SubmitRequest>>,
        fail_times: AtomicUsize,
    }

    impl StubBackend {
        fn new(survey: Survey) -> Self {
            StubBackend {
                survey,
                submissions: Mutex::new(Vec::new()),
                fail_times: AtomicUsize::new(0),
            }
        }
    }

    impl SurveyBackend for StubBackend {
        fn fetch_survey(
            &self,
            _survey_id: i64,
        ) -> impl std::future::Future<Output = api::Result<Survey>> + Send {
            let survey = self.survey.clone();
            async move { Ok(survey) }
        }

        fn submit_responses(
            &self,
            survey_id: i64,
            request: SubmitRequest,
        ) -> impl std::future::Future<Output = api::Result<SurveyResponse>> + Send {
            self.submissions.lock().push(request.clone());
            let should_fail = self
                .fail_times
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                    left.checked_sub(1)
                })
                .is_ok();
            async move {
                if should_fail {
                    return Err(ApiError::Server {
                        status: StatusCode::INTERNAL_SERVER_ERROR,
                        message: "boom".to_string(),
                    });
                }
                Ok(SurveyResponse {
                    id: Some(1),
                    survey_id,
                    user_id: request.user_id,
                    started_at: None,
                    completed_at: None,
                    answers: request.answers,
                })
            }
        }
    }

    fn fixture_survey() -> Survey {
        let question = |id: i64, question_type, options: Vec<(i64, &str)>| Question {
            id: Some(id),
            question_text: format!("Q{}", id),
            question_type,
            order_number: None,
            options: options
                .into_iter()
                .map(|(option_id, text)| crate::api::models::QuestionOption {
                    id: Some(option_id),
                    option_text: text.to_string(),
                    order_number: None,
                })
                .collect(),
        };
        Survey {
            id: Some(5),
            title: "Fixture".to_string(),
            description: String::new(),
            category_id: Some(1),
            duration_minutes: 1,
            response_count: None,
            questions: vec![
                question(1, QuestionType::Text, vec![]),
                question(2, QuestionType::MultipleChoice, vec![(11, "a"), (12, "b")]),
                question(3, QuestionType::Rating, vec![]),
            ],
            created_at: None,
            updated_at: None,
        }
    }

    async fn active_session(
        backend: Arc<StubBackend>,
    ) -> (
        Arc<SurveySession<StubBackend>>,
        mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        SurveySession::begin(backend, 5, 42).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn manual_and_timeout_racing_send_exactly_one_payload() {
        let backend = Arc::new(StubBackend::new(fixture_survey()));
        let (session, _events) = active_session(Arc::clone(&backend)).await;

        session.next().unwrap();
        session.next().unwrap();
        session.next().unwrap(); // gate opens

        // Drive both trigger paths in the same event-loop turn.
        let (manual, timeout) = tokio::join!(
            session.confirm(),
            Arc::clone(&session).handle_expiry()
        );
        manual.unwrap();
        let _ = timeout;

        assert_eq!(backend.submissions.lock().len(), 1);
        assert!(matches!(session.phase(), SessionPhase::Submitted(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn second_confirm_is_suppressed() {
        let backend = Arc::new(StubBackend::new(fixture_survey()));
        let (session, _events) = active_session(Arc::clone(&backend)).await;

        session.next().unwrap();
        session.next().unwrap();
        session.next().unwrap();

        session.confirm().await.unwrap();
        session.confirm().await.unwrap(); // no-op, not an error

        assert_eq!(backend.submissions.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_without_open_gate_is_rejected() {
        let backend = Arc::new(StubBackend::new(fixture_survey()));
        let (session, _events) = active_session(backend).await;

        let err = session.confirm().await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidPhase(SessionPhase::Active)));
    }
}
