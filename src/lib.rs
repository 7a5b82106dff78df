pub mod api;
pub mod config;
pub mod editor;
pub mod history;
pub mod identity;
pub mod taking;

pub use api::{ApiClient, ApiError};
pub use config::AppConfig;
pub use identity::{Identity, Role};
pub use taking::{
    AnswerStore, AnswerValue, CountdownTimer, SessionEvent, SessionPhase, SubmissionTrigger,
    SurveyBackend, SurveySession,
};
