pub mod client;
pub mod models;

pub use client::ApiClient;
pub use reqwest::StatusCode;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, decode).
    #[error("request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered with a non-2xx status.
    #[error("backend returned {status}: {message}")]
    Server { status: StatusCode, message: String },
}

pub type Result<T> = std::result::Result<T, ApiError>;
