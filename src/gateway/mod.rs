//! Remote verification gateway.
//!
//! Face detection, enrollment and matching all happen inside a remote
//! service. This module is the typed contract to it:
//!
//! | Operation | Endpoint |
//! |---|---|
//! | [`VerificationGateway::enroll`] | `POST /register-faces` |
//! | [`VerificationGateway::recognize`] | `POST /recognize-face` |
//! | [`VerificationGateway::mark_attendance`] | `POST /mark-attendance` |
//! | [`VerificationGateway::fetch_status`] | `GET /attendance-status` |
//!
//! Each call is independent; a failure in one never touches state
//! produced by another.

mod http;
mod types;

pub use http::HttpGateway;
pub use types::{EnrollmentSubject, RecognitionResult, ReplyStatus};

use crate::capture::CapturedImage;
use crate::status::{AttendanceStatusSnapshot, Subject};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur talking to the recognition service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The service answered with `status: "error"`.
    #[error("service error: {0}")]
    Remote(String),
    /// The service could not be reached or its reply could not be read.
    #[error("transport error: {0}")]
    Transport(String),
    /// No reply within the limit.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Request/response contract with the recognition service.
#[async_trait]
pub trait VerificationGateway: Send + Sync {
    /// Registers a subject from one or more stills. Returns the service message.
    async fn enroll(&self, subject: &EnrollmentSubject) -> Result<String, GatewayError>;

    /// Identifies the face in a single still.
    async fn recognize(&self, image: &CapturedImage) -> Result<RecognitionResult, GatewayError>;

    /// Records attendance for a recognized subject. Returns the service message.
    ///
    /// Repeat marks for the same day are forwarded as-is; whatever the
    /// service answers is the result.
    async fn mark_attendance(&self, subject: &Subject) -> Result<String, GatewayError>;

    /// Reads today's full attended / not-attended lists.
    async fn fetch_status(&self) -> Result<AttendanceStatusSnapshot, GatewayError>;
}

/// Bounds a gateway call by `limit`.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(limit)),
    }
}
