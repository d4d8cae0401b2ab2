//! Request/response shapes for the recognition service.
//!
//! Wire structs mirror the service's JSON exactly; the domain types
//! ([`EnrollmentSubject`], [`RecognitionResult`]) are what the rest of
//! the crate works with.

use super::GatewayError;
use crate::capture::CapturedImage;
use crate::status::{AttendanceStatusSnapshot, Subject};
use serde::{Deserialize, Serialize};

/// A new person to register, submitted as one unit.
#[derive(Debug, Clone)]
pub struct EnrollmentSubject {
    /// Display name.
    pub name: String,
    /// Roll number, sent as `roll`.
    pub roll_id: String,
    /// Stills in capture order.
    pub images: Vec<CapturedImage>,
}

/// Outcome of a recognition round trip.
///
/// A non-match is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionResult {
    /// The face matched a registered subject.
    Recognized(Subject),
    /// No face, or an unknown one. Carries the service message if any.
    NoMatch { message: Option<String> },
}

impl RecognitionResult {
    /// True for a match.
    pub fn recognized(&self) -> bool {
        matches!(self, RecognitionResult::Recognized(_))
    }

    /// The matched subject, only when recognized.
    pub fn subject(&self) -> Option<&Subject> {
        match self {
            RecognitionResult::Recognized(subject) => Some(subject),
            RecognitionResult::NoMatch { .. } => None,
        }
    }

    /// Display name.
    pub fn name(&self) -> Option<&str> {
        self.subject().map(|s| s.name.as_str())
    }

    /// Roll of the matched subject.
    pub fn roll_id(&self) -> Option<&str> {
        self.subject().map(|s| s.roll_id.as_str())
    }
}

impl std::fmt::Display for RecognitionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognitionResult::Recognized(subject) => write!(f, "Recognized: {subject}"),
            RecognitionResult::NoMatch { message: Some(m) } => write!(f, "No match: {m}"),
            RecognitionResult::NoMatch { message: None } => {
                write!(f, "No match: no face detected or unknown face")
            }
        }
    }
}

/// Status field common to every reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    /// The request was handled.
    Ok,
    /// The service rejected the request.
    Error,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterFacesRequest<'a> {
    pub name: &'a str,
    pub roll: &'a str,
    pub images: Vec<String>,
}

impl<'a> From<&'a EnrollmentSubject> for RegisterFacesRequest<'a> {
    fn from(subject: &'a EnrollmentSubject) -> Self {
        Self {
            name: &subject.name,
            roll: &subject.roll_id,
            images: subject.images.iter().map(CapturedImage::to_data_uri).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RecognizeFaceRequest {
    pub image: String,
}

/// `{status, message}` reply used by enrollment and attendance marking.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageReply {
    pub status: ReplyStatus,
    #[serde(default)]
    pub message: Option<String>,
}

impl MessageReply {
    pub fn into_message(self) -> Result<String, GatewayError> {
        match self.status {
            ReplyStatus::Ok => Ok(self.message.unwrap_or_default()),
            ReplyStatus::Error => Err(remote(self.message)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecognizeFaceReply {
    pub status: ReplyStatus,
    #[serde(default)]
    pub recognized: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roll: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RecognizeFaceReply {
    /// Placeholder name/roll sent alongside `recognized: false` are dropped.
    pub fn into_result(self) -> Result<RecognitionResult, GatewayError> {
        if self.status == ReplyStatus::Error {
            return Err(remote(self.message));
        }
        if !self.recognized {
            return Ok(RecognitionResult::NoMatch {
                message: self.message,
            });
        }
        match (self.name, self.roll) {
            (Some(name), Some(roll)) if !name.is_empty() && !roll.is_empty() => {
                Ok(RecognitionResult::Recognized(Subject::new(name, roll)))
            }
            _ => Err(GatewayError::Transport(
                "recognized reply is missing name or roll".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttendanceStatusReply {
    pub status: ReplyStatus,
    #[serde(default)]
    pub attended_today: Vec<Subject>,
    #[serde(default)]
    pub not_attended_today: Vec<Subject>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AttendanceStatusReply {
    pub fn into_snapshot(self) -> Result<AttendanceStatusSnapshot, GatewayError> {
        match self.status {
            ReplyStatus::Ok => Ok(AttendanceStatusSnapshot::new(
                self.attended_today,
                self.not_attended_today,
            )),
            ReplyStatus::Error => Err(remote(self.message)),
        }
    }
}

fn remote(message: Option<String>) -> GatewayError {
    GatewayError::Remote(message.unwrap_or_else(|| "service reported an error".to_string()))
}
