//! Session error taxonomy.

use super::{Action, ViewKind};
use crate::capture::CameraError;
use crate::gateway::GatewayError;
use std::time::Duration;
use thiserror::Error;

/// Every failure a session operation can report.
///
/// None of these end the session; returning Home always succeeds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Camera permission denied or no device.
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
    /// Capture attempted before the stream reported video dimensions.
    #[error("camera is not ready yet, try again")]
    NoActiveFrame,
    /// Reading or encoding a frame failed; the stream itself is still up.
    #[error("could not capture photo: {0}")]
    Capture(String),
    /// Required input missing before a submit.
    #[error("{0}")]
    Validation(String),
    /// The service answered with an error status.
    #[error("service error: {0}")]
    Remote(String),
    /// Network or decoding failure reaching the service.
    #[error("could not reach service: {0}")]
    Transport(String),
    /// The service did not answer in time.
    #[error("service did not answer within {0:?}")]
    Timeout(Duration),
    /// The event is not accepted in the current view.
    #[error("cannot {action} while {view}")]
    InvalidState { action: Action, view: ViewKind },
    /// The same action already has a request in flight.
    #[error("{0} is already in progress")]
    Busy(Action),
    /// The reply arrived after its view was left and was discarded.
    #[error("{0} reply discarded, the view has changed")]
    Stale(Action),
}

impl SessionError {
    /// Errors the user fixes by changing input or permissions, rather than retrying.
    pub fn needs_user_fix(&self) -> bool {
        matches!(
            self,
            SessionError::DeviceUnavailable(_) | SessionError::Validation(_)
        )
    }
}

impl From<CameraError> for SessionError {
    fn from(error: CameraError) -> Self {
        match error {
            CameraError::NoActiveFrame => SessionError::NoActiveFrame,
            CameraError::DeviceUnavailable(reason) => SessionError::DeviceUnavailable(reason),
            CameraError::ConfigFailed(reason) => SessionError::DeviceUnavailable(reason),
            CameraError::CaptureFailed(reason) => SessionError::Capture(reason),
            CameraError::NotAcquired => SessionError::Capture(CameraError::NotAcquired.to_string()),
        }
    }
}

impl From<GatewayError> for SessionError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Remote(message) => SessionError::Remote(message),
            GatewayError::Transport(message) => SessionError::Transport(message),
            GatewayError::Timeout(limit) => SessionError::Timeout(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_failure_is_retryable() {
        let error = SessionError::from(CameraError::CaptureFailed("jpeg encode failed".into()));
        assert_eq!(error, SessionError::Capture("jpeg encode failed".into()));
        assert!(!error.needs_user_fix());
    }

    #[test]
    fn test_missing_device_needs_user_fix() {
        let error = SessionError::from(CameraError::DeviceUnavailable("permission denied".into()));
        assert!(error.needs_user_fix());
        assert!(SessionError::from(CameraError::ConfigFailed("bad size".into())).needs_user_fix());
    }

    #[test]
    fn test_gateway_errors_keep_their_kind() {
        assert_eq!(
            SessionError::from(GatewayError::Remote("duplicate roll".into())),
            SessionError::Remote("duplicate roll".into())
        );
        assert_eq!(
            SessionError::from(GatewayError::Timeout(Duration::from_secs(3))),
            SessionError::Timeout(Duration::from_secs(3))
        );
    }
}
