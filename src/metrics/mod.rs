//! Prometheus metrics for capture sessions.
//!
//! # Metrics Exposed
//!
//! ## Session Metrics
//! - `face_attendance_view` - Current view (0=home, 1=enrolling, 2=recognizing)
//! - `face_attendance_camera_streaming` - Whether a camera stream is live
//! - `face_attendance_camera_acquisitions_total` / `_releases_total` - Stream open/stop counts
//! - `face_attendance_captures_total` / `face_attendance_capture_failures_total`
//!
//! ## Gateway Metrics
//! - `face_attendance_enrollments_total` - Enrollments accepted
//! - `face_attendance_recognitions_total` - Recognition replies applied
//! - `face_attendance_marks_total` - Attendance marks accepted
//! - `face_attendance_gateway_failures_total` - Failed service calls
//! - `face_attendance_stale_replies_total` - Replies discarded after a view change
//!
//! ## Status Metrics
//! - `face_attendance_status_refreshes_total` / `_status_refresh_failures_total`
//! - `face_attendance_attended_today` / `face_attendance_not_attended_today`
//!
//! [`MetricsExporter`] renders these on demand. Its HTTP endpoint is
//! behind the `metrics` feature.

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsExporter, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{router, serve};
