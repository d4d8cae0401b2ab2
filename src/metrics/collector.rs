//! Metrics collection and registry.

use crate::session::{SessionController, ViewKind};
use crate::status::AttendanceStatusCache;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registering or encoding a metric failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of session state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Current view (0=home, 1=enrolling, 2=recognizing).
    pub view: i64,
    /// Whether a camera stream is live.
    pub camera_streaming: bool,
    /// Camera streams opened.
    pub camera_acquisitions: u64,
    /// Camera streams stopped.
    pub camera_releases: u64,
    /// Successful photo captures.
    pub captures: u64,
    /// Captures that produced no image.
    pub capture_failures: u64,
    /// Enrollments accepted by the service.
    pub enrollments: u64,
    /// Recognition replies applied.
    pub recognitions: u64,
    /// Attendance marks accepted by the service.
    pub attendance_marks: u64,
    /// Gateway calls that failed (remote, transport or timeout).
    pub gateway_failures: u64,
    /// Replies discarded because the view had changed.
    pub stale_replies: u64,
    /// Successful status refreshes.
    pub status_refreshes: u64,
    /// Failed status refreshes.
    pub status_refresh_failures: u64,
    /// Attended count from the latest status snapshot.
    pub attended_today: Option<usize>,
    /// Not-attended count from the latest status snapshot.
    pub not_attended_today: Option<usize>,
}

/// Prometheus metrics registry for capture sessions.
pub struct MetricsRegistry {
    registry: Registry,

    // Session metrics
    view: IntGauge,
    camera_streaming: IntGauge,
    camera_acquisitions_total: IntCounter,
    camera_releases_total: IntCounter,
    captures_total: IntCounter,
    capture_failures_total: IntCounter,

    // Gateway metrics
    enrollments_total: IntCounter,
    recognitions_total: IntCounter,
    attendance_marks_total: IntCounter,
    gateway_failures_total: IntCounter,
    stale_replies_total: IntCounter,

    // Status metrics
    status_refreshes_total: IntCounter,
    status_refresh_failures_total: IntCounter,
    attended_today: IntGauge,
    not_attended_today: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all session metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let view = IntGauge::new(
            "face_attendance_view",
            "Current view (0=home, 1=enrolling, 2=recognizing)",
        )?;
        let camera_streaming = IntGauge::new(
            "face_attendance_camera_streaming",
            "Whether a camera stream is live (1=yes, 0=no)",
        )?;
        let camera_acquisitions_total = IntCounter::new(
            "face_attendance_camera_acquisitions_total",
            "Camera streams opened",
        )?;
        let camera_releases_total = IntCounter::new(
            "face_attendance_camera_releases_total",
            "Camera streams stopped",
        )?;
        let captures_total = IntCounter::new(
            "face_attendance_captures_total",
            "Photos captured into a buffer",
        )?;
        let capture_failures_total = IntCounter::new(
            "face_attendance_capture_failures_total",
            "Photo captures that failed",
        )?;

        let enrollments_total = IntCounter::new(
            "face_attendance_enrollments_total",
            "Enrollments accepted by the service",
        )?;
        let recognitions_total = IntCounter::new(
            "face_attendance_recognitions_total",
            "Recognition replies applied",
        )?;
        let attendance_marks_total = IntCounter::new(
            "face_attendance_marks_total",
            "Attendance marks accepted by the service",
        )?;
        let gateway_failures_total = IntCounter::new(
            "face_attendance_gateway_failures_total",
            "Service calls that failed",
        )?;
        let stale_replies_total = IntCounter::new(
            "face_attendance_stale_replies_total",
            "Service replies discarded after the view changed",
        )?;

        let status_refreshes_total = IntCounter::new(
            "face_attendance_status_refreshes_total",
            "Successful attendance status refreshes",
        )?;
        let status_refresh_failures_total = IntCounter::new(
            "face_attendance_status_refresh_failures_total",
            "Failed attendance status refreshes",
        )?;
        let attended_today = IntGauge::new(
            "face_attendance_attended_today",
            "Subjects marked present today",
        )?;
        let not_attended_today = IntGauge::new(
            "face_attendance_not_attended_today",
            "Registered subjects not yet marked today",
        )?;

        registry.register(Box::new(view.clone()))?;
        registry.register(Box::new(camera_streaming.clone()))?;
        registry.register(Box::new(camera_acquisitions_total.clone()))?;
        registry.register(Box::new(camera_releases_total.clone()))?;
        registry.register(Box::new(captures_total.clone()))?;
        registry.register(Box::new(capture_failures_total.clone()))?;
        registry.register(Box::new(enrollments_total.clone()))?;
        registry.register(Box::new(recognitions_total.clone()))?;
        registry.register(Box::new(attendance_marks_total.clone()))?;
        registry.register(Box::new(gateway_failures_total.clone()))?;
        registry.register(Box::new(stale_replies_total.clone()))?;
        registry.register(Box::new(status_refreshes_total.clone()))?;
        registry.register(Box::new(status_refresh_failures_total.clone()))?;
        registry.register(Box::new(attended_today.clone()))?;
        registry.register(Box::new(not_attended_today.clone()))?;

        Ok(Self {
            registry,
            view,
            camera_streaming,
            camera_acquisitions_total,
            camera_releases_total,
            captures_total,
            capture_failures_total,
            enrollments_total,
            recognitions_total,
            attendance_marks_total,
            gateway_failures_total,
            stale_replies_total,
            status_refreshes_total,
            status_refresh_failures_total,
            attended_today,
            not_attended_today,
        })
    }

    /// Updates all metrics from a snapshot of session state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.view.set(snapshot.view);
        self.camera_streaming
            .set(if snapshot.camera_streaming { 1 } else { 0 });

        // Counters only move forward by the difference
        advance(&self.camera_acquisitions_total, snapshot.camera_acquisitions);
        advance(&self.camera_releases_total, snapshot.camera_releases);
        advance(&self.captures_total, snapshot.captures);
        advance(&self.capture_failures_total, snapshot.capture_failures);
        advance(&self.enrollments_total, snapshot.enrollments);
        advance(&self.recognitions_total, snapshot.recognitions);
        advance(&self.attendance_marks_total, snapshot.attendance_marks);
        advance(&self.gateway_failures_total, snapshot.gateway_failures);
        advance(&self.stale_replies_total, snapshot.stale_replies);
        advance(&self.status_refreshes_total, snapshot.status_refreshes);
        advance(
            &self.status_refresh_failures_total,
            snapshot.status_refresh_failures,
        );

        // Only update if a snapshot has been fetched
        if let Some(attended) = snapshot.attended_today {
            self.attended_today.set(attended as i64);
        }
        if let Some(not_attended) = snapshot.not_attended_today {
            self.not_attended_today.set(not_attended as i64);
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of a session.
    pub fn from_session(session: &SessionController) -> Self {
        let counters = session.counters();
        let camera = session.camera_stats();

        Self {
            view: match session.view() {
                ViewKind::Home => 0,
                ViewKind::Enrolling => 1,
                ViewKind::Recognizing => 2,
            },
            camera_streaming: session.is_camera_streaming(),
            camera_acquisitions: camera.acquisitions,
            camera_releases: camera.releases,
            captures: counters.captures,
            capture_failures: counters.capture_failures,
            enrollments: counters.enrollments,
            recognitions: counters.recognitions,
            attendance_marks: counters.attendance_marks,
            gateway_failures: counters.gateway_failures,
            stale_replies: counters.stale_replies,
            ..Default::default()
        }
        .with_status(session.status_cache())
    }

    /// Fills the status fields from the cache as it is right now.
    pub fn with_status(mut self, status: &AttendanceStatusCache) -> Self {
        let latest = status.snapshot();
        self.status_refreshes = status.refresh_count();
        self.status_refresh_failures = status.failure_count();
        self.attended_today = latest.as_ref().map(|s| s.attended.len());
        self.not_attended_today = latest.as_ref().map(|s| s.not_attended.len());
        self
    }
}

/// Renders the registry on demand.
///
/// The session is single-threaded and stays with its owner, which pushes
/// counters through [`MetricsExporter::publish`]. The status cache is
/// shared, so its figures are read live at render time.
pub struct MetricsExporter {
    registry: MetricsRegistry,
    status: Arc<AttendanceStatusCache>,
    session: Mutex<MetricsSnapshot>,
}

impl MetricsExporter {
    /// Creates an exporter reading status figures from `status`.
    pub fn new(registry: MetricsRegistry, status: Arc<AttendanceStatusCache>) -> Self {
        Self {
            registry,
            status,
            session: Mutex::new(MetricsSnapshot::default()),
        }
    }

    /// Records the latest session-side figures.
    pub fn publish(&self, snapshot: MetricsSnapshot) {
        *self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot;
    }

    /// True once the status cache holds a snapshot.
    pub fn has_status(&self) -> bool {
        self.status.snapshot().is_some()
    }

    /// Updates the registry and encodes it in Prometheus text format.
    pub fn render(&self) -> Result<String, MetricsError> {
        let snapshot = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .with_status(&self.status);
        self.registry.update(&snapshot);
        self.registry.encode()
    }
}
