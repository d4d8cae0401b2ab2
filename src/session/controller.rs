//! Session controller: the capture state machine.
//!
//! ```text
//!            start enrollment                 start recognition
//!   Home ───────────────────▶ Enrolling   Home ───────────────────▶ Recognizing
//!    ▲  ◀── submit ok / go home ──┘          ▲  ◀────── go home ─────────┘
//!    │
//!    └── every path back to Home releases the camera
//! ```
//!
//! Switching between the two capture views always goes through a fresh
//! acquisition: the old stream is released and the old payload dropped.
//!
//! Operations take `&self`. State sits behind a mutex that is never held
//! across an `.await`, so UI events interleave with pending service calls.
//! Each transition bumps an epoch; a reply that comes back under a
//! different epoch is discarded.

use super::state::{Enrollment, Recognition, View};
use super::{Action, SessionError, ViewKind};
use crate::capture::{Camera, CameraManager, CameraStats, CaptureConfig, CapturedImage, FrameEncoder};
use crate::gateway::{with_timeout, EnrollmentSubject, RecognitionResult, VerificationGateway};
use crate::status::{AttendanceStatusCache, AttendanceStatusSnapshot, Subject};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Running totals for a session, fed to the metrics registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    /// Photos stored in a buffer or slot.
    pub captures: u64,
    /// Capture attempts that stored nothing.
    pub capture_failures: u64,
    /// Enrollments accepted by the service.
    pub enrollments: u64,
    /// Recognition replies applied to the view.
    pub recognitions: u64,
    /// Attendance marks accepted by the service.
    pub attendance_marks: u64,
    /// Service calls that failed and were not stale.
    pub gateway_failures: u64,
    /// Replies discarded because the view had changed.
    pub stale_replies: u64,
}

/// Result of a successful attendance mark.
#[derive(Debug, Clone)]
pub struct AttendanceMark {
    /// Who was marked.
    pub subject: Subject,
    /// Message from the service.
    pub message: String,
    /// Status after the follow-up refresh, if that refresh succeeded.
    pub snapshot: Option<Arc<AttendanceStatusSnapshot>>,
}

struct SessionInner {
    view: View,
    epoch: u64,
    camera: CameraManager,
    counters: SessionCounters,
}

impl SessionInner {
    /// Drops the current view payload and releases its camera.
    fn go_home(&mut self) -> ViewKind {
        let previous = std::mem::replace(&mut self.view, View::Home);
        let kind = previous.kind();
        self.epoch += 1;
        if let Some(handle) = previous.into_camera() {
            self.camera.release(handle);
        }
        kind
    }

    fn check_epoch(&mut self, epoch: u64, action: Action) -> Result<(), SessionError> {
        if self.epoch == epoch {
            return Ok(());
        }
        self.counters.stale_replies += 1;
        debug!(
            %action,
            issued = epoch,
            current = self.epoch,
            "Discarding stale reply"
        );
        Err(SessionError::Stale(action))
    }
}

/// Clears an in-flight flag when the request finishes or is dropped.
struct InFlight<'a> {
    session: &'a SessionController,
    action: Action,
    epoch: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.lock();
        if inner.epoch == self.epoch {
            inner.view.finish(self.action);
        }
    }
}

/// Orchestrates camera, capture buffer, remote service and status cache
/// for one interactive session.
pub struct SessionController {
    inner: Mutex<SessionInner>,
    gateway: Arc<dyn VerificationGateway>,
    status: Arc<AttendanceStatusCache>,
    encoder: FrameEncoder,
    request_timeout: Duration,
}

impl SessionController {
    /// Creates a session in `Home` with its own status cache.
    pub fn new(
        camera: Box<dyn Camera>,
        capture: CaptureConfig,
        gateway: Arc<dyn VerificationGateway>,
        request_timeout: Duration,
    ) -> Self {
        let status = Arc::new(AttendanceStatusCache::new(
            Arc::clone(&gateway),
            request_timeout,
        ));
        Self::with_status_cache(camera, capture, gateway, status, request_timeout)
    }

    /// Creates a session sharing an existing status cache.
    pub fn with_status_cache(
        camera: Box<dyn Camera>,
        capture: CaptureConfig,
        gateway: Arc<dyn VerificationGateway>,
        status: Arc<AttendanceStatusCache>,
        request_timeout: Duration,
    ) -> Self {
        let encoder = FrameEncoder::new(capture.jpeg_quality);
        Self {
            inner: Mutex::new(SessionInner {
                view: View::Home,
                epoch: 0,
                camera: CameraManager::new(camera, capture),
                counters: SessionCounters::default(),
            }),
            gateway,
            status,
            encoder,
            request_timeout,
        }
    }

    /// Creates a session and performs the initial status refresh.
    ///
    /// A failed refresh is logged; the session is usable either way.
    pub async fn open(
        camera: Box<dyn Camera>,
        capture: CaptureConfig,
        gateway: Arc<dyn VerificationGateway>,
        request_timeout: Duration,
    ) -> Self {
        let session = Self::new(camera, capture, gateway, request_timeout);
        if let Err(e) = session.status.refresh().await {
            warn!(error = %e, "Initial attendance status unavailable");
        }
        session
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ---------------------------------------------------------------
    // Transitions
    // ---------------------------------------------------------------

    /// Enters `Enrolling` with an empty buffer, blank fields and a fresh stream.
    pub fn start_enrollment(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        inner.go_home();
        let handle = inner.camera.acquire().map_err(|e| {
            warn!(error = %e, "Could not start enrollment");
            SessionError::from(e)
        })?;
        inner.view = View::Enrolling(Enrollment::new(handle));
        info!(epoch = inner.epoch, "Enrollment started");
        Ok(())
    }

    /// Enters `Recognizing` with an empty slot, no result and a fresh stream.
    pub fn start_recognition(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        inner.go_home();
        let handle = inner.camera.acquire().map_err(|e| {
            warn!(error = %e, "Could not start recognition");
            SessionError::from(e)
        })?;
        inner.view = View::Recognizing(Recognition::new(handle));
        info!(epoch = inner.epoch, "Recognition started");
        Ok(())
    }

    /// Releases the camera and returns to `Home`. Always succeeds.
    pub fn go_home(&self) {
        let mut inner = self.lock();
        let left = inner.go_home();
        if left != ViewKind::Home {
            info!(from = %left, "Returned home");
        }
    }

    /// Takes a still from the live stream.
    ///
    /// Appends to the enrollment buffer or replaces the recognition slot.
    /// Returns how many images the current view now holds.
    pub fn capture_photo(&self) -> Result<usize, SessionError> {
        let mut guard = self.lock();
        let SessionInner {
            view,
            camera,
            counters,
            ..
        } = &mut *guard;

        let captured = match view {
            View::Enrolling(e) => self
                .encoder
                .capture_frame(camera, &e.camera)
                .map(|image| {
                    e.buffer.append(image);
                    e.buffer.len()
                }),
            View::Recognizing(r) => self
                .encoder
                .capture_frame(camera, &r.camera)
                .map(|image| {
                    r.slot.set(image);
                    1
                }),
            View::Home => {
                return Err(SessionError::InvalidState {
                    action: Action::CapturePhoto,
                    view: ViewKind::Home,
                })
            }
        };

        match captured {
            Ok(held) => {
                counters.captures += 1;
                debug!(images = held, view = %view.kind(), "Captured photo");
                Ok(held)
            }
            Err(e) => {
                counters.capture_failures += 1;
                debug!(error = %e, "Capture failed");
                Err(e.into())
            }
        }
    }

    /// Empties the enrollment buffer.
    pub fn clear_photos(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        match &mut inner.view {
            View::Enrolling(e) => {
                e.buffer.clear();
                debug!("Enrollment photos cleared");
                Ok(())
            }
            other => Err(SessionError::InvalidState {
                action: Action::ClearPhotos,
                view: other.kind(),
            }),
        }
    }

    /// Sets the name field of the subject being enrolled.
    pub fn set_name(&self, name: impl Into<String>) -> Result<(), SessionError> {
        let name = name.into();
        self.edit_enrollment(|e| e.name = name)
    }

    /// Sets the roll field of the subject being enrolled.
    pub fn set_roll_id(&self, roll_id: impl Into<String>) -> Result<(), SessionError> {
        let roll_id = roll_id.into();
        self.edit_enrollment(|e| e.roll_id = roll_id)
    }

    fn edit_enrollment(&self, edit: impl FnOnce(&mut Enrollment)) -> Result<(), SessionError> {
        let mut inner = self.lock();
        match &mut inner.view {
            View::Enrolling(e) => {
                edit(e);
                Ok(())
            }
            other => Err(SessionError::InvalidState {
                action: Action::EditSubject,
                view: other.kind(),
            }),
        }
    }

    /// Validates and submits the enrollment.
    ///
    /// On success the camera is released and the session returns `Home`.
    /// On failure the view, fields and buffer are left as they were so the
    /// user can retry.
    pub async fn submit_enrollment(&self) -> Result<String, SessionError> {
        let action = Action::SubmitEnrollment;
        let (subject, epoch) = {
            let mut inner = self.lock();
            let epoch = inner.epoch;
            let e = match &mut inner.view {
                View::Enrolling(e) => e,
                other => {
                    return Err(SessionError::InvalidState {
                        action,
                        view: other.kind(),
                    })
                }
            };
            if e.submitting {
                return Err(SessionError::Busy(action));
            }

            let name = e.name.trim();
            let roll_id = e.roll_id.trim();
            if name.is_empty() || roll_id.is_empty() {
                return Err(SessionError::Validation(
                    "name and roll are required".to_string(),
                ));
            }
            if e.buffer.is_empty() {
                return Err(SessionError::Validation(
                    "no captured images to register".to_string(),
                ));
            }

            let subject = EnrollmentSubject {
                name: name.to_string(),
                roll_id: roll_id.to_string(),
                images: e.buffer.snapshot(),
            };
            e.submitting = true;
            (subject, epoch)
        };

        info!(
            name = %subject.name,
            roll = %subject.roll_id,
            images = subject.images.len(),
            "Submitting enrollment"
        );
        let outcome = {
            let _flight = InFlight {
                session: self,
                action,
                epoch,
            };
            with_timeout(self.request_timeout, self.gateway.enroll(&subject)).await
        };

        let mut inner = self.lock();
        inner.check_epoch(epoch, action)?;
        match outcome {
            Ok(message) => {
                inner.counters.enrollments += 1;
                inner.go_home();
                info!(name = %subject.name, roll = %subject.roll_id, "Enrollment accepted");
                Ok(message)
            }
            Err(e) => {
                inner.counters.gateway_failures += 1;
                warn!(error = %e, "Enrollment rejected");
                Err(e.into())
            }
        }
    }

    /// Sends the captured still for identification and stores the result.
    pub async fn recognize(&self) -> Result<RecognitionResult, SessionError> {
        let action = Action::Recognize;
        let (image, epoch) = {
            let mut inner = self.lock();
            let epoch = inner.epoch;
            let r = match &mut inner.view {
                View::Recognizing(r) => r,
                other => {
                    return Err(SessionError::InvalidState {
                        action,
                        view: other.kind(),
                    })
                }
            };
            if r.recognizing {
                return Err(SessionError::Busy(action));
            }
            let image = r.slot.get().cloned().ok_or_else(|| {
                SessionError::Validation("no captured image for recognition".to_string())
            })?;
            r.recognizing = true;
            (image, epoch)
        };

        let outcome = {
            let _flight = InFlight {
                session: self,
                action,
                epoch,
            };
            with_timeout(self.request_timeout, self.gateway.recognize(&image)).await
        };

        let mut inner = self.lock();
        inner.check_epoch(epoch, action)?;
        match outcome {
            Ok(result) => {
                inner.counters.recognitions += 1;
                if let View::Recognizing(r) = &mut inner.view {
                    r.result = Some(result.clone());
                }
                info!(recognized = result.recognized(), "{}", result);
                Ok(result)
            }
            Err(e) => {
                inner.counters.gateway_failures += 1;
                warn!(error = %e, "Recognition failed");
                Err(e.into())
            }
        }
    }

    /// Marks attendance for the recognized subject, then refreshes status.
    ///
    /// The refresh runs even if the view changed while the mark was in
    /// flight, since the record already exists on the service.
    pub async fn mark_attendance(&self) -> Result<AttendanceMark, SessionError> {
        let action = Action::MarkAttendance;
        let (subject, epoch) = {
            let mut inner = self.lock();
            let epoch = inner.epoch;
            let r = match &mut inner.view {
                View::Recognizing(r) => r,
                other => {
                    return Err(SessionError::InvalidState {
                        action,
                        view: other.kind(),
                    })
                }
            };
            if r.marking {
                return Err(SessionError::Busy(action));
            }
            let subject = r
                .result
                .as_ref()
                .and_then(RecognitionResult::subject)
                .cloned()
                .ok_or_else(|| {
                    SessionError::Validation("no recognized subject to mark".to_string())
                })?;
            r.marking = true;
            (subject, epoch)
        };

        let outcome = {
            let _flight = InFlight {
                session: self,
                action,
                epoch,
            };
            with_timeout(
                self.request_timeout,
                self.gateway.mark_attendance(&subject),
            )
            .await
        };

        let message = match outcome {
            Ok(message) => {
                self.lock().counters.attendance_marks += 1;
                info!(%subject, "Attendance marked");
                message
            }
            Err(e) => {
                let mut inner = self.lock();
                inner.check_epoch(epoch, action)?;
                inner.counters.gateway_failures += 1;
                warn!(error = %e, %subject, "Attendance mark failed");
                return Err(e.into());
            }
        };

        let snapshot = self.status.refresh().await.ok();
        self.lock().check_epoch(epoch, action)?;

        Ok(AttendanceMark {
            subject,
            message,
            snapshot,
        })
    }

    /// Refreshes the attendance status cache.
    pub async fn refresh_status(&self) -> Result<Arc<AttendanceStatusSnapshot>, SessionError> {
        self.status.refresh().await.map_err(SessionError::from)
    }

    // ---------------------------------------------------------------
    // Read-only views for rendering
    // ---------------------------------------------------------------

    /// Current view.
    pub fn view(&self) -> ViewKind {
        self.lock().view.kind()
    }

    /// Transition counter; changes on every view change.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Stills held by the current view, in capture order.
    pub fn captured_images(&self) -> Vec<CapturedImage> {
        match &self.lock().view {
            View::Enrolling(e) => e.buffer.snapshot(),
            View::Recognizing(r) => r.slot.get().cloned().into_iter().collect(),
            View::Home => Vec::new(),
        }
    }

    /// Number of stills the current view holds.
    pub fn captured_count(&self) -> usize {
        match &self.lock().view {
            View::Enrolling(e) => e.buffer.len(),
            View::Recognizing(r) => usize::from(!r.slot.is_empty()),
            View::Home => 0,
        }
    }

    /// Current (name, roll) fields while enrolling.
    pub fn subject_fields(&self) -> Option<(String, String)> {
        match &self.lock().view {
            View::Enrolling(e) => Some((e.name.clone(), e.roll_id.clone())),
            _ => None,
        }
    }

    /// Last recognition result while recognizing.
    pub fn recognition_result(&self) -> Option<RecognitionResult> {
        match &self.lock().view {
            View::Recognizing(r) => r.result.clone(),
            _ => None,
        }
    }

    /// True when a `recognized` result exists to mark attendance for.
    pub fn can_mark_attendance(&self) -> bool {
        self.recognition_result()
            .is_some_and(|result| result.recognized())
    }

    /// True while `action` has a request in flight.
    pub fn is_pending(&self, action: Action) -> bool {
        self.lock().view.is_pending(action)
    }

    /// Today's attendance as last fetched.
    pub fn status_snapshot(&self) -> Option<Arc<AttendanceStatusSnapshot>> {
        self.status.snapshot()
    }

    /// The shared status cache.
    pub fn status_cache(&self) -> &Arc<AttendanceStatusCache> {
        &self.status
    }

    /// True while the view holds a live stream.
    pub fn is_camera_streaming(&self) -> bool {
        self.lock().camera.is_streaming()
    }

    /// Acquire/release counts for the camera.
    pub fn camera_stats(&self) -> CameraStats {
        self.lock().camera.stats()
    }

    /// Running totals for metrics.
    pub fn counters(&self) -> SessionCounters {
        self.lock().counters
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("SessionController")
            .field("view", &inner.view.kind())
            .field("epoch", &inner.epoch)
            .field("camera", &inner.camera)
            .field("counters", &inner.counters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MockCamera;
    use crate::gateway::GatewayError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Gateway whose enroll, recognize and mark calls park until released.
    #[derive(Default)]
    struct ParkedGateway {
        release: Notify,
        entered: Notify,
        enroll_calls: AtomicUsize,
        status_calls: AtomicUsize,
        mark_reply: std::sync::Mutex<Option<Result<String, GatewayError>>>,
    }

    #[async_trait]
    impl VerificationGateway for ParkedGateway {
        async fn enroll(&self, _: &EnrollmentSubject) -> Result<String, GatewayError> {
            self.enroll_calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Ok("Registered".to_string())
        }

        async fn recognize(&self, _: &CapturedImage) -> Result<RecognitionResult, GatewayError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(RecognitionResult::Recognized(Subject::new("Ravi", "55")))
        }

        async fn mark_attendance(&self, subject: &Subject) -> Result<String, GatewayError> {
            self.entered.notify_one();
            self.release.notified().await;
            let reply = self.mark_reply.lock().unwrap().take();
            reply.unwrap_or_else(|| Ok(format!("marked {subject}")))
        }

        async fn fetch_status(&self) -> Result<AttendanceStatusSnapshot, GatewayError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            Ok(AttendanceStatusSnapshot::new(
                vec![Subject::new("Ravi", "55")],
                vec![],
            ))
        }
    }

    fn session(gateway: Arc<dyn VerificationGateway>) -> SessionController {
        SessionController::new(
            Box::new(MockCamera::new()),
            CaptureConfig::with_dimensions(8, 8),
            gateway,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_starts_home_without_camera() {
        let session = session(Arc::new(ParkedGateway::default()));
        assert_eq!(session.view(), ViewKind::Home);
        assert!(!session.is_camera_streaming());
        assert_eq!(session.captured_count(), 0);
    }

    #[test]
    fn test_home_rejects_capture() {
        let session = session(Arc::new(ParkedGateway::default()));
        assert_eq!(
            session.capture_photo(),
            Err(SessionError::InvalidState {
                action: Action::CapturePhoto,
                view: ViewKind::Home
            })
        );
    }

    #[test]
    fn test_go_home_from_home_is_noop() {
        let session = session(Arc::new(ParkedGateway::default()));
        session.go_home();
        session.go_home();
        assert_eq!(session.camera_stats(), CameraStats::default());
    }

    #[test]
    fn test_switching_modes_reacquires_camera() {
        let session = session(Arc::new(ParkedGateway::default()));
        session.start_enrollment().unwrap();
        session.capture_photo().unwrap();
        session.start_recognition().unwrap();

        assert_eq!(session.view(), ViewKind::Recognizing);
        assert_eq!(session.captured_count(), 0);
        assert_eq!(
            session.camera_stats(),
            CameraStats {
                acquisitions: 2,
                releases: 1
            }
        );
    }

    #[test]
    fn test_denied_camera_stays_home() {
        let session = SessionController::new(
            Box::new(MockCamera::denied()),
            CaptureConfig::default(),
            Arc::new(ParkedGateway::default()),
            Duration::from_secs(5),
        );
        assert!(matches!(
            session.start_enrollment(),
            Err(SessionError::DeviceUnavailable(_))
        ));
        assert_eq!(session.view(), ViewKind::Home);
        assert!(!session.is_camera_streaming());
    }

    #[tokio::test]
    async fn test_stale_recognition_is_discarded() {
        let gateway = Arc::new(ParkedGateway::default());
        let session = session(gateway.clone());
        session.start_recognition().unwrap();
        session.capture_photo().unwrap();

        let (result, ()) = tokio::join!(session.recognize(), async {
            gateway.entered.notified().await;
            // User leaves and comes back before the reply lands
            session.go_home();
            session.start_recognition().unwrap();
            gateway.release.notify_one();
        });

        assert_eq!(result, Err(SessionError::Stale(Action::Recognize)));
        assert_eq!(session.recognition_result(), None);
        assert!(!session.can_mark_attendance());
        assert_eq!(session.counters().stale_replies, 1);
    }

    #[tokio::test]
    async fn test_double_submit_is_rejected() {
        let gateway = Arc::new(ParkedGateway::default());
        let session = session(gateway.clone());
        session.start_enrollment().unwrap();
        session.set_name("Asha").unwrap();
        session.set_roll_id("101").unwrap();
        session.capture_photo().unwrap();

        let (first, second) = tokio::join!(session.submit_enrollment(), async {
            gateway.entered.notified().await;
            assert!(session.is_pending(Action::SubmitEnrollment));
            let second = session.submit_enrollment().await;
            gateway.release.notify_one();
            second
        });

        assert_eq!(first, Ok("Registered".to_string()));
        assert_eq!(second, Err(SessionError::Busy(Action::SubmitEnrollment)));
        assert_eq!(gateway.enroll_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.view(), ViewKind::Home);
    }

    #[tokio::test]
    async fn test_dropped_request_clears_pending_flag() {
        let gateway = Arc::new(ParkedGateway::default());
        let session = session(gateway.clone());
        session.start_recognition().unwrap();
        session.capture_photo().unwrap();

        tokio::select! {
            _ = session.recognize() => panic!("recognize should still be parked"),
            _ = gateway.entered.notified() => {}
        }

        assert!(!session.is_pending(Action::Recognize));
        assert_eq!(session.view(), ViewKind::Recognizing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_service_times_out() {
        let gateway = Arc::new(ParkedGateway::default());
        let session = session(gateway);
        session.start_recognition().unwrap();
        session.capture_photo().unwrap();

        let result = session.recognize().await;
        assert_eq!(result, Err(SessionError::Timeout(Duration::from_secs(5))));
        assert!(!session.is_pending(Action::Recognize));
    }

    /// Recognizing with a stored `Recognized` result.
    async fn recognized(gateway: &Arc<ParkedGateway>) -> SessionController {
        let session = session(gateway.clone());
        session.start_recognition().unwrap();
        session.capture_photo().unwrap();
        gateway.release.notify_one();
        session.recognize().await.unwrap();
        assert!(session.can_mark_attendance());
        session
    }

    #[tokio::test]
    async fn test_stale_mark_still_refreshes_status() {
        let gateway = Arc::new(ParkedGateway::default());
        let session = recognized(&gateway).await;

        let (result, ()) = tokio::join!(session.mark_attendance(), async {
            gateway.entered.notified().await;
            session.go_home();
            gateway.release.notify_one();
        });

        assert!(matches!(
            result,
            Err(SessionError::Stale(Action::MarkAttendance))
        ));
        assert_eq!(gateway.status_calls.load(Ordering::SeqCst), 1);
        let snapshot = session.status_snapshot().unwrap();
        assert!(snapshot.has_attended(&Subject::new("Ravi", "55")));

        assert_eq!(session.view(), ViewKind::Home);
        assert!(!session.is_camera_streaming());
        let counters = session.counters();
        assert_eq!(counters.attendance_marks, 1);
        assert_eq!(counters.stale_replies, 1);
    }

    #[tokio::test]
    async fn test_stale_failed_mark_is_discarded() {
        let gateway = Arc::new(ParkedGateway::default());
        *gateway.mark_reply.lock().unwrap() =
            Some(Err(GatewayError::Transport("connection reset".into())));
        let session = recognized(&gateway).await;

        let (result, ()) = tokio::join!(session.mark_attendance(), async {
            gateway.entered.notified().await;
            session.go_home();
            session.start_recognition().unwrap();
            gateway.release.notify_one();
        });

        assert!(matches!(
            result,
            Err(SessionError::Stale(Action::MarkAttendance))
        ));
        assert_eq!(gateway.status_calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.status_snapshot(), None);

        let counters = session.counters();
        assert_eq!(counters.gateway_failures, 0);
        assert_eq!(counters.stale_replies, 1);
        // The new recognition view starts clean
        assert_eq!(session.recognition_result(), None);
        assert!(!session.is_pending(Action::MarkAttendance));
    }
}
