//! Shared fixtures: an in-process recognition service with scripted replies.

#![allow(dead_code)]

use async_trait::async_trait;
use face_attendance::capture::{CaptureConfig, CapturedImage, MockCamera};
use face_attendance::gateway::{EnrollmentSubject, GatewayError, RecognitionResult, VerificationGateway};
use face_attendance::session::SessionController;
use face_attendance::status::{AttendanceStatusSnapshot, Subject};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Behaves like the attendance service: enrolled subjects become
/// registered, marks move them to attended. Queued replies override
/// the default behaviour one call at a time.
#[derive(Default)]
pub struct ScriptedGateway {
    pub enroll_replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    pub recognize_replies: Mutex<VecDeque<Result<RecognitionResult, GatewayError>>>,
    pub mark_replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    pub status_failures: Mutex<VecDeque<GatewayError>>,

    pub registered: Mutex<Vec<Subject>>,
    pub attended: Mutex<Vec<Subject>>,
    pub enrolled: Mutex<Vec<EnrollmentSubject>>,

    pub enroll_calls: AtomicUsize,
    pub recognize_calls: AtomicUsize,
    pub mark_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, subject: Subject) {
        self.registered.lock().unwrap().push(subject);
    }

    pub fn queue_enroll(&self, reply: Result<String, GatewayError>) {
        self.enroll_replies.lock().unwrap().push_back(reply);
    }

    pub fn queue_recognize(&self, reply: Result<RecognitionResult, GatewayError>) {
        self.recognize_replies.lock().unwrap().push_back(reply);
    }

    pub fn queue_mark(&self, reply: Result<String, GatewayError>) {
        self.mark_replies.lock().unwrap().push_back(reply);
    }

    pub fn fail_next_status(&self, error: GatewayError) {
        self.status_failures.lock().unwrap().push_back(error);
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationGateway for ScriptedGateway {
    async fn enroll(&self, subject: &EnrollmentSubject) -> Result<String, GatewayError> {
        self.enroll_calls.fetch_add(1, Ordering::SeqCst);
        self.enrolled.lock().unwrap().push(subject.clone());

        let reply = self.enroll_replies.lock().unwrap().pop_front();
        let reply = reply.unwrap_or_else(|| {
            Ok(format!("Registered {} (Roll: {})", subject.name, subject.roll_id))
        });
        if reply.is_ok() {
            self.register(Subject::new(&subject.name, &subject.roll_id));
        }
        reply
    }

    async fn recognize(&self, _image: &CapturedImage) -> Result<RecognitionResult, GatewayError> {
        self.recognize_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.recognize_replies.lock().unwrap().pop_front();
        reply.unwrap_or(Ok(RecognitionResult::NoMatch { message: None }))
    }

    async fn mark_attendance(&self, subject: &Subject) -> Result<String, GatewayError> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.mark_replies.lock().unwrap().pop_front();
        let reply = reply.unwrap_or_else(|| {
            Ok(format!(
                "Attendance marked for {} ({}).",
                subject.name, subject.roll_id
            ))
        });
        if reply.is_ok() {
            let mut attended = self.attended.lock().unwrap();
            if !attended.contains(subject) {
                attended.push(subject.clone());
            }
        }
        reply
    }

    async fn fetch_status(&self) -> Result<AttendanceStatusSnapshot, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.status_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let attended = self.attended.lock().unwrap().clone();
        let not_attended = self
            .registered
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !attended.contains(s))
            .cloned()
            .collect();
        Ok(AttendanceStatusSnapshot::new(attended, not_attended))
    }
}

pub fn session_with(camera: MockCamera, gateway: Arc<ScriptedGateway>) -> SessionController {
    SessionController::new(
        Box::new(camera),
        CaptureConfig::with_dimensions(16, 12),
        gateway,
        Duration::from_secs(5),
    )
}

pub fn session(gateway: Arc<ScriptedGateway>) -> SessionController {
    session_with(MockCamera::new(), gateway)
}
