//! View states and their per-view payloads.

use super::buffer::{EnrollmentBuffer, RecognitionSlot};
use crate::capture::CameraHandle;
use crate::gateway::RecognitionResult;

/// Which screen the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// No camera, nothing captured.
    Home,
    /// Collecting stills plus name and roll.
    Enrolling,
    /// One still, identify, then mark attendance.
    Recognizing,
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ViewKind::Home => "home",
            ViewKind::Enrolling => "enrolling",
            ViewKind::Recognizing => "recognizing",
        })
    }
}

/// User-triggered events, used to tag errors and in-flight requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Taking a still from the live stream.
    CapturePhoto,
    /// Emptying the enrollment buffer.
    ClearPhotos,
    /// Setting the name or roll.
    EditSubject,
    /// Sending the enrollment to the service.
    SubmitEnrollment,
    /// Identifying the held still.
    Recognize,
    /// Recording attendance for the recognized subject.
    MarkAttendance,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Action::CapturePhoto => "capture photo",
            Action::ClearPhotos => "clear photos",
            Action::EditSubject => "edit subject",
            Action::SubmitEnrollment => "submit enrollment",
            Action::Recognize => "recognize",
            Action::MarkAttendance => "mark attendance",
        })
    }
}

pub(crate) struct Enrollment {
    pub camera: CameraHandle,
    pub name: String,
    pub roll_id: String,
    pub buffer: EnrollmentBuffer,
    pub submitting: bool,
}

impl Enrollment {
    pub fn new(camera: CameraHandle) -> Self {
        Self {
            camera,
            name: String::new(),
            roll_id: String::new(),
            buffer: EnrollmentBuffer::new(),
            submitting: false,
        }
    }
}

pub(crate) struct Recognition {
    pub camera: CameraHandle,
    pub slot: RecognitionSlot,
    pub result: Option<RecognitionResult>,
    pub recognizing: bool,
    pub marking: bool,
}

impl Recognition {
    pub fn new(camera: CameraHandle) -> Self {
        Self {
            camera,
            slot: RecognitionSlot::new(),
            result: None,
            recognizing: false,
            marking: false,
        }
    }
}

/// The session's state. The camera handle lives inside the capture views,
/// so Home can never hold a stream and capture views always do.
pub(crate) enum View {
    Home,
    Enrolling(Enrollment),
    Recognizing(Recognition),
}

impl View {
    pub fn kind(&self) -> ViewKind {
        match self {
            View::Home => ViewKind::Home,
            View::Enrolling(_) => ViewKind::Enrolling,
            View::Recognizing(_) => ViewKind::Recognizing,
        }
    }

    /// Consumes the view, handing back its camera handle.
    pub fn into_camera(self) -> Option<CameraHandle> {
        match self {
            View::Home => None,
            View::Enrolling(e) => Some(e.camera),
            View::Recognizing(r) => Some(r.camera),
        }
    }

    /// Clears the in-flight flag for `action`, if this view tracks one.
    pub fn finish(&mut self, action: Action) {
        match (self, action) {
            (View::Enrolling(e), Action::SubmitEnrollment) => e.submitting = false,
            (View::Recognizing(r), Action::Recognize) => r.recognizing = false,
            (View::Recognizing(r), Action::MarkAttendance) => r.marking = false,
            _ => {}
        }
    }

    pub fn is_pending(&self, action: Action) -> bool {
        match (self, action) {
            (View::Enrolling(e), Action::SubmitEnrollment) => e.submitting,
            (View::Recognizing(r), Action::Recognize) => r.recognizing,
            (View::Recognizing(r), Action::MarkAttendance) => r.marking,
            _ => false,
        }
    }
}
