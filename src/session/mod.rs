//! The capture session.
//!
//! A session moves between three views: `Home`, `Enrolling` (collect
//! several stills plus a name and roll, then register them) and
//! `Recognizing` (take one still, identify it, then mark attendance).
//! The camera stream is held only while in a capture view.

mod buffer;
mod controller;
mod error;
mod state;

pub use buffer::{EnrollmentBuffer, RecognitionSlot};
pub use controller::{AttendanceMark, SessionController, SessionCounters};
pub use error::SessionError;
pub use state::{Action, ViewKind};
