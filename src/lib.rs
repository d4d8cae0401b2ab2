//! Face Attendance Library
//!
//! Client side of a face-attendance workflow: owns the camera, captures
//! stills, and drives a remote recognition service through enrollment,
//! recognition and attendance marking.
//!
//! # Architecture
//!
//! ```text
//! capture (camera + encoder) ─┐
//!                             ├─▶ session (state machine) ─▶ gateway (HTTP)
//! status (attendance cache) ◀─┘                                  │
//!        ▲───────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **One stream**: the camera is acquired on entering a capture view and
//!   released on every way out of it
//! - **Typed views**: per-view payloads make impossible combinations
//!   (a recognition result while Home) unrepresentable
//! - **Stale replies are dropped**: every request is tagged with the view
//!   epoch it was issued under
//! - **Nothing is fatal**: every error is reported and returning Home
//!   always succeeds
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use face_attendance::{
//!     capture::{CaptureConfig, MockCamera},
//!     config::ServiceConfig,
//!     gateway::HttpGateway,
//!     session::SessionController,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ServiceConfig::default();
//! let gateway = Arc::new(HttpGateway::new(&service)?);
//! let session = SessionController::open(
//!     Box::new(MockCamera::new()),
//!     CaptureConfig::default(),
//!     gateway,
//!     service.request_timeout(),
//! )
//! .await;
//!
//! session.start_enrollment()?;
//! session.capture_photo()?;
//! session.capture_photo()?;
//! session.set_name("Asha")?;
//! session.set_roll_id("101")?;
//! println!("{}", session.submit_enrollment().await?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod config;
pub mod gateway;
pub mod metrics;
pub mod session;
pub mod status;

// Re-export commonly used types at crate root
pub use capture::{Camera, CameraManager, CaptureConfig, CapturedImage, Frame, MockCamera};
pub use config::FileConfig;
pub use gateway::{GatewayError, HttpGateway, RecognitionResult, VerificationGateway};
pub use session::{Action, SessionController, SessionError, ViewKind};
pub use status::{AttendanceStatusCache, AttendanceStatusSnapshot, Subject};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
