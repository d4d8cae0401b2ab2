//! Today's attendance status.
//!
//! One cache per process, populated lazily and refreshed on demand or
//! after an attendance mark succeeds.

mod cache;
mod snapshot;

pub use cache::AttendanceStatusCache;
pub use snapshot::{AttendanceStatusSnapshot, Subject};
