//! Property tests for the capture buffer and enrollment validation.

mod common;

use common::{session_with, ScriptedGateway};
use face_attendance::capture::MockCamera;
use face_attendance::session::{SessionError, ViewKind};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Capture,
    Clear,
    Restart,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => Just(Op::Capture),
        2 => Just(Op::Clear),
        1 => Just(Op::Restart),
    ]
}

proptest! {
    #[test]
    fn buffer_counts_successful_captures_since_last_reset(
        warmup in 0u32..4,
        ops in prop::collection::vec(op(), 0..40),
    ) {
        let session = session_with(MockCamera::with_warmup(warmup), ScriptedGateway::new());
        session.start_enrollment().unwrap();

        let mut expected = 0usize;
        for op in ops {
            match op {
                Op::Capture => match session.capture_photo() {
                    Ok(held) => {
                        expected += 1;
                        prop_assert_eq!(held, expected);
                    }
                    Err(e) => {
                        prop_assert_eq!(e, SessionError::NoActiveFrame);
                    }
                },
                Op::Clear => {
                    session.clear_photos().unwrap();
                    expected = 0;
                }
                Op::Restart => {
                    session.start_enrollment().unwrap();
                    expected = 0;
                }
            }
            prop_assert_eq!(session.captured_count(), expected);
            prop_assert_eq!(session.captured_images().len(), expected);
        }

        prop_assert!(session.is_camera_streaming());
        session.go_home();
        prop_assert!(!session.is_camera_streaming());
        let stats = session.camera_stats();
        prop_assert_eq!(stats.acquisitions, stats.releases);
    }

    #[test]
    fn enrollment_reaches_service_only_when_complete(
        name in "[ a-z]{0,6}",
        roll in "[ 0-9]{0,4}",
        photos in 0usize..3,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let gateway = ScriptedGateway::new();
        let session = session_with(MockCamera::new(), gateway.clone());

        session.start_enrollment().unwrap();
        for _ in 0..photos {
            session.capture_photo().unwrap();
        }
        session.set_name(name.clone()).unwrap();
        session.set_roll_id(roll.clone()).unwrap();

        let complete = !name.trim().is_empty() && !roll.trim().is_empty() && photos > 0;
        let outcome = runtime.block_on(session.submit_enrollment());

        if complete {
            prop_assert!(outcome.is_ok());
            prop_assert_eq!(session.view(), ViewKind::Home);
            let enrolled = gateway.enrolled.lock().unwrap();
            prop_assert_eq!(enrolled.len(), 1);
            prop_assert_eq!(enrolled[0].images.len(), photos);
        } else {
            prop_assert!(matches!(outcome, Err(SessionError::Validation(_))));
            prop_assert_eq!(session.view(), ViewKind::Enrolling);
            prop_assert_eq!(ScriptedGateway::calls(&gateway.enroll_calls), 0);
        }
    }
}
