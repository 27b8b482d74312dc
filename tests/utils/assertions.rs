//! View assertion helpers - wait for a session's live view to settle
#![allow(dead_code)] // Test utilities may not all be used in every test

use tokio::time::{timeout, Duration};

use roomfeed::{RoomSession, RoomView};

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct ViewAssertion<'a> {
    session: &'a RoomSession,
    wait: Duration,
}

impl<'a> ViewAssertion<'a> {
    pub fn for_session(session: &'a RoomSession) -> Self {
        Self {
            session,
            wait: Duration::from_secs(1),
        }
    }

    /// Waits until the view satisfies `check` and returns it
    pub async fn reaches(self, what: &str, check: impl FnMut(&RoomView) -> bool) -> RoomView {
        let mut view = self.session.view();
        let reached = timeout(self.wait, view.wait_for(check))
            .await
            .is_ok_and(|changed| changed.is_ok());
        assert!(
            reached,
            "view never reached {}: {:?}",
            what,
            self.session.current_view()
        );
        self.session.current_view()
    }

    pub async fn has_participants(self, expected: u64) -> RoomView {
        self.reaches(&format!("{} participants", expected), |view| {
            view.participant_count() == expected
        })
        .await
    }

    pub async fn has_feedback(self, expected: usize) -> RoomView {
        self.reaches(&format!("{} feedback events", expected), |view| {
            view.feedback.len() == expected
        })
        .await
    }
}
