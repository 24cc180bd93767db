use std::time::Duration;

use crate::workflows::adjudication::status::{RequestState, RequestTracker, STATUS_RESET_DELAY};

#[tokio::test(start_paused = true)]
async fn indicator_falls_back_to_idle_after_the_reset_delay() {
    let mut tracker = RequestTracker::new();
    tracker.begin();
    assert_eq!(tracker.state(), RequestState::Sending);

    tracker.succeed();
    assert_eq!(tracker.state(), RequestState::Succeeded);

    tokio::time::sleep(STATUS_RESET_DELAY + Duration::from_secs(1)).await;
    assert_eq!(tracker.state(), RequestState::Idle);
}

#[tokio::test(start_paused = true)]
async fn a_stale_reset_never_clobbers_a_newer_request() {
    let mut tracker = RequestTracker::new();
    tracker.begin();
    tracker.succeed();

    // A second request starts before the first reset fires.
    tokio::time::sleep(Duration::from_secs(1)).await;
    tracker.begin();
    tracker.fail("boom");

    // Past the first request's reset deadline the indicator must still show
    // the newer failure.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(tracker.state(), RequestState::Failed);

    // The newer request's own reset still fires.
    tokio::time::sleep(STATUS_RESET_DELAY).await;
    assert_eq!(tracker.state(), RequestState::Idle);
}

#[tokio::test(start_paused = true)]
async fn failure_message_outlives_the_reset_until_the_next_request() {
    let mut tracker = RequestTracker::new();
    tracker.begin();
    tracker.fail("code already exists");

    tokio::time::sleep(STATUS_RESET_DELAY + Duration::from_secs(1)).await;
    assert_eq!(tracker.state(), RequestState::Idle);
    assert_eq!(tracker.error().as_deref(), Some("code already exists"));

    tracker.begin();
    assert!(tracker.error().is_none());
}
