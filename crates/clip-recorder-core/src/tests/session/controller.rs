#![allow(clippy::unwrap_used)]

use crate::{
    ClipFormat, NoticeKind, Phase, RecorderError, SessionOutcome, SessionSettings,
    tests::fakes::{FakeDevice, FakeResponse, FakeUploader, Harness},
};

use std::{
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use serde_json::json;
use tokio::sync::Notify;

fn mp4_device() -> FakeDevice {
    FakeDevice::new(vec![ClipFormat::Mp4, ClipFormat::Webm])
}

fn linked() -> FakeResponse {
    FakeResponse::Json(json!({ "data": { "downloadLink": "https://x/y" } }))
}

/// Polls `condition` until it holds or a second has passed.
async fn settle(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// WHAT: Full record, stop, upload, navigate flow
/// WHY: This is the primary user journey
#[tokio::test]
async fn given_chunks_and_linked_response_when_uploading_then_navigates_to_link() {
    // Given: A session with an MP4-capable device and a linking upload service
    let harness = Harness::spawn(mp4_device(), FakeUploader::new(linked()));

    // When: Capturing two chunks, stopping, and uploading
    let capturing = harness.start_capture(None).await;
    assert_eq!(capturing.phase, Phase::Capturing);
    harness.device.emit(b"c1").await;
    harness.device.emit(b"c2").await;
    let clip = harness.stop_capture().await;

    // Then: The clip is the concatenation tagged with the chosen format
    assert_eq!(&clip.data[..], b"c1c2");
    assert_eq!(clip.format, ClipFormat::Mp4);

    // When: Uploading
    harness.handle.upload().await.unwrap();

    // Then: The session ends by navigating to the returned link
    let uploader = Arc::clone(&harness.uploader);
    let presenter = Arc::clone(&harness.presenter);
    let outcome = harness.task.await.unwrap().unwrap();
    let uploaded = uploader.uploaded();
    assert_eq!(outcome, SessionOutcome::Navigated("https://x/y".to_string()));
    assert_eq!(presenter.navigations(), vec!["https://x/y".to_string()]);
    assert_eq!(uploaded.len(), 1);
    assert_eq!(uploaded[0].1, "recorded-video.mp4");
    assert_eq!(&uploaded[0].2[..], b"c1c2");
}

/// WHAT: A response without data.downloadLink is surfaced verbatim
/// WHY: The user needs to see what the service actually returned
#[tokio::test]
async fn given_empty_json_response_when_uploading_then_notice_contains_raw_json() {
    // Given: An upload service answering `{}`
    let mut harness = Harness::spawn(mp4_device(), FakeUploader::new(FakeResponse::Json(json!({}))));
    harness.start_capture(None).await;
    harness.device.emit(b"data").await;
    let clip = harness.stop_capture().await;

    // When: Uploading
    harness.handle.upload().await.unwrap();
    let notice = harness.notices.recv().await.unwrap();

    // Then: No navigation, notice carries `{}`, clip still under review
    assert_eq!(notice.kind, NoticeKind::MissingDownloadLink);
    assert!(notice.message.contains("{}"));
    assert!(harness.presenter.navigations().is_empty());

    let snapshot = harness.handle.snapshot();
    assert_eq!(snapshot.phase, Phase::Previewing);
    assert_eq!(snapshot.clip.unwrap().id, clip.id);

    assert_eq!(harness.finish().await, SessionOutcome::Shutdown);
}

/// WHAT: An empty download link is treated as missing
/// WHY: Navigating to an empty link would end the session with nothing opened
#[tokio::test]
async fn given_empty_download_link_when_uploading_then_notice_and_no_navigation() {
    // Given: An upload service answering with an empty link
    let response = FakeResponse::Json(json!({ "data": { "downloadLink": "" } }));
    let mut harness = Harness::spawn(mp4_device(), FakeUploader::new(response));
    harness.start_capture(None).await;
    harness.device.emit(b"data").await;
    harness.stop_capture().await;

    // When: Uploading
    harness.handle.upload().await.unwrap();
    let notice = harness.notices.recv().await.unwrap();

    // Then: Missing-link notice with the raw response, session still previewing
    assert_eq!(notice.kind, NoticeKind::MissingDownloadLink);
    assert!(notice.message.contains("downloadLink"));
    assert!(harness.presenter.navigations().is_empty());
    assert_eq!(harness.handle.snapshot().phase, Phase::Previewing);

    assert_eq!(harness.finish().await, SessionOutcome::Shutdown);
}

/// WHAT: A network failure keeps the clip for a manual retry
/// WHY: Re-invoking upload is the only retry path
#[tokio::test]
async fn given_network_error_when_uploading_then_clip_retained_and_retry_possible() {
    // Given: An upload service that fails in transport
    let mut harness = Harness::spawn(mp4_device(), FakeUploader::new(FakeResponse::NetworkError));
    harness.start_capture(None).await;
    harness.device.emit(b"data").await;
    let clip = harness.stop_capture().await;

    // When: Uploading
    harness.handle.upload().await.unwrap();
    let notice = harness.notices.recv().await.unwrap();

    // Then: Upload error reported, phase and clip unchanged
    assert_eq!(notice.kind, NoticeKind::UploadFailed);
    assert_eq!(notice.message, "An error occurred during the upload.");
    let snapshot = harness.wait_for(|s| !s.uploading).await;
    assert_eq!(snapshot.phase, Phase::Previewing);
    assert_eq!(snapshot.clip.as_ref().unwrap().id, clip.id);
    assert_eq!(snapshot.clip.unwrap().data, clip.data);

    // When: Retrying manually
    harness.handle.upload().await.unwrap();
    let retry = harness.notices.recv().await.unwrap();

    // Then: The same clip was sent again
    assert_eq!(retry.kind, NoticeKind::UploadFailed);
    let uploaded = harness.uploader.uploaded();
    assert_eq!(uploaded.len(), 2);
    assert!(uploaded.iter().all(|(id, _, _)| *id == clip.id));
}

/// WHAT: Denied camera access is reported and the session stays idle
/// WHY: No retry happens without a new user action
#[tokio::test]
async fn given_denied_device_when_starting_then_notice_and_idle() {
    // Given: A device that refuses access
    let device = mp4_device();
    device.deny();
    let mut harness = Harness::spawn(device, FakeUploader::new(linked()));

    // When: Starting
    harness.handle.start().await.unwrap();
    let notice = harness.notices.recv().await.unwrap();

    // Then: Device error reported, still idle, nothing opened
    assert_eq!(notice.kind, NoticeKind::DeviceAccess);
    assert_eq!(
        notice.message,
        "Error accessing camera. Ensure camera permissions are allowed."
    );
    assert_eq!(harness.handle.snapshot().phase, Phase::Idle);
    assert_eq!(harness.device.granted(), 0);
    assert!(harness.presenter.live_previews.lock().unwrap().is_empty());
}

/// WHAT: Restarting while capturing never holds two streams
/// WHY: A leaked stream keeps the camera locked
#[tokio::test]
async fn given_capturing_when_starting_again_then_first_stream_released_first() {
    // Given: An active capture
    let harness = Harness::spawn(mp4_device(), FakeUploader::new(linked()));
    let first = harness.start_capture(None).await;
    let first_id = first.stream.unwrap().id;

    // When: Starting again
    let second = harness.start_capture(Some(first_id)).await;

    // Then: Exactly one stream is live and there were never two
    assert_eq!(second.phase, Phase::Capturing);
    assert_eq!(harness.device.granted(), 2);
    assert_eq!(harness.device.live(), 1);
    assert_eq!(harness.device.peak(), 1);

    // When: Shutting down
    let device = Arc::clone(&harness.device);
    assert_eq!(harness.finish().await, SessionOutcome::Shutdown);

    // Then: The remaining stream is released too
    assert_eq!(device.live(), 0);
}

/// WHAT: Back-to-back starts settle on a single live stream
/// WHY: A superseded grant must be released when it arrives
#[tokio::test]
async fn given_two_starts_in_a_row_when_grants_arrive_then_one_stream_live() {
    // Given: A session
    let harness = Harness::spawn(mp4_device(), FakeUploader::new(linked()));

    // When: Starting twice without waiting
    harness.handle.start().await.unwrap();
    harness.handle.start().await.unwrap();

    // Then: Both requests were granted but only one stream stays open
    let device = Arc::clone(&harness.device);
    assert!(settle(|| device.granted() == 2 && device.live() == 1).await);
    let snapshot = harness.wait_for(|s| s.phase == Phase::Capturing).await;
    assert!(snapshot.stream.is_some());
}

/// WHAT: Stop outside capturing changes nothing
/// WHY: Stop is idempotent
#[tokio::test]
async fn given_not_capturing_when_stopping_then_nothing_changes() {
    // Given: An idle session
    let harness = Harness::spawn(mp4_device(), FakeUploader::new(linked()));

    // When: Stopping while idle
    harness.handle.stop().await.unwrap();
    harness.start_capture(None).await;
    harness.device.emit(b"once").await;
    let clip = harness.stop_capture().await;

    // When: Stopping again while previewing
    harness.handle.stop().await.unwrap();
    harness.handle.stop().await.unwrap();
    let presenter = Arc::clone(&harness.presenter);
    let handle = harness.handle.clone();
    assert_eq!(harness.finish().await, SessionOutcome::Shutdown);

    // Then: Exactly one clip was produced and it is still the current one
    assert_eq!(presenter.shown_clips.lock().unwrap().len(), 1);
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.phase, Phase::Previewing);
    assert_eq!(snapshot.clip.unwrap().id, clip.id);
    assert!(presenter.notices().is_empty());
}

/// WHAT: The capture ceiling stops the recording and tells the user
/// WHY: Captures are capped at thirty seconds
#[tokio::test(start_paused = true)]
async fn given_capture_when_ceiling_elapses_then_previewing_with_limit_notice() {
    // Given: A capture that emitted data
    let mut harness = Harness::spawn(mp4_device(), FakeUploader::new(linked()));
    harness.start_capture(None).await;
    harness.device.emit(b"c1").await;
    harness.device.emit(b"c2").await;

    // When: Thirty seconds pass
    let notice = harness.notices.recv().await.unwrap();

    // Then: Same terminal state as a manual stop, plus the limit notice
    assert_eq!(notice.kind, NoticeKind::RecordingLimit);
    assert_eq!(
        notice.message,
        "Recording stopped automatically after 30 seconds."
    );
    let snapshot = harness.handle.snapshot();
    assert_eq!(snapshot.phase, Phase::Previewing);
    let clip = snapshot.clip.unwrap();
    assert_eq!(&clip.data[..], b"c1c2");
    assert!(clip.recorded_for >= Duration::from_secs(30));
    assert_eq!(harness.device.live(), 0);
}

/// WHAT: Manual stop and the ceiling reach the same state
/// WHY: Both paths must hand the user a reviewable clip
#[tokio::test(start_paused = true)]
async fn given_manual_stop_and_ceiling_when_compared_then_same_terminal_state() {
    // Given: Two sessions with identical captures
    let manual = Harness::spawn(mp4_device(), FakeUploader::new(linked()));
    let mut ceiling = Harness::spawn(mp4_device(), FakeUploader::new(linked()));
    for harness in [&manual, &ceiling] {
        harness.start_capture(None).await;
        harness.device.emit(b"same").await;
    }

    // When: One is stopped manually and the other hits the ceiling
    let manual_clip = manual.stop_capture().await;
    ceiling.notices.recv().await.unwrap();
    let ceiling_snapshot = ceiling.handle.snapshot();

    // Then: Both are previewing a clip with the same content and no stream
    let manual_snapshot = manual.handle.snapshot();
    assert_eq!(manual_snapshot.phase, ceiling_snapshot.phase);
    assert!(manual_snapshot.stream.is_none() && ceiling_snapshot.stream.is_none());
    let ceiling_clip = ceiling_snapshot.clip.unwrap();
    assert_eq!(manual_clip.data, ceiling_clip.data);
    assert_eq!(manual_clip.format, ceiling_clip.format);
    assert_eq!(manual.device.live(), 0);
    assert_eq!(ceiling.device.live(), 0);
}

/// WHAT: Re-recording releases the previous clip entirely
/// WHY: Stale clips must not linger in memory
#[tokio::test]
async fn given_previewing_when_rerecording_then_previous_clip_dropped() {
    // Given: A clip under review, observed only through a weak reference
    let harness = Harness::spawn(mp4_device(), FakeUploader::new(linked()));
    let first = harness.start_capture(None).await;
    harness.device.emit(b"old").await;
    let clip = harness.stop_capture().await;
    let old_id = clip.id;
    let weak = Arc::downgrade(&clip);
    drop(clip);

    // When: Recording again
    let second = harness
        .start_capture(first.stream.map(|stream| stream.id))
        .await;

    // Then: The old clip is gone and nothing references it
    assert!(second.clip.is_none());
    assert!(weak.upgrade().is_none());

    // When: Finishing the new recording
    harness.device.emit(b"new").await;
    let new_clip = harness.stop_capture().await;

    // Then: The new clip holds only the new data
    assert_ne!(new_clip.id, old_id);
    assert_eq!(&new_clip.data[..], b"new");
}

/// WHAT: The container falls back to WebM when MP4 is unavailable
/// WHY: The format is fixed once at start from what the platform supports
#[tokio::test]
async fn given_webm_only_device_when_recording_then_clip_is_webm() {
    // Given: A device without MP4 support
    let harness = Harness::spawn(
        FakeDevice::new(vec![ClipFormat::Webm]),
        FakeUploader::new(linked()),
    );

    // When: Recording
    harness.start_capture(None).await;
    harness.device.emit(b"vp8").await;
    let clip = harness.stop_capture().await;

    // Then: Clip is WebM and is named accordingly
    assert_eq!(clip.format, ClipFormat::Webm);
    assert_eq!(clip.file_name(), "recorded-video.webm");
}

/// WHAT: Upload without a clip is ignored
/// WHY: There is nothing to send
#[tokio::test]
async fn given_no_clip_when_uploading_then_nothing_sent() {
    // Given: An idle session
    let harness = Harness::spawn(mp4_device(), FakeUploader::new(linked()));

    // When: Uploading
    harness.handle.upload().await.unwrap();
    let uploader = Arc::clone(&harness.uploader);
    assert_eq!(harness.finish().await, SessionOutcome::Shutdown);

    // Then: The upload service was never called
    assert_eq!(uploader.calls(), 0);
}

/// WHAT: A second upload while one is in flight is ignored
/// WHY: One clip is posted once per user action that can complete
#[tokio::test]
async fn given_upload_in_flight_when_uploading_again_then_single_request() {
    // Given: An upload held open by the service
    let gate = Arc::new(Notify::new());
    let mut harness = Harness::spawn(
        mp4_device(),
        FakeUploader::held(FakeResponse::Json(json!({ "ok": true })), Arc::clone(&gate)),
    );
    harness.start_capture(None).await;
    harness.device.emit(b"data").await;
    harness.stop_capture().await;
    harness.handle.upload().await.unwrap();
    harness.wait_for(|s| s.uploading).await;

    // When: Uploading again, then releasing the service
    harness.handle.upload().await.unwrap();
    gate.notify_one();
    let notice = harness.notices.recv().await.unwrap();

    // Then: Only one request went out
    assert_eq!(notice.kind, NoticeKind::MissingDownloadLink);
    assert_eq!(harness.uploader.calls(), 1);
}

/// WHAT: An upload result for a discarded clip is ignored
/// WHY: Late results must not act on a session that moved on
#[tokio::test]
async fn given_rerecord_during_upload_when_link_arrives_then_no_navigation() {
    // Given: An upload held open by the service
    let gate = Arc::new(Notify::new());
    let harness = Harness::spawn(mp4_device(), FakeUploader::held(linked(), Arc::clone(&gate)));
    let first = harness.start_capture(None).await;
    harness.device.emit(b"old").await;
    harness.stop_capture().await;
    harness.handle.upload().await.unwrap();
    harness.wait_for(|s| s.uploading).await;

    // When: Re-recording, then letting the old upload answer with a link
    harness
        .start_capture(first.stream.map(|stream| stream.id))
        .await;
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Then: The session keeps capturing and did not navigate
    assert_eq!(harness.handle.snapshot().phase, Phase::Capturing);
    assert!(harness.presenter.navigations().is_empty());
    assert_eq!(harness.finish().await, SessionOutcome::Shutdown);
}

/// WHAT: Encoder failure releases the stream and reports a device error
/// WHY: A broken capture must not hold the camera
#[tokio::test]
async fn given_capturing_when_encoder_fails_then_idle_and_released() {
    // Given: An active capture
    let mut harness = Harness::spawn(mp4_device(), FakeUploader::new(linked()));
    harness.start_capture(None).await;

    // When: The encoder fails
    harness.device.fail_encoder("device unplugged").await;
    let notice = harness.notices.recv().await.unwrap();

    // Then: Idle, stream released, device error shown
    assert_eq!(notice.kind, NoticeKind::DeviceAccess);
    let snapshot = harness.wait_for(|s| s.phase == Phase::Idle).await;
    assert!(snapshot.clip.is_none());
    assert_eq!(harness.device.live(), 0);
}

/// WHAT: An encoder finishing on its own yields a clip
/// WHY: Output already produced should not be lost
#[tokio::test]
async fn given_capturing_when_encoder_finishes_unprompted_then_previewing() {
    // Given: An active capture with data
    let harness = Harness::spawn(mp4_device(), FakeUploader::new(linked()));
    harness.start_capture(None).await;
    harness.device.emit(b"tail").await;

    // When: The encoder ends by itself
    harness.device.finish_encoder().await;

    // Then: The clip holds what was produced and the stream is released
    let snapshot = harness.wait_for(|s| s.phase == Phase::Previewing).await;
    assert_eq!(&snapshot.clip.unwrap().data[..], b"tail");
    assert_eq!(harness.device.live(), 0);
}

/// WHAT: A failed navigation keeps the clip and tells the user
/// WHY: The user can retry once a browser is available
#[tokio::test]
async fn given_navigation_failure_when_link_returned_then_still_previewing() {
    // Given: A presenter that cannot open links
    let mut harness = Harness::spawn(mp4_device(), FakeUploader::new(linked()));
    harness.presenter.fail_navigation.store(true, Ordering::SeqCst);
    harness.start_capture(None).await;
    harness.device.emit(b"data").await;
    harness.stop_capture().await;

    // When: Uploading
    harness.handle.upload().await.unwrap();
    let notice = harness.notices.recv().await.unwrap();

    // Then: Still previewing, notice names the link
    assert_eq!(notice.kind, NoticeKind::NavigationFailed);
    assert!(notice.message.contains("https://x/y"));
    assert_eq!(harness.handle.snapshot().phase, Phase::Previewing);
}

/// WHAT: Commands after navigation fail with SessionClosed
/// WHY: A torn-down session accepts nothing
#[tokio::test]
async fn given_navigated_session_when_sending_command_then_session_closed() {
    // Given: A session that navigated away
    let harness = Harness::spawn(mp4_device(), FakeUploader::new(linked()));
    harness.start_capture(None).await;
    harness.device.emit(b"data").await;
    harness.stop_capture().await;
    harness.handle.upload().await.unwrap();
    let handle = harness.handle.clone();
    let outcome = harness.task.await.unwrap().unwrap();
    assert!(matches!(outcome, SessionOutcome::Navigated(_)));

    // When: Starting again
    let result = handle.start().await;

    // Then: The handle reports the session as closed
    assert!(matches!(result, Err(RecorderError::SessionClosed { .. })));
}

/// WHAT: The configured ceiling is used in the notice
/// WHY: The limit is a setting, not a constant
#[tokio::test(start_paused = true)]
async fn given_short_ceiling_when_elapsed_then_notice_names_configured_seconds() {
    // Given: A ten-second ceiling
    let settings = SessionSettings {
        max_duration: Duration::from_secs(10),
        ..SessionSettings::default()
    };
    let mut harness = Harness::spawn_with(mp4_device(), FakeUploader::new(linked()), settings);
    harness.start_capture(None).await;

    // When: The ceiling elapses
    let notice = harness.notices.recv().await.unwrap();

    // Then: The notice names ten seconds
    assert_eq!(
        notice.message,
        "Recording stopped automatically after 10 seconds."
    );
}
