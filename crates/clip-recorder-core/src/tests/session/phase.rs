use crate::{Phase, Step, Trigger};

/// WHAT: The documented lifecycle transitions hold
/// WHY: The controller gates every reaction on this table
#[test]
fn given_lifecycle_when_applying_triggers_then_phases_follow_state_machine() {
    assert_eq!(Phase::Idle.on(Trigger::StartGranted), Step::Enter(Phase::Capturing));
    assert_eq!(Phase::Idle.on(Trigger::StartFailed), Step::Enter(Phase::Idle));
    assert_eq!(Phase::Capturing.on(Trigger::Stop), Step::Enter(Phase::Previewing));
    assert_eq!(
        Phase::Capturing.on(Trigger::CeilingReached),
        Step::Enter(Phase::Previewing)
    );
    assert_eq!(Phase::Previewing.on(Trigger::UploadLinked), Step::Terminate);
    assert_eq!(
        Phase::Previewing.on(Trigger::UploadFailed),
        Step::Enter(Phase::Previewing)
    );
    assert_eq!(
        Phase::Previewing.on(Trigger::LinkMissing),
        Step::Enter(Phase::Previewing)
    );
}

/// WHAT: Start from any phase first discards to Idle
/// WHY: Re-recording must release the device and the previous clip
#[test]
fn given_any_phase_when_start_requested_then_enters_idle() {
    for phase in [Phase::Idle, Phase::Capturing, Phase::Previewing] {
        assert_eq!(phase.on(Trigger::StartRequested), Step::Enter(Phase::Idle));
    }
}

/// WHAT: Stop outside capturing is ignored
/// WHY: Stop is idempotent
#[test]
fn given_not_capturing_when_stopping_then_ignored() {
    assert_eq!(Phase::Idle.on(Trigger::Stop), Step::Ignore);
    assert_eq!(Phase::Previewing.on(Trigger::Stop), Step::Ignore);
    assert_eq!(Phase::Previewing.on(Trigger::CeilingReached), Step::Ignore);
}

/// WHAT: Grants and upload results outside their phase are ignored
/// WHY: Late results must never act on a session that moved on
#[test]
fn given_wrong_phase_when_late_result_arrives_then_ignored() {
    assert_eq!(Phase::Capturing.on(Trigger::StartGranted), Step::Ignore);
    assert_eq!(Phase::Previewing.on(Trigger::StartGranted), Step::Ignore);
    assert_eq!(Phase::Idle.on(Trigger::UploadLinked), Step::Ignore);
    assert_eq!(Phase::Capturing.on(Trigger::UploadFailed), Step::Ignore);
}

/// WHAT: Encoder failure while capturing returns to Idle
/// WHY: A broken capture has no clip to preview
#[test]
fn given_capturing_when_encoder_fails_then_enters_idle() {
    assert_eq!(Phase::Capturing.on(Trigger::EncoderFailed), Step::Enter(Phase::Idle));
    assert_eq!(Phase::Previewing.on(Trigger::EncoderFailed), Step::Ignore);
}
