use crate::{
    TrayIconState,
    tray_icon_state::MenuActions,
    tray_manager::{icon_color, icon_pixels},
};

use clip_recorder_core::{Phase, SessionSnapshot};

fn snapshot(phase: Phase, uploading: bool) -> SessionSnapshot {
    SessionSnapshot {
        phase,
        uploading,
        ..SessionSnapshot::default()
    }
}

/// WHAT: Each session phase maps to its tray state
/// WHY: The tray is the only indicator of what the recorder is doing
#[test]
fn given_snapshots_when_mapping_then_tray_state_follows_phase() {
    assert_eq!(
        TrayIconState::from_snapshot(&snapshot(Phase::Idle, false)),
        TrayIconState::Idle
    );
    assert_eq!(
        TrayIconState::from_snapshot(&snapshot(Phase::Capturing, false)),
        TrayIconState::Recording
    );
    assert_eq!(
        TrayIconState::from_snapshot(&snapshot(Phase::Previewing, false)),
        TrayIconState::Previewing
    );
    assert_eq!(
        TrayIconState::from_snapshot(&snapshot(Phase::Previewing, true)),
        TrayIconState::Uploading
    );
}

/// WHAT: Menu items are enabled only where the action applies
/// WHY: Submit without a clip or stop while idle would do nothing
#[test]
fn given_states_when_listing_menu_actions_then_only_applicable_enabled() {
    assert_eq!(
        TrayIconState::Idle.menu_actions(),
        MenuActions {
            start: true,
            ..MenuActions::default()
        }
    );
    assert_eq!(
        TrayIconState::Recording.menu_actions(),
        MenuActions {
            stop: true,
            ..MenuActions::default()
        }
    );
    assert_eq!(
        TrayIconState::Previewing.menu_actions(),
        MenuActions {
            record_again: true,
            submit: true,
            ..MenuActions::default()
        }
    );

    // Then: A second submit is not offered while uploading
    assert!(!TrayIconState::Uploading.menu_actions().submit);
}

/// WHAT: Generated icons are a coloured disc on a transparent square
/// WHY: Tray hosts expect a square RGBA buffer
#[test]
fn given_state_when_rendering_icon_then_disc_on_transparent_square() {
    let pixels = icon_pixels(TrayIconState::Recording);

    // Then: 32x32 RGBA
    assert_eq!(pixels.len(), 32 * 32 * 4);

    // Then: Corner is transparent, centre is opaque in the state colour
    assert_eq!(pixels[3], 0x00);
    let centre = (16 * 32 + 16) * 4;
    assert_eq!(&pixels[centre..centre + 3], &icon_color(TrayIconState::Recording));
    assert_eq!(pixels[centre + 3], 0xff);
}

/// WHAT: Every state has its own colour and tooltip
/// WHY: States must be distinguishable at a glance
#[test]
fn given_all_states_then_colours_and_tooltips_distinct() {
    let states = [
        TrayIconState::Idle,
        TrayIconState::Recording,
        TrayIconState::Previewing,
        TrayIconState::Uploading,
    ];

    for (i, a) in states.iter().enumerate() {
        for b in &states[i + 1..] {
            assert_ne!(icon_color(*a), icon_color(*b));
            assert_ne!(a.tooltip(), b.tooltip());
        }
    }
}
