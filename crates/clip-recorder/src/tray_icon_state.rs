use clip_recorder_core::{Phase, SessionSnapshot};

/// Tray icon states corresponding to the session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayIconState {
    /// Ready to start recording.
    Idle,
    /// Camera is open and recording.
    Recording,
    /// A clip is ready to submit or re-record.
    Previewing,
    /// The clip is being uploaded.
    Uploading,
}

impl TrayIconState {
    /// Tray state for a published session snapshot.
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        match snapshot.phase {
            Phase::Idle => TrayIconState::Idle,
            Phase::Capturing => TrayIconState::Recording,
            Phase::Previewing if snapshot.uploading => TrayIconState::Uploading,
            Phase::Previewing => TrayIconState::Previewing,
        }
    }

    /// Tooltip shown while in this state.
    pub fn tooltip(self) -> &'static str {
        match self {
            TrayIconState::Idle => "Clip Recorder - Ready",
            TrayIconState::Recording => "Clip Recorder - Recording...",
            TrayIconState::Previewing => "Clip Recorder - Clip ready",
            TrayIconState::Uploading => "Clip Recorder - Uploading...",
        }
    }

    /// Which menu actions make sense in this state.
    pub fn menu_actions(self) -> MenuActions {
        match self {
            TrayIconState::Idle => MenuActions {
                start: true,
                ..MenuActions::default()
            },
            TrayIconState::Recording => MenuActions {
                stop: true,
                ..MenuActions::default()
            },
            TrayIconState::Previewing => MenuActions {
                record_again: true,
                submit: true,
                ..MenuActions::default()
            },
            TrayIconState::Uploading => MenuActions {
                record_again: true,
                ..MenuActions::default()
            },
        }
    }
}

/// Enabled flags for the tray menu items. Exit is always enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuActions {
    /// "Start Recording".
    pub start: bool,
    /// "Stop Recording".
    pub stop: bool,
    /// "Record Again".
    pub record_again: bool,
    /// "Submit Video".
    pub submit: bool,
}
