/// Commands sent from the hotkey handler and tray menu to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Hotkey pressed: stop if recording, otherwise start.
    ToggleRecording,
    /// Start a new recording, discarding any clip under review.
    StartRecording,
    /// Stop the current recording and keep the clip.
    StopRecording,
    /// Upload the clip under review.
    SubmitVideo,
    /// Request application shutdown.
    Shutdown,
}
