use crate::{AppCommand, AppResult, TrayCommand, TrayIconState, tray_manager::TrayMenuIds};

use std::time::Duration;

use clip_recorder_core::{CoreResult, Phase, SessionCommand, SessionHandle, SessionOutcome};
use tao::event_loop::EventLoopProxy;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{error, info, instrument, warn};
use tray_icon::menu::{MenuEvent, MenuId};

/// Main application state.
///
/// Runs on the async runtime thread. Tray updates go back to the main
/// thread through `tray_proxy` because `TrayIcon` is `!Send` and must
/// remain on the UI thread.
pub struct App {
    pub(crate) session: SessionHandle,
    pub(crate) session_task: JoinHandle<CoreResult<SessionOutcome>>,
    pub(crate) tray_proxy: EventLoopProxy<TrayCommand>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    pub(crate) menu_ids: TrayMenuIds,
}

impl App {
    /// Run the main application event loop until the session ends.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Clip-Recorder starting");

        // MenuEvent::receiver() is a blocking crossbeam receiver; one
        // blocking task forwards it until tray_event_rx is dropped.
        let (tray_event_tx, mut tray_event_rx) = mpsc::channel(32);
        let tray_handle = tokio::task::spawn_blocking(move || {
            let receiver = MenuEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if tray_event_tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        let mut snapshots = self.session.subscribe();
        let mut tray_state = TrayIconState::from_snapshot(&snapshots.borrow_and_update());

        loop {
            tokio::select! {
                Some(event) = tray_event_rx.recv() => {
                    match menu_command(&self.menu_ids, &event.id) {
                        Some(command) => self.dispatch(command).await,
                        None => warn!(menu_id = ?event.id, "Unknown tray menu item"),
                    }
                }

                Some(command) = self.command_rx.recv() => {
                    self.dispatch(command).await;
                }

                Ok(()) = snapshots.changed() => {
                    let state = TrayIconState::from_snapshot(&snapshots.borrow_and_update());
                    if state != tray_state {
                        tray_state = state;
                        if self.tray_proxy.send_event(TrayCommand::SetState(state)).is_err() {
                            warn!("UI event loop closed, dropping tray update");
                        }
                    }
                }

                outcome = &mut self.session_task => {
                    match outcome {
                        Ok(Ok(SessionOutcome::Navigated(link))) => {
                            info!(link = %link, "Clip submitted, session finished");
                        }
                        Ok(Ok(SessionOutcome::Shutdown)) => info!("Session shut down"),
                        Ok(Err(e)) => error!(error = ?e, "Session ended with an error"),
                        Err(e) => error!(error = ?e, "Session task panicked"),
                    }
                    break;
                }
            }
        }

        drop(tray_event_rx);

        match tokio::time::timeout(Duration::from_secs(1), tray_handle).await {
            Ok(Ok(())) => info!("Tray event forwarder stopped cleanly"),
            Ok(Err(e)) => error!(error = ?e, "Tray event forwarder task panicked"),
            Err(_) => info!(
                "Tray event forwarder did not stop within timeout, \
                     will be cleaned up on exit"
            ),
        }

        let _ = self.shutdown_tx.send(true);
        let _ = self.tray_proxy.send_event(TrayCommand::Shutdown);
        info!("Clip-Recorder shut down successfully");

        Ok(())
    }

    /// Forwards a user command to the session.
    #[instrument(skip(self))]
    async fn dispatch(&self, command: AppCommand) {
        let phase = self.session.snapshot().phase;
        let session_command = session_command(command, phase);

        if let Err(e) = self.session.send(session_command).await {
            error!(command = ?session_command, error = ?e, "Failed to send session command");
        }
    }
}

/// Maps an application command to a session command for the current phase.
pub(crate) fn session_command(command: AppCommand, phase: Phase) -> SessionCommand {
    match command {
        AppCommand::ToggleRecording if phase == Phase::Capturing => SessionCommand::Stop,
        AppCommand::ToggleRecording | AppCommand::StartRecording => SessionCommand::Start,
        AppCommand::StopRecording => SessionCommand::Stop,
        AppCommand::SubmitVideo => SessionCommand::Upload,
        AppCommand::Shutdown => SessionCommand::Shutdown,
    }
}

/// Maps a tray menu click to an application command.
pub(crate) fn menu_command(ids: &TrayMenuIds, id: &MenuId) -> Option<AppCommand> {
    if *id == ids.start || *id == ids.record_again {
        Some(AppCommand::StartRecording)
    } else if *id == ids.stop {
        Some(AppCommand::StopRecording)
    } else if *id == ids.submit {
        Some(AppCommand::SubmitVideo)
    } else if *id == ids.exit {
        info!("Exit requested from tray menu");
        Some(AppCommand::Shutdown)
    } else {
        None
    }
}
