use crate::{CoreResult, RecorderError, session::SessionCommand, session::SessionSnapshot};

use std::panic::Location;

use error_location::ErrorLocation;
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Cloneable front end of a [`crate::SessionController`].
///
/// Commands are queued and handled in order by the controller task. Once
/// the controller has ended, every command fails with
/// [`RecorderError::SessionClosed`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<SessionCommand>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<SessionCommand>,
        snapshot_rx: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            command_tx,
            snapshot_rx,
        }
    }

    /// Starts capturing, discarding any current capture or clip.
    pub async fn start(&self) -> CoreResult<()> {
        self.send(SessionCommand::Start).await
    }

    /// Stops capturing. Ignored unless capturing.
    pub async fn stop(&self) -> CoreResult<()> {
        self.send(SessionCommand::Stop).await
    }

    /// Uploads the clip under review. Ignored without a clip.
    pub async fn upload(&self) -> CoreResult<()> {
        self.send(SessionCommand::Upload).await
    }

    /// Ends the session.
    pub async fn shutdown(&self) -> CoreResult<()> {
        self.send(SessionCommand::Shutdown).await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver notified on every published state.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Queues any command.
    pub async fn send(&self, command: SessionCommand) -> CoreResult<()> {
        self.command_tx.send(command).await.map_err(|_| {
            debug!(command = ?command, "Command sent to a closed session");
            RecorderError::SessionClosed {
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }
}
