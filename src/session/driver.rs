use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::info;

use super::controller::{SessionController, SessionEvents};
use super::state::{SessionSnapshot, UserAction};
use crate::error::ActionRejected;

type ActionReply = oneshot::Sender<Result<SessionSnapshot, ActionRejected>>;

struct Command {
    action: UserAction,
    reply: ActionReply,
}

/// Cloneable handle to a session running on its own task
///
/// The task applies user actions and queued events one at a time. When the last handle is
/// dropped the task cleans the session up and exits.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Move the controller onto a task
    pub fn spawn(controller: SessionController, events: SessionEvents) -> (Self, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(32);
        let snapshots = controller.subscribe();

        let task = tokio::spawn(run(controller, events, commands_rx));

        (
            Self {
                commands: commands_tx,
                snapshots,
            },
            task,
        )
    }

    /// Apply a user action and return the snapshot right after it
    pub async fn dispatch(
        &self,
        action: UserAction,
    ) -> Result<Result<SessionSnapshot, ActionRejected>> {
        let (reply, response) = oneshot::channel();

        self.commands
            .send(Command { action, reply })
            .await
            .context("Session task has stopped")?;

        response.await.context("Session task dropped the action")
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Watch snapshots as they change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }
}

async fn run(
    mut controller: SessionController,
    mut events: SessionEvents,
    mut commands: mpsc::Receiver<Command>,
) {
    info!("Demo call session task started");

    loop {
        // Queued events are applied before the next action is read
        tokio::select! {
            biased;
            Some(event) = events.recv() => controller.handle_event(event),
            command = commands.recv() => match command {
                Some(Command { action, reply }) => {
                    let result = controller
                        .dispatch(action)
                        .await
                        .map(|()| controller.snapshot());
                    let _ = reply.send(result);
                }
                None => break,
            },
        }
    }

    controller.cleanup();
    info!("Demo call session task stopped");
}
