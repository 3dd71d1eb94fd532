// SPDX-License-Identifier: GPL-3.0-only

//! Capture session actor
//!
//! Hosts a [`CaptureController`] on its own task. The screen talks to it
//! through [`SessionHandle`] and listens to the controller's event channel.
//! Triggers that arrive while the controller is busy are answered with a
//! status line instead of being queued, and a teardown interrupts whatever is
//! running.

use super::controller::CaptureController;
use super::state::{AttemptKind, CaptureEvent};
use crate::errors::RejectReason;
use crate::storage::PersistenceGateway;
use std::future::Future;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Commands the screen can send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Start the first try
    Start,
    /// Use the redo
    Redo,
    /// Leave the screen
    Teardown,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// The redo committed and the flow moved on
    Advanced,
    /// The screen was left
    TornDown,
}

/// Cheap handle for sending commands to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Returns `false` once the session has ended
    pub fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn start(&self) -> bool {
        self.send(SessionCommand::Start)
    }

    pub fn redo(&self) -> bool {
        self.send(SessionCommand::Redo)
    }

    pub fn teardown(&self) -> bool {
        self.send(SessionCommand::Teardown)
    }
}

/// Run `controller` on a new task
pub fn spawn_session<G>(
    controller: CaptureController<G>,
) -> (SessionHandle, JoinHandle<SessionExit>)
where
    G: PersistenceGateway + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_session(controller, rx));
    (SessionHandle { commands: tx }, task)
}

/// Drive a session until it advances or is torn down
///
/// Loads prior shots, opens the camera, then serves triggers one at a time.
/// The camera is released before this returns, on every path.
pub async fn run_session<G: PersistenceGateway>(
    mut controller: CaptureController<G>,
    mut commands: UnboundedReceiver<SessionCommand>,
) -> SessionExit {
    let events = controller.events();

    let exit = 'session: {
        let mounted = async {
            controller.load_existing().await;
            // Failure is reported through events; the next trigger retries
            let _ = controller.ensure_camera().await;
        };
        if interruptible(mounted, &mut commands, &events).await.is_none() {
            break 'session SessionExit::TornDown;
        }

        while let Some(command) = commands.recv().await {
            let kind = match command {
                SessionCommand::Start => AttemptKind::First,
                SessionCommand::Redo => AttemptKind::Redo,
                SessionCommand::Teardown => break,
            };

            let attempt = controller.run_attempt(kind);
            match interruptible(attempt, &mut commands, &events).await {
                None => break,
                Some(Ok(())) if kind == AttemptKind::Redo => {
                    break 'session SessionExit::Advanced;
                }
                Some(Ok(())) => {}
                Some(Err(error)) if error.is_rejection() => debug!(%error, "Trigger ignored"),
                Some(Err(error)) => info!(%error, "Attempt ended without commit"),
            }
        }
        SessionExit::TornDown
    };

    info!(?exit, "Capture session ending");
    controller.teardown();
    exit
}

/// Run `work` while answering triggers with a busy status
///
/// Returns `None` if a teardown arrived (or every handle was dropped) first;
/// `work` is dropped at that point.
async fn interruptible<F: Future>(
    work: F,
    commands: &mut UnboundedReceiver<SessionCommand>,
    events: &UnboundedSender<CaptureEvent>,
) -> Option<F::Output> {
    tokio::pin!(work);
    loop {
        tokio::select! {
            output = &mut work => return Some(output),
            command = commands.recv() => match command {
                Some(SessionCommand::Teardown) | None => return None,
                Some(trigger) => {
                    info!(?trigger, "Trigger while busy");
                    let _ = events.send(CaptureEvent::Status(RejectReason::Busy.user_message()));
                }
            },
        }
    }
}
