//! Debounced autosave.
//!
//! Request handlers mutate the [`Workspace`] and then call
//! [`AutosaveHandle::notify`]. A single background task owns all backend
//! writes and moves through these states:
//!
//! ```text
//! idle → pending → saving → success | error → idle
//! ```
//!
//! Every notification re-arms the quiet-period countdown. When it expires
//! the task writes the global blob plus each store touched since its last
//! successful save. Notifications that arrive while a save is running
//! wait in the channel and re-arm the countdown once it finishes. Failed
//! stores stay dirty, so the next cycle writes them again in full.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, sleep_until};
use tracing::{error, info, warn};

use souq_core::StoreId;

use crate::backend::BackendError;
use crate::config::AutosaveConfig;
use crate::workspace::Workspace;

/// Capacity of the transition broadcast channel.
const EVENT_CAPACITY: usize = 64;

/// What the autosave task is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    #[default]
    Idle,
    /// Changes are waiting for the countdown to expire.
    Pending,
    Saving,
    /// Shown for the success window, then back to idle.
    Success,
    /// Shown for the error window, then back to idle.
    Error,
}

/// Outcome of one save cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveReport {
    const fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: &BackendError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// The most recent finished cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastSave {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub report: SaveReport,
}

#[derive(Debug, Error)]
pub enum AutosaveError {
    #[error("autosave task has stopped")]
    Stopped,
}

enum Command {
    Mutated(Option<StoreId>),
    SaveNow(oneshot::Sender<SaveReport>),
    Shutdown(oneshot::Sender<SaveReport>),
}

/// Handle to the autosave task. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AutosaveHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
    last: watch::Receiver<Option<LastSave>>,
    events: broadcast::Sender<SaveStatus>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mutated(store) => f.debug_tuple("Mutated").field(store).finish(),
            Self::SaveNow(_) => f.write_str("SaveNow"),
            Self::Shutdown(_) => f.write_str("Shutdown"),
        }
    }
}

impl AutosaveHandle {
    /// Report a mutation. `None` means only the global blob changed.
    pub fn notify(&self, store: Option<StoreId>) {
        if self.commands.send(Command::Mutated(store)).is_err() {
            warn!("mutation after autosave stopped; change will not be saved");
        }
    }

    #[must_use]
    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    /// Watch the current status.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Receive every status transition from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SaveStatus> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn last_save(&self) -> Option<LastSave> {
        self.last.borrow().clone()
    }

    /// Save immediately and wait for the result.
    ///
    /// # Errors
    ///
    /// Returns `AutosaveError::Stopped` if the task is gone.
    pub async fn save_now(&self) -> Result<SaveReport, AutosaveError> {
        let (reply, result) = oneshot::channel();
        self.commands
            .send(Command::SaveNow(reply))
            .map_err(|_| AutosaveError::Stopped)?;
        result.await.map_err(|_| AutosaveError::Stopped)
    }

    /// Write any pending changes and stop the task.
    ///
    /// # Errors
    ///
    /// Returns `AutosaveError::Stopped` if the task is already gone.
    pub async fn shutdown(&self) -> Result<SaveReport, AutosaveError> {
        let (reply, result) = oneshot::channel();
        self.commands
            .send(Command::Shutdown(reply))
            .map_err(|_| AutosaveError::Stopped)?;
        result.await.map_err(|_| AutosaveError::Stopped)
    }
}

/// Start the autosave task.
#[must_use]
pub fn spawn(workspace: Arc<Workspace>, config: AutosaveConfig) -> (AutosaveHandle, JoinHandle<()>) {
    let (commands, receiver) = mpsc::unbounded_channel();
    let (status_tx, status) = watch::channel(SaveStatus::Idle);
    let (last_tx, last) = watch::channel(None);
    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    let task = Autosave {
        workspace,
        config,
        dirty: HashSet::new(),
        status: status_tx,
        last: last_tx,
        events: events.clone(),
        deadline: None,
        revert_at: None,
        waiters: Vec::new(),
    };
    let join = tokio::spawn(task.run(receiver));

    (
        AutosaveHandle {
            commands,
            status,
            last,
            events,
        },
        join,
    )
}

async fn wait_until(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

struct Autosave {
    workspace: Arc<Workspace>,
    config: AutosaveConfig,
    dirty: HashSet<StoreId>,
    status: watch::Sender<SaveStatus>,
    last: watch::Sender<Option<LastSave>>,
    events: broadcast::Sender<SaveStatus>,
    /// When the pending countdown expires.
    deadline: Option<Instant>,
    /// When `success`/`error` falls back to idle.
    revert_at: Option<Instant>,
    /// Manual saves waiting for the next cycle.
    waiters: Vec<oneshot::Sender<SaveReport>>,
}

impl Autosave {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Mutated(store)) => {
                        if let Some(store) = store {
                            self.dirty.insert(store);
                        }
                        self.arm(self.config.debounce);
                    }
                    Some(Command::SaveNow(reply)) => {
                        self.waiters.push(reply);
                        self.arm(Duration::ZERO);
                    }
                    Some(Command::Shutdown(reply)) => {
                        let report = self.flush().await;
                        let _ = reply.send(report);
                        info!("autosave stopped");
                        return;
                    }
                    None => {
                        self.flush().await;
                        return;
                    }
                },
                () = wait_until(self.deadline) => {
                    self.deadline = None;
                    self.save().await;
                }
                () = wait_until(self.revert_at) => {
                    self.revert_at = None;
                    self.set(SaveStatus::Idle);
                }
            }
        }
    }

    fn set(&self, status: SaveStatus) {
        if *self.status.borrow() != status {
            self.status.send_replace(status);
            let _ = self.events.send(status);
        }
    }

    /// Enter `pending` and (re)start the countdown. A manual save that is
    /// already waiting keeps its earlier deadline.
    fn arm(&mut self, delay: Duration) {
        let at = Instant::now() + delay;
        self.deadline = Some(match self.deadline {
            Some(current) if !self.waiters.is_empty() => current.min(at),
            _ => at,
        });
        self.revert_at = None;
        self.set(SaveStatus::Pending);
    }

    async fn flush(&mut self) -> SaveReport {
        if self.deadline.is_none() && self.dirty.is_empty() {
            return SaveReport::ok();
        }
        self.set(SaveStatus::Pending);
        self.deadline = None;
        self.save().await
    }

    async fn save(&mut self) -> SaveReport {
        self.set(SaveStatus::Saving);
        let snapshot = self.workspace.snapshot(&self.dirty).await;
        self.dirty
            .retain(|id| snapshot.stores.iter().any(|(saved, _)| saved == id));
        let backend = self.workspace.backend();

        let mut failure = backend.save_global_data(&snapshot.global).await.err();
        for (store, data) in &snapshot.stores {
            match backend.save_store_data(store, data).await {
                Ok(version) => {
                    self.workspace.mark_saved(store, version).await;
                    self.dirty.remove(store);
                }
                Err(e) => {
                    error!(%store, error = %e, "store save failed");
                    failure.get_or_insert(e);
                }
            }
        }

        let now = Instant::now();
        let report = match failure {
            None => {
                info!(stores = snapshot.stores.len(), "autosave complete");
                self.set(SaveStatus::Success);
                self.revert_at = Some(now + self.config.success_display);
                SaveReport::ok()
            }
            Some(e) => {
                let event_id = sentry::capture_error(&e);
                error!(
                    error = %e,
                    sentry_event_id = %event_id,
                    dirty_stores = self.dirty.len(),
                    "autosave failed"
                );
                self.set(SaveStatus::Error);
                self.revert_at = Some(now + self.config.error_display);
                SaveReport::failed(&e)
            }
        };

        self.last.send_replace(Some(LastSave {
            at: Utc::now(),
            report: report.clone(),
        }));
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(report.clone());
        }
        report
    }
}
