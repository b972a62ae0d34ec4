//! Single-writer access to a session.
//!
//! [`SessionHandle::spawn`] moves a [`SessionController`] into its own task.
//! Handles send commands over a channel and the task runs them one at a
//! time, so at most one gist write is ever in flight. Mutations that queue
//! up while the task is busy are applied together and committed once.

use chrono::{DateTime, Utc};
use ghtt_github::{Connector, ListOutcome, RateLimitMonitor};
use ghtt_protocol::{Issue, IssueId, TimeEntry};
use secrecy::SecretString;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::controller::{Mutation, SessionController};
use crate::error::{Result, SessionError};
use crate::state::{CommitReport, LoginState, Session};

/// Commands queued before senders wait.
const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Login {
        token: SecretString,
        reply: Reply<Result<CommitReport>>,
    },
    Restore {
        reply: Reply<Result<Option<CommitReport>>>,
    },
    Logout {
        reply: Reply<CommitReport>,
    },
    Mutate {
        mutation: Mutation,
        reply: Reply<Result<CommitReport>>,
    },
    Snapshot {
        reply: Reply<Session>,
    },
    AssignedIssues {
        reply: Reply<Result<ListOutcome<Issue>>>,
    },
    TimeEntries {
        issue: Issue,
        reply: Reply<Result<ListOutcome<TimeEntry>>>,
    },
}

/// A cloneable handle to a session task.
///
/// The task stops once every handle is dropped.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use chrono::Utc;
/// use ghtt_config::MemoryCredentialStore;
/// use ghtt_github::{GistStore, OctocrabConnector};
/// use ghtt_session::{SessionController, SessionHandle};
///
/// # async fn example() -> ghtt_session::Result<()> {
/// let controller = SessionController::new(
///     OctocrabConnector::default(),
///     GistStore::default(),
///     Arc::new(MemoryCredentialStore::new()),
/// );
/// let (session, _task) = SessionHandle::spawn(controller);
///
/// session.restore().await?;
/// let report = session.stop_timer(Utc::now()).await?;
/// if let Some(entry) = report.entry {
///     println!("recorded {} minutes", entry.duration().num_minutes());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<Command>,
    monitor: RateLimitMonitor,
    login_state: watch::Receiver<LoginState>,
}

impl SessionHandle {
    /// Spawns a task owning `controller`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn<C: Connector + 'static>(controller: SessionController<C>) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        let handle = Self {
            sender,
            monitor: controller.rate_limits().clone(),
            login_state: controller.subscribe_login_state(),
        };
        let task = tokio::spawn(run(controller, receiver));
        (handle, task)
    }

    /// Returns the current login state.
    #[must_use]
    pub fn login_state(&self) -> LoginState {
        *self.login_state.borrow()
    }

    /// Returns whether a login is underway.
    #[must_use]
    pub fn login_in_progress(&self) -> bool {
        self.login_state() == LoginState::LoggingIn
    }

    /// Returns a receiver notified on every login state change.
    #[must_use]
    pub fn subscribe_login_state(&self) -> watch::Receiver<LoginState> {
        self.login_state.clone()
    }

    /// Returns the rate-limit monitor.
    ///
    /// Reading it never waits for the session task.
    #[must_use]
    pub fn rate_limits(&self) -> &RateLimitMonitor {
        &self.monitor
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(command(reply))
            .await
            .map_err(|_| SessionError::ActorClosed)?;
        response.await.map_err(|_| SessionError::ActorClosed)
    }

    /// See [`SessionController::login`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ActorClosed`] if the task has stopped, or the
    /// login error.
    pub async fn login(&self, token: SecretString) -> Result<CommitReport> {
        self.request(|reply| Command::Login { token, reply }).await?
    }

    /// See [`SessionController::restore`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ActorClosed`] if the task has stopped, or the
    /// restore error.
    pub async fn restore(&self) -> Result<Option<CommitReport>> {
        self.request(|reply| Command::Restore { reply }).await?
    }

    /// See [`SessionController::logout`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ActorClosed`] if the task has stopped.
    pub async fn logout(&self) -> Result<CommitReport> {
        self.request(|reply| Command::Logout { reply }).await
    }

    /// Queues a mutation; it is committed together with any mutation
    /// queued behind it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ActorClosed`] if the task has stopped, or
    /// [`SessionError::NotLoggedIn`] without a session.
    pub async fn mutate(&self, mutation: Mutation) -> Result<CommitReport> {
        self.request(|reply| Command::Mutate { mutation, reply })
            .await?
    }

    /// See [`SessionController::add_issue`].
    ///
    /// # Errors
    ///
    /// See [`SessionHandle::mutate`].
    pub async fn add_issue(&self, issue: Issue) -> Result<CommitReport> {
        self.mutate(Mutation::AddIssue(issue)).await
    }

    /// See [`SessionController::drop_issue`].
    ///
    /// # Errors
    ///
    /// See [`SessionHandle::mutate`].
    pub async fn drop_issue(&self, id: IssueId) -> Result<CommitReport> {
        self.mutate(Mutation::DropIssue(id)).await
    }

    /// See [`SessionController::start_timer`].
    ///
    /// # Errors
    ///
    /// See [`SessionHandle::mutate`].
    pub async fn start_timer(&self, issue: Issue, at: DateTime<Utc>) -> Result<CommitReport> {
        self.mutate(Mutation::StartTimer { issue, at }).await
    }

    /// See [`SessionController::stop_timer`].
    ///
    /// # Errors
    ///
    /// See [`SessionHandle::mutate`].
    pub async fn stop_timer(&self, at: DateTime<Utc>) -> Result<CommitReport> {
        self.mutate(Mutation::StopTimer { at }).await
    }

    /// See [`SessionController::add_entry`].
    ///
    /// # Errors
    ///
    /// See [`SessionHandle::mutate`].
    pub async fn add_entry(
        &self,
        issue: Issue,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CommitReport> {
        self.mutate(Mutation::AddEntry { issue, begin, end }).await
    }

    /// Returns a copy of the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ActorClosed`] if the task has stopped.
    pub async fn snapshot(&self) -> Result<Session> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// See [`SessionController::assigned_issues`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ActorClosed`] if the task has stopped, or
    /// [`SessionError::NotLoggedIn`] without a session.
    pub async fn assigned_issues(&self) -> Result<ListOutcome<Issue>> {
        self.request(|reply| Command::AssignedIssues { reply })
            .await?
    }

    /// See [`SessionController::time_entries`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ActorClosed`] if the task has stopped, or
    /// [`SessionError::NotLoggedIn`] without a session.
    pub async fn time_entries(&self, issue: Issue) -> Result<ListOutcome<TimeEntry>> {
        self.request(|reply| Command::TimeEntries { issue, reply })
            .await?
    }
}

type Pending = (Mutation, Reply<Result<CommitReport>>);

async fn run<C: Connector>(
    mut controller: SessionController<C>,
    mut receiver: mpsc::Receiver<Command>,
) {
    let mut deferred = None;
    loop {
        let command = match deferred.take() {
            Some(command) => command,
            None => match receiver.recv().await {
                Some(command) => command,
                None => break,
            },
        };

        // Replies are dropped silently when the requester stopped waiting.
        match command {
            Command::Mutate { mutation, reply } => {
                let mut batch = vec![(mutation, reply)];
                while let Ok(next) = receiver.try_recv() {
                    match next {
                        Command::Mutate { mutation, reply } => batch.push((mutation, reply)),
                        other => {
                            deferred = Some(other);
                            break;
                        }
                    }
                }
                apply_batch(&mut controller, batch).await;
            }
            Command::Login { token, reply } => {
                let _ = reply.send(controller.login(token).await);
            }
            Command::Restore { reply } => {
                let _ = reply.send(controller.restore().await);
            }
            Command::Logout { reply } => {
                let _ = reply.send(controller.logout().await);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(controller.session().clone());
            }
            Command::AssignedIssues { reply } => {
                let _ = reply.send(controller.assigned_issues().await);
            }
            Command::TimeEntries { issue, reply } => {
                let _ = reply.send(controller.time_entries(&issue).await);
            }
        }
    }
    debug!("session task stopped");
}

async fn apply_batch<C: Connector>(controller: &mut SessionController<C>, batch: Vec<Pending>) {
    let mut applied = Vec::with_capacity(batch.len());
    for (mutation, reply) in batch {
        let mut report = CommitReport::default();
        match controller.apply(mutation, &mut report).await {
            Ok(()) => applied.push((report, reply)),
            Err(e) => {
                let _ = reply.send(Err(e));
            }
        }
    }
    if applied.is_empty() {
        return;
    }

    let committed = controller.commit().await;
    debug!(mutations = applied.len(), "committed batch");
    for (mut report, reply) in applied {
        report.absorb(committed.clone());
        let _ = reply.send(Ok(report));
    }
}
