//! Program execution engine.
//!
//! The engine runs as its own task and owns the whole run state: the cursor,
//! the wait timer and the current status. Callers talk to it through a
//! cloneable [`EngineHandle`]: commands go in over a channel, events come out
//! on a broadcast channel, and the latest [`EngineStatus`] is always readable.
//!
//! At most one program runs at a time. Starting while a program runs is
//! refused with [`StartOutcome::AlreadyRunning`]. [`EngineHandle::stop`] is the
//! emergency stop: it cancels any run and always switches all four relays off.

mod cursor;
mod event;
mod runner;
mod timer;

pub use event::{EngineEvent, EngineState, EngineStatus};

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};

use relayhub_domain::error::RelayHubError;
use relayhub_domain::program::Program;
use relayhub_domain::relay::RelayBoard;

use crate::ports::{ActionLog, Actuator, SweepReport};
use runner::{Command, Runner};

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

const COMMAND_CAPACITY: usize = 16;

/// Answer to a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The program is now running.
    Started,
    /// Another program is running; it was left untouched.
    AlreadyRunning,
    /// The program has no steps; the engine stayed idle.
    EmptyProgram,
}

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Labels used to describe relay steps.
    pub board: RelayBoard,
    /// Interval between wait countdown ticks.
    pub tick_period: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            board: RelayBoard::default(),
            tick_period: Duration::from_secs(1),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Entry point for spawning the engine task.
pub struct ProgramEngine;

impl ProgramEngine {
    /// Spawn the engine on the current tokio runtime.
    ///
    /// The task runs until every [`EngineHandle`] has been dropped; a run in
    /// progress at that point is cancelled and all relays are switched off.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<A, L>(actuator: A, log: L, config: EngineConfig) -> EngineHandle
    where
        A: Actuator + 'static,
        L: ActionLog + Send + Sync + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (status_tx, status_rx) = watch::channel(EngineStatus::Idle);

        let runner = Runner {
            actuator,
            log,
            board: config.board,
            tick_period: config.tick_period,
            events: events.clone(),
            status: status_tx,
        };
        tokio::spawn(runner.serve(command_rx));

        EngineHandle {
            commands: command_tx,
            events,
            status: status_rx,
        }
    }
}

/// Cloneable handle to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<EngineEvent>,
    status: watch::Receiver<EngineStatus>,
}

impl EngineHandle {
    /// Ask the engine to run `program`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::EngineUnavailable`] if the engine task is gone.
    #[tracing::instrument(skip(self, program), fields(program_id = %program.id))]
    pub async fn start(&self, program: Program) -> Result<StartOutcome, RelayHubError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Start { program, reply })
            .await
            .map_err(|_| RelayHubError::EngineUnavailable)?;
        outcome.await.map_err(|_| RelayHubError::EngineUnavailable)
    }

    /// Emergency stop: cancel any run and switch every relay off.
    ///
    /// Resolves once the off commands have been answered. Failed off commands
    /// are listed in the report and do not make this call fail.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::EngineUnavailable`] if the engine task is gone.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self) -> Result<SweepReport, RelayHubError> {
        let (reply, report) = oneshot::channel();
        self.commands
            .send(Command::Stop { reply })
            .await
            .map_err(|_| RelayHubError::EngineUnavailable)?;
        report.await.map_err(|_| RelayHubError::EngineUnavailable)
    }

    /// Latest progress snapshot.
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.status.borrow().clone()
    }

    /// Coarse state of the latest snapshot, without its details.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.status.borrow().state()
    }

    /// Receiver for status changes.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<EngineStatus> {
        self.status.clone()
    }

    /// Subscribe to engine events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Engine events as a stream. Events missed by a lagging consumer are skipped.
    pub fn events(&self) -> impl Stream<Item = EngineEvent> + Send + Unpin + 'static {
        BroadcastStream::new(self.subscribe()).filter_map(|result| match result {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "engine event subscriber lagged, some events were dropped");
                None
            }
        })
    }
}
