//! The engine task: owns the state machine and interprets programs.

use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use relayhub_domain::action_log::ActionLogEntry;
use relayhub_domain::id::ProgramId;
use relayhub_domain::program::{Program, WaitDuration};
use relayhub_domain::relay::{RelayBoard, RelayIndex, RelayState};
use relayhub_domain::time::now;

use super::cursor::{Cursor, Dispatch};
use super::event::{EngineEvent, EngineStatus};
use super::timer::ActiveTimer;
use super::StartOutcome;
use crate::ports::{ActionLog, Actuator, SweepReport};

/// Description reported while a wait step counts down.
pub(crate) const WAITING: &str = "waiting";

/// Messages accepted by the engine task.
pub(crate) enum Command {
    Start {
        program: Program,
        reply: oneshot::Sender<StartOutcome>,
    },
    Stop {
        reply: oneshot::Sender<SweepReport>,
    },
}

/// How a run left off after a suspension point.
enum Flow {
    Continue,
    /// Halted by a stop command; the sweep has already been issued.
    Cancelled,
    /// Every handle is gone; the sweep has already been issued.
    Shutdown,
}

pub(crate) struct Runner<A, L> {
    pub(crate) actuator: A,
    pub(crate) log: L,
    pub(crate) board: RelayBoard,
    pub(crate) tick_period: Duration,
    pub(crate) events: broadcast::Sender<EngineEvent>,
    pub(crate) status: watch::Sender<EngineStatus>,
}

impl<A, L> Runner<A, L>
where
    A: Actuator,
    L: ActionLog + Send + Sync,
{
    /// Serve commands until every handle has been dropped.
    pub(crate) async fn serve(self, mut commands: mpsc::Receiver<Command>) {
        tracing::debug!("program engine started");
        while let Some(command) = commands.recv().await {
            match command {
                Command::Start { program, reply } => {
                    if program.steps.is_empty() {
                        tracing::debug!(program_id = %program.id, "ignoring program without steps");
                        let _ = reply.send(StartOutcome::EmptyProgram);
                        continue;
                    }
                    if let Flow::Shutdown = self.execute(&program, reply, &mut commands).await {
                        break;
                    }
                }
                Command::Stop { reply } => {
                    let report = self.sweep().await;
                    let _ = reply.send(report);
                }
            }
        }
        tracing::debug!("program engine stopped");
    }

    /// Interpret `program` from its first step until it finishes, fails, or is stopped.
    async fn execute(
        &self,
        program: &Program,
        reply: oneshot::Sender<StartOutcome>,
        commands: &mut mpsc::Receiver<Command>,
    ) -> Flow {
        tracing::info!(program_id = %program.id, program_name = %program.name, "program run started");
        let mut reply = Some(reply);
        let mut cursor = Cursor::new(&program.steps);

        loop {
            let dispatch = cursor.resolve();
            if let Some(dispatch) = dispatch {
                let description = self.describe(dispatch);
                self.set_status(EngineStatus::Running {
                    program_id: program.id.clone(),
                    current_action: description.clone(),
                });
                self.emit(EngineEvent::StepAdvanced { description });
            }
            if let Some(reply) = reply.take() {
                let _ = reply.send(StartOutcome::Started);
            }
            let Some(dispatch) = dispatch else {
                self.set_status(EngineStatus::Idle);
                self.emit(EngineEvent::Finished);
                tracing::info!(program_id = %program.id, "program run finished");
                return Flow::Continue;
            };

            let flow = match dispatch {
                Dispatch::Relay {
                    step,
                    relay,
                    action,
                } => match self.relay(relay, action, commands).await {
                    Ok(flow) => flow,
                    Err(reason) => {
                        tracing::error!(
                            program_id = %program.id,
                            step_id = %step.id,
                            %reason,
                            "actuator failure, aborting program run"
                        );
                        self.set_status(EngineStatus::Idle);
                        self.emit(EngineEvent::Error { reason });
                        return Flow::Continue;
                    }
                },
                Dispatch::Wait { step, duration } => {
                    let seconds = draw_seconds(duration);
                    tracing::debug!(step_id = %step.id, seconds, "waiting");
                    self.wait(&program.id, seconds, commands).await
                }
            };
            let flow = match flow {
                Flow::Continue => self.between_steps(commands).await,
                flow => flow,
            };

            match flow {
                Flow::Continue => cursor.advance(),
                Flow::Cancelled | Flow::Shutdown => {
                    tracing::info!(program_id = %program.id, "program run cancelled");
                    return flow;
                }
            }
        }
    }

    /// Let other tasks run, then act on commands queued since the last
    /// suspension point.
    ///
    /// Zero-second waits complete without awaiting anything; this is the
    /// only suspension point a run of them has.
    async fn between_steps(&self, commands: &mut mpsc::Receiver<Command>) -> Flow {
        tokio::task::yield_now().await;
        let stop = loop {
            match commands.try_recv() {
                Ok(Command::Start { reply, .. }) => {
                    let _ = reply.send(StartOutcome::AlreadyRunning);
                }
                Ok(Command::Stop { reply }) => break Some(reply),
                Err(TryRecvError::Disconnected) => break None,
                Err(TryRecvError::Empty) => return Flow::Continue,
            }
        };
        self.cancel();
        self.finish_stop(stop).await
    }

    /// Drive one output, keeping the command channel serviced while the
    /// controller answers.
    ///
    /// `Err` carries the failure reason.
    async fn relay(
        &self,
        relay: RelayIndex,
        state: RelayState,
        commands: &mut mpsc::Receiver<Command>,
    ) -> Result<Flow, String> {
        let call = self.actuator.set_relay(relay, state);
        tokio::pin!(call);

        let stop = loop {
            tokio::select! {
                result = &mut call => {
                    result.map_err(|err| err.to_string())?;
                    self.record(relay, state).await;
                    return Ok(Flow::Continue);
                }
                command = commands.recv() => match command {
                    Some(Command::Start { reply, .. }) => {
                        let _ = reply.send(StartOutcome::AlreadyRunning);
                    }
                    Some(Command::Stop { reply }) => break Some(reply),
                    None => break None,
                },
            }
        };

        self.cancel();
        // The in-flight command must resolve before the sweep so the off
        // commands reach the board after it. Its result is ignored.
        if let Err(err) = call.await {
            tracing::debug!(%relay, %err, "in-flight command failed after cancellation");
        }
        Ok(self.finish_stop(stop).await)
    }

    /// Count down `seconds`, one tick per timer period.
    async fn wait(
        &self,
        program_id: &ProgramId,
        seconds: u64,
        commands: &mut mpsc::Receiver<Command>,
    ) -> Flow {
        if seconds == 0 {
            return Flow::Continue;
        }

        let mut remaining = seconds;
        self.set_status(EngineStatus::Waiting {
            program_id: program_id.clone(),
            current_action: WAITING.to_string(),
            remaining_secs: remaining,
        });
        let mut timer = ActiveTimer::start(self.tick_period);

        let stop = loop {
            tokio::select! {
                () = timer.tick() => {
                    remaining -= 1;
                    if remaining == 0 {
                        timer.cancel();
                        self.emit(EngineEvent::Tick { remaining });
                        return Flow::Continue;
                    }
                    self.status.send_modify(|status| {
                        if let EngineStatus::Waiting { remaining_secs, .. } = status {
                            *remaining_secs = remaining;
                        }
                    });
                    self.emit(EngineEvent::Tick { remaining });
                }
                command = commands.recv() => match command {
                    Some(Command::Start { reply, .. }) => {
                        let _ = reply.send(StartOutcome::AlreadyRunning);
                    }
                    Some(Command::Stop { reply }) => break Some(reply),
                    None => break None,
                },
            }
        };

        timer.cancel();
        debug_assert!(!timer.is_active());
        self.cancel();
        self.finish_stop(stop).await
    }

    /// Abandon the run: the engine is idle from here on.
    fn cancel(&self) {
        self.set_status(EngineStatus::Idle);
        self.emit(EngineEvent::Cancelled);
    }

    /// Issue the all-off sweep after a cancellation and answer the stop request.
    async fn finish_stop(&self, stop: Option<oneshot::Sender<SweepReport>>) -> Flow {
        let report = self.sweep().await;
        match stop {
            Some(reply) => {
                let _ = reply.send(report);
                Flow::Cancelled
            }
            None => Flow::Shutdown,
        }
    }

    /// Switch every output off. Failures are logged and reported, never fatal.
    async fn sweep(&self) -> SweepReport {
        let report = self.actuator.set_all_off().await;
        for (relay, err) in &report.failures {
            tracing::warn!(%relay, %err, "emergency stop could not switch relay off");
        }
        if report.is_clean() {
            tracing::info!("all relays switched off");
        }
        report
    }

    async fn record(&self, relay: RelayIndex, state: RelayState) {
        let entry = ActionLogEntry::new(relay, state, now());
        if let Err(err) = self.log.append(entry).await {
            tracing::warn!(%relay, %state, %err, "failed to append to action log");
        }
    }

    fn describe(&self, dispatch: Dispatch<'_>) -> String {
        match dispatch {
            Dispatch::Relay { relay, action, .. } => self.board.describe(relay, action),
            Dispatch::Wait { .. } => WAITING.to_string(),
        }
    }

    fn set_status(&self, status: EngineStatus) {
        self.status.send_replace(status);
    }

    fn emit(&self, event: EngineEvent) {
        // Sending fails only when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

/// Number of seconds a wait step lasts; random waits are drawn once, here.
fn draw_seconds(duration: WaitDuration) -> u64 {
    match duration {
        WaitDuration::Fixed { seconds } => seconds,
        WaitDuration::Random { min, max } if min < max => {
            rand::thread_rng().gen_range(min..=max)
        }
        WaitDuration::Random { min, .. } => min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_use_literal_fixed_duration() {
        assert_eq!(draw_seconds(WaitDuration::Fixed { seconds: 12 }), 12);
    }

    #[test]
    fn should_draw_random_duration_within_bounds() {
        for _ in 0..200 {
            let secs = draw_seconds(WaitDuration::Random { min: 3, max: 6 });
            assert!((3..=6).contains(&secs));
        }
    }

    #[test]
    fn should_use_single_value_of_degenerate_range() {
        assert_eq!(draw_seconds(WaitDuration::Random { min: 5, max: 5 }), 5);
    }
}
