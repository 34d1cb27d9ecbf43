//! Subcommand handlers.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use relayhub_adapter_storage_sqlite_sqlx::{
    Config as StorageConfig, SqliteActionLog, SqliteProgramRepository,
};
use relayhub_app::engine::{EngineConfig, EngineEvent, EngineHandle, ProgramEngine, StartOutcome};
use relayhub_app::ports::{ActionLog, Actuator, SweepReport};
use relayhub_app::services::ProgramService;
use relayhub_domain::error::RelayHubError;
use relayhub_domain::program::Program;
use relayhub_domain::relay::{RelayBoard, RelayIndex};

use crate::actuator::Controller;
use crate::config::Config;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// How a followed run ended.
#[derive(Debug)]
pub enum RunEnd {
    Finished,
    Failed(String),
    /// Stopped from this process; carries the all-off sweep.
    Stopped(SweepReport),
    /// Cancelled by another holder of the engine handle.
    Cancelled,
}

/// Storage, relay controller and engine settings wired from the configuration.
pub struct App {
    programs: ProgramService<SqliteProgramRepository>,
    log: SqliteActionLog,
    controller: Arc<Controller>,
    engine: EngineConfig,
}

impl App {
    /// Open the database (running migrations) and build the relay controller.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the controller
    /// cannot be built.
    pub async fn connect(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let db = StorageConfig {
            database_url: config.database_url().to_string(),
        }
        .build()
        .await?;
        let pool = db.pool().clone();

        Ok(Self {
            programs: ProgramService::new(SqliteProgramRepository::new(pool.clone())),
            log: SqliteActionLog::new(pool),
            controller: Arc::new(Controller::from_config(config)?),
            engine: config.engine_config(),
        })
    }

    fn board(&self) -> &RelayBoard {
        &self.engine.board
    }

    fn spawn_engine(&self) -> EngineHandle {
        ProgramEngine::spawn(
            Arc::clone(&self.controller),
            self.log.clone(),
            self.engine.clone(),
        )
    }

    pub async fn import(&self, file: &Path) -> CommandResult {
        let json = tokio::fs::read_to_string(file).await?;
        let program = self.programs.import_json(&json).await?;
        println!("imported {}", summary(&program));
        Ok(())
    }

    pub async fn export(&self, key: &str) -> CommandResult {
        let program = self.programs.resolve(key).await?;
        println!("{}", program.to_json_pretty());
        Ok(())
    }

    pub async fn list(&self) -> CommandResult {
        let programs = self.programs.list_programs().await?;
        if programs.is_empty() {
            println!("no programs");
        }
        for program in &programs {
            let status = if program.enabled { "enabled" } else { "disabled" };
            println!("{:<36}  {status:<8}  {}", program.id, program.name);
        }
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> CommandResult {
        let program = self.programs.resolve(key).await?;
        self.programs.delete_program(&program.id).await?;
        println!("deleted {}", summary(&program));
        Ok(())
    }

    /// Run a program in the foreground; Ctrl-C triggers the emergency stop.
    pub async fn run(&self, key: &str) -> CommandResult {
        let program = self.programs.runnable_program(key).await?;
        let engine = self.spawn_engine();
        let mut events = engine.subscribe();

        println!("running {}", summary(&program));
        match engine.start(program).await? {
            StartOutcome::Started => {}
            StartOutcome::EmptyProgram => {
                println!("program has no steps");
                return Ok(());
            }
            StartOutcome::AlreadyRunning => {
                return Err("engine is already running a program".into());
            }
        }

        match follow(&engine, &mut events, interrupted()).await? {
            RunEnd::Finished | RunEnd::Cancelled => Ok(()),
            RunEnd::Failed(reason) => Err(reason.into()),
            RunEnd::Stopped(report) => report_sweep(self.board(), &report),
        }
    }

    pub async fn history(&self, limit: usize) -> CommandResult {
        let entries = self.log.recent(limit).await?;
        if entries.is_empty() {
            println!("no relay activity recorded");
        }
        for entry in entries {
            println!(
                "{}  {} ({})",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                self.board().describe(entry.relay, entry.action),
                entry.action
            );
        }
        Ok(())
    }

    /// Switch every relay off through the engine's emergency stop.
    pub async fn stop(&self) -> CommandResult {
        let report = self.spawn_engine().stop().await?;
        report_sweep(self.board(), &report)
    }

    pub async fn state(&self) -> CommandResult {
        let states = self.controller.read_state().await?;
        for relay in RelayIndex::ALL {
            let config = self.board().relay(relay);
            let note = if config.enabled { "" } else { "  (disabled)" };
            println!("{relay}  {:<20}  {}{note}", config.name, states[relay.as_usize()]);
        }
        Ok(())
    }
}

fn summary(program: &Program) -> String {
    let (min, max) = program.duration_bounds();
    let waiting = if min == max {
        format!("{min}s")
    } else {
        format!("{min}s to {max}s")
    };
    format!(
        "{} \"{}\" ({} dispatches, {waiting} of waiting)",
        program.id,
        program.name,
        program.dispatch_count()
    )
}

fn report_sweep(board: &RelayBoard, report: &SweepReport) -> CommandResult {
    if report.is_clean() {
        println!("all relays off");
        return Ok(());
    }
    for (relay, err) in &report.failures {
        eprintln!("{} did not switch off: {err}", board.relay(*relay).name);
    }
    Err(format!(
        "{} of {} relays did not acknowledge the off command",
        report.failures.len(),
        report.attempted.len()
    )
    .into())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Print engine events until the run ends, stopping the engine if
/// `interrupt` resolves first.
async fn follow(
    engine: &EngineHandle,
    events: &mut broadcast::Receiver<EngineEvent>,
    interrupt: impl Future<Output = ()>,
) -> Result<RunEnd, RelayHubError> {
    tokio::pin!(interrupt);
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    print_event(&event);
                    match event {
                        EngineEvent::Finished => return Ok(RunEnd::Finished),
                        EngineEvent::Error { reason } => return Ok(RunEnd::Failed(reason)),
                        EngineEvent::Cancelled => return Ok(RunEnd::Cancelled),
                        EngineEvent::StepAdvanced { .. } | EngineEvent::Tick { .. } => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "missed engine events");
                }
                Err(RecvError::Closed) => return Err(RelayHubError::EngineUnavailable),
            },
            () = &mut interrupt => {
                tracing::warn!("interrupted, stopping program");
                return engine.stop().await.map(RunEnd::Stopped);
            }
        }
    }
}

fn print_event(event: &EngineEvent) {
    match event {
        EngineEvent::StepAdvanced { description } => println!("> {description}"),
        EngineEvent::Tick { remaining } => println!("  {remaining}s"),
        EngineEvent::Finished => println!("finished"),
        EngineEvent::Error { reason } => eprintln!("error: {reason}"),
        EngineEvent::Cancelled => println!("cancelled"),
    }
}
