//! Termination controller
//!
//! Owns the resource registry and the shutdown state machine. Every way the
//! process can end goes through [`TerminationController::terminate`], which
//! releases files, then memory, exactly once and picks the exit status.

use std::io::Write;
use std::process::ExitCode;

use tracing::{info, warn};

use crate::registry::{ReleaseReport, ResourceKind, ResourceRegistry};
use crate::signals::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationState {
    Running,
    Terminating,
    Exited,
}

/// Why the process is shutting down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    EndOfInput,
    Signal(Signal),
    /// Bad arguments or unusable target file
    StartupFailure,
}

impl Trigger {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Trigger::StartupFailure => ExitStatus::Failure,
            Trigger::EndOfInput | Trigger::Signal(_) => ExitStatus::Success,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::SUCCESS,
            ExitStatus::Failure => ExitCode::FAILURE,
        }
    }
}

pub struct TerminationController<W: Write> {
    state: TerminationState,
    status: Option<ExitStatus>,
    registry: ResourceRegistry,
    console: W,
}

impl<W: Write> TerminationController<W> {
    pub fn new(registry: ResourceRegistry, console: W) -> Self {
        Self {
            state: TerminationState::Running,
            status: None,
            registry,
            console,
        }
    }

    pub fn state(&self) -> TerminationState {
        self.state
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.registry
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    /// Release everything and decide the exit status.
    ///
    /// Only the first call does any work; later calls return the status the
    /// first one settled on.
    pub fn terminate(&mut self, trigger: Trigger) -> ExitStatus {
        if self.state != TerminationState::Running {
            info!(?trigger, state = ?self.state, "termination already under way, ignoring");
            return self.status.unwrap_or(ExitStatus::Success);
        }
        self.state = TerminationState::Terminating;
        let status = trigger.exit_status();
        self.status = Some(status);
        info!(?trigger, ?status, "terminating");

        self.say("Terminating...");

        // Files first so buffered appends reach disk before exit
        let files = self.registry.release_all(ResourceKind::File);
        self.say(&format!("Closing files... {}.", outcome(&files)));

        let memory = self.registry.release_all(ResourceKind::Memory);
        self.say(&format!("Freeing memory... {}.", outcome(&memory)));

        self.say("Terminated");

        self.state = TerminationState::Exited;
        info!(
            files_closed = files.released,
            blocks_freed = memory.released,
            failures = files.failed + memory.failed,
            "terminated"
        );
        status
    }

    /// Transcript lines are best-effort: a closed stdout must not stop cleanup
    fn say(&mut self, line: &str) {
        if let Err(e) = writeln!(self.console, "{}", line).and_then(|_| self.console.flush()) {
            warn!(error = %e, "failed to write shutdown transcript");
        }
    }
}

fn outcome(report: &ReleaseReport) -> &'static str {
    if report.is_clean() { "Done" } else { "Error" }
}
