use std::io::{self, BufReader};
use std::process::ExitCode;

use colored::Colorize;
use tracing::{error, info, warn};

use linecase::cli;
use linecase::config::{self, Config};
use linecase::error::{FileAccessError, StartupError};
use linecase::input::SignalAwareInput;
use linecase::interpreter::Interpreter;
use linecase::logger;
use linecase::registry::ResourceRegistry;
use linecase::signals;
use linecase::termination::{TerminationController, Trigger};

fn main() -> ExitCode {
    let mut controller = TerminationController::new(ResourceRegistry::new(), io::stdout());

    let trigger = match run_session(&mut controller) {
        Ok(trigger) => trigger,
        Err(e) => {
            report_startup_error(&e);
            Trigger::StartupFailure
        }
    };

    controller.terminate(trigger).into()
}

/// Everything between argument parsing and the end of the command loop.
///
/// Startup failures come back as errors; once the loop runs, the result is
/// always the trigger that ended it.
fn run_session(controller: &mut TerminationController<io::Stdout>) -> Result<Trigger, StartupError> {
    let args = cli::parse_args()?;

    let config = match config::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}; using defaults", "warning:".yellow().bold(), e);
            Config::default()
        }
    };

    match logger::init_debug_logging(args.debug || config.logging.debug) {
        Ok(Some(log_path)) => info!(log = %log_path.display(), "debug logging enabled"),
        Ok(None) => {}
        Err(e) => eprintln!(
            "{} {:#}; debug logging disabled",
            "warning:".yellow().bold(),
            e
        ),
    }

    let shutdown = signals::install().map_err(StartupError::Signals)?;

    let output = controller
        .registry_mut()
        .open_append(&args.target)
        .map_err(|e| FileAccessError::from_io(&args.target, e))?;

    if let Some(seconds) = args.timeout.or(config.session.alarm_seconds) {
        signals::arm_alarm(seconds);
    }

    info!(file = %args.target.display(), buffer_size = config.session.buffer_size, "session started");

    let input = BufReader::new(SignalAwareInput::new(io::stdin(), shutdown.wake_fd()));
    let mut interpreter = Interpreter::new(input, io::stdout(), output, shutdown)
        .with_buffer_size(config.session.buffer_size);

    match interpreter.run(controller.registry_mut()) {
        Ok(outcome) => {
            info!(
                trigger = ?outcome.trigger,
                executed = outcome.stats.executed,
                rejected = outcome.stats.rejected,
                write_failures = outcome.stats.write_failures,
                "command loop finished"
            );
            Ok(outcome.trigger)
        }
        Err(e) => {
            // Input is gone; shut down as if it had ended
            error!(error = %format!("{:#}", e), "command loop aborted");
            eprintln!("{} {:#}", "error:".red().bold(), e);
            Ok(Trigger::EndOfInput)
        }
    }
}

fn report_startup_error(err: &StartupError) {
    eprintln!("{} {}", "error:".red().bold(), err);
    if let StartupError::FileAccess(e) = err {
        warn!(path = %e.path().display(), "target file unusable");
        let hint = e.hint();
        if !hint.is_empty() {
            eprintln!("\n{}", hint);
        }
    }
}
