use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use clap::error::ErrorKind;

use crate::error::ArgumentError;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "

License: MIT
Rust Edition: 2024"
);

#[derive(Parser)]
#[command(name = "linecase")]
#[command(about = "Interactive case-transform interpreter that appends results to a file")]
#[command(long_about = "linecase reads commands from standard input, one per line, and
writes each result to standard output and to the end of FILE.

COMMANDS:
  toupper N TOKEN_1 ... TOKEN_N    Join the tokens and upper-case them
  tolower N TOKEN_1 ... TOKEN_N    Join the tokens and lower-case them

Malformed commands print 'Not Supported'. Blank lines are ignored.

SHUTDOWN:
  End of input (Ctrl-D), SIGINT (Ctrl-C) and SIGALRM all close FILE and
  free every buffer before exiting. Use --timeout to end the session
  automatically.

EXAMPLES:
  linecase notes.txt
  echo 'toupper 3 foo bar baz' | linecase notes.txt
  linecase --timeout 60 notes.txt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = LONG_VERSION)]
struct Cli {
    /// Existing, writable file that receives every result line
    #[arg(value_name = "FILE")]
    targets: Vec<PathBuf>,

    /// End the session with SIGALRM after this many seconds
    #[arg(short = 't', long, value_name = "SECONDS")]
    timeout: Option<u32>,

    /// Use a different configuration file
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write a debug log to ~/.linecase/linecase.log
    #[arg(short = 'd', long)]
    debug: bool,
}

/// Validated command-line arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub target: PathBuf,
    pub timeout: Option<u32>,
    pub config: Option<PathBuf>,
    pub debug: bool,
}

/// Parse the process arguments
pub fn parse_args() -> Result<Args, ArgumentError> {
    parse_args_from(std::env::args_os())
}

/// Parse `argv`, first element being the program name.
///
/// `--help` and `--version` print and exit right here; every other clap error
/// becomes an [`ArgumentError`].
pub fn parse_args_from<I, T>(argv: I) -> Result<Args, ArgumentError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
    let program = argv
        .first()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "linecase".to_string());

    let cli = match Cli::try_parse_from(&argv) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let rendered = e.render().to_string();
            let message = rendered.trim().trim_start_matches("error: ").to_string();
            return Err(ArgumentError::Invalid(message));
        }
    };

    let provided = cli.targets.len();
    let mut targets = cli.targets.into_iter();
    match (targets.next(), targets.next()) {
        (Some(target), None) => Ok(Args {
            target,
            timeout: cli.timeout,
            config: cli.config,
            debug: cli.debug,
        }),
        _ => Err(ArgumentError::Count { program, provided }),
    }
}
