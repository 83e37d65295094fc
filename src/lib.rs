//! linecase: interactive case-transform interpreter
//!
//! This library exposes the interpreter's building blocks so they can be
//! exercised from integration and property-based tests. The main binary is at
//! src/main.rs.

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod input;
pub mod interpreter;
pub mod logger;
pub mod registry;
pub mod signals;
pub mod termination;

// Re-export commonly used types for convenience
pub use command::{CommandLine, Transform, join_tokens};
pub use error::{ArgumentError, CommandParseError, FileAccessError, StartupError};
pub use input::SignalAwareInput;
pub use interpreter::{Interpreter, Outcome, SessionStats};
pub use registry::{Handle, Release, ReleaseReport, ResourceKind, ResourceList, ResourceRegistry};
pub use signals::{ShutdownSignal, Signal};
pub use termination::{ExitStatus, TerminationController, TerminationState, Trigger};
