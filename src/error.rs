//! Error taxonomy for linecase
//!
//! Fatal startup errors abort before the command loop starts and route through
//! the termination controller's failure path. Command parse errors are
//! recoverable and never leave the interpreter.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Unusable command line at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    /// Anything but exactly one target file
    Count { program: String, provided: usize },
    /// An option clap could not parse; holds clap's own message
    Invalid(String),
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentError::Count { program, provided } => write!(
                f,
                "{} requires exactly 1 argument ({} provided)",
                program, provided
            ),
            ArgumentError::Invalid(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for ArgumentError {}

/// The target file cannot be used for appending
#[derive(Debug)]
pub enum FileAccessError {
    /// The file does not exist (it is never created)
    Missing { path: PathBuf },
    /// The file exists but the process lacks write permission
    NotWritable { path: PathBuf },
    /// Any other failure while opening the file
    Other { path: PathBuf, source: io::Error },
}

impl FileAccessError {
    /// Classify an open failure for `path`
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::NotFound => FileAccessError::Missing { path },
            io::ErrorKind::PermissionDenied => FileAccessError::NotWritable { path },
            _ => FileAccessError::Other { path, source: err },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            FileAccessError::Missing { path }
            | FileAccessError::NotWritable { path }
            | FileAccessError::Other { path, .. } => path,
        }
    }

    /// Actionable hint printed under the diagnostic
    pub fn hint(&self) -> String {
        match self {
            FileAccessError::Missing { path } => format!(
                "Possible fixes:\n\
                 1. Check the file path is correct\n\
                 2. Create the file first: touch '{}'",
                path.display()
            ),
            FileAccessError::NotWritable { path } => format!(
                "Possible fixes:\n\
                 1. Check file permissions: ls -l '{}'\n\
                 2. Grant write access: chmod u+w '{}'",
                path.display(),
                path.display()
            ),
            FileAccessError::Other { .. } => String::new(),
        }
    }
}

impl fmt::Display for FileAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileAccessError::Missing { path } => {
                write!(f, "Invalid file '{}': file does not exist", path.display())
            }
            FileAccessError::NotWritable { path } => {
                write!(f, "Invalid file '{}': permission denied", path.display())
            }
            FileAccessError::Other { path, source } => {
                write!(f, "Invalid file '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for FileAccessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileAccessError::Other { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A malformed command line. Reported as `Not Supported`, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    /// First token is missing or not a known transform
    UnknownTransform(String),
    /// Repeat count is missing, not base-10, or below 1
    InvalidCount(String),
    /// Fewer tokens than the repeat count announced
    MissingTokens { expected: usize, found: usize },
}

impl fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandParseError::UnknownTransform(name) => {
                write!(f, "unknown transform '{}'", name)
            }
            CommandParseError::InvalidCount(count) => {
                write!(f, "invalid repeat count '{}'", count)
            }
            CommandParseError::MissingTokens { expected, found } => {
                write!(f, "expected {} tokens, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for CommandParseError {}

/// Any condition that ends the process before the command loop starts
#[derive(Debug)]
pub enum StartupError {
    Arguments(ArgumentError),
    FileAccess(FileAccessError),
    Signals(io::Error),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Arguments(e) => e.fmt(f),
            StartupError::FileAccess(e) => e.fmt(f),
            StartupError::Signals(e) => write!(f, "failed to install signal handlers: {}", e),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::Arguments(e) => Some(e),
            StartupError::FileAccess(e) => Some(e),
            StartupError::Signals(e) => Some(e),
        }
    }
}

impl From<ArgumentError> for StartupError {
    fn from(err: ArgumentError) -> Self {
        StartupError::Arguments(err)
    }
}

impl From<FileAccessError> for StartupError {
    fn from(err: FileAccessError) -> Self {
        StartupError::FileAccess(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_argument_error_message() {
        let err = ArgumentError::Count {
            program: "linecase".to_string(),
            provided: 3,
        };
        assert_eq!(
            err.to_string(),
            "linecase requires exactly 1 argument (3 provided)"
        );
    }

    #[test]
    fn test_file_access_classification() {
        let path = Path::new("/tmp/target.txt");

        let missing = FileAccessError::from_io(path, io::Error::new(ErrorKind::NotFound, "nf"));
        assert!(matches!(missing, FileAccessError::Missing { .. }));
        assert!(missing.hint().contains("touch"));

        let denied =
            FileAccessError::from_io(path, io::Error::new(ErrorKind::PermissionDenied, "pd"));
        assert!(matches!(denied, FileAccessError::NotWritable { .. }));
        assert!(denied.to_string().contains("permission denied"));
        assert_eq!(denied.path(), path);

        let other = FileAccessError::from_io(path, io::Error::other("disk on fire"));
        assert!(matches!(other, FileAccessError::Other { .. }));
        assert!(other.hint().is_empty());
    }

    #[test]
    fn test_parse_error_messages() {
        let err = CommandParseError::MissingTokens {
            expected: 3,
            found: 1,
        };
        assert_eq!(err.to_string(), "expected 3 tokens, found 1");
        assert_eq!(
            CommandParseError::UnknownTransform("foo".into()).to_string(),
            "unknown transform 'foo'"
        );
    }
}
