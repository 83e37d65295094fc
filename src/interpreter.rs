//! Command loop
//!
//! Reads one line at a time into a tracked buffer, parses it, and writes the
//! transformed result to the console and the tracked output file. The loop
//! ends on end-of-input or as soon as a shutdown signal is observed.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{debug, warn};

use crate::command::CommandLine;
use crate::registry::{Handle, ResourceRegistry};
use crate::signals::ShutdownSignal;
use crate::termination::Trigger;

/// Initial size of the line buffer
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Printed for every command that fails to parse
pub const NOT_SUPPORTED: &str = "Not Supported";

/// Counters for one session. Blank lines touch none of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub executed: usize,
    pub rejected: usize,
    pub write_failures: usize,
}

/// How the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub trigger: Trigger,
    pub stats: SessionStats,
}

enum LineRead {
    /// A line of this many bytes, newline included, is in the buffer
    Line(usize),
    /// A read was cut short by a shutdown signal
    Interrupted,
    EndOfInput,
}

pub struct Interpreter<R, W> {
    input: R,
    console: W,
    output: Handle,
    shutdown: ShutdownSignal,
    buffer_size: usize,
    stats: SessionStats,
}

impl<R: BufRead, W: Write> Interpreter<R, W> {
    /// `output` must be a file handle tracked by the registry passed to
    /// [`run`](Self::run).
    pub fn new(input: R, console: W, output: Handle, shutdown: ShutdownSignal) -> Self {
        Self {
            input,
            console,
            output,
            shutdown,
            buffer_size: DEFAULT_BUFFER_SIZE,
            stats: SessionStats::default(),
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    /// Run until end-of-input or a shutdown signal.
    ///
    /// Returns an error only when standard input itself fails.
    pub fn run(&mut self, registry: &mut ResourceRegistry) -> Result<Outcome> {
        let mut line = registry.allocate(self.buffer_size);

        loop {
            if let Some(signal) = self.shutdown.pending() {
                debug!(signal = signal.name(), "shutdown requested, leaving command loop");
                return Ok(self.outcome(Trigger::Signal(signal)));
            }

            let len = match self.read_line(registry, &mut line)? {
                LineRead::Line(len) => len,
                LineRead::Interrupted => continue,
                LineRead::EndOfInput => return Ok(self.outcome(Trigger::EndOfInput)),
            };

            // A signal that arrived while the read was completing wins over the line
            if let Some(signal) = self.shutdown.pending() {
                debug!(signal = signal.name(), "shutdown requested, dropping unread line");
                return Ok(self.outcome(Trigger::Signal(signal)));
            }

            let bytes = &registry.block(line)?.as_slice()[..len];
            if bytes == b"\n" {
                continue;
            }
            let text = bytes.strip_suffix(b"\n").unwrap_or(bytes);
            if let Some(rendered) = self.render(text) {
                self.emit(registry, &rendered)?;
            }
        }
    }

    fn outcome(&self, trigger: Trigger) -> Outcome {
        Outcome {
            trigger,
            stats: self.stats,
        }
    }

    /// Read one line into the tracked buffer, growing it when needed
    fn read_line(&mut self, registry: &mut ResourceRegistry, line: &mut Handle) -> Result<LineRead> {
        let mut len = 0;
        loop {
            let available = match self.input.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    if self.shutdown.is_requested() {
                        return Ok(LineRead::Interrupted);
                    }
                    continue;
                }
                Err(e) => return Err(e).context("Failed to read from standard input"),
            };

            if available.is_empty() {
                return Ok(if len == 0 {
                    LineRead::EndOfInput
                } else {
                    LineRead::Line(len)
                });
            }

            let (take, complete) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };

            let capacity = registry.block(*line)?.len();
            if len + take > capacity {
                let grown = (len + take).max(capacity * 2);
                *line = registry.resize(*line, grown)?;
                debug!(capacity = grown, "grew line buffer");
            }
            registry.block_mut(*line)?.as_mut_slice()[len..len + take]
                .copy_from_slice(&available[..take]);
            len += take;
            self.input.consume(take);

            if complete {
                return Ok(LineRead::Line(len));
            }
        }
    }

    /// Parse and execute one line. `None` means it was rejected.
    fn render(&mut self, text: &[u8]) -> Option<Vec<u8>> {
        match CommandLine::parse(text) {
            Ok(command) => {
                debug!(
                    transform = command.transform.name(),
                    count = command.count(),
                    "executing command"
                );
                Some(command.execute())
            }
            Err(e) => {
                debug!(error = %e, line = %text.escape_ascii(), "rejected command");
                self.stats.rejected += 1;
                if let Err(e) = writeln!(self.console, "{}", NOT_SUPPORTED) {
                    warn!(error = %e, "failed to write to console");
                }
                None
            }
        }
    }

    /// Send one result line to the console and the output file
    fn emit(&mut self, registry: &mut ResourceRegistry, rendered: &[u8]) -> Result<()> {
        // Stage the line in a tracked block; it is freed once both sinks saw it
        let len = rendered.len() + 1;
        let staging = registry.allocate(len);
        {
            let block = registry.block_mut(staging)?.as_mut_slice();
            block[..rendered.len()].copy_from_slice(rendered);
            block[rendered.len()] = b'\n';
        }

        let console = self
            .console
            .write_all(&registry.block(staging)?.as_slice()[..len]);
        if let Err(e) = console {
            self.stats.write_failures += 1;
            warn!(error = %e, "failed to write to console");
        }

        if let Err(e) = registry.append_block(staging, len, self.output) {
            self.stats.write_failures += 1;
            let path = registry.file(self.output)?.path().display().to_string();
            warn!(error = %e, path = %path, "failed to append to output file");
            eprintln!(
                "{} failed to append to '{}': {}",
                "warning:".yellow().bold(),
                path,
                e
            );
        }

        registry.untrack(staging)?;
        self.stats.executed += 1;
        Ok(())
    }
}
