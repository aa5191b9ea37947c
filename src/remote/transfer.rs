//! Single-file transfers through the external `scp` executable.
//!
//! Each call is one attempt: the subprocess runs to completion, and its exit
//! status plus captured stderr are folded into a [`TransferOutcome`]. No
//! retries, no timeouts. A hung `scp` blocks the caller.
//!
//! # Classification
//!
//! A missing remote file is a normal branch, not an error. When the source is
//! remote, the destination is local, and the caller asked for missing files to
//! be created, the outcome is [`TransferOutcome::MissingSourceCreate`] and the
//! caller materialises an empty local file. Every other failure is fatal and
//! carries the raw stderr text so it can be shown to the user verbatim.
//!
//! # Example
//!
//! ```rust,ignore
//! use remote_edit::remote::transfer::{ScpTransfer, Transfer, TransferOutcome};
//!
//! let scp = ScpTransfer::detect()?;
//! match scp.transfer("dev@10.0.0.5:/etc/app.conf", "/tmp/x/app.conf", false) {
//!     TransferOutcome::Success => {}
//!     other => eprintln!("{other:?}"),
//! }
//! ```

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use thiserror::Error;

use super::target::is_remote_location;

const MISSING_FILE_MARKER: &str = "no such file or directory";
const RETRY_MARKER: &str = "please try again";

/// Errors locating the transfer executable.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("scp executable not found on PATH: {0}")]
    NotFound(#[from] which::Error),
}

/// Result of one transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The copy completed.
    Success,
    /// The copy failed; the message is the raw stderr (or a generic
    /// description when scp printed nothing).
    FatalError(String),
    /// The remote source does not exist and the local destination should be
    /// created empty.
    MissingSourceCreate,
    /// The remote source does not exist and nothing should be created.
    MissingSourceSkip,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success)
    }
}

impl std::fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::FatalError(msg) => write!(f, "fatal: {}", msg),
            Self::MissingSourceCreate => write!(f, "missing source (create)"),
            Self::MissingSourceSkip => write!(f, "missing source (skip)"),
        }
    }
}

/// One directional file copy between two scp locations.
///
/// Locations are opaque strings: a bare local path or `[user@]host:path`.
pub trait Transfer {
    fn transfer(&self, source: &str, destination: &str, create_if_missing: bool)
    -> TransferOutcome;
}

/// Decide what a finished transfer means.
///
/// `exit_code` is `None` when the process was terminated by a signal. Only
/// exit code 0 is success; every other status goes through the stderr
/// inspection below.
pub fn classify(
    exit_code: Option<i32>,
    stderr: &str,
    source: &str,
    destination: &str,
    create_if_missing: bool,
) -> TransferOutcome {
    if exit_code == Some(0) {
        return TransferOutcome::Success;
    }

    let message = stderr.trim_end();
    if message.trim().is_empty() {
        return TransferOutcome::FatalError(match exit_code {
            Some(code) => format!("scp exited with status {}", code),
            None => "scp was terminated by a signal".to_string(),
        });
    }

    let lowered = message.to_lowercase();
    if !lowered.contains(MISSING_FILE_MARKER)
        || lowered.contains(RETRY_MARKER)
        || !is_remote_location(source)
        || !create_if_missing
    {
        TransferOutcome::FatalError(message.to_string())
    } else if !is_remote_location(destination) {
        TransferOutcome::MissingSourceCreate
    } else {
        TransferOutcome::MissingSourceSkip
    }
}

/// [`Transfer`] backed by the system `scp` binary.
///
/// Invoked with an argument vector, never through a shell, so alias and path
/// contents cannot inject commands.
#[derive(Debug, Clone)]
pub struct ScpTransfer {
    program: PathBuf,
}

impl Default for ScpTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScpTransfer {
    /// Use `scp` as resolved by the OS at spawn time.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("scp"),
        }
    }

    /// Locate `scp` on `PATH` up front so a missing binary is reported once.
    pub fn detect() -> Result<Self, TransferError> {
        let program = which::which("scp")?;
        tracing::debug!(program = %program.display(), "found scp");
        Ok(Self { program })
    }

    /// Use a specific executable instead of `scp`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, source: &str, destination: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-o", "StrictHostKeychecking=no", "--", source, destination])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Transfer for ScpTransfer {
    fn transfer(
        &self,
        source: &str,
        destination: &str,
        create_if_missing: bool,
    ) -> TransferOutcome {
        let start = Instant::now();

        tracing::debug!(
            program = %self.program.display(),
            source = %source,
            destination = %destination,
            create_if_missing,
            "starting scp"
        );

        let output = match self.command(source, destination).output() {
            Ok(o) => o,
            Err(e) => {
                tracing::warn!(program = %self.program.display(), error = %e, "failed to spawn scp");
                return TransferOutcome::FatalError(format!("failed to execute scp: {}", e));
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let outcome = classify(
            output.status.code(),
            &stderr,
            source,
            destination,
            create_if_missing,
        );

        match &outcome {
            TransferOutcome::Success => {
                tracing::debug!(source = %source, destination = %destination, duration_ms, "scp completed");
            }
            TransferOutcome::FatalError(msg) => {
                tracing::warn!(
                    source = %source,
                    destination = %destination,
                    status = ?output.status.code(),
                    error = %msg,
                    "scp failed"
                );
            }
            missing => {
                tracing::info!(source = %source, outcome = %missing, "remote file missing");
            }
        }

        outcome
    }
}
