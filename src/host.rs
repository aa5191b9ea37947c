//! Terminal host for remote editing sessions.
//!
//! Stands in for an editor plugin: it opens the session, runs an external
//! editor on the local copy, and translates what happens on disk into
//! session events.
//!
//! - a `notify` watcher on the session's temp directory reports writes
//! - a thread waits for the editor process to exit
//! - both feed one channel; this thread is the only one touching the
//!   controller, so events are handled strictly one at a time
//!
//! A `Saved` event is emitted whenever the file's content digest differs from
//! what was last pushed, including once more when the editor exits.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{Context, Result, bail};
use colored::Colorize;
use crossbeam_channel::{Receiver, Sender};
use notify::{EventKind, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};

use crate::remote::Transfer;
use crate::remote::interactive::{InteractiveError, confirm_action};
use crate::session::{Disposition, EditorEvent, OpenRequest, SessionController, ViewId};

/// Editor used when neither `VISUAL` nor `EDITOR` is set.
pub const DEFAULT_EDITOR: &str = "vi";

/// An editor invocation, e.g. `code --wait` or `vim`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    program: String,
    args: Vec<String>,
}

impl EditorCommand {
    /// Parse a shell-style command line.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut words = shell_words::split(spec)
            .with_context(|| format!("invalid editor command: {spec}"))?
            .into_iter();
        let Some(program) = words.next() else {
            bail!("editor command is empty");
        };
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    /// `VISUAL`, then `EDITOR`, then [`DEFAULT_EDITOR`].
    pub fn from_env() -> Result<Self> {
        let spec = ["VISUAL", "EDITOR"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
        Self::parse(&spec)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the editor for `file`.
    ///
    /// Lines are passed as `+N`, which most terminal editors read as a
    /// 1-based line to jump to. Line 0 means no positioning.
    pub fn args_for(&self, file: &Path, line: Option<u32>) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        if let Some(line) = line.filter(|l| *l > 0) {
            args.push(format!("+{line}").into());
        }
        args.push(file.as_os_str().to_owned());
        args
    }

    fn command(&self, file: &Path, line: Option<u32>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args_for(file, line));
        cmd
    }
}

/// Hex SHA-256 of a file's content.
pub fn file_digest(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[derive(Debug)]
enum HostEvent {
    Changed,
    WatchFailed(String),
    EditorExited(std::io::Result<ExitStatus>),
}

/// How an editing run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditSummary {
    /// Session closed and local copy removed.
    Closed { pushes: usize },
    /// Nothing was opened.
    Skipped(String),
    /// The last edits could not be pushed; the local copy was kept.
    Kept { local_path: PathBuf },
}

/// Open `request`, edit it with `editor`, push changes, then close.
pub fn edit_remote_file<T: Transfer>(
    controller: &mut SessionController<T>,
    request: OpenRequest,
    editor: &EditorCommand,
) -> Result<EditSummary> {
    let (view, local_path, line) = match controller.dispatch(EditorEvent::Open(request))? {
        Disposition::Opened {
            view,
            local_path,
            line,
            status,
            ..
        } => {
            if let Some(status) = status {
                eprintln!("{}", status.yellow());
            }
            (view, local_path, line)
        }
        Disposition::Skipped(status) => {
            eprintln!("{}", status.yellow());
            return Ok(EditSummary::Skipped(status));
        }
        other => bail!("unexpected result opening remote file: {other:?}"),
    };

    let mut sync = SyncState::new(view, &local_path)?;
    let run = run_editor(controller, &mut sync, &local_path, line, editor);

    if let Err(e) = &run {
        tracing::warn!(error = %e, "editor run failed");
    }

    if !sync.in_sync(&local_path)
        && !retry_pending_push(controller, &mut sync, &local_path, || {
            confirm_action("Upload failed. Retry?", true)
        })
    {
        eprintln!(
            "{} {}",
            "Unsaved remote changes kept at".red(),
            local_path.display()
        );
        run?;
        return Ok(EditSummary::Kept { local_path });
    }

    controller.dispatch(EditorEvent::Closed(view))?;
    run?;
    Ok(EditSummary::Closed {
        pushes: sync.pushes,
    })
}

struct SyncState {
    view: ViewId,
    last_pushed: String,
    pushes: usize,
}

impl SyncState {
    fn new(view: ViewId, local_path: &Path) -> Result<Self> {
        let last_pushed = file_digest(local_path)
            .with_context(|| format!("failed to read {}", local_path.display()))?;
        Ok(Self {
            view,
            last_pushed,
            pushes: 0,
        })
    }

    fn in_sync(&self, local_path: &Path) -> bool {
        file_digest(local_path).is_ok_and(|d| d == self.last_pushed)
    }

    /// Push if the content changed since the last successful push.
    ///
    /// Returns false only when a push was attempted and failed.
    fn push_if_changed<T: Transfer>(
        &mut self,
        controller: &mut SessionController<T>,
        local_path: &Path,
    ) -> bool {
        // Editors that save by rename can leave the path briefly missing.
        let Ok(digest) = file_digest(local_path) else {
            return true;
        };
        if digest == self.last_pushed {
            return true;
        }

        match controller.dispatch(EditorEvent::Saved(self.view)) {
            Ok(Disposition::Pushed(_)) => {
                self.last_pushed = digest;
                self.pushes += 1;
                tracing::info!(view = %self.view, "pushed local changes");
                true
            }
            Ok(other) => {
                tracing::debug!(view = %self.view, disposition = ?other, "save not pushed");
                true
            }
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                false
            }
        }
    }
}

fn run_editor<T: Transfer>(
    controller: &mut SessionController<T>,
    sync: &mut SyncState,
    local_path: &Path,
    line: Option<u32>,
    editor: &EditorCommand,
) -> Result<()> {
    let (tx, rx) = crossbeam_channel::unbounded();

    // Keep the watcher alive for the whole run; live sync is best effort.
    let _watcher = match watch_local_copy(local_path, tx.clone()) {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "file watching unavailable; pushing on editor exit only");
            None
        }
    };

    let mut child = editor
        .command(local_path, line)
        .spawn()
        .with_context(|| format!("failed to launch editor `{}`", editor.program()))?;
    tracing::debug!(editor = %editor.program(), file = %local_path.display(), "editor started");

    std::thread::spawn(move || {
        let _ = tx.send(HostEvent::EditorExited(child.wait()));
    });

    event_loop(controller, sync, local_path, &rx)
}

fn event_loop<T: Transfer>(
    controller: &mut SessionController<T>,
    sync: &mut SyncState,
    local_path: &Path,
    rx: &Receiver<HostEvent>,
) -> Result<()> {
    loop {
        match rx.recv() {
            Ok(HostEvent::Changed) => {
                sync.push_if_changed(controller, local_path);
            }
            Ok(HostEvent::WatchFailed(e)) => {
                tracing::warn!(error = %e, "file watcher error");
            }
            Ok(HostEvent::EditorExited(status)) => {
                let status = status.context("failed to wait for editor")?;
                if !status.success() {
                    tracing::warn!(status = ?status.code(), "editor exited with failure");
                }
                sync.push_if_changed(controller, local_path);
                return Ok(());
            }
            Err(_) => bail!("editor event channel closed unexpectedly"),
        }
    }
}

fn watch_local_copy(local_path: &Path, tx: Sender<HostEvent>) -> Result<notify::RecommendedWatcher> {
    let dir = local_path
        .parent()
        .context("local copy has no parent directory")?
        .to_path_buf();
    let file_name = local_path
        .file_name()
        .context("local copy has no file name")?
        .to_owned();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                let _ = tx.send(HostEvent::WatchFailed(e.to_string()));
                return;
            }
        };
        let touches_file = event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()));
        if touches_file && matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            let _ = tx.send(HostEvent::Changed);
        }
    })?;
    // Watch the directory: editors that save by rename replace the file inode.
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Offer to retry a failed final push until it succeeds or the user declines.
///
/// Gives up without asking once the local copy is gone: there is nothing left
/// to push.
fn retry_pending_push<T: Transfer>(
    controller: &mut SessionController<T>,
    sync: &mut SyncState,
    local_path: &Path,
    mut confirm: impl FnMut() -> Result<bool, InteractiveError>,
) -> bool {
    loop {
        if !local_path.is_file() {
            eprintln!(
                "{} {}",
                "Local copy disappeared before it could be uploaded:".red(),
                local_path.display()
            );
            return false;
        }
        match confirm() {
            Ok(true) => {
                if sync.push_if_changed(controller, local_path) && sync.in_sync(local_path) {
                    return true;
                }
            }
            Ok(false) => return false,
            Err(e) => {
                tracing::debug!(error = %e, "cannot prompt for retry");
                return false;
            }
        }
    }
}
