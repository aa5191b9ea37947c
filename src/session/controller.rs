//! Open/save/close orchestration for remote editing sessions.

use std::path::{Path, PathBuf};

use super::{Disposition, EditorEvent, OpenRequest, Session, SessionError, SessionRegistry, ViewId};
use crate::remote::{RemoteTarget, Settings, Transfer, TransferOutcome, split_line_suffix};

/// Prefix of every temporary directory holding a local working copy.
pub const TEMP_DIR_PREFIX: &str = "remote-edit-";

const STATUS_CREATED: &str = "Could not get file, so creating it";
const STATUS_SKIPPED: &str = "Could not get file, not creating it";

/// Drives sessions through their lifecycle.
///
/// All mutation goes through `&mut self`, so a save and a close for the same
/// session can never interleave. Hosts that receive events on several threads
/// must funnel them into one owner of the controller.
pub struct SessionController<T: Transfer> {
    settings: Settings,
    transfer: T,
    registry: SessionRegistry,
    temp_root: Option<PathBuf>,
}

impl<T: Transfer> SessionController<T> {
    pub fn new(settings: Settings, transfer: T) -> Self {
        Self {
            settings,
            transfer,
            registry: SessionRegistry::new(),
            temp_root: None,
        }
    }

    /// Create temporary directories under `root` instead of the system temp dir.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn transfer(&self) -> &T {
        &self.transfer
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn session(&self, view: ViewId) -> Option<&Session> {
        self.registry.get(view)
    }

    /// Single entry point for host events.
    pub fn dispatch(&mut self, event: EditorEvent) -> Result<Disposition, SessionError> {
        match event {
            EditorEvent::Open(request) => self.open(&request),
            EditorEvent::Saved(view) => self.save(view),
            EditorEvent::Closed(view) => self.close(view),
        }
    }

    /// Fetch the remote file into a fresh local copy, or focus the live
    /// session already editing it.
    pub fn open(&mut self, request: &OpenRequest) -> Result<Disposition, SessionError> {
        tracing::debug!(
            alias = %request.alias,
            path = %request.path,
            create_if_missing = ?request.create_if_missing,
            "open requested"
        );

        let (path, line) = split_line_suffix(&request.path);
        let descriptor = self
            .settings
            .alias(&request.alias)
            .ok_or_else(|| SessionError::UnknownAlias(request.alias.clone()))?;
        let create_if_missing = self
            .settings
            .create_if_missing_for(descriptor, request.create_if_missing);
        let target = descriptor.target(path);

        if let Some((view, session)) = self.registry.find(&target) {
            tracing::debug!(view = %view, remote = %target, "reusing open session");
            return Ok(Disposition::Opened {
                view,
                local_path: session.local_path.clone(),
                line,
                reused: true,
                status: None,
            });
        }

        let temp_dir = self.create_temp_dir()?;
        let local_path = temp_dir.path().join(target.file_name());

        let status = match self.fetch(&target, &local_path, create_if_missing) {
            TransferOutcome::Success => None,
            TransferOutcome::MissingSourceCreate => {
                std::fs::File::create(&local_path)
                    .map_err(|e| SessionError::local_io(&local_path, e))?;
                tracing::info!(remote = %target, local = %local_path.display(), "created empty local copy");
                Some(STATUS_CREATED.to_string())
            }
            TransferOutcome::MissingSourceSkip => {
                tracing::info!(remote = %target, "remote file missing, not creating it");
                return Ok(Disposition::Skipped(STATUS_SKIPPED.to_string()));
            }
            TransferOutcome::FatalError(message) => {
                return Err(SessionError::FatalTransfer(message));
            }
        };

        if !local_path.is_file() {
            return Err(SessionError::FatalTransfer(format!(
                "Transfer of {} completed but produced no local file",
                target
            )));
        }

        // Only now does the directory outlive this call.
        let local_dir = temp_dir.keep();

        tracing::debug!(remote = %target, temp = %local_path.display(), "opened");

        let view = self.registry.register(Session {
            target,
            local_path: local_path.clone(),
            local_dir,
            create_if_missing,
        });

        Ok(Disposition::Opened {
            view,
            local_path,
            line,
            reused: false,
            status,
        })
    }

    /// Push the local copy of `view` back to its remote file.
    pub fn save(&mut self, view: ViewId) -> Result<Disposition, SessionError> {
        let Some(session) = self.registry.get(view) else {
            tracing::debug!(view = %view, "save for view without session");
            return Ok(Disposition::Ignored);
        };

        tracing::debug!(view = %view, remote = %session.target, "saved");

        let source = session.local_path.to_string_lossy();
        let destination = session.target.scp_path();
        match self
            .transfer
            .transfer(&source, &destination, session.create_if_missing)
        {
            TransferOutcome::Success => Ok(Disposition::Pushed(view)),
            TransferOutcome::FatalError(message) => Err(SessionError::FatalTransfer(message)),
            other => {
                tracing::warn!(view = %view, outcome = %other, "unexpected outcome pushing local copy");
                Err(SessionError::FatalTransfer(format!(
                    "Could not save {}: {}",
                    destination, other
                )))
            }
        }
    }

    /// End the session of `view`, removing its local copy and then the
    /// directory that held it.
    pub fn close(&mut self, view: ViewId) -> Result<Disposition, SessionError> {
        let Some(session) = self.registry.deregister(view) else {
            tracing::debug!(view = %view, "close for view without session");
            return Ok(Disposition::Ignored);
        };

        tracing::debug!(view = %view, remote = %session.target, "closed");

        // The directory goes even when the file could not be removed; editors
        // may also have left backups or autosaves next to the copy.
        let file_result = std::fs::remove_file(&session.local_path)
            .map_err(|e| SessionError::local_io(&session.local_path, e));
        let dir_result = std::fs::remove_dir_all(&session.local_dir)
            .map_err(|e| SessionError::local_io(&session.local_dir, e));
        file_result?;
        dir_result?;

        tracing::debug!(dir = %session.local_dir.display(), "deleted local copy");
        Ok(Disposition::Released(view))
    }

    fn create_temp_dir(&self) -> Result<tempfile::TempDir, SessionError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_DIR_PREFIX);
        match &self.temp_root {
            Some(root) => builder
                .tempdir_in(root)
                .map_err(|e| SessionError::local_io(root, e)),
            None => builder
                .tempdir()
                .map_err(|e| SessionError::local_io(std::env::temp_dir(), e)),
        }
    }

    fn fetch(
        &self,
        target: &RemoteTarget,
        local_path: &Path,
        create_if_missing: bool,
    ) -> TransferOutcome {
        self.transfer.transfer(
            &target.scp_path(),
            &local_path.to_string_lossy(),
            create_if_missing,
        )
    }
}
