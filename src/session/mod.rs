//! Remote editing sessions.
//!
//! A session ties a local working copy to the remote file it came from. The
//! lifecycle is driven by three events, all delivered through
//! [`SessionController::dispatch`]:
//!
//! ```text
//! Idle ──Open──> Resolving ──> Fetching ──> Open ──Saved──> Saving ──┐
//!                   │              │          ▲                     │
//!                   │              │          └─────────────────────┘
//!                   │              └──> (fatal / skipped: no session)
//!                   └──> (unknown alias)
//! Open ──Closed──> Closed (local copy and its directory removed)
//! ```
//!
//! Opening a target that already has a live session reuses it instead of
//! fetching again. The create-if-missing policy is fixed when the session is
//! created and reused for every save.

pub mod controller;
pub mod registry;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::remote::RemoteTarget;

pub use controller::SessionController;
pub use registry::SessionRegistry;

/// Opaque handle for the editor view that owns a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub(crate) u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// One open remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub target: RemoteTarget,
    /// Local working copy, named after the remote file.
    pub local_path: PathBuf,
    /// Unique temporary directory holding `local_path`.
    pub local_dir: PathBuf,
    pub create_if_missing: bool,
}

/// Request to open `path` (optionally suffixed with `:line`) on `alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub alias: String,
    pub path: String,
    /// Overrides the configured policy when set.
    pub create_if_missing: Option<bool>,
}

impl OpenRequest {
    pub fn new(alias: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            path: path.into(),
            create_if_missing: None,
        }
    }

    pub fn with_create_if_missing(mut self, create: Option<bool>) -> Self {
        self.create_if_missing = create;
        self
    }
}

/// Events the host editor reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    Open(OpenRequest),
    Saved(ViewId),
    Closed(ViewId),
}

/// What the host should do after an event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Show `local_path` in `view`, moving to `line` when given.
    Opened {
        view: ViewId,
        local_path: PathBuf,
        line: Option<u32>,
        /// An existing session was focused instead of fetching again.
        reused: bool,
        /// Non-blocking status to show, if any.
        status: Option<String>,
    },
    /// The remote file is missing and was not created; nothing was opened.
    Skipped(String),
    /// The local copy was pushed back to the remote host.
    Pushed(ViewId),
    /// The session ended and its local files were removed.
    Released(ViewId),
    /// The event concerned a view without a session.
    Ignored,
}

/// Errors surfaced to the user by the session lifecycle.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Could not find ssh config alias \"{0}\"")]
    UnknownAlias(String),

    #[error("{0}")]
    FatalTransfer(String),

    #[error("Local file error at {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }
}
