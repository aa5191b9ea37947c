//! Live sessions keyed by the editor view that owns them.

use std::collections::HashMap;

use super::{Session, ViewId};
use crate::remote::RemoteTarget;

/// Open sessions, one per editor view.
///
/// Lookups by target scan the live views rather than keeping a second index,
/// so the view map stays the single source of truth for what is open.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ViewId, Session>,
    next_view: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the view already editing `target`, if any.
    pub fn find(&self, target: &RemoteTarget) -> Option<(ViewId, &Session)> {
        self.sessions
            .iter()
            .find(|(_, session)| &session.target == target)
            .map(|(view, session)| (*view, session))
    }

    pub fn get(&self, view: ViewId) -> Option<&Session> {
        self.sessions.get(&view)
    }

    /// Attach `session` to a fresh view and return its id.
    pub fn register(&mut self, session: Session) -> ViewId {
        self.next_view += 1;
        let view = ViewId(self.next_view);
        tracing::debug!(view = %view, remote = %session.target, "registered session");
        self.sessions.insert(view, session);
        view
    }

    /// Detach and return the session owned by `view`.
    pub fn deregister(&mut self, view: ViewId) -> Option<Session> {
        let session = self.sessions.remove(&view);
        if let Some(session) = &session {
            tracing::debug!(view = %view, remote = %session.target, "deregistered session");
        }
        session
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
