//! Remote file identity and `path:line` parsing.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A file on a remote host, addressed the way scp addresses it.
///
/// Identity is the composed `[user@]address:path` string, so two targets
/// reached through different aliases compare equal when they name the same
/// host, user and path.
#[derive(Debug, Clone)]
pub struct RemoteTarget {
    address: String,
    username: Option<String>,
    remote_path: String,
}

impl RemoteTarget {
    pub fn new(
        address: impl Into<String>,
        username: Option<String>,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.filter(|u| !u.is_empty()),
            remote_path: remote_path.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    /// `user@address:path`, or `address:path` without a username.
    pub fn scp_path(&self) -> String {
        match &self.username {
            Some(user) => format!("{}@{}:{}", user, self.address, self.remote_path),
            None => format!("{}:{}", self.address, self.remote_path),
        }
    }

    /// File name used for the local working copy.
    ///
    /// Falls back to `remote-file` for paths without a final component
    /// (`/`, `~`, empty).
    pub fn file_name(&self) -> String {
        self.remote_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty() && *name != "~" && *name != "." && *name != "..")
            .unwrap_or("remote-file")
            .to_string()
    }
}

impl PartialEq for RemoteTarget {
    fn eq(&self, other: &Self) -> bool {
        self.scp_path() == other.scp_path()
    }
}

impl Eq for RemoteTarget {}

impl Hash for RemoteTarget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scp_path().hash(state);
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scp_path())
    }
}

/// Split an optional trailing `:<line>` off a user-supplied remote path.
///
/// Only a purely numeric suffix after the last colon counts as a line
/// number. Anything else (`:abc`, a trailing bare `:`) stays part of the path.
/// A numeric suffix too large for a line number is still removed from the
/// path, but carries no line.
pub fn split_line_suffix(input: &str) -> (&str, Option<u32>) {
    match input.rsplit_once(':') {
        Some((path, suffix)) if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) => {
            (path, suffix.parse::<u32>().ok())
        }
        _ => (input, None),
    }
}

/// Whether an scp location string names a remote host rather than a local path.
///
/// Mirrors how the transfer classification tells the two apart: only
/// `user@host:path` locations count as remote.
pub fn is_remote_location(location: &str) -> bool {
    location.contains('@')
}
