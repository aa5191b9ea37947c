//! Remote hosts and file transfers.
//!
//! # Architecture
//!
//! - **config**: settings layers, alias resolution into connection descriptors
//! - **target**: remote file identity (`[user@]host:path`) and `path:line` parsing
//! - **transfer**: one-shot `scp` copies and classification of their outcome
//! - **interactive**: terminal prompts for picking an alias and a path
//!
//! # Configuration
//!
//! Aliases are configured in `~/.config/remote-edit/settings.toml`, and can be
//! replaced per project by `.remote-edit.toml` in the working directory:
//!
//! ```toml
//! create_if_missing = false
//!
//! [ssh_configs.prod]
//! address = "10.0.0.5"
//! username = "dev"
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use remote_edit::remote::{ConfigPaths, Settings, ScpTransfer, Transfer};
//!
//! let settings = Settings::load(&ConfigPaths::discover(None, None, &cwd))?;
//! let prod = settings.alias("prod").expect("alias configured");
//! let target = prod.target("/etc/app.conf");
//!
//! let outcome = ScpTransfer::detect()?.transfer(&target.scp_path(), "/tmp/app.conf", false);
//! ```

pub mod config;
pub mod interactive;
pub mod target;
pub mod transfer;

pub use config::{
    ConfigError, ConfigPaths, ConnectionDescriptor, MergedOptions, Settings, SettingsLayer,
    merged_options, resolve,
};

pub use target::{RemoteTarget, split_line_suffix};

pub use transfer::{ScpTransfer, Transfer, TransferError, TransferOutcome, classify};
