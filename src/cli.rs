use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Edit files on remote hosts through a local copy kept in sync with scp.
#[derive(Parser, Debug)]
#[command(name = "remote-edit", version, about, long_about = None)]
pub struct Cli {
    /// Global settings file (default: <config dir>/remote-edit/settings.toml)
    #[arg(long, global = true, env = "REMOTE_EDIT_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project settings file, read after the global one (default: ./.remote-edit.toml)
    #[arg(long, global = true, env = "REMOTE_EDIT_PROJECT", value_name = "PATH")]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open a remote file in your editor; saves are pushed back on write
    Open {
        /// Alias from the ssh_configs table
        alias: String,
        /// Remote path, optionally suffixed with :LINE
        path: String,
        #[command(flatten)]
        edit: EditArgs,
    },

    /// Pick an alias and path interactively, then open it
    Prompt {
        #[command(flatten)]
        edit: EditArgs,
    },

    /// List configured aliases
    Aliases {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Create the file if it does not exist on the remote host
    #[arg(long, conflicts_with = "no_create")]
    pub create_if_missing: bool,

    /// Never create missing remote files, whatever the settings say
    #[arg(long)]
    pub no_create: bool,

    /// Editor command (default: $VISUAL, $EDITOR, then vi)
    #[arg(long, env = "REMOTE_EDIT_EDITOR", value_name = "CMD")]
    pub editor: Option<String>,

    /// scp executable to use instead of the one on PATH
    #[arg(long, env = "REMOTE_EDIT_SCP", value_name = "PATH")]
    pub scp: Option<PathBuf>,
}

impl EditArgs {
    /// Explicit create-if-missing policy, if one was given on the command line.
    pub fn create_policy(&self) -> Option<bool> {
        if self.create_if_missing {
            Some(true)
        } else if self.no_create {
            Some(false)
        } else {
            None
        }
    }
}
