//! Interactive prompts for picking an alias and a remote path.
//!
//! Aliases are shown sorted by name, each with the address it resolves to:
//!
//! ```text
//! > prod
//!     Address: dev@10.0.0.5
//!   stage
//!     Address: 10.0.0.6
//! ```
//!
//! After an alias is chosen the user types the remote path, optionally with a
//! `:line` suffix.

use std::fmt;

use colored::Colorize;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};

use super::config::ConnectionDescriptor;

// =============================================================================
// Alias Picker
// =============================================================================

/// What the user chose in the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSelection {
    pub alias: String,
    pub path: String,
}

/// Select-an-alias-then-type-a-path prompt.
pub struct AliasPicker {
    aliases: Vec<ConnectionDescriptor>,
    theme: ColorfulTheme,
}

impl AliasPicker {
    /// Create a picker; aliases are sorted by name regardless of input order.
    pub fn new(aliases: impl IntoIterator<Item = ConnectionDescriptor>) -> Self {
        let mut aliases: Vec<_> = aliases.into_iter().collect();
        aliases.sort_by(|a, b| a.alias.cmp(&b.alias));
        Self {
            aliases,
            theme: ColorfulTheme::default(),
        }
    }

    /// Two-line entry: alias name, then the address it resolves to.
    fn format_alias(&self, descriptor: &ConnectionDescriptor) -> String {
        let address = match &descriptor.username {
            Some(user) => format!("{}@{}", user, descriptor.address),
            None => descriptor.address.clone(),
        };
        format!(
            "{}\n    {} {}",
            descriptor.alias.bold(),
            "Address:".dimmed(),
            address.dimmed()
        )
    }

    /// Run both prompts.
    pub fn prompt(&self) -> Result<OpenSelection, InteractiveError> {
        if self.aliases.is_empty() {
            return Err(InteractiveError::NoAliases);
        }

        let items: Vec<String> = self.aliases.iter().map(|d| self.format_alias(d)).collect();

        println!();
        println!("{}", "Select a remote host:".bold().underline());
        println!();

        let index = Select::with_theme(&self.theme)
            .items(&items)
            .default(0)
            .interact_opt()
            .map_err(|e| InteractiveError::IoError(e.to_string()))?
            .ok_or(InteractiveError::Cancelled)?;

        let alias = self
            .aliases
            .get(index)
            .map(|d| d.alias.clone())
            .ok_or(InteractiveError::Cancelled)?;

        let path: String = Input::with_theme(&self.theme)
            .with_prompt("Enter remote file to open")
            .interact_text()
            .map_err(|e| InteractiveError::IoError(e.to_string()))?;

        let path = path.trim().to_string();
        if path.is_empty() {
            return Err(InteractiveError::Cancelled);
        }

        Ok(OpenSelection { alias, path })
    }

    pub fn aliases(&self) -> &[ConnectionDescriptor] {
        &self.aliases
    }
}

// =============================================================================
// Confirmation Prompts
// =============================================================================

/// Ask a yes/no question on the terminal.
pub fn confirm_action(message: &str, default: bool) -> Result<bool, InteractiveError> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(default)
        .interact()
        .map_err(|e| InteractiveError::IoError(e.to_string()))
}

// =============================================================================
// Errors
// =============================================================================

/// Errors from interactive prompts.
#[derive(Debug)]
pub enum InteractiveError {
    /// User cancelled the prompt
    Cancelled,
    /// No aliases configured
    NoAliases,
    /// IO error during prompt
    IoError(String),
}

impl fmt::Display for InteractiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractiveError::Cancelled => write!(f, "Operation cancelled by user"),
            InteractiveError::NoAliases => {
                write!(f, "No aliases configured; add entries under [ssh_configs]")
            }
            InteractiveError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for InteractiveError {}
