pub mod cli;
pub mod host;
pub mod remote;
pub mod session;

use anyhow::{Context, Result};
use colored::Colorize;

use cli::{Cli, Commands, EditArgs};
use host::{EditSummary, EditorCommand};
use remote::interactive::AliasPicker;
use remote::{ConfigPaths, ScpTransfer, Settings};
use session::{OpenRequest, SessionController};

/// Load the global and project settings layers named by `cli`.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let paths = ConfigPaths::discover(cli.config.clone(), cli.project.clone(), &cwd);
    tracing::debug!(global = ?paths.global, project = ?paths.project, "settings layers");
    Ok(Settings::load(&paths)?)
}

/// Library entrypoint for the `remote-edit` binary.
pub fn run(cli: Cli, settings: Settings) -> Result<()> {
    match cli.command {
        Commands::Open { alias, path, edit } => open(settings, alias, path, &edit),
        Commands::Prompt { edit } => {
            let selection = AliasPicker::new(settings.aliases.values().cloned()).prompt()?;
            open(settings, selection.alias, selection.path, &edit)
        }
        Commands::Aliases { json } => list_aliases(&settings, json),
    }
}

fn open(settings: Settings, alias: String, path: String, edit: &EditArgs) -> Result<()> {
    let editor = match &edit.editor {
        Some(spec) => EditorCommand::parse(spec)?,
        None => EditorCommand::from_env()?,
    };
    let transfer = match &edit.scp {
        Some(program) => ScpTransfer::new().with_program(program),
        None => ScpTransfer::detect()?,
    };

    tracing::debug!(scp = %transfer.program().display(), editor = %editor.program(), "tools");

    let request = OpenRequest::new(alias, path).with_create_if_missing(edit.create_policy());
    let mut controller = SessionController::new(settings, transfer);

    match host::edit_remote_file(&mut controller, request, &editor)? {
        EditSummary::Closed { pushes } => {
            tracing::debug!(pushes, "session closed");
        }
        EditSummary::Skipped(_) => {}
        EditSummary::Kept { local_path } => {
            anyhow::bail!("changes were not uploaded; local copy kept at {}", local_path.display());
        }
    }
    Ok(())
}

fn list_aliases(settings: &Settings, json: bool) -> Result<()> {
    if json {
        let aliases: Vec<_> = settings.aliases.values().collect();
        let payload = serde_json::json!({
            "create_if_missing": settings.create_if_missing,
            "aliases": aliases,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if settings.aliases.is_empty() {
        println!("{}", "No aliases configured.".dimmed());
        return Ok(());
    }

    for descriptor in settings.aliases.values() {
        let address = match &descriptor.username {
            Some(user) => format!("{}@{}", user, descriptor.address),
            None => descriptor.address.clone(),
        };
        let create = match descriptor.create_if_missing {
            Some(true) => " (create if missing)".green().to_string(),
            Some(false) => " (never create)".dimmed().to_string(),
            None => String::new(),
        };
        println!("{}  {}{}", descriptor.alias.bold(), address, create);
    }
    Ok(())
}
