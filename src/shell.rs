use crate::constants::{MAX_ITEMS_TO_SHOW, SHELL_PROMPT};
use crate::context::App;
use crate::operation::Operation;
use crate::settings::TimeWindow;
use crate::tracker::UndoReport;
use crate::vault::Entry;
use crate::{debug, error, info, status, warning};
use anyhow::{Context, Result, bail};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// a parsed shell line
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Rename { from: String, to: String },
    Undo,
    Clear,
    History,
    Window(Option<u64>),
    Help,
    Quit,
}

/// parse a line into a command, `Ok(None)` for blank lines
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let Some(words) = shlex::split(line) else {
        bail!("unbalanced quotes");
    };
    let Some((name, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match (name.as_str(), args) {
        ("mv" | "rename" | "move", [from, to]) => Command::Rename {
            from: from.clone(),
            to: to.clone(),
        },
        ("mv" | "rename" | "move", _) => bail!("usage: {name} <from> <to>"),
        ("undo" | "u", []) => Command::Undo,
        ("clear", []) => Command::Clear,
        ("history" | "h", []) => Command::History,
        ("window", []) => Command::Window(None),
        ("window", [secs]) => {
            let secs = secs
                .parse::<u64>()
                .with_context(|| format!("not a number of seconds: {secs}"))?;
            Command::Window(Some(secs))
        }
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit" | "q", _) => Command::Quit,
        (other, _) => bail!("unknown command: {other} (try 'help')"),
    };
    Ok(Some(command))
}

enum ShellAction {
    Continue,
    Exit,
}

/// read commands until quit or end of input
pub fn run(app: &mut App) -> Result<()> {
    let mut editor = DefaultEditor::new().context("failed to initialise line editor")?;

    status!(
        "tracking renames in {} (time window {}s, 'help' for commands)",
        app.vault.root().display(),
        app.tracker.time_window().secs()
    );

    loop {
        let line = match editor.readline(SHELL_PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read command"),
        };
        if !line.trim().is_empty()
            && let Err(e) = editor.add_history_entry(line.as_str())
        {
            debug!("failed to add line to editor history: {}", e);
        }

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };

        match handle_command(app, command) {
            Ok(ShellAction::Continue) => {}
            Ok(ShellAction::Exit) => break,
            Err(e) => error!("{:#}", e),
        }
    }

    Ok(())
}

fn handle_command(app: &mut App, command: Command) -> Result<ShellAction> {
    match command {
        Command::Rename { from, to } => {
            app.vault.rename_path(&from, &to)?;
        }
        Command::Undo => {
            if let Some(report) = app.tracker.undo(&app.vault) {
                display_undo(&report);
            }
        }
        Command::Clear => {
            app.tracker.clear();
            status!("cache cleared");
        }
        Command::History => display_history(app),
        Command::Window(None) => {
            info!("time window: {} seconds", app.tracker.time_window().secs());
        }
        Command::Window(Some(secs)) => {
            let window = TimeWindow::new(secs)?;
            app.set_time_window(window)?;
            status!("time window set to {} seconds", window.secs());
        }
        Command::Help => display_help(),
        Command::Quit => return Ok(ShellAction::Exit),
    }
    Ok(ShellAction::Continue)
}

/// one notification per undo, failures are only counted
fn display_undo(report: &UndoReport) {
    status!("undo successful");
    debug!(
        "reverted {} of {} item(s) from the latest {}",
        report.reverted,
        report.attempted,
        report.kind
    );
    if !report.is_complete() {
        warning!(
            "{} of {} item(s) could not be reverted",
            report.failures.len(),
            report.attempted
        );
    }
}

/// list pending operations, newest first
fn display_history(app: &App) {
    let now = app.tracker.now();
    let window = app.tracker.time_window();

    app.tracker.with_history(|history| {
        if history.is_empty() {
            info!("nothing to undo");
            return;
        }

        let cursor = history.cursor();
        for (idx, operation) in history.iter().enumerate().rev() {
            let age_secs = now.saturating_sub(operation.timestamp) / 1000;
            let marker = if Some(idx) == cursor { "*" } else { " " };
            let expired = if operation.is_fresh(now, window.millis()) {
                ""
            } else {
                " (expired)"
            };
            status!(
                "{} {} of {} {}, {}s ago{}",
                marker,
                operation.kind,
                operation.files.len(),
                operation.item_word(),
                age_secs,
                expired
            );
            display_items(operation);
        }
    });
}

fn display_items(operation: &Operation<Entry>) {
    for item in operation.files.iter().take(MAX_ITEMS_TO_SHOW) {
        info!("    {} {} → {}", item.kind, item.old_path, item.new_path);
    }

    // show count of remaining items
    if operation.files.len() > MAX_ITEMS_TO_SHOW {
        info!("    (+{} more)", operation.files.len() - MAX_ITEMS_TO_SHOW);
    }
}

fn display_help() {
    info!("mv <from> <to>   rename or move an entry (aliases: rename, move)");
    info!("undo             undo the latest batch of renames or moves (alias: u)");
    info!("clear            forget every pending operation");
    info!("history          list pending operations (alias: h)");
    info!("window [SECS]    show or set the time window (3-60 seconds)");
    info!("quit             leave (also ctrl-d)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use tempfile::TempDir;

    fn parse(line: &str) -> Command {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn test_rename_with_quoted_paths() {
        assert_eq!(
            parse(r#"mv "Daily Notes/a.md" 'Archive/old notes/a.md'"#),
            Command::Rename {
                from: "Daily Notes/a.md".to_string(),
                to: "Archive/old notes/a.md".to_string(),
            }
        );
        assert_eq!(
            parse("move a.md b.md"),
            Command::Rename {
                from: "a.md".to_string(),
                to: "b.md".to_string(),
            }
        );
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("undo"), Command::Undo);
        assert_eq!(parse("  u  "), Command::Undo);
        assert_eq!(parse("clear"), Command::Clear);
        assert_eq!(parse("history"), Command::History);
        assert_eq!(parse("help"), Command::Help);
        assert_eq!(parse("exit"), Command::Quit);
    }

    #[test]
    fn test_window_command() {
        assert_eq!(parse("window"), Command::Window(None));
        assert_eq!(parse("window 20"), Command::Window(Some(20)));
        assert!(parse_command("window soon").is_err());
    }

    #[test]
    fn test_blank_line_is_ignored() {
        assert!(parse_command("").unwrap().is_none());
        assert!(parse_command("   ").unwrap().is_none());
    }

    #[test]
    fn test_clear_forgets_pending_operations() {
        let vault_dir = TempDir::new().unwrap();
        let config_dir = TempDir::new().unwrap();
        std::fs::write(vault_dir.path().join("a.md"), "").unwrap();
        let cli = Cli::try_parse_from([
            "vault-undo".to_string(),
            "--vault".to_string(),
            vault_dir.path().display().to_string(),
            "--config".to_string(),
            config_dir.path().join("settings.json").display().to_string(),
        ])
        .unwrap();
        let mut app = App::init(&cli).unwrap();

        handle_command(&mut app, parse("mv a.md b.md")).unwrap();
        app.tracker.with_history(|h| assert_eq!(h.len(), 1));

        handle_command(&mut app, Command::Clear).unwrap();

        app.tracker.with_history(|h| assert!(h.is_empty()));
        assert!(app.tracker.undo(&app.vault).is_none());
        assert!(vault_dir.path().join("b.md").exists());
    }

    #[test]
    fn test_bad_input_is_an_error() {
        assert!(parse_command("mv only-one.md").is_err());
        assert!(parse_command("undo now").is_err());
        assert!(parse_command("frobnicate").is_err());
        assert!(parse_command("mv \"unterminated a.md b.md").is_err());
    }
}
