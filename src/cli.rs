use clap::Parser;
use std::path::PathBuf;

/// vault-undo: track renames and moves inside a vault and undo the latest batch
#[derive(Parser, Debug)]
#[command(name = "vault-undo", about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// vault root directory
    #[arg(long, default_value = ".")]
    pub vault: PathBuf,

    /// settings file (defaults to the per-user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// time window in seconds for this session only (3-60)
    #[arg(long, value_name = "SECS")]
    pub time_window: Option<u64>,

    /// print developer-level detail
    #[arg(
        long,
        env = "VAULT_UNDO_DEBUG",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["vault-undo"]).unwrap();
        assert_eq!(cli.vault, PathBuf::from("."));
        assert!(cli.config.is_none());
        assert!(cli.time_window.is_none());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "vault-undo",
            "--vault",
            "/tmp/notes",
            "--config",
            "/tmp/settings.json",
            "--time-window",
            "30",
            "--verbose",
        ])
        .unwrap();
        assert_eq!(cli.vault, PathBuf::from("/tmp/notes"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/settings.json")));
        assert_eq!(cli.time_window, Some(30));
        assert!(cli.verbose);
    }
}
