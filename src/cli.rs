use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "slowmo")]
#[command(about = "Periodically snapshot web pages into a git history", long_about = None)]
pub struct Cli {
    /// Remove the local git repository and snapshot files before starting
    #[arg(long)]
    pub reset: bool,

    /// Configuration file (defaults to $SLOWMO_CONFIG or config/slowmo.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["slowmo"]).unwrap();
        assert!(!cli.reset);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_reset_and_config() {
        let cli = Cli::try_parse_from(["slowmo", "--reset", "--config", "custom.toml"]).unwrap();
        assert!(cli.reset);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_rejects_unknown_flag() {
        assert!(Cli::try_parse_from(["slowmo", "--forever"]).is_err());
    }
}
