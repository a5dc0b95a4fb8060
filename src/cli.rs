//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `strata`.
#[derive(Debug, Parser)]
#[command(name = "strata", version, about = "Summarize a source tree into annotated modules")]
pub struct Cli {
    /// Log level or filter directive, overriding the configured level.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log full summarizer requests and responses, whatever the configuration says.
    #[arg(long, global = true)]
    pub debug: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create project metadata in the current directory.
    Init {
        /// Summarizer backend (`anthropic` or `openai`).
        #[arg(long)]
        provider: Option<String>,
    },
    /// Refresh metadata for the enclosing project.
    Update,
    /// Delete project metadata in the current directory.
    Remove,
    /// Print the files in scope.
    Select {
        /// File whose directory narrows the scope.
        target: Option<PathBuf>,
        /// Inclusion pattern (repeatable, defaults to `*`).
        #[arg(long = "include", value_name = "PATTERN")]
        include: Vec<String>,
        /// Extra exclusion pattern (repeatable).
        #[arg(long = "exclude", value_name = "PATTERN")]
        exclude: Vec<String>,
    },
    /// Print the assembled scope request as JSON.
    Context {
        /// File whose directory narrows the scope.
        target: Option<PathBuf>,
        /// Keep every selected file, not only the target module's own.
        #[arg(long)]
        all: bool,
    },
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_init_with_provider() {
        let cli = Cli::parse_from(["strata", "init", "--provider", "openai"]);
        assert!(matches!(cli.command, Command::Init { provider: Some(ref p) } if p == "openai"));
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn log_level_is_global() {
        let cli = Cli::parse_from(["strata", "update", "--log-level", "debug"]);
        assert!(matches!(cli.command, Command::Update));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(!cli.debug);
    }

    #[test]
    fn debug_flag_is_global() {
        let cli = Cli::parse_from(["strata", "init", "--debug"]);
        assert!(cli.debug);
        let cli = Cli::parse_from(["strata", "--debug", "update"]);
        assert!(matches!(cli.command, Command::Update));
        assert!(cli.debug);
    }

    #[test]
    fn parses_repeated_select_patterns() {
        let cli = Cli::parse_from([
            "strata", "select", "src/lib.rs", "--include", "*.rs", "--include", "*.toml",
            "--exclude", "target/",
        ]);
        let Command::Select { target, include, exclude } = cli.command else {
            panic!("expected select");
        };
        assert_eq!(target, Some(PathBuf::from("src/lib.rs")));
        assert_eq!(include, vec!["*.rs", "*.toml"]);
        assert_eq!(exclude, vec!["target/"]);
    }

    #[test]
    fn parses_context_flags() {
        let cli = Cli::parse_from(["strata", "context", "--all"]);
        assert!(matches!(cli.command, Command::Context { target: None, all: true }));
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["strata", "generate"]).is_err());
    }
}
