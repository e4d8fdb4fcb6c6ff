use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `katalog` binary.
#[derive(Debug, Parser)]
#[command(name = "katalog", version, about = "Katalog - warehouse catalog sync and audit trail")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Max results to return
    #[arg(short, long, global = true)]
    pub limit: Option<u32>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    #[must_use]
    pub const fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            limit: self.limit,
            quiet: self.quiet,
            verbose: self.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from([
            "katalog", "--format", "table", "--limit", "10", "--verbose", "history", "--project",
            "prj-a",
        ])
        .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Table);
        assert_eq!(cli.limit, Some(10));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::History(ref args) if args.project == "prj-a"));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "katalog", "changelog", "--sync", "syn-1", "--format", "raw", "--quiet",
        ])
        .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.global_flags().quiet);
        assert!(matches!(cli.command, Commands::Changelog(ref args) if args.sync == "syn-1"));
    }

    #[test]
    fn sync_accepts_name_and_gcp_project() {
        let cli = Cli::try_parse_from([
            "katalog", "sync", "--project", "prj-a", "--name", "Analytics", "--gcp-project", "acme",
        ])
        .expect("cli should parse");
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.name.as_deref(), Some("Analytics"));
        assert_eq!(args.gcp_project.as_deref(), Some("acme"));
    }

    #[test]
    fn search_takes_query_positionally() {
        let cli = Cli::try_parse_from(["katalog", "search", "--project", "prj-a", "col:amount"])
            .expect("cli should parse");
        assert!(matches!(cli.command, Commands::Search(ref args) if args.query == "col:amount"));
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        let parsed = Cli::try_parse_from(["katalog", "--format", "xml", "init-index"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn sync_requires_project() {
        assert!(Cli::try_parse_from(["katalog", "sync"]).is_err());
    }
}
