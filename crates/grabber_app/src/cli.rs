//! Command-line definition for `changelist-grabber`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use grabber_logging::LevelFilter;

/// Collects added, removed and modified files for one depot across a range
/// of builds, one patchnotes page at a time.
#[derive(Parser, Debug)]
#[command(name = "changelist-grabber", version)]
pub struct Cli {
    /// Engine settings file (ron). Missing file means defaults.
    #[arg(long, global = true, default_value = "grabber.ron")]
    pub config: PathBuf,

    /// Coordination state file; overrides the config value.
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write the log to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the builds on an app page, most recent first.
    Builds(AppArgs),
    /// Collect changes between two builds and write `<depot>_changes.json`.
    Changes(ChangesArgs),
    /// Load the app page again; exports a finished run that was interrupted.
    Resume(AppArgs),
    /// Print the stored coordination state.
    Status,
    /// Clear all stored state.
    Reset,
    /// Summarize an exported changes file.
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct AppArgs {
    /// App id, as in `/app/<id>/`.
    #[arg(long)]
    pub app: String,
}

#[derive(Args, Debug)]
pub struct ChangesArgs {
    #[arg(long)]
    pub app: String,

    #[arg(long)]
    pub depot: String,

    /// Starting build (excluded from the visits).
    #[arg(long)]
    pub from: String,

    #[arg(long)]
    pub to: String,

    /// Directory for the changes file; overrides the config value.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn changes_takes_range_and_output() {
        let cli = Cli::try_parse_from([
            "changelist-grabber",
            "changes",
            "--app",
            "730",
            "--depot",
            "2347770",
            "--from",
            "100",
            "--to",
            "200",
            "--output",
            "out",
        ])
        .unwrap();
        match cli.command {
            Command::Changes(args) => {
                assert_eq!(args.depot, "2347770");
                assert_eq!(args.from, "100");
                assert_eq!(args.to, "200");
                assert_eq!(args.output, Some(PathBuf::from("out")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli =
            Cli::try_parse_from(["changelist-grabber", "status", "-v", "--state", "s.json"]).unwrap();
        assert_eq!(cli.log_level(), LevelFilter::Debug);
        assert_eq!(cli.state, Some(PathBuf::from("s.json")));
        assert_eq!(cli.config, PathBuf::from("grabber.ron"));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["changelist-grabber", "-v", "-q", "reset"]).is_err());
    }

    #[test]
    fn changes_requires_a_depot() {
        assert!(Cli::try_parse_from([
            "changelist-grabber",
            "changes",
            "--app",
            "1",
            "--from",
            "1",
            "--to",
            "2"
        ])
        .is_err());
    }
}
