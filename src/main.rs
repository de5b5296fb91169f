use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use roster::artifacts::core::hex_id::RevisionId;
use roster::artifacts::merge::{AmbiguityPolicy, BOOKKEEPING_DIR, MergeOptions};
use roster::commands::merge::MergeInput;
use roster::commands::{apply, check_cset, diff, merge, parse_revision};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "roster",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Roster, change-set and merge toolkit",
    long_about = "Works on versioned file trees (rosters) stored as text. \
    Change-sets can be validated, applied to rosters or derived from two rosters, \
    and two rosters can be merged using their ancestry markings.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    /// Increase log verbosity (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Ambiguous {
    Fail,
    Conflict,
}

impl From<Ambiguous> for AmbiguityPolicy {
    fn from(value: Ambiguous) -> Self {
        match value {
            Ambiguous::Fail => AmbiguityPolicy::Fail,
            Ambiguous::Conflict => AmbiguityPolicy::Conflict,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "check-cset",
        about = "Validate a change-set and print its normalized form",
        long_about = "This command parses a change-set file, checks that it is normalized \
        and prints it back in canonical form."
    )]
    CheckCset {
        #[arg(index = 1, help = "The change-set file")]
        file: PathBuf,
    },
    #[command(
        name = "apply",
        about = "Apply a change-set to a roster",
        long_about = "This command applies a change-set to a roster file, marks the result \
        as a child revision of the input and prints the new roster."
    )]
    Apply {
        #[arg(index = 1, help = "The roster file")]
        roster: PathBuf,
        #[arg(index = 2, help = "The change-set file")]
        cset: PathBuf,
        #[arg(short, long, value_parser = parse_revision, help = "Id of the new revision")]
        revision: RevisionId,
        #[arg(long, help = "First id given to new nodes (default: above every id in the roster)")]
        first_node_id: Option<u64>,
    },
    #[command(
        name = "diff",
        about = "Print the change-set between two rosters",
        long_about = "This command derives the change-set that turns the first roster into the second."
    )]
    Diff {
        #[arg(index = 1, help = "The roster to start from")]
        from: PathBuf,
        #[arg(index = 2, help = "The roster to end at")]
        to: PathBuf,
    },
    #[command(
        name = "merge",
        about = "Merge two rosters",
        long_about = "This command merges two roster files given each side's uncommon ancestors. \
        Conflicts are listed; a clean merge is printed as a roster when a revision id is given."
    )]
    Merge {
        #[arg(index = 1, help = "The left roster file")]
        left: PathBuf,
        #[arg(index = 2, help = "The right roster file")]
        right: PathBuf,
        #[arg(long, num_args = 0.., value_parser = parse_revision, help = "Revisions only the left side has seen")]
        left_uncommon: Vec<RevisionId>,
        #[arg(long, num_args = 0.., value_parser = parse_revision, help = "Revisions only the right side has seen")]
        right_uncommon: Vec<RevisionId>,
        #[arg(short, long, value_parser = parse_revision, help = "Id of the merge revision")]
        revision: Option<RevisionId>,
        #[arg(long, value_enum, default_value = "fail", help = "What to do with scalars both sides win")]
        ambiguous: Ambiguous,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        _ => EnvFilter::new(default_level),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::CheckCset { file } => check_cset::check_cset(&file, &mut stdout)?,
        Commands::Apply {
            roster,
            cset,
            revision,
            first_node_id,
        } => apply::apply(&roster, &cset, &revision, first_node_id, &mut stdout)?,
        Commands::Diff { from, to } => diff::diff(&from, &to, &mut stdout)?,
        Commands::Merge {
            left,
            right,
            left_uncommon,
            right_uncommon,
            revision,
            ambiguous,
        } => {
            let options = MergeOptions::new(BOOKKEEPING_DIR.to_string(), ambiguous.into());
            let clean = merge::merge(
                &MergeInput::new(left, left_uncommon),
                &MergeInput::new(right, right_uncommon),
                revision.as_ref(),
                &options,
                &mut stdout,
            )?;

            if !clean {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
