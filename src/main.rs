use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dunamai::cli::{run_check, run_from, FromWorkflowArgs};
use dunamai::config::load_project_config;
use dunamai::{ui, Style, Vcs};

#[derive(Parser)]
#[command(
    name = "dunamai",
    version,
    about = "Generate dynamic versions from version control tags"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a version from a version control system
    From {
        #[command(subcommand)]
        vcs: FromVcs,
    },
    /// Check if a version is valid for a style
    Check {
        /// Version to check; read from stdin when omitted
        #[arg(value_name = "VERSION")]
        candidate: Option<String>,

        #[arg(long, value_enum, default_value_t = Style::Pep440, help = "Versioning style to check against")]
        style: Style,
    },
}

#[derive(Subcommand)]
enum FromVcs {
    /// Autodetect the version control system
    Any(FromArgs),
    Git(FromArgs),
    Mercurial(FromArgs),
    Darcs(FromArgs),
    Subversion(FromArgs),
    Bazaar(FromArgs),
    Fossil(FromArgs),
    Pijul(FromArgs),
}

impl FromVcs {
    fn split(self) -> (Vcs, FromArgs) {
        match self {
            FromVcs::Any(args) => (Vcs::Any, args),
            FromVcs::Git(args) => (Vcs::Git, args),
            FromVcs::Mercurial(args) => (Vcs::Mercurial, args),
            FromVcs::Darcs(args) => (Vcs::Darcs, args),
            FromVcs::Subversion(args) => (Vcs::Subversion, args),
            FromVcs::Bazaar(args) => (Vcs::Bazaar, args),
            FromVcs::Fossil(args) => (Vcs::Fossil, args),
            FromVcs::Pijul(args) => (Vcs::Pijul, args),
        }
    }
}

#[derive(clap::Args)]
struct FromArgs {
    #[arg(long, overrides_with = "no_metadata", help = "Always include metadata")]
    metadata: bool,

    #[arg(long, help = "Never include metadata")]
    no_metadata: bool,

    #[arg(long, help = "Include dirty flag if applicable")]
    dirty: bool,

    #[arg(long, help = "Ignore untracked files when determining whether the repository is dirty (Git only)")]
    ignore_untracked: bool,

    #[arg(long, help = "Include the tagged metadata in the version")]
    tagged_metadata: bool,

    #[arg(long, help = "Regex or preset name (default, default-unprefixed) for parsing tags")]
    pattern: Option<String>,

    #[arg(long, help = "Insert this after the pattern's start anchor")]
    pattern_prefix: Option<String>,

    #[arg(long, help = "Custom output format, e.g. 'v{base}+{distance}.{commit}'")]
    format: Option<String>,

    #[arg(long, value_enum, help = "Preconfigured output format")]
    style: Option<Style>,

    #[arg(long, help = "Only inspect the latest tag for a pattern match")]
    latest_tag: bool,

    #[arg(long, help = "Fail instead of falling back to 0.0.0 when no tags match")]
    strict: bool,

    #[arg(long, help = "Directory to inspect instead of the current one")]
    path: Option<PathBuf>,

    #[arg(long, help = "Print debug logging to stderr")]
    debug: bool,

    #[arg(long, help = "Increment the last base component (or stage revision) when not on a tag")]
    bump: bool,

    #[arg(long, help = "Use the full commit id instead of the short form")]
    full_commit: bool,

    #[arg(long, help = "Use this many characters of the full commit id")]
    commit_length: Option<usize>,

    #[arg(long, help = "Prefix added to the commit id in metadata")]
    commit_prefix: Option<String>,

    #[arg(long, help = "Replacement for non-alphanumeric branch characters in {branch_escaped}")]
    escape_with: Option<String>,

    #[arg(long, help = "Branch whose tags are considered (Git only)")]
    tag_branch: Option<String>,

    #[arg(long, help = "Directory containing tags (Subversion only)")]
    tag_dir: Option<String>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,
}

impl FromArgs {
    fn into_workflow(self, vcs: Vcs) -> FromWorkflowArgs {
        let metadata = match (self.metadata, self.no_metadata) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        };
        FromWorkflowArgs {
            vcs: Some(vcs),
            config_path: self.config,
            path: self.path,
            pattern: self.pattern,
            pattern_prefix: self.pattern_prefix,
            latest_tag: self.latest_tag,
            tag_dir: self.tag_dir,
            tag_branch: self.tag_branch,
            full_commit: self.full_commit,
            commit_length: self.commit_length,
            ignore_untracked: self.ignore_untracked,
            strict: self.strict,
            metadata,
            dirty: self.dirty,
            tagged_metadata: self.tagged_metadata,
            format: self.format,
            style: self.style,
            bump: self.bump,
            commit_prefix: self.commit_prefix,
            escape_with: self.escape_with,
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::From { vcs } => {
            let (vcs, args) = vcs.split();
            init_logging(args.debug);
            let args = args.into_workflow(vcs);
            let project_dir = args.path.clone().unwrap_or_else(|| PathBuf::from("."));
            let config = load_project_config(args.config_path.as_deref(), &project_dir)?;
            let result = run_from(&args, &config)?;
            for concern in &result.version.concerns {
                ui::display_concern(concern);
            }
            println!("{}", result.serialized);
        }
        Command::Check { candidate, style } => {
            init_logging(false);
            let version = match candidate {
                Some(version) => version,
                None => ui::read_version_from_stdin()?,
            };
            run_check(&version, style)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::display_error_chain(&e);
            ExitCode::FAILURE
        }
    }
}
