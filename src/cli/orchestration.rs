//! Command workflows behind the binary.
//!
//! The argument structs here mirror the command line without depending on
//! clap, so the workflows can be driven programmatically and tested with a
//! mock runner.

use anyhow::{Context as _, Result};
use std::path::PathBuf;

use crate::config::Config;
use crate::domain::Version;
use crate::serialize::SerializeOptions;
use crate::style::{check_version, Style};
use crate::vcs::{self, CommandRunner, SystemRunner, Vcs, VcsOptions};

/// Arguments of `dunamai from <vcs>`.
///
/// `false` booleans and `None` values mean "not given", leaving the
/// configuration file's value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FromWorkflowArgs {
    pub vcs: Option<Vcs>,
    pub config_path: Option<String>,
    pub path: Option<PathBuf>,

    pub pattern: Option<String>,
    pub pattern_prefix: Option<String>,
    pub latest_tag: bool,
    pub tag_dir: Option<String>,
    pub tag_branch: Option<String>,
    pub full_commit: bool,
    pub commit_length: Option<usize>,
    pub ignore_untracked: bool,
    pub strict: bool,

    /// `Some(true)` for `--metadata`, `Some(false)` for `--no-metadata`
    pub metadata: Option<bool>,
    pub dirty: bool,
    pub tagged_metadata: bool,
    pub format: Option<String>,
    pub style: Option<Style>,
    pub bump: bool,
    pub commit_prefix: Option<String>,
    pub escape_with: Option<String>,
}

/// Outcome of a successful `from` workflow
#[derive(Debug, Clone, PartialEq)]
pub struct FromResult {
    pub version: Version,
    pub serialized: String,
}

/// Merge configuration and flags into adapter and output options.
pub fn resolve_options(args: &FromWorkflowArgs, config: &Config) -> Result<(VcsOptions, SerializeOptions)> {
    let mut vcs_config = config.vcs.clone();
    if args.pattern.is_some() {
        vcs_config.pattern = args.pattern.clone();
    }
    if args.pattern_prefix.is_some() {
        vcs_config.pattern_prefix = args.pattern_prefix.clone();
    }
    if args.tag_dir.is_some() {
        vcs_config.tag_dir = args.tag_dir.clone();
    }
    if args.tag_branch.is_some() {
        vcs_config.tag_branch = args.tag_branch.clone();
    }
    if args.commit_length.is_some() {
        vcs_config.commit_length = args.commit_length;
    }
    let mut vcs_options = vcs_config.to_options()?;
    vcs_options.latest_tag |= args.latest_tag;
    vcs_options.full_commit |= args.full_commit;
    vcs_options.ignore_untracked |= args.ignore_untracked;
    vcs_options.strict |= args.strict;

    let mut output = config.output.to_options();
    if args.metadata.is_some() {
        output.metadata = args.metadata;
    }
    output.dirty |= args.dirty;
    output.tagged_metadata |= args.tagged_metadata;
    output.bump |= args.bump;
    if args.format.is_some() {
        output.format = args.format.clone();
    }
    if args.style.is_some() {
        output.style = args.style;
    }
    if args.commit_prefix.is_some() {
        output.commit_prefix = args.commit_prefix.clone();
    }
    if args.escape_with.is_some() {
        output.escape_with = args.escape_with.clone();
    }

    Ok((vcs_options, output))
}

/// Determine and serialize the version of the repository at `args.path`.
pub fn run_from(args: &FromWorkflowArgs, config: &Config) -> Result<FromResult> {
    run_from_with(&SystemRunner, args, config)
}

/// [`run_from`] with an injected command runner
pub fn run_from_with(
    runner: &dyn CommandRunner,
    args: &FromWorkflowArgs,
    config: &Config,
) -> Result<FromResult> {
    let (vcs_options, output) = resolve_options(args, config)?;
    let path = args.path.clone().unwrap_or_else(|| PathBuf::from("."));
    let vcs = args.vcs.unwrap_or(Vcs::Any);

    let version = vcs::from_vcs_with(runner, vcs, &vcs_options, &path)
        .with_context(|| format!("Unable to determine version from {} at {}", vcs, path.display()))?;
    let serialized = version.serialize(&output)?;

    Ok(FromResult { version, serialized })
}

/// Validate a version string against a style.
pub fn run_check(version: &str, style: Style) -> Result<()> {
    check_version(version.trim(), style)?;
    Ok(())
}
