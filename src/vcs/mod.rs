//! Version control adapters
//!
//! Every supported VCS implements the [`Backend`] trait: a probe telling
//! whether the tool works at a path, an optional archival-file reader for
//! source exports, and the live extraction of [`RawFacts`]. The functions
//! at the bottom of this module turn those facts into a [`Version`].
//!
//! Adapters never spawn processes themselves. They go through a
//! [`CommandRunner`], which is [`SystemRunner`] in production and
//! [`MockRunner`] in tests.
//!
//! ```no_run
//! # use dunamai::vcs::{from_any_vcs, VcsOptions};
//! # fn example() -> dunamai::Result<()> {
//! let version = from_any_vcs(&VcsOptions::default(), std::path::Path::new("."))?;
//! println!("{}", version);
//! # Ok(())
//! # }
//! ```

pub mod archival;
pub mod bazaar;
pub mod darcs;
pub mod fossil;
pub mod git;
pub mod mercurial;
pub mod mock;
pub mod pijul;
pub mod runner;
pub mod subversion;

pub use mock::MockRunner;
pub use runner::{CommandOutput, CommandRunner, SystemRunner};

use crate::concern::Concern;
use crate::domain::Version;
use crate::error::{DunamaiError, Result};
use crate::pattern::{CompiledPattern, Pattern, TagMatch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Which version control system produced a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vcs {
    /// Not tied to a particular VCS
    Any,
    Git,
    Mercurial,
    Darcs,
    Subversion,
    Bazaar,
    Fossil,
    Pijul,
}

impl Vcs {
    /// Order in which [`from_any_vcs`] tries each system
    pub const DETECTION_ORDER: [Vcs; 7] = [
        Vcs::Git,
        Vcs::Mercurial,
        Vcs::Darcs,
        Vcs::Subversion,
        Vcs::Bazaar,
        Vcs::Fossil,
        Vcs::Pijul,
    ];

    fn name(&self) -> &'static str {
        match self {
            Vcs::Any => "any",
            Vcs::Git => "git",
            Vcs::Mercurial => "mercurial",
            Vcs::Darcs => "darcs",
            Vcs::Subversion => "subversion",
            Vcs::Bazaar => "bazaar",
            Vcs::Fossil => "fossil",
            Vcs::Pijul => "pijul",
        }
    }
}

impl fmt::Display for Vcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Vcs {
    type Err = DunamaiError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        [Vcs::Any]
            .into_iter()
            .chain(Vcs::DETECTION_ORDER)
            .find(|vcs| vcs.name() == lower)
            .ok_or_else(|| DunamaiError::config(format!("Unknown VCS '{}'", s)))
    }
}

/// Why a VCS could not be used at a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// The tool's executable was not found
    NotInstalled,
    /// The tool ran but rejected the path; holds its message
    NotRepository(String),
    /// The repository is owned by another user and the tool refused it
    DubiousOwnership,
    PermissionDenied,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::NotInstalled => write!(f, "not installed"),
            Unavailable::NotRepository(message) if message.is_empty() => {
                write!(f, "not a repository")
            }
            Unavailable::NotRepository(message) => write!(f, "not a repository: {}", message),
            Unavailable::DubiousOwnership => write!(
                f,
                "detected dubious ownership of the repository (see git's safe.directory)"
            ),
            Unavailable::PermissionDenied => write!(f, "permission denied"),
        }
    }
}

/// Options shared by every adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsOptions {
    pub pattern: Pattern,
    /// Text spliced after the pattern's start anchor
    pub pattern_prefix: Option<String>,
    /// Only consider the newest tag
    pub latest_tag: bool,
    /// Subversion directory holding tags
    pub tag_dir: String,
    /// Git branch whose tags are considered instead of HEAD's
    pub tag_branch: Option<String>,
    pub full_commit: bool,
    /// Truncate the full commit id to this many characters
    pub commit_length: Option<usize>,
    /// Git only: untracked files do not make the tree dirty
    pub ignore_untracked: bool,
    /// Fail instead of falling back to 0.0.0 or ignoring concerns
    pub strict: bool,
}

impl Default for VcsOptions {
    fn default() -> Self {
        VcsOptions {
            pattern: Pattern::Default,
            pattern_prefix: None,
            latest_tag: false,
            tag_dir: "tags".to_string(),
            tag_branch: None,
            full_commit: false,
            commit_length: None,
            ignore_untracked: false,
            strict: false,
        }
    }
}

impl VcsOptions {
    pub(crate) fn compiled_pattern(&self) -> Result<CompiledPattern> {
        self.pattern.compile(self.pattern_prefix.as_deref())
    }

    /// Pick the commit id to report. `commit_length` implies the full id,
    /// cut down to that many characters.
    pub fn commit_id(&self, full: &str, short: &str) -> String {
        match self.commit_length {
            Some(length) => full.chars().take(length).collect(),
            None if self.full_commit => full.to_string(),
            None => short.to_string(),
        }
    }
}

/// Everything an adapter learned about the working copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFacts {
    /// Tag that matched the pattern, with its parsed fields
    pub matched: Option<TagMatch>,
    /// Tags considered, newest first
    pub candidates: Vec<String>,
    /// Newer tags skipped because they did not match
    pub newer_unmatched: Vec<String>,
    pub distance: u64,
    pub commit: Option<String>,
    pub dirty: Option<bool>,
    pub branch: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub concerns: BTreeSet<Concern>,
}

impl RawFacts {
    /// Facts for a repository without any commit yet
    pub(crate) fn empty_repository(branch: Option<String>) -> Self {
        RawFacts {
            dirty: Some(true),
            branch,
            ..Default::default()
        }
    }

    /// Fill in the tag fields from a newest-first candidate list
    pub(crate) fn with_selection(mut self, candidates: Vec<String>, options: &VcsOptions) -> Result<Self> {
        let pattern = options.compiled_pattern()?;
        let selection = crate::pattern::select_tag(&candidates, &pattern, options.latest_tag);
        self.matched = selection.matched;
        self.newer_unmatched = selection.newer_unmatched;
        self.candidates = candidates;
        Ok(self)
    }

    pub fn tag(&self) -> Option<&str> {
        self.matched.as_ref().map(|m| m.tag.as_str())
    }
}

/// Where and how an adapter runs its commands
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub runner: &'a dyn CommandRunner,
    pub path: &'a Path,
}

impl<'a> Context<'a> {
    pub fn new(runner: &'a dyn CommandRunner, path: &'a Path) -> Self {
        Context { runner, path }
    }

    /// Run a status-like command and classify why it failed, if it did.
    pub(crate) fn probe(&self, program: &str, args: &[&str]) -> std::result::Result<(), Unavailable> {
        let output = match self.runner.run(program, args, self.path) {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Unavailable::NotInstalled),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(Unavailable::PermissionDenied)
            }
            Err(e) => return Err(Unavailable::NotRepository(e.to_string())),
        };
        if output.success() {
            return Ok(());
        }

        let message = output.combined();
        let lower = message.to_ascii_lowercase();
        if lower.contains("dubious ownership") {
            Err(Unavailable::DubiousOwnership)
        } else if lower.contains("permission denied") {
            Err(Unavailable::PermissionDenied)
        } else {
            Err(Unavailable::NotRepository(message))
        }
    }

    /// Run a command and return its output whatever the exit code.
    pub(crate) fn exec(&self, vcs: Vcs, program: &str, args: &[&str]) -> Result<CommandOutput> {
        self.runner
            .run(program, args, self.path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => DunamaiError::VcsUnavailable {
                    vcs,
                    reason: Unavailable::NotInstalled,
                },
                _ => DunamaiError::Io(e),
            })
    }

    /// Run a command accepting only the listed exit codes.
    pub(crate) fn run_codes(
        &self,
        vcs: Vcs,
        program: &str,
        args: &[&str],
        codes: &[i32],
    ) -> Result<CommandOutput> {
        let output = self.exec(vcs, program, args)?;
        match output.status {
            Some(code) if codes.contains(&code) => Ok(output),
            status => Err(DunamaiError::Command {
                vcs,
                command: command_line(program, args),
                status,
                output: output.combined(),
            }),
        }
    }

    /// Run a command that must succeed and return its trimmed stdout.
    pub(crate) fn run(&self, vcs: Vcs, program: &str, args: &[&str]) -> Result<String> {
        let output = self.run_codes(vcs, program, args, &[0])?;
        Ok(output.stdout.trim().to_string())
    }
}

fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a count printed by a VCS tool
pub(crate) fn parse_count(vcs: Vcs, what: &'static str, text: &str) -> Result<u64> {
    text.trim()
        .parse::<u64>()
        .map_err(|_| DunamaiError::unexpected(vcs, what, text))
}

/// Capability interface implemented once per VCS
pub trait Backend: Send + Sync {
    fn vcs(&self) -> Vcs;

    /// Check that the tool runs and accepts the path as a repository.
    fn probe(&self, ctx: &Context<'_>) -> std::result::Result<(), Unavailable>;

    /// Whether this VCS is usable at the path. Based on running the tool,
    /// never on the presence of metadata directories.
    fn detect(&self, ctx: &Context<'_>) -> bool {
        self.probe(ctx).is_ok()
    }

    /// Read facts from an archival file left by a source export.
    fn archival(&self, _ctx: &Context<'_>, _options: &VcsOptions) -> Result<Option<RawFacts>> {
        Ok(None)
    }

    /// Extract facts from a live repository.
    fn collect(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<RawFacts>;

    /// Probe, then collect. When the probe fails an archival file is the
    /// last resort before reporting the VCS as unavailable.
    fn get_info(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<RawFacts> {
        match self.probe(ctx) {
            Ok(()) => self.collect(ctx, options),
            Err(reason) => {
                debug!(vcs = %self.vcs(), %reason, "probe failed");
                match self.archival(ctx, options)? {
                    Some(facts) => Ok(facts),
                    None => Err(DunamaiError::VcsUnavailable {
                        vcs: self.vcs(),
                        reason,
                    }),
                }
            }
        }
    }
}

/// Adapter for `vcs`, or `None` for [`Vcs::Any`]
pub fn backend(vcs: Vcs) -> Option<&'static dyn Backend> {
    match vcs {
        Vcs::Any => None,
        Vcs::Git => Some(&git::Git),
        Vcs::Mercurial => Some(&mercurial::Mercurial),
        Vcs::Darcs => Some(&darcs::Darcs),
        Vcs::Subversion => Some(&subversion::Subversion),
        Vcs::Bazaar => Some(&bazaar::Bazaar),
        Vcs::Fossil => Some(&fossil::Fossil),
        Vcs::Pijul => Some(&pijul::Pijul),
    }
}

/// Determine the version from a specific VCS
pub fn from_vcs(vcs: Vcs, options: &VcsOptions, path: &Path) -> Result<Version> {
    from_vcs_with(&SystemRunner, vcs, options, path)
}

/// [`from_vcs`] with an injected runner
pub fn from_vcs_with(
    runner: &dyn CommandRunner,
    vcs: Vcs,
    options: &VcsOptions,
    path: &Path,
) -> Result<Version> {
    let Some(adapter) = backend(vcs) else {
        return from_any_vcs_with(runner, options, path);
    };
    // Reject a bad pattern before running anything.
    options.compiled_pattern()?;
    let ctx = Context::new(runner, path);
    let facts = adapter.get_info(&ctx, options)?;
    assemble(vcs, facts, options)
}

/// Determine the version from whichever VCS works at `path`
pub fn from_any_vcs(options: &VcsOptions, path: &Path) -> Result<Version> {
    from_any_vcs_with(&SystemRunner, options, path)
}

/// [`from_any_vcs`] with an injected runner.
///
/// Systems are tried in [`Vcs::DETECTION_ORDER`]. Only an unavailable VCS
/// moves on to the next one; any other failure is returned as is.
pub fn from_any_vcs_with(
    runner: &dyn CommandRunner,
    options: &VcsOptions,
    path: &Path,
) -> Result<Version> {
    let mut attempts = Vec::new();
    for vcs in Vcs::DETECTION_ORDER {
        match from_vcs_with(runner, vcs, options, path) {
            Err(DunamaiError::VcsUnavailable { vcs, reason }) => {
                debug!(%vcs, %reason, "skipping");
                attempts.push((vcs, reason));
            }
            other => return other,
        }
    }
    Err(DunamaiError::VcsNotDetected { attempts })
}

/// Turn adapter facts into a version, applying strict mode.
fn assemble(vcs: Vcs, facts: RawFacts, options: &VcsOptions) -> Result<Version> {
    if options.strict {
        if facts.concerns.contains(&Concern::ShallowRepository) {
            return Err(DunamaiError::ShallowRepository);
        }
        if facts.matched.is_none() {
            return Err(DunamaiError::NoMatchingTag {
                pattern: options.pattern.regex(options.pattern_prefix.as_deref()),
                tags: facts.candidates,
            });
        }
    }
    for concern in &facts.concerns {
        debug!(%vcs, concern = concern.code(), "{}", concern);
    }

    let mut version = match facts.matched {
        Some(matched) => {
            let mut version = Version::new(matched.base);
            version.stage = matched.stage;
            version.tagged_metadata = matched.tagged_metadata;
            version.epoch = matched.epoch;
            version.matched_tag = Some(matched.tag);
            version
        }
        None => Version::new([0, 0, 0]),
    };
    version.distance = facts.distance;
    version.commit = facts.commit;
    version.dirty = facts.dirty;
    version.branch = facts.branch;
    version.timestamp = facts.timestamp;
    version.concerns = facts.concerns;
    version.newer_tags = facts.newer_unmatched;
    version.vcs = vcs;
    Ok(version)
}

impl Version {
    /// Determine the version from `vcs`, [`Vcs::Any`] meaning autodetection
    pub fn from_vcs(vcs: Vcs, options: &VcsOptions, path: &Path) -> Result<Version> {
        from_vcs(vcs, options, path)
    }

    pub fn from_any_vcs(options: &VcsOptions, path: &Path) -> Result<Version> {
        from_any_vcs(options, path)
    }

    pub fn from_git(options: &VcsOptions, path: &Path) -> Result<Version> {
        from_vcs(Vcs::Git, options, path)
    }

    pub fn from_mercurial(options: &VcsOptions, path: &Path) -> Result<Version> {
        from_vcs(Vcs::Mercurial, options, path)
    }

    pub fn from_darcs(options: &VcsOptions, path: &Path) -> Result<Version> {
        from_vcs(Vcs::Darcs, options, path)
    }

    pub fn from_subversion(options: &VcsOptions, path: &Path) -> Result<Version> {
        from_vcs(Vcs::Subversion, options, path)
    }

    pub fn from_bazaar(options: &VcsOptions, path: &Path) -> Result<Version> {
        from_vcs(Vcs::Bazaar, options, path)
    }

    pub fn from_fossil(options: &VcsOptions, path: &Path) -> Result<Version> {
        from_vcs(Vcs::Fossil, options, path)
    }

    pub fn from_pijul(options: &VcsOptions, path: &Path) -> Result<Version> {
        from_vcs(Vcs::Pijul, options, path)
    }
}
