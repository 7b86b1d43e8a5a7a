use crate::concern::Concern;
use crate::domain::Stage;
use crate::error::{DunamaiError, Result};
use crate::pattern::Pattern;
use crate::vcs::Vcs;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

static DISTANCE_METADATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^d?(\d+)$").expect("static regex"));
static COMMIT_METADATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^g?([0-9a-z]+)$").expect("static regex"));
static POST_DEV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.post(\d+)\.dev\d+").expect("static regex"));

/// A version derived from VCS state.
///
/// Equality and ordering look at `base`, `stage`, `distance`, `epoch`,
/// `commit`, `dirty` and `tagged_metadata`. The remaining fields are
/// informational.
#[derive(Debug, Clone)]
pub struct Version {
    /// Release numbers, never empty
    pub base: Vec<u64>,
    pub stage: Option<Stage>,
    /// Commits since the matched tag
    pub distance: u64,
    pub commit: Option<String>,
    /// `None` when the working tree was not inspected
    pub dirty: Option<bool>,
    pub tagged_metadata: Option<String>,
    pub epoch: Option<u64>,
    pub branch: Option<String>,
    /// Time of the current commit
    pub timestamp: Option<DateTime<Utc>>,
    pub concerns: BTreeSet<Concern>,
    pub vcs: Vcs,
    /// Tag the version was derived from
    pub matched_tag: Option<String>,
    /// Tags newer than `matched_tag` that did not match the pattern
    pub newer_tags: Vec<String>,
    smart_bumped: bool,
}

/// Parameters for [`Version::bump_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bump {
    /// Position in `base`; negative values count from the end
    pub index: isize,
    pub increment: u64,
    /// Leave versions sitting exactly on a tag untouched
    pub smart: bool,
}

impl Default for Bump {
    fn default() -> Self {
        Bump {
            index: -1,
            increment: 1,
            smart: false,
        }
    }
}

impl Version {
    /// Create a version from release numbers. An empty base means 0.0.0.
    pub fn new(base: impl Into<Vec<u64>>) -> Self {
        let mut base = base.into();
        if base.is_empty() {
            base = vec![0, 0, 0];
        }
        Version {
            base,
            stage: None,
            distance: 0,
            commit: None,
            dirty: None,
            tagged_metadata: None,
            epoch: None,
            branch: None,
            timestamp: None,
            concerns: BTreeSet::new(),
            vcs: Vcs::Any,
            matched_tag: None,
            newer_tags: Vec::new(),
            smart_bumped: false,
        }
    }

    pub fn with_stage(mut self, name: impl Into<String>, revision: Option<u64>) -> Self {
        let name = name.into();
        self.stage = if name.is_empty() {
            None
        } else {
            Some(Stage { name, revision })
        };
        self
    }

    pub fn with_distance(mut self, distance: u64) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    pub fn with_dirty(mut self, dirty: bool) -> Self {
        self.dirty = Some(dirty);
        self
    }

    pub fn with_tagged_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.tagged_metadata = Some(metadata.into());
        self
    }

    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = Some(epoch);
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_vcs(mut self, vcs: Vcs) -> Self {
        self.vcs = vcs;
        self
    }

    /// Release numbers joined with dots, like "1.2.3"
    pub fn base_string(&self) -> String {
        join_base(&self.base)
    }

    /// Whether this value came out of a smart bump with a distance to
    /// account for. PEP 440 then renders `.devN` rather than `.postN.dev0`.
    pub fn is_smart_bumped(&self) -> bool {
        self.smart_bumped
    }

    /// Parse a version string with `pattern`.
    ///
    /// Metadata after `+` is mined for `dirty`/`clean`, a distance (`7` or
    /// `d7`) and a commit (`abc123` or `gabc123`). Output of this crate's
    /// own PEP 440 style is understood: `1.2.3.post4.dev0` has distance 4
    /// and `1.2.3.dev5` has distance 5.
    pub fn parse(version: &str, pattern: &Pattern) -> Result<Version> {
        let compiled = pattern.compile(None)?;
        let normalized = if *pattern == Pattern::Default && !version.starts_with('v') {
            format!("v{}", version)
        } else {
            version.to_string()
        };

        let matched = match compiled.match_tag(&normalized) {
            Some(matched) => matched,
            None => {
                let rewritten = POST_DEV.replacen(version, 1, ".dev$1");
                if rewritten != version {
                    return Version::parse(&rewritten, pattern);
                }
                return Err(DunamaiError::UnparsableVersion {
                    version: version.to_string(),
                    pattern: pattern.to_string(),
                });
            }
        };

        let mut parsed = Version::new(matched.base);
        parsed.stage = matched.stage;
        parsed.epoch = matched.epoch;

        let mut distance = None;
        if let Some(metadata) = matched.tagged_metadata {
            let mut rest = Vec::new();
            for part in metadata.split('.') {
                if parsed.dirty.is_none() && (part == "dirty" || part == "clean") {
                    parsed.dirty = Some(part == "dirty");
                    continue;
                }
                if distance.is_none() {
                    if let Some(caps) = DISTANCE_METADATA.captures(part) {
                        distance = caps[1].parse::<u64>().ok();
                        if distance.is_some() {
                            continue;
                        }
                    }
                }
                if parsed.commit.is_none() {
                    if let Some(caps) = COMMIT_METADATA.captures(part) {
                        parsed.commit = Some(caps[1].to_string());
                        continue;
                    }
                }
                rest.push(part);
            }
            let rest = rest.join(".");
            if !rest.trim().is_empty() {
                parsed.tagged_metadata = Some(rest);
            }
        }
        parsed.distance = distance.unwrap_or(0);

        if let Some(Stage {
            name,
            revision: Some(revision),
        }) = &parsed.stage
        {
            if name.eq_ignore_ascii_case("dev") {
                parsed.distance += revision;
                parsed.stage = None;
            }
        }

        Ok(parsed)
    }

    /// Bump the last release number, or the stage revision when a stage
    /// is present. A version exactly on its tag (distance 0) is returned
    /// unchanged.
    pub fn bump(&self, increment: u64) -> Version {
        let bump = Bump {
            increment,
            smart: true,
            ..Bump::default()
        };
        // index -1 always exists because base is never empty
        self.bump_with(bump).unwrap_or_else(|_| self.clone())
    }

    /// Bump with explicit control over the index and smart behaviour.
    /// Components after the bumped index reset to zero.
    pub fn bump_with(&self, bump: Bump) -> Result<Version> {
        let mut bumped = self.clone();
        if bump.smart {
            if self.distance == 0 {
                return Ok(bumped);
            }
            bumped.smart_bumped = true;
        }

        match &mut bumped.stage {
            None => bumped.base = bump_components(&self.base, bump.index, bump.increment)?,
            Some(stage) => {
                stage.revision = Some(stage.revision.unwrap_or(1) + bump.increment);
            }
        }
        Ok(bumped)
    }

    fn comparison_key(&self) -> ComparisonKey<'_> {
        (
            &self.base,
            StageKey(&self.stage),
            self.distance,
            self.epoch,
            self.commit.as_deref(),
            self.dirty,
            self.tagged_metadata.as_deref(),
        )
    }
}

type ComparisonKey<'a> = (
    &'a [u64],
    StageKey<'a>,
    u64,
    Option<u64>,
    Option<&'a str>,
    Option<bool>,
    Option<&'a str>,
);

/// Orders "no stage" above any stage so releases sort after their
/// pre-releases.
#[derive(PartialEq, Eq)]
struct StageKey<'a>(&'a Option<Stage>);

impl PartialOrd for StageKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StageKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparison_key().cmp(&other.comparison_key())
    }
}

impl fmt::Display for Version {
    /// Default PEP 440 rendering without validation
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = crate::serialize::pep440::render(self, &Default::default());
        write!(f, "{}", rendered)
    }
}

pub(crate) fn join_base(base: &[u64]) -> String {
    base.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

fn bump_components(base: &[u64], index: isize, increment: u64) -> Result<Vec<u64>> {
    let len = base.len() as isize;
    let position = if index < 0 { len + index } else { index };
    if position < 0 || position >= len {
        return Err(DunamaiError::config(format!(
            "Bump index {} is out of range for version {}",
            index,
            join_base(base)
        )));
    }
    let position = position as usize;

    Ok(base
        .iter()
        .enumerate()
        .map(|(i, value)| match i.cmp(&position) {
            Ordering::Less => *value,
            Ordering::Equal => value + increment,
            Ordering::Greater => 0,
        })
        .collect())
}

/// Bump one component of a dotted version string, like "1.2.3" to "1.3.0".
pub fn bump_version(base: &str, index: isize, increment: u64) -> Result<String> {
    let components = base
        .split('.')
        .map(|part| part.parse::<u64>())
        .collect::<std::result::Result<Vec<u64>, _>>()
        .map_err(|_| {
            DunamaiError::config(format!(
                "Version base '{}' is not dot-separated integers",
                base
            ))
        })?;
    Ok(join_base(&bump_components(&components, index, increment)?))
}
