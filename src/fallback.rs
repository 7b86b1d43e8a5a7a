//! Choosing a version from several sources in order of preference.
//!
//! A program that may run from a checkout or from an installed build can
//! ask the VCS first and fall back to the version it was built with:
//!
//! ```no_run
//! use dunamai::{Version, VcsOptions, VersionLookup};
//!
//! let version = VersionLookup::new()
//!     .installed(env!("CARGO_PKG_VERSION"))
//!     .third_choice(|| Version::from_any_vcs(&VcsOptions::default(), ".".as_ref()).ok())
//!     .get();
//! println!("{}", version);
//! ```

use crate::domain::Version;
use crate::pattern::Pattern;
use tracing::debug;

type Choice<'a> = Box<dyn Fn() -> Option<Version> + 'a>;

/// Builder trying a first choice, an installed version string, a third
/// choice, and finally a fixed fallback
pub struct VersionLookup<'a> {
    first_choice: Option<Choice<'a>>,
    installed: Option<String>,
    third_choice: Option<Choice<'a>>,
    ignore: Vec<Version>,
    fallback: Version,
}

impl<'a> VersionLookup<'a> {
    pub fn new() -> Self {
        VersionLookup {
            first_choice: None,
            installed: None,
            third_choice: None,
            ignore: Vec::new(),
            fallback: Version::new([0, 0, 0]),
        }
    }

    pub fn first_choice(mut self, choice: impl Fn() -> Option<Version> + 'a) -> Self {
        self.first_choice = Some(Box::new(choice));
        self
    }

    /// Version string of the installed build, such as `CARGO_PKG_VERSION`
    pub fn installed(mut self, version: impl Into<String>) -> Self {
        self.installed = Some(version.into());
        self
    }

    pub fn third_choice(mut self, choice: impl Fn() -> Option<Version> + 'a) -> Self {
        self.third_choice = Some(Box::new(choice));
        self
    }

    /// Skip candidates matching any of these. Only the base and the fields
    /// set in an entry are compared.
    pub fn ignore(mut self, versions: impl IntoIterator<Item = Version>) -> Self {
        self.ignore.extend(versions);
        self
    }

    /// Version returned when nothing else applies, 0.0.0 by default
    pub fn fallback(mut self, version: Version) -> Self {
        self.fallback = version;
        self
    }

    fn is_ignored(&self, version: &Version) -> bool {
        self.ignore.iter().any(|entry| matches_entry(entry, version))
    }

    fn accept(&self, source: &str, version: Option<Version>) -> Option<Version> {
        let version = version?;
        if self.is_ignored(&version) {
            debug!(source, %version, "ignoring version");
            return None;
        }
        debug!(source, %version, "using version");
        Some(version)
    }

    /// Resolve the version
    pub fn get(&self) -> Version {
        if let Some(version) = self.accept("first choice", self.first_choice.as_ref().and_then(|f| f())) {
            return version;
        }

        let installed = self.installed.as_deref().and_then(|text| {
            Version::parse(text, &Pattern::Default)
                .map_err(|e| debug!(error = %e, "installed version is not parseable"))
                .ok()
        });
        if let Some(version) = self.accept("installed", installed) {
            return version;
        }

        if let Some(version) = self.accept("third choice", self.third_choice.as_ref().and_then(|f| f())) {
            return version;
        }

        self.fallback.clone()
    }
}

impl Default for VersionLookup<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_entry(entry: &Version, version: &Version) -> bool {
    fn field<T: PartialEq>(wanted: &Option<T>, actual: &Option<T>) -> bool {
        wanted.is_none() || wanted == actual
    }

    entry.base == version.base
        && (entry.distance == 0 || entry.distance == version.distance)
        && field(&entry.stage, &version.stage)
        && field(&entry.commit, &version.commit)
        && field(&entry.dirty, &version.dirty)
        && field(&entry.tagged_metadata, &version.tagged_metadata)
        && field(&entry.epoch, &version.epoch)
}
