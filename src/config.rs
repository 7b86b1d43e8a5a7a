use crate::error::{DunamaiError, Result};
use crate::pattern::Pattern;
use crate::serialize::SerializeOptions;
use crate::style::Style;
use crate::vcs::VcsOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up next to the inspected project, in the working
/// directory and in the user config directory
pub const CONFIG_FILE: &str = "dunamai.toml";

/// Settings read from `dunamai.toml`.
///
/// Every value is optional so that command-line flags can override the file
/// and the file can override the built-in defaults.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub vcs: VcsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// How tags are found and matched.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct VcsConfig {
    /// Preset name (`default`, `default-unprefixed`) or a regular expression
    pub pattern: Option<String>,
    pub pattern_prefix: Option<String>,
    pub latest_tag: Option<bool>,
    pub tag_dir: Option<String>,
    pub tag_branch: Option<String>,
    pub full_commit: Option<bool>,
    pub commit_length: Option<usize>,
    pub ignore_untracked: Option<bool>,
    pub strict: Option<bool>,
}

/// How the version is rendered.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct OutputConfig {
    pub metadata: Option<bool>,
    pub dirty: Option<bool>,
    pub tagged_metadata: Option<bool>,
    pub format: Option<String>,
    pub style: Option<Style>,
    pub bump: Option<bool>,
    pub commit_prefix: Option<String>,
    pub escape_with: Option<String>,
}

impl VcsConfig {
    /// Build adapter options, validating the pattern.
    pub fn to_options(&self) -> Result<VcsOptions> {
        let defaults = VcsOptions::default();
        let pattern = match &self.pattern {
            Some(text) => text.parse::<Pattern>()?,
            None => defaults.pattern,
        };
        Ok(VcsOptions {
            pattern,
            pattern_prefix: self.pattern_prefix.clone(),
            latest_tag: self.latest_tag.unwrap_or(defaults.latest_tag),
            tag_dir: self.tag_dir.clone().unwrap_or(defaults.tag_dir),
            tag_branch: self.tag_branch.clone(),
            full_commit: self.full_commit.unwrap_or(defaults.full_commit),
            commit_length: self.commit_length,
            ignore_untracked: self.ignore_untracked.unwrap_or(defaults.ignore_untracked),
            strict: self.strict.unwrap_or(defaults.strict),
        })
    }
}

impl OutputConfig {
    pub fn to_options(&self) -> SerializeOptions {
        SerializeOptions {
            metadata: self.metadata,
            dirty: self.dirty.unwrap_or(false),
            format: self.format.clone(),
            style: self.style,
            bump: self.bump.unwrap_or(false),
            tagged_metadata: self.tagged_metadata.unwrap_or(false),
            commit_prefix: self.commit_prefix.clone(),
            escape_with: self.escape_with.clone(),
        }
    }
}

fn locate(config_path: Option<&str>, project_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = config_path {
        return Some(PathBuf::from(path));
    }
    [project_dir, Path::new(".")]
        .into_iter()
        .map(|dir| dir.join(CONFIG_FILE))
        .chain(dirs::config_dir().map(|dir| dir.join(CONFIG_FILE)))
        .find(|path| path.exists())
}

/// Loads configuration from file or returns defaults.
///
/// Lookup order:
/// 1. The path given as parameter
/// 2. `dunamai.toml` in the current directory
/// 3. `dunamai.toml` in the user config directory
/// 4. Defaults when no file is found
///
/// An explicit path that cannot be read is an error, as is any file that
/// is not valid TOML for [`Config`].
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    load_project_config(config_path, Path::new("."))
}

/// Like [`load_config`], but looks for `dunamai.toml` in `project_dir`
/// before the current directory.
pub fn load_project_config(config_path: Option<&str>, project_dir: &Path) -> Result<Config> {
    let Some(path) = locate(config_path, project_dir) else {
        return Ok(Config::default());
    };
    let text = fs::read_to_string(&path)?;
    toml::from_str(&text).map_err(|e| {
        DunamaiError::config(format!("Cannot parse {}: {}", path.display(), e))
    })
}
