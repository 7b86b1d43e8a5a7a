//! Rendering versions as strings.
//!
//! - [`pep440`], [`semver`] and [`pvp`] render the built-in styles
//! - [`template`] renders custom `{placeholder}` formats
//!
//! Whatever produced the string, a requested style is enforced afterwards
//! through [`check_version`].

pub mod pep440;
pub mod pvp;
pub mod semver;
pub mod template;

pub use pep440::{serialize_pep440, Pep440Parts};
pub use pvp::serialize_pvp;
pub use semver::serialize_semver;

use crate::domain::Version;
use crate::error::Result;
use crate::style::{check_version, Style};

/// Flags controlling how a [`Version`] is rendered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// `Some(true)` always adds the commit, `Some(false)` never adds any
    /// metadata, `None` adds the commit only off-tag
    pub metadata: Option<bool>,
    /// Add a `dirty` marker when the working tree is dirty
    pub dirty: bool,
    /// Custom template, overriding the style's layout
    pub format: Option<String>,
    /// Style to render and validate against
    pub style: Option<Style>,
    /// Smart-bump before rendering
    pub bump: bool,
    /// Add the metadata captured from the tag
    pub tagged_metadata: bool,
    /// Text placed before the commit id
    pub commit_prefix: Option<String>,
    /// Replacement for characters stripped from `{branch_escaped}`
    pub escape_with: Option<String>,
}

impl SerializeOptions {
    pub fn with_style(style: Style) -> Self {
        SerializeOptions {
            style: Some(style),
            ..Default::default()
        }
    }
}

impl Version {
    /// Render with `options`.
    ///
    /// Without a format the style (PEP 440 by default) decides the layout.
    /// The result is validated whenever a style applies, including a
    /// custom format combined with an explicit style.
    pub fn serialize(&self, options: &SerializeOptions) -> Result<String> {
        let version = if options.bump {
            self.bump(1)
        } else {
            self.clone()
        };

        if let Some(format) = &options.format {
            let rendered = template::render(format, &version, options)?;
            if let Some(style) = options.style {
                check_version(&rendered, style)?;
            }
            return Ok(rendered);
        }

        let style = options.style.unwrap_or(Style::Pep440);
        let rendered = match style {
            Style::Pep440 => pep440::render(&version, options),
            Style::SemVer => semver::render(&version, options),
            Style::Pvp => pvp::render(&version, options),
        };
        check_version(&rendered, style)?;
        Ok(rendered)
    }

    /// Render through a callback, validating against `style` if given.
    ///
    /// The callback gets a copy, so `self` is never modified.
    pub fn serialize_with<F>(&self, format: F, style: Option<Style>) -> Result<String>
    where
        F: FnOnce(Version) -> String,
    {
        let rendered = format(self.clone());
        if let Some(style) = style {
            check_version(&rendered, style)?;
        }
        Ok(rendered)
    }
}

/// Metadata items shared by every style, in order: commit, dirty marker,
/// tagged metadata.
pub(crate) fn metadata_items(version: &Version, options: &SerializeOptions) -> Vec<String> {
    let mut items = Vec::new();
    if options.metadata == Some(false) {
        return items;
    }

    if let Some(commit) = &version.commit {
        if options.metadata == Some(true) || version.distance > 0 {
            let prefix = options.commit_prefix.as_deref().unwrap_or("");
            items.push(format!("{}{}", prefix, commit));
        }
    }
    if options.dirty && version.dirty == Some(true) {
        items.push("dirty".to_string());
    }
    if options.tagged_metadata {
        if let Some(tagged) = &version.tagged_metadata {
            items.push(tagged.clone());
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DunamaiError;

    fn opts() -> SerializeOptions {
        SerializeOptions::default()
    }

    #[test]
    fn test_default_style_is_pep440() {
        let v = Version::new([0, 1, 0]).with_distance(1).with_commit("abc");
        assert_eq!(v.serialize(&opts()).unwrap(), "0.1.0.post1.dev0+abc");
        assert_eq!(v.to_string(), "0.1.0.post1.dev0+abc");
    }

    #[test]
    fn test_idempotent() {
        let v = Version::new([1, 2, 3])
            .with_stage("rc", Some(1))
            .with_distance(4)
            .with_commit("abc")
            .with_dirty(true);
        let options = SerializeOptions {
            dirty: true,
            ..opts()
        };
        assert_eq!(v.serialize(&options).unwrap(), v.serialize(&options).unwrap());
    }

    #[test]
    fn test_metadata_order() {
        let v = Version::new([0, 1, 0])
            .with_distance(1)
            .with_commit("abc")
            .with_dirty(true)
            .with_tagged_metadata("def");
        let options = SerializeOptions {
            dirty: true,
            tagged_metadata: true,
            ..opts()
        };
        assert_eq!(metadata_items(&v, &options), vec!["abc", "dirty", "def"]);

        let options = SerializeOptions {
            metadata: Some(false),
            ..options
        };
        assert!(metadata_items(&v, &options).is_empty());
    }

    #[test]
    fn test_commit_prefix() {
        let v = Version::new([0, 1, 0]).with_distance(1).with_commit("abc");
        let options = SerializeOptions {
            commit_prefix: Some("g".to_string()),
            ..opts()
        };
        assert_eq!(v.serialize(&options).unwrap(), "0.1.0.post1.dev0+gabc");
    }

    #[test]
    fn test_format_validated_against_style() {
        let v = Version::new([0, 1, 0]);
        let options = SerializeOptions {
            format: Some("v{base}".to_string()),
            style: Some(Style::Pep440),
            ..opts()
        };
        let err = v.serialize(&options).unwrap_err();
        assert!(matches!(err, DunamaiError::InvalidVersion { .. }));

        let unchecked = SerializeOptions {
            format: Some("v{base}".to_string()),
            ..opts()
        };
        assert_eq!(v.serialize(&unchecked).unwrap(), "v0.1.0");
    }

    #[test]
    fn test_serialize_with_callback() {
        let v = Version::new([1]).with_stage("a", Some(2));
        let rendered = v
            .serialize_with(
                |v| {
                    let base = v.base_string();
                    let stage = v.stage.unwrap();
                    format!("{},{},{}", base, stage.name, stage.revision.unwrap())
                },
                None,
            )
            .unwrap();
        assert_eq!(rendered, "1,a,2");

        assert!(v
            .serialize_with(|v| format!("v{}", v.base_string()), Some(Style::Pep440))
            .is_err());
    }

    #[test]
    fn test_callback_cannot_modify_original() {
        let v = Version::new([0, 1, 0]);
        v.serialize_with(
            |mut copy| {
                copy.distance += 100;
                copy.to_string()
            },
            None,
        )
        .unwrap();
        assert_eq!(v.distance, 0);
    }

    #[test]
    fn test_round_trip_through_validators() {
        let versions = [
            Version::new([0, 1, 0]),
            Version::new([1, 2, 3]).with_stage("alpha", Some(2)),
            Version::new([1, 2, 3])
                .with_stage("beta", None)
                .with_distance(7)
                .with_commit("abc1234")
                .with_dirty(true),
            Version::new([2, 0, 0]).with_distance(3).with_commit("f00"),
        ];
        for v in &versions {
            for style in [Style::Pep440, Style::SemVer, Style::Pvp] {
                let options = SerializeOptions {
                    dirty: true,
                    style: Some(style),
                    ..opts()
                };
                let rendered = v.serialize(&options).unwrap();
                assert!(check_version(&rendered, style).is_ok(), "{}", rendered);
            }
        }
    }
}
