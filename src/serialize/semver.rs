use crate::domain::Version;
use crate::error::Result;
use crate::serialize::{metadata_items, SerializeOptions};
use crate::style::{check_version, Style};

fn assemble(base: &str, pre: &[String], metadata: &[String]) -> String {
    let mut out = base.to_string();
    if !pre.is_empty() {
        out.push('-');
        out.push_str(&pre.join("."));
    }
    if !metadata.is_empty() {
        out.push('+');
        out.push_str(&metadata.join("."));
    }
    out
}

/// Assemble and validate a Semantic Versioning string from its pieces.
pub fn serialize_semver(base: &str, pre: &[String], metadata: &[String]) -> Result<String> {
    let rendered = assemble(base, pre, metadata);
    check_version(&rendered, Style::SemVer)?;
    Ok(rendered)
}

/// Pre-release identifiers: stage, revision, then `post`/`pre` and the
/// distance. Epochs have no SemVer counterpart and are dropped.
pub(crate) fn pre_release_items(version: &Version) -> Vec<String> {
    let mut pre = Vec::new();
    if let Some(stage) = &version.stage {
        pre.push(stage.name.clone());
        if let Some(revision) = stage.revision {
            pre.push(revision.to_string());
        }
    }
    if version.distance > 0 {
        let marker = if version.is_smart_bumped() { "pre" } else { "post" };
        pre.push(marker.to_string());
        pre.push(version.distance.to_string());
    }
    pre
}

pub(crate) fn render(version: &Version, options: &SerializeOptions) -> String {
    assemble(
        &version.base_string(),
        &pre_release_items(version),
        &metadata_items(version, options),
    )
}
