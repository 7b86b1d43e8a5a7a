use crate::domain::Version;
use crate::error::Result;
use crate::serialize::semver::pre_release_items;
use crate::serialize::{metadata_items, SerializeOptions};
use crate::style::{check_version, Style};

fn assemble(base: &str, tags: &[String]) -> String {
    let mut out = base.to_string();
    for tag in tags {
        out.push('-');
        out.push_str(tag);
    }
    out
}

/// Assemble and validate a PVP version. PVP has no build metadata
/// separator, so every tag follows the base after a dash.
pub fn serialize_pvp(base: &str, tags: &[String]) -> Result<String> {
    let rendered = assemble(base, tags);
    check_version(&rendered, Style::Pvp)?;
    Ok(rendered)
}

pub(crate) fn render(version: &Version, options: &SerializeOptions) -> String {
    let mut tags = pre_release_items(version);
    tags.extend(metadata_items(version, options));
    assemble(&version.base_string(), &tags)
}
