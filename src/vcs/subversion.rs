//! Subversion adapter.
//!
//! Subversion tags are plain copies under a tag directory. A tag's position
//! in history is the revision it was copied from, found by walking its log
//! back to the copy.

use crate::error::Result;
use crate::vcs::archival::parse_timestamp;
use crate::vcs::{parse_count, Backend, Context, RawFacts, Unavailable, Vcs, VcsOptions};
use regex::Regex;
use tracing::debug;

/// Subversion backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Subversion;

/// A tag directory with the revisions that place it in history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvnTag {
    pub name: String,
    /// Revision that created the tag
    pub revision: u64,
    /// Revision the tag was copied from
    pub source: u64,
}

/// Parse `svn ls -v` output into `(name, revision)` pairs.
pub fn parse_listing(output: &str) -> Vec<(String, u64)> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let revision = fields.first()?.parse::<u64>().ok()?;
            let name = fields.last()?.trim_end_matches('/');
            (name != "." && !name.is_empty()).then(|| (name.to_string(), revision))
        })
        .collect()
}

/// Find the copy source revision in `svn log -v --stop-on-copy` output.
pub fn parse_copy_source(log: &str, tag_dir: &str, tag: &str) -> Option<u64> {
    let expr = format!(
        r"(?m)^\s*A /{}/{} \(from .+:(\d+)\)",
        regex::escape(tag_dir),
        regex::escape(tag)
    );
    let regex = Regex::new(&expr).ok()?;
    regex.captures(log)?[1].parse().ok()
}

/// Newest first: by source revision, then by tagging revision.
pub fn sort_tags(tags: &mut [SvnTag]) {
    tags.sort_by(|a, b| (b.source, b.revision).cmp(&(a.source, a.revision)));
}

impl Subversion {
    fn svn(&self, ctx: &Context<'_>, args: &[&str]) -> Result<String> {
        ctx.run(Vcs::Subversion, "svn", args)
    }

    fn tags(&self, ctx: &Context<'_>, url: &str, revision: u64, tag_dir: &str) -> Result<Vec<SvnTag>> {
        let tags_url = format!("{}/{}", url, tag_dir);
        let rev = revision.to_string();
        let listing = ctx.exec(Vcs::Subversion, "svn", &["ls", "-v", "-r", &rev, &tags_url])?;
        if !listing.success() {
            debug!(url = %tags_url, "no tag directory");
            return Ok(Vec::new());
        }

        let mut tags = Vec::new();
        for (name, tag_revision) in parse_listing(&listing.stdout) {
            let tag_url = format!("{}/{}", tags_url, name);
            let log = self.svn(ctx, &["log", "-v", &tag_url, "--stop-on-copy"])?;
            let source = parse_copy_source(&log, tag_dir, &name).unwrap_or(tag_revision);
            tags.push(SvnTag {
                name,
                revision: tag_revision,
                source,
            });
        }
        sort_tags(&mut tags);
        Ok(tags)
    }
}

impl Backend for Subversion {
    fn vcs(&self) -> Vcs {
        Vcs::Subversion
    }

    fn probe(&self, ctx: &Context<'_>) -> std::result::Result<(), Unavailable> {
        ctx.probe("svn", &["info"])
    }

    fn collect(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<RawFacts> {
        let dirty = !self.svn(ctx, &["status"])?.is_empty();
        let url = self.svn(ctx, &["info", "--show-item", "repos-root-url"])?;
        let revision = self.svn(ctx, &["info", "--show-item", "revision"])?;
        let revision = parse_count(Vcs::Subversion, "revision", &revision)?;
        if revision == 0 {
            debug!("repository has no commits");
            return Ok(RawFacts::empty_repository(None));
        }
        let timestamp = self.svn(ctx, &["info", "--show-item", "last-changed-date"])?;

        let facts = RawFacts {
            commit: Some(revision.to_string()),
            dirty: Some(dirty),
            timestamp: parse_timestamp(&timestamp),
            ..Default::default()
        };

        let tag_dir = options.tag_dir.trim_matches('/');
        let tags = self.tags(ctx, url.trim_end_matches('/'), revision, tag_dir)?;
        let names = tags.iter().map(|tag| tag.name.clone()).collect();
        let facts = facts.with_selection(names, options)?;

        let distance = match facts.tag() {
            Some(name) => {
                let source = tags
                    .iter()
                    .find(|tag| tag.name == name)
                    .map(|tag| tag.source)
                    .unwrap_or(revision);
                // The tagging commit itself does not count.
                revision.saturating_sub(1).saturating_sub(source)
            }
            None => revision,
        };
        Ok(RawFacts { distance, ..facts })
    }
}
