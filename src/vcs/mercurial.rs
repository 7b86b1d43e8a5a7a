//! Mercurial adapter.

use crate::error::{DunamaiError, Result};
use crate::vcs::archival::{self, parse_timestamp};
use crate::vcs::{parse_count, Backend, Context, RawFacts, Unavailable, Vcs, VcsOptions};
use std::fs;
use tracing::debug;

/// Mercurial backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Mercurial;

impl Mercurial {
    fn hg(&self, ctx: &Context<'_>, args: &[&str]) -> Result<String> {
        ctx.run(Vcs::Mercurial, "hg", args)
    }
}

/// Split `hg log` tag output into names, newest commit first.
///
/// Each line lists the tags of one commit joined by `:`. Tags sharing a
/// commit are ordered by name, descending. `tip` is not a real tag.
pub fn parse_tag_lines(output: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for line in output.lines() {
        let mut names: Vec<&str> = line
            .split(':')
            .map(str::trim)
            .filter(|name| !name.is_empty() && *name != "tip")
            .collect();
        names.sort_by(|a, b| b.cmp(a));
        tags.extend(names.into_iter().map(str::to_string));
    }
    tags
}

impl Backend for Mercurial {
    fn vcs(&self) -> Vcs {
        Vcs::Mercurial
    }

    fn probe(&self, ctx: &Context<'_>) -> std::result::Result<(), Unavailable> {
        ctx.probe("hg", &["status"])
    }

    fn archival(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<Option<RawFacts>> {
        match archival::find_upward(ctx.path, archival::HG_ARCHIVAL_FILE, ".hg") {
            Some(file) => {
                debug!(file = %file.display(), "reading mercurial archival file");
                archival::read_hg_archival(&fs::read_to_string(file)?, options)
            }
            None => Ok(None),
        }
    }

    fn collect(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<RawFacts> {
        let summary = self.hg(ctx, &["summary"])?;
        let dirty = summary
            .lines()
            .find(|line| line.starts_with("commit:"))
            .map(|line| !line.contains("(clean)"))
            .ok_or_else(|| DunamaiError::unexpected(Vcs::Mercurial, "commit status", &summary))?;
        let branch = Some(self.hg(ctx, &["branch"])?).filter(|b| !b.is_empty());

        let short = self.hg(ctx, &["id", "--template", "{id|short}"])?;
        if short.chars().all(|c| c == '0') {
            debug!("repository has no commits");
            return Ok(RawFacts::empty_repository(branch));
        }
        let commit = if options.full_commit || options.commit_length.is_some() {
            let full = self.hg(ctx, &["id", "--template", "{id}"])?;
            options.commit_id(&full, &short)
        } else {
            short.clone()
        };

        let timestamp = self.hg(ctx, &["log", "--limit", "1", "--template", "{date|rfc3339date}"])?;
        let facts = RawFacts {
            commit: Some(commit),
            dirty: Some(dirty),
            branch,
            timestamp: parse_timestamp(&timestamp),
            ..Default::default()
        };

        let revset = format!("sort(tag() and ancestors({}), -rev)", short);
        let tags = self.hg(ctx, &["log", "-r", &revset, "--template", "{join(tags, ':')}\\n"])?;
        let facts = facts.with_selection(parse_tag_lines(&tags), options)?;

        let distance = match facts.tag() {
            Some(tag) => {
                let revset = format!("{tag}::{short} - {tag}");
                let dots = self.hg(ctx, &["log", "-r", &revset, "--template", "."])?;
                // The commit recording the tag sits after the tagged commit.
                (dots.len() as u64).saturating_sub(1)
            }
            None => {
                let tip = self.hg(ctx, &["id", "--num", "--rev", "tip"])?;
                parse_count(Vcs::Mercurial, "revision number", &tip)? + 1
            }
        };
        Ok(RawFacts { distance, ..facts })
    }
}
