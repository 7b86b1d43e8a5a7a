//! Git adapter built on the `git` command line.

use crate::concern::Concern;
use crate::error::{DunamaiError, Result};
use crate::vcs::archival::{self, parse_timestamp};
use crate::vcs::{parse_count, Backend, Context, RawFacts, Unavailable, Vcs, VcsOptions};
use chrono::{DateTime, Utc};
use std::fs;
use tracing::debug;

const TAG_FORMAT: &str = "%(refname)@{%(objectname)@{%(creatordate:iso-strict)@{%(*committerdate:iso-strict)@{%(taggerdate:iso-strict)";

/// Git backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Git;

/// A tag reachable from HEAD, as listed by `git for-each-ref`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    /// Date of the commit the tag points at
    pub commit_date: DateTime<Utc>,
    /// Tagger date for annotated tags, the commit date otherwise
    pub tag_date: DateTime<Utc>,
}

impl TagRef {
    /// Parse one `for-each-ref` line in [`TAG_FORMAT`].
    pub fn parse(line: &str) -> Option<TagRef> {
        let fields: Vec<&str> = line.split("@{").collect();
        let [refname, _object, creator, tagged_commit, tagger] = fields.as_slice() else {
            return None;
        };
        let name = refname.strip_prefix("refs/tags/")?.to_string();
        let creator = parse_timestamp(creator)?;
        let commit_date = match parse_timestamp(tagged_commit) {
            Some(date) => date,
            None => creator,
        };
        let tag_date = parse_timestamp(tagger).unwrap_or(creator);
        Some(TagRef {
            name,
            commit_date,
            tag_date,
        })
    }
}

/// Order tags newest first: by tagged commit date, then tag date, then
/// name, all descending.
pub fn sort_tags(tags: &mut [TagRef]) {
    tags.sort_by(|a, b| {
        (b.commit_date, b.tag_date, &b.name).cmp(&(a.commit_date, a.tag_date, &a.name))
    });
}

impl Git {
    fn git(&self, ctx: &Context<'_>, args: &[&str]) -> Result<String> {
        ctx.run(Vcs::Git, "git", args)
    }

    fn is_shallow(&self, ctx: &Context<'_>) -> Result<bool> {
        let output = ctx.exec(Vcs::Git, "git", &["rev-parse", "--is-shallow-repository"])?;
        Ok(output.success() && output.stdout.trim() == "true")
    }

    fn branch(&self, ctx: &Context<'_>) -> Result<Option<String>> {
        let output = ctx.run_codes(Vcs::Git, "git", &["symbolic-ref", "--short", "HEAD"], &[0, 128])?;
        Ok(match output.status {
            Some(0) => Some(output.stdout.trim().to_string()).filter(|b| !b.is_empty()),
            _ => None,
        })
    }

    /// Resolve `--tag-branch` to a ref. A local branch is spelled out as
    /// `refs/heads/<name>` so that a tag with the same name does not win;
    /// anything else (remote branches, commits) is passed through.
    fn merged_ref(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<String> {
        let Some(branch) = options.tag_branch.as_deref() else {
            return Ok("HEAD".to_string());
        };
        let qualified = format!("refs/heads/{}", branch);
        let output = ctx.exec(Vcs::Git, "git", &["rev-parse", "--verify", "--quiet", &qualified])?;
        if output.success() {
            Ok(qualified)
        } else {
            debug!(branch, "tag branch is not a local branch");
            Ok(branch.to_string())
        }
    }

    fn tags(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<Vec<String>> {
        let merged = self.merged_ref(ctx, options)?;
        let output = self.git(
            ctx,
            &["for-each-ref", "refs/tags/**", "--merged", &merged, "--format", TAG_FORMAT],
        )?;

        let mut tags = Vec::new();
        for line in output.lines().filter(|line| !line.trim().is_empty()) {
            let tag = TagRef::parse(line.trim())
                .ok_or_else(|| DunamaiError::unexpected(Vcs::Git, "tag list", line))?;
            tags.push(tag);
        }
        sort_tags(&mut tags);
        Ok(tags.into_iter().map(|tag| tag.name).collect())
    }
}

impl Backend for Git {
    fn vcs(&self) -> Vcs {
        Vcs::Git
    }

    fn probe(&self, ctx: &Context<'_>) -> std::result::Result<(), Unavailable> {
        ctx.probe("git", &["status"])
    }

    fn archival(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<Option<RawFacts>> {
        match archival::find_upward(ctx.path, archival::GIT_ARCHIVAL_FILE, ".git") {
            Some(file) => {
                debug!(file = %file.display(), "reading git archival file");
                archival::read_git_archival(&fs::read_to_string(file)?, options)
            }
            None => Ok(None),
        }
    }

    fn collect(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<RawFacts> {
        let mut facts = RawFacts::default();
        if self.is_shallow(ctx)? {
            facts.concerns.insert(Concern::ShallowRepository);
        }
        facts.branch = self.branch(ctx)?;

        let head = ctx.run_codes(Vcs::Git, "git", &["log", "-n", "1", "--format=%H %h"], &[0, 128])?;
        if head.status == Some(128) {
            debug!("repository has no commits");
            return Ok(RawFacts {
                concerns: facts.concerns,
                ..RawFacts::empty_repository(facts.branch)
            });
        }
        let head = head.stdout.trim();
        let (full, short) = head
            .split_once(' ')
            .ok_or_else(|| DunamaiError::unexpected(Vcs::Git, "commit id", head))?;
        facts.commit = Some(options.commit_id(full, short));

        let timestamp = self.git(
            ctx,
            &["-c", "log.showsignature=false", "log", "-n", "1", "--pretty=format:%cI"],
        )?;
        facts.timestamp = Some(
            parse_timestamp(&timestamp)
                .ok_or_else(|| DunamaiError::unexpected(Vcs::Git, "commit timestamp", timestamp))?,
        );

        let status = if options.ignore_untracked {
            self.git(ctx, &["status", "--porcelain", "--untracked-files=no"])?
        } else {
            self.git(ctx, &["status", "--porcelain"])?
        };
        facts.dirty = Some(!status.is_empty());

        let facts = facts.with_selection(self.tags(ctx, options)?, options)?;
        let distance = match facts.tag() {
            Some(tag) => {
                let range = format!("refs/tags/{}..HEAD", tag);
                self.git(ctx, &["rev-list", "--count", &range])?
            }
            None => self.git(ctx, &["rev-list", "--count", "HEAD"])?,
        };
        let distance = parse_count(Vcs::Git, "distance", &distance)?;
        Ok(RawFacts { distance, ..facts })
    }
}
