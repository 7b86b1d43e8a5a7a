//! Bazaar adapter.

use crate::error::{DunamaiError, Result};
use crate::vcs::{Backend, Context, RawFacts, Unavailable, Vcs, VcsOptions};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Bazaar backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Bazaar;

/// Fields of the newest entry in `bzr log --limit 1`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEntry {
    pub revno: u64,
    pub branch_nick: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Parse `bzr log --limit 1`, `None` for a branch without revisions.
pub fn parse_log(output: &str) -> Option<LogEntry> {
    let fields: HashMap<&str, &str> = output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();
    let revno = fields.get("revno")?.parse::<u64>().ok()?;
    Some(LogEntry {
        revno,
        branch_nick: fields.get("branch nick").map(|nick| nick.to_string()),
        timestamp: fields
            .get("timestamp")
            .and_then(|t| DateTime::parse_from_str(t, "%a %Y-%m-%d %H:%M:%S %z").ok())
            .map(|t| t.with_timezone(&Utc)),
    })
}

/// Parse `bzr tags` into `(name, revno)`, newest first.
///
/// Tags pointing at revisions missing from this branch (`?`) or beyond
/// `current` are left out.
pub fn parse_tags(output: &str, current: u64) -> Vec<(String, u64)> {
    let mut tags: Vec<(String, u64)> = output
        .lines()
        .filter_map(|line| {
            let (name, revno) = line.trim().rsplit_once(char::is_whitespace)?;
            let revno = revno.parse::<u64>().ok()?;
            (revno <= current).then(|| (name.trim().to_string(), revno))
        })
        .collect();
    tags.sort_by(|a, b| (b.1, &b.0).cmp(&(a.1, &a.0)));
    tags
}

impl Backend for Bazaar {
    fn vcs(&self) -> Vcs {
        Vcs::Bazaar
    }

    fn probe(&self, ctx: &Context<'_>) -> std::result::Result<(), Unavailable> {
        ctx.probe("bzr", &["status"])
    }

    fn collect(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<RawFacts> {
        let dirty = !ctx.run(Vcs::Bazaar, "bzr", &["status"])?.is_empty();
        let log = ctx.run(Vcs::Bazaar, "bzr", &["log", "--limit", "1"])?;
        if log.is_empty() {
            return Ok(RawFacts::empty_repository(None));
        }
        let entry =
            parse_log(&log).ok_or_else(|| DunamaiError::unexpected(Vcs::Bazaar, "revision", &log))?;

        let facts = RawFacts {
            commit: Some(entry.revno.to_string()),
            dirty: Some(dirty),
            branch: entry.branch_nick.clone(),
            timestamp: entry.timestamp,
            ..Default::default()
        };

        let tags = parse_tags(&ctx.run(Vcs::Bazaar, "bzr", &["tags"])?, entry.revno);
        let names = tags.iter().map(|(name, _)| name.clone()).collect();
        let facts = facts.with_selection(names, options)?;

        let distance = match facts.tag() {
            Some(tag) => tags
                .iter()
                .find(|(name, _)| name == tag)
                .map(|(_, revno)| entry.revno - revno)
                .unwrap_or(0),
            None => entry.revno,
        };
        Ok(RawFacts { distance, ..facts })
    }
}
