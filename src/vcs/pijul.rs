//! Pijul adapter.

use crate::error::Result;
use crate::vcs::archival::parse_timestamp;
use crate::vcs::{Backend, Context, RawFacts, Unavailable, Vcs, VcsOptions};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Pijul backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Pijul;

/// One change from `pijul log --output-format json`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub hash: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A tagged state from `pijul tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PijulTag {
    pub name: String,
    pub state: String,
    pub date: DateTime<Utc>,
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    parse_timestamp(text).or_else(|| {
        NaiveDateTime::parse_from_str(text.trim_end_matches(" UTC"), "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    })
}

/// Parse `pijul tag` output, newest first.
///
/// Each block starts with `State <hash>`, followed by headers and the
/// indented tag message. When one message tags several states, the most
/// recent one wins.
pub fn parse_tags(output: &str) -> Vec<PijulTag> {
    let mut newest: HashMap<String, PijulTag> = HashMap::new();
    let mut state: Option<String> = None;
    let mut date: Option<DateTime<Utc>> = None;

    let mut finish = |state: &Option<String>, date: &Option<DateTime<Utc>>, name: &str| {
        if let (Some(state), Some(date)) = (state, date) {
            let tag = PijulTag {
                name: name.to_string(),
                state: state.clone(),
                date: *date,
            };
            match newest.get(name) {
                Some(existing) if existing.date >= tag.date => {}
                _ => {
                    newest.insert(name.to_string(), tag);
                }
            }
        }
    };

    for line in output.lines() {
        if let Some(hash) = line.strip_prefix("State ") {
            state = Some(hash.trim().to_string());
            date = None;
        } else if let Some(text) = line.strip_prefix("Date:") {
            date = parse_date(text);
        } else if line.starts_with(char::is_whitespace) && !line.trim().is_empty() {
            finish(&state, &date, line.trim());
        }
    }

    let mut tags: Vec<PijulTag> = newest.into_values().collect();
    tags.sort_by(|a, b| (b.date, &b.name).cmp(&(a.date, &a.name)));
    tags
}

impl Pijul {
    fn log(&self, ctx: &Context<'_>, state: Option<&str>) -> Result<Vec<LogEntry>> {
        let output = match state {
            Some(state) => ctx.run(
                Vcs::Pijul,
                "pijul",
                &["log", "--state", state, "--output-format", "json"],
            )?,
            None => ctx.run(Vcs::Pijul, "pijul", &["log", "--output-format", "json"])?,
        };
        if output.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&output)?)
    }
}

impl Backend for Pijul {
    fn vcs(&self) -> Vcs {
        Vcs::Pijul
    }

    fn probe(&self, ctx: &Context<'_>) -> std::result::Result<(), Unavailable> {
        ctx.probe("pijul", &["log", "--limit", "1"])
    }

    fn collect(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<RawFacts> {
        let dirty = !ctx.run(Vcs::Pijul, "pijul", &["diff", "--short"])?.is_empty();
        let channels = ctx.run(Vcs::Pijul, "pijul", &["channel"])?;
        let branch = channels
            .lines()
            .find_map(|line| line.strip_prefix("* "))
            .map(|name| name.trim().to_string());

        let log = self.log(ctx, None)?;
        let Some(head) = log.first() else {
            return Ok(RawFacts::empty_repository(branch));
        };
        let short: String = head.hash.chars().take(7).collect();
        let facts = RawFacts {
            commit: Some(options.commit_id(&head.hash, &short)),
            dirty: Some(dirty),
            branch,
            timestamp: head.timestamp.as_deref().and_then(parse_date),
            ..Default::default()
        };

        let tags = parse_tags(&ctx.run(Vcs::Pijul, "pijul", &["tag"])?);
        let names = tags.iter().map(|tag| tag.name.clone()).collect();
        let facts = facts.with_selection(names, options)?;

        let distance = match facts.tag().and_then(|name| tags.iter().find(|t| t.name == name)) {
            Some(tag) => {
                let tagged = self.log(ctx, Some(&tag.state))?;
                log.len().saturating_sub(tagged.len()) as u64
            }
            None => log.len().saturating_sub(1) as u64,
        };
        Ok(RawFacts { distance, ..facts })
    }
}
