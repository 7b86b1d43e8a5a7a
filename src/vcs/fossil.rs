//! Fossil adapter.
//!
//! Fossil keeps its history in SQLite, so most facts come from
//! `fossil sql` queries against the checkout's repository.

use crate::error::{DunamaiError, Result};
use crate::vcs::{parse_count, Backend, Context, RawFacts, Unavailable, Vcs, VcsOptions};
use chrono::NaiveDateTime;

const CHECKOUT_HASH: &str = "SELECT value FROM vvar WHERE name = 'checkout-hash' LIMIT 1";

const CHECKOUT_TIME: &str = "SELECT DATETIME(event.mtime) FROM event JOIN blob ON event.objid = blob.rid \
WHERE event.type = 'ci' AND blob.uuid = (SELECT value FROM vvar WHERE name = 'checkout-hash') LIMIT 1";

const CHECKIN_COUNT: &str = "SELECT count() FROM event WHERE type = 'ci'";

/// Tags on ancestors of the checkout with their generation, 1 being the
/// checkout itself.
const TAGGED_ANCESTORS: &str = "WITH RECURSIVE ancestor(rid, generation) AS (\
SELECT rid, 1 FROM blob WHERE uuid = (SELECT value FROM vvar WHERE name = 'checkout-hash') \
UNION SELECT plink.pid, ancestor.generation + 1 FROM plink JOIN ancestor ON plink.cid = ancestor.rid) \
SELECT substr(tag.tagname, 5), MIN(ancestor.generation) FROM tag \
JOIN tagxref ON tag.tagid = tagxref.tagid JOIN ancestor ON ancestor.rid = tagxref.rid \
WHERE tag.tagname LIKE 'sym-%' AND tagxref.tagtype = 1 \
GROUP BY tag.tagname ORDER BY MIN(ancestor.generation) ASC, tag.tagname DESC";

/// Fossil backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Fossil;

fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

/// Parse the rows of [`TAGGED_ANCESTORS`] into `(tag, generation)`.
pub fn parse_tag_rows(output: &str) -> Vec<(String, u64)> {
    output
        .lines()
        .filter_map(|line| {
            let (name, generation) = line.rsplit_once('|')?;
            let generation = generation.trim().parse::<u64>().ok()?;
            Some((unquote(name).to_string(), generation))
        })
        .collect()
}

impl Fossil {
    fn sql(&self, ctx: &Context<'_>, query: &str) -> Result<String> {
        let output = ctx.run(Vcs::Fossil, "fossil", &["sql", query])?;
        Ok(unquote(&output).to_string())
    }
}

impl Backend for Fossil {
    fn vcs(&self) -> Vcs {
        Vcs::Fossil
    }

    fn probe(&self, ctx: &Context<'_>) -> std::result::Result<(), Unavailable> {
        ctx.probe("fossil", &["status"])
    }

    fn collect(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<RawFacts> {
        let dirty = !ctx.run(Vcs::Fossil, "fossil", &["changes", "--differ"])?.is_empty();
        let branch = ctx.run(Vcs::Fossil, "fossil", &["branch", "current"])?;

        let hash = self.sql(ctx, CHECKOUT_HASH)?;
        if hash.is_empty() {
            return Err(DunamaiError::unexpected(Vcs::Fossil, "checkout hash", hash));
        }
        let short: String = hash.chars().take(10).collect();
        let timestamp = self.sql(ctx, CHECKOUT_TIME)?;

        let facts = RawFacts {
            commit: Some(options.commit_id(&hash, &short)),
            dirty: Some(dirty),
            branch: Some(branch).filter(|b| !b.is_empty()),
            timestamp: NaiveDateTime::parse_from_str(&timestamp, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc()),
            ..Default::default()
        };

        let rows = parse_tag_rows(&ctx.run(Vcs::Fossil, "fossil", &["sql", TAGGED_ANCESTORS])?);
        let names = rows.iter().map(|(name, _)| name.clone()).collect();
        let facts = facts.with_selection(names, options)?;

        let distance = match facts.tag() {
            Some(tag) => rows
                .iter()
                .find(|(name, _)| name == tag)
                .map(|(_, generation)| generation.saturating_sub(1))
                .unwrap_or(0),
            // The repository starts with an empty initial check-in.
            None => parse_count(Vcs::Fossil, "check-in count", &self.sql(ctx, CHECKIN_COUNT)?)?
                .saturating_sub(1),
        };
        Ok(RawFacts { distance, ..facts })
    }
}
