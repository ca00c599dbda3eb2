//! Content-tag index with fuzzy lookup.
//!
//! Each site owns a set of case-sensitive tags. [`fuzzy_match_tag`] finds a
//! known tag that starts with, contains, or ends with the user's input.
//!
//! # Ranking
//!
//! Candidates are prefiltered by SQLite with an escaped
//! `LIKE '%input%' ESCAPE '\'` pattern, which is case-insensitive for ASCII
//! and therefore a superset of the real matches. The survivors are scanned
//! in byte-wise lexicographic order and classified case-sensitively by
//! [`MatchTier`]. The lowest tier wins; ties go to the lexicographically
//! smallest tag. The result is the same for the same data on every run.
//!
//! SQLite rejects `LIKE` patterns longer than [`MAX_LIKE_PATTERN`] bytes. For
//! inputs whose escaped pattern exceeds that, the prefilter is a length check
//! instead and classification does all the work.

use std::collections::BTreeSet;

use hifumi_types::codec::contains_pattern;
use hifumi_types::Site;
use rusqlite::{params, Connection};

/// SQLite's default `SQLITE_MAX_LIKE_PATTERN_LENGTH`.
pub const MAX_LIKE_PATTERN: usize = 50_000;

/// How a candidate tag matched the input. Lower tiers are preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    /// The tag starts with the input.
    Prefix,
    /// The input occurs inside the tag, not only at its end.
    Substring,
    /// The only occurrence of the input is at the end of the tag.
    Suffix,
}

impl MatchTier {
    /// Classifies `tag` against `input`, or returns `None` when the input
    /// does not occur in the tag at all.
    pub fn classify(tag: &str, input: &str) -> Option<Self> {
        if tag.starts_with(input) {
            return Some(Self::Prefix);
        }
        let first = tag.find(input)?;
        if first + input.len() < tag.len() {
            Some(Self::Substring)
        } else {
            Some(Self::Suffix)
        }
    }
}

/// Inserts a tag for `site`. Returns `true` if it was not already known.
pub fn write_tag(conn: &Connection, site: &Site, tag: &str) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "INSERT OR IGNORE INTO nsfw_tags (site, tag) VALUES (?1, ?2)",
        params![site, tag],
    )?;
    Ok(count > 0)
}

/// Inserts many tags for `site`, returning how many were new.
///
/// Run inside a transaction to make the batch atomic.
pub fn write_tags<'a, I>(conn: &Connection, site: &Site, tags: I) -> rusqlite::Result<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut stmt =
        conn.prepare_cached("INSERT OR IGNORE INTO nsfw_tags (site, tag) VALUES (?1, ?2)")?;
    let mut inserted = 0;
    for tag in tags {
        inserted += stmt.execute(params![site, tag])?;
    }
    Ok(inserted)
}

/// Removes a tag from `site`. Returns `true` if it was present.
pub fn remove_tag(conn: &Connection, site: &Site, tag: &str) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "DELETE FROM nsfw_tags WHERE site = ?1 AND tag = ?2",
        params![site, tag],
    )?;
    Ok(count > 0)
}

/// Exact, case-sensitive membership test.
pub fn tag_exists(conn: &Connection, site: &Site, tag: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM nsfw_tags WHERE site = ?1 AND tag = ?2)",
        params![site, tag],
        |row| row.get(0),
    )
}

/// Lists every tag known for `site`.
pub fn list_tags(conn: &Connection, site: &Site) -> rusqlite::Result<BTreeSet<String>> {
    let mut stmt = conn.prepare_cached("SELECT tag FROM nsfw_tags WHERE site = ?1")?;
    let rows = stmt.query_map([site], |row| row.get::<_, String>(0))?;
    rows.collect()
}

/// Finds the best tag of `site` matching `input`; see the module docs for the
/// ranking. Empty input matches nothing.
pub fn fuzzy_match_tag(
    conn: &Connection,
    site: &Site,
    input: &str,
) -> rusqlite::Result<Option<String>> {
    if input.is_empty() {
        return Ok(None);
    }

    let pattern = contains_pattern(input);
    if pattern.len() <= MAX_LIKE_PATTERN {
        let mut stmt = conn.prepare_cached(
            "SELECT tag FROM nsfw_tags
             WHERE site = ?1 AND tag LIKE ?2 ESCAPE '\\'
             ORDER BY tag",
        )?;
        let rows = stmt.query_map(params![site, pattern], |row| row.get::<_, String>(0))?;
        best_match(rows, input)
    } else {
        let mut stmt = conn.prepare_cached(
            "SELECT tag FROM nsfw_tags
             WHERE site = ?1 AND length(CAST(tag AS BLOB)) >= ?2
             ORDER BY tag",
        )?;
        let min_len = i64::try_from(input.len()).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![site, min_len], |row| row.get::<_, String>(0))?;
        best_match(rows, input)
    }
}

/// Picks the best candidate from tags already sorted lexicographically.
fn best_match<I>(candidates: I, input: &str) -> rusqlite::Result<Option<String>>
where
    I: Iterator<Item = rusqlite::Result<String>>,
{
    let mut best: Option<(MatchTier, String)> = None;
    for candidate in candidates {
        let tag = candidate?;
        let Some(tier) = MatchTier::classify(&tag, input) else {
            continue;
        };
        if tier == MatchTier::Prefix {
            return Ok(Some(tag));
        }
        if best.as_ref().map_or(true, |(current, _)| tier < *current) {
            best = Some((tier, tag));
        }
    }
    Ok(best.map(|(_, tag)| tag))
}
