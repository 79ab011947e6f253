//! List keys, working/master pairs and the bulk-load/registration operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{error::StoreResult, store::ListStore};

/// Identifier of one persisted list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListKey {
    /// Working roster consumed by draws.
    Roster,
    /// Full roster retained for resets.
    RosterMaster,
    /// Working question pool consumed by paired draws.
    Questions,
    /// Full question bank retained for resets.
    QuestionsMaster,
}

impl ListKey {
    /// Every key the device persists.
    pub const ALL: [ListKey; 4] = [
        ListKey::Roster,
        ListKey::RosterMaster,
        ListKey::Questions,
        ListKey::QuestionsMaster,
    ];

    /// Stable key name, also used as the file stem on disk.
    pub fn as_str(self) -> &'static str {
        match self {
            ListKey::Roster => "roster",
            ListKey::RosterMaster => "roster-master",
            ListKey::Questions => "questions",
            ListKey::QuestionsMaster => "questions-master",
        }
    }

    /// File name under the data root.
    pub fn file_name(self) -> String {
        format!("{}.txt", self.as_str())
    }
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A working pool together with its master copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolPair {
    /// Student names.
    Roster,
    /// Questions paired with names in paired mode.
    Questions,
}

impl PoolPair {
    /// Key of the list consumed by draws.
    pub fn working(self) -> ListKey {
        match self {
            PoolPair::Roster => ListKey::Roster,
            PoolPair::Questions => ListKey::Questions,
        }
    }

    /// Key of the retained full list.
    pub fn master(self) -> ListKey {
        match self {
            PoolPair::Roster => ListKey::RosterMaster,
            PoolPair::Questions => ListKey::QuestionsMaster,
        }
    }
}

/// Result of a single registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Registration {
    /// The entry was appended to the working and master lists.
    Added,
    /// The input was empty after trimming and nothing was written.
    Ignored,
}

/// Remaining and total entries of a pool pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolCounts {
    /// Entries still drawable.
    pub remaining: usize,
    /// Entries in the master list.
    pub total: usize,
}

/// Trim an entry, returning `None` for empty or whitespace-only input.
///
/// Embedded line breaks become spaces so one entry always stays one line on disk.
pub fn normalize_entry(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.replace(['\r', '\n'], " "))
    }
}

/// Split pasted text into entries: one per line, trimmed, blank lines dropped.
pub fn parse_entries(text: &str) -> Vec<String> {
    text.lines().filter_map(normalize_entry).collect()
}

/// Replace both lists of `pair` with `entries`. Returns the number stored.
pub fn bulk_load<S>(store: &S, pair: PoolPair, entries: &[String]) -> StoreResult<usize>
where
    S: ListStore + ?Sized,
{
    let entries: Vec<String> = entries
        .iter()
        .filter_map(|entry| normalize_entry(entry))
        .collect();
    store.save(pair.master(), &entries)?;
    store.save(pair.working(), &entries)?;
    info!(pair = ?pair, count = entries.len(), "bulk load");
    Ok(entries.len())
}

/// Append one entry to both lists of `pair`, keeping the master authoritative.
pub fn register<S>(store: &S, pair: PoolPair, raw: &str) -> StoreResult<Registration>
where
    S: ListStore + ?Sized,
{
    let Some(entry) = normalize_entry(raw) else {
        debug!(pair = ?pair, "ignoring blank registration");
        return Ok(Registration::Ignored);
    };
    store.append(pair.master(), &entry)?;
    store.append(pair.working(), &entry)?;
    info!(pair = ?pair, name = %entry, "registered");
    Ok(Registration::Added)
}

/// Count remaining and total entries of `pair`.
pub fn counts<S>(store: &S, pair: PoolPair) -> StoreResult<PoolCounts>
where
    S: ListStore + ?Sized,
{
    Ok(PoolCounts {
        remaining: store.load(pair.working())?.len(),
        total: store.load(pair.master())?.len(),
    })
}
