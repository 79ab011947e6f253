//! Restoring working pools from their master copies.

use serde::Serialize;
use tracing::{debug, info};

use crate::{error::StoreResult, pools::PoolPair, store::ListStore};

/// Entries restored per pool by a reset. `None` means the master did not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    /// Names restored into the working roster.
    pub roster: Option<usize>,
    /// Questions restored into the working question pool.
    pub questions: Option<usize>,
}

/// Copy the master list of `pair` over its working list.
///
/// A missing master is a no-op and yields `None`.
pub fn reset_pool<S>(store: &S, pair: PoolPair) -> StoreResult<Option<usize>>
where
    S: ListStore + ?Sized,
{
    if !store.exists(pair.master())? {
        debug!(pair = ?pair, "no master list; reset skipped");
        return Ok(None);
    }
    let master = store.load(pair.master())?;
    store.save(pair.working(), &master)?;
    info!(pair = ?pair, restored = master.len(), "pool reset");
    Ok(Some(master.len()))
}

/// Restore the roster only. The question pool keeps its state.
pub fn reset_roster<S>(store: &S) -> StoreResult<ResetReport>
where
    S: ListStore + ?Sized,
{
    Ok(ResetReport {
        roster: reset_pool(store, PoolPair::Roster)?,
        questions: None,
    })
}

/// Restore both the roster and the question pool.
pub fn reset_all<S>(store: &S) -> StoreResult<ResetReport>
where
    S: ListStore + ?Sized,
{
    Ok(ResetReport {
        roster: reset_pool(store, PoolPair::Roster)?,
        questions: reset_pool(store, PoolPair::Questions)?,
    })
}
