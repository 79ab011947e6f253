//! Draw-without-replacement over the working pools.

use std::{collections::HashSet, sync::Arc};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    error::{PoolSide, TombolaError, TombolaResult},
    mode::GameMode,
    pools::ListKey,
    store::ListStore,
};

/// Group size used when the configuration does not override it.
pub const DEFAULT_GROUP_SIZE: usize = 3;

/// Entries selected by one draw. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawOutcome {
    /// Individual mode.
    Single {
        /// Selected name.
        name: String,
    },
    /// Paired-question mode.
    Paired {
        /// Selected name.
        name: String,
        /// Selected question.
        question: String,
    },
    /// Group mode, names in the order they were drawn.
    Group {
        /// Selected names.
        names: Vec<String>,
    },
}

impl DrawOutcome {
    /// Every drawn name, in draw order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            DrawOutcome::Single { name } | DrawOutcome::Paired { name, .. } => vec![name.as_str()],
            DrawOutcome::Group { names } => names.iter().map(String::as_str).collect(),
        }
    }

    /// Drawn question, if any.
    pub fn question(&self) -> Option<&str> {
        match self {
            DrawOutcome::Paired { question, .. } => Some(question.as_str()),
            _ => None,
        }
    }
}

/// Mode-aware draw engine over a [`ListStore`].
pub struct DrawEngine<S: ListStore> {
    store: Arc<S>,
    rng: StdRng,
    group_size: usize,
}

impl<S: ListStore> DrawEngine<S> {
    /// Engine seeded from operating-system entropy.
    pub fn new(store: Arc<S>, group_size: usize) -> Self {
        Self::with_rng(store, group_size, StdRng::from_entropy())
    }

    /// Engine with a fixed seed, for reproducible runs.
    pub fn with_seed(store: Arc<S>, group_size: usize, seed: u64) -> Self {
        Self::with_rng(store, group_size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: Arc<S>, group_size: usize, rng: StdRng) -> Self {
        Self {
            store,
            rng,
            group_size: group_size.max(1),
        }
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Draw according to `mode`, writing the reduced pools back.
    pub fn draw(&mut self, mode: GameMode) -> TombolaResult<DrawOutcome> {
        match mode {
            GameMode::Individual => self.draw_individual(),
            GameMode::PairedQuestion => self.draw_paired(),
            GameMode::Group => self.draw_group(),
        }
    }

    fn draw_individual(&mut self) -> TombolaResult<DrawOutcome> {
        let mut roster = self.store.load(ListKey::Roster)?;
        if roster.is_empty() {
            warn!("draw attempted on an empty roster");
            return Err(TombolaError::EmptyPool(PoolSide::Roster));
        }

        let name = take_one(&mut self.rng, &mut roster);
        self.store.save(ListKey::Roster, &roster)?;
        info!(name = %name, remaining = roster.len(), "individual draw");
        Ok(DrawOutcome::Single { name })
    }

    fn draw_paired(&mut self) -> TombolaResult<DrawOutcome> {
        let mut roster = self.store.load(ListKey::Roster)?;
        let mut questions = self.store.load(ListKey::Questions)?;
        let empty = match (roster.is_empty(), questions.is_empty()) {
            (true, true) => Some(PoolSide::Both),
            (true, false) => Some(PoolSide::Roster),
            (false, true) => Some(PoolSide::Questions),
            (false, false) => None,
        };
        if let Some(side) = empty {
            warn!(side = side.label(), "paired draw attempted on an empty pool");
            return Err(TombolaError::EmptyPool(side));
        }

        let full_roster = roster.clone();
        let name = take_one(&mut self.rng, &mut roster);
        let question = take_one(&mut self.rng, &mut questions);
        self.store.save(ListKey::Roster, &roster)?;
        if let Err(err) = self.store.save(ListKey::Questions, &questions) {
            // The name must not disappear without being announced.
            error!(%err, "question pool save failed, restoring roster");
            if let Err(restore_err) = self.store.save(ListKey::Roster, &full_roster) {
                error!(%restore_err, "roster restore failed");
            }
            return Err(err.into());
        }
        info!(
            name = %name,
            remaining = roster.len(),
            questions_remaining = questions.len(),
            "paired draw"
        );
        Ok(DrawOutcome::Paired { name, question })
    }

    fn draw_group(&mut self) -> TombolaResult<DrawOutcome> {
        let roster = self.store.load(ListKey::Roster)?;
        if roster.is_empty() {
            warn!("group draw attempted on an empty roster");
            return Err(TombolaError::EmptyPool(PoolSide::Roster));
        }

        let size = self.group_size.min(roster.len());
        let picked = partial_shuffle(&mut self.rng, roster.len(), size);
        let names: Vec<String> = picked.iter().map(|&index| roster[index].clone()).collect();

        let excluded: HashSet<usize> = picked.into_iter().collect();
        let remaining: Vec<String> = roster
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !excluded.contains(index))
            .map(|(_, entry)| entry)
            .collect();
        self.store.save(ListKey::Roster, &remaining)?;
        info!(drawn = names.len(), remaining = remaining.len(), "group draw");
        Ok(DrawOutcome::Group { names })
    }
}

/// Remove and return a uniformly chosen entry, keeping the others in order.
fn take_one<R: Rng>(rng: &mut R, entries: &mut Vec<String>) -> String {
    let index = rng.gen_range(0..entries.len());
    entries.remove(index)
}

/// First `count` positions of a Fisher-Yates shuffle of `0..len`.
fn partial_shuffle<R: Rng>(rng: &mut R, len: usize, count: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    for slot in 0..count {
        let pick = rng.gen_range(slot..len);
        indices.swap(slot, pick);
    }
    indices.truncate(count);
    indices
}
