//! Serializes every mutation coming from the network handler and the buttons.
//!
//! The draw engine and the mode selector live behind one mutex. Network
//! callers wait a bounded time for it; button callers never wait and get
//! [`TombolaError::Busy`] instead, which they are expected to drop.

use std::{sync::Arc, time::Duration};

use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    draw::{DrawEngine, DrawOutcome},
    error::{TombolaError, TombolaResult},
    mode::{GameMode, ModeState},
    pools::{self, PoolCounts, PoolPair, Registration},
    reset::{self, ResetReport},
    store::ListStore,
};

/// Default time a network caller waits before being told the device is busy.
pub const DEFAULT_BUSY_WAIT: Duration = Duration::from_secs(2);

/// Operations that can be triggered from either input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Draw using the current mode.
    Draw,
    /// Restore the roster from its master.
    ResetRoster,
    /// Restore the roster and the question pool.
    ResetAll,
    /// Move to the next game mode.
    AdvanceMode,
}

/// Result of an accepted trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TriggerOutcome {
    /// A draw completed.
    Drawn {
        /// Mode the draw ran in.
        mode: GameMode,
        /// Selected entries.
        outcome: DrawOutcome,
    },
    /// A reset completed.
    Reset(ResetReport),
    /// The mode selector moved.
    ModeChanged(GameMode),
}

/// Snapshot for the status page and the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    /// Active mode.
    pub mode: GameMode,
    /// Roster counts.
    pub roster: PoolCounts,
    /// Question pool counts.
    pub questions: PoolCounts,
}

struct Machine<S: ListStore> {
    engine: DrawEngine<S>,
    mode: ModeState,
}

impl<S: ListStore> Machine<S> {
    fn apply(&mut self, trigger: Trigger) -> TombolaResult<TriggerOutcome> {
        match trigger {
            Trigger::Draw => {
                let mode = self.mode.current();
                let outcome = self.engine.draw(mode)?;
                Ok(TriggerOutcome::Drawn { mode, outcome })
            }
            Trigger::ResetRoster => Ok(TriggerOutcome::Reset(reset::reset_roster(self.store())?)),
            Trigger::ResetAll => Ok(TriggerOutcome::Reset(reset::reset_all(self.store())?)),
            Trigger::AdvanceMode => Ok(TriggerOutcome::ModeChanged(self.mode.advance())),
        }
    }

    fn store(&self) -> &S {
        self.engine.store().as_ref()
    }
}

/// Cloneable handle through which every caller reaches the engine.
pub struct TriggerArbiter<S: ListStore> {
    inner: Arc<Mutex<Machine<S>>>,
    busy_wait: Duration,
}

impl<S: ListStore> Clone for TriggerArbiter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            busy_wait: self.busy_wait,
        }
    }
}

impl<S: ListStore> TriggerArbiter<S> {
    /// Wrap `engine`; the mode starts at `Individual`.
    pub fn new(engine: DrawEngine<S>, busy_wait: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Machine {
                engine,
                mode: ModeState::default(),
            })),
            busy_wait,
        }
    }

    /// Submit from a caller that may wait up to the configured busy wait.
    pub fn submit(&self, trigger: Trigger) -> TombolaResult<TriggerOutcome> {
        let mut machine = self.acquire()?;
        debug!(?trigger, "trigger accepted");
        machine.apply(trigger)
    }

    /// Submit from a caller that must never wait (the button poll loop).
    pub fn try_submit(&self, trigger: Trigger) -> TombolaResult<TriggerOutcome> {
        let mut machine = self.inner.try_lock().ok_or_else(|| {
            warn!(?trigger, "button trigger rejected while busy");
            TombolaError::Busy
        })?;
        debug!(?trigger, "button trigger accepted");
        machine.apply(trigger)
    }

    /// Replace the roster (working and master) with `entries`.
    pub fn bulk_load_roster(&self, entries: &[String]) -> TombolaResult<usize> {
        let machine = self.acquire()?;
        Ok(pools::bulk_load(machine.store(), PoolPair::Roster, entries)?)
    }

    /// Replace the question pool (working and master) with `entries`.
    pub fn bulk_load_questions(&self, entries: &[String]) -> TombolaResult<usize> {
        let machine = self.acquire()?;
        Ok(pools::bulk_load(machine.store(), PoolPair::Questions, entries)?)
    }

    /// Replace roster and questions together under one acquisition.
    pub fn bulk_load_roster_and_questions(
        &self,
        roster: &[String],
        questions: &[String],
    ) -> TombolaResult<(usize, usize)> {
        let machine = self.acquire()?;
        let names = pools::bulk_load(machine.store(), PoolPair::Roster, roster)?;
        let asked = pools::bulk_load(machine.store(), PoolPair::Questions, questions)?;
        Ok((names, asked))
    }

    /// Register one name on the roster. Blank names are ignored.
    pub fn register(&self, name: &str) -> TombolaResult<Registration> {
        let machine = self.acquire()?;
        Ok(pools::register(machine.store(), PoolPair::Roster, name)?)
    }

    /// Active mode.
    pub fn current_mode(&self) -> TombolaResult<GameMode> {
        Ok(self.acquire()?.mode.current())
    }

    /// Mode and pool counts.
    pub fn status(&self) -> TombolaResult<DeviceStatus> {
        let machine = self.acquire()?;
        Ok(DeviceStatus {
            mode: machine.mode.current(),
            roster: pools::counts(machine.store(), PoolPair::Roster)?,
            questions: pools::counts(machine.store(), PoolPair::Questions)?,
        })
    }

    /// Names left in the working roster.
    pub fn remaining(&self) -> TombolaResult<usize> {
        Ok(self.status()?.roster.remaining)
    }

    fn acquire(&self) -> TombolaResult<MutexGuard<'_, Machine<S>>> {
        self.inner.try_lock_for(self.busy_wait).ok_or_else(|| {
            warn!(waited_ms = self.busy_wait.as_millis() as u64, "arbiter busy");
            TombolaError::Busy
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pools::ListKey, store::MemoryListStore};
    use std::{
        collections::HashSet,
        sync::{Arc, Barrier},
        thread,
    };

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn arbiter_with(roster: &[&str]) -> TriggerArbiter<MemoryListStore> {
        let store = Arc::new(MemoryListStore::new());
        let engine = DrawEngine::with_seed(store, 3, 11);
        let arbiter = TriggerArbiter::new(engine, Duration::from_secs(5));
        arbiter.bulk_load_roster(&names(roster)).unwrap();
        arbiter
    }

    fn drawn_names(outcome: TriggerOutcome) -> Vec<String> {
        match outcome {
            TriggerOutcome::Drawn { outcome, .. } => {
                outcome.names().into_iter().map(str::to_string).collect()
            }
            other => panic!("expected a draw, got {other:?}"),
        }
    }

    #[test]
    fn concurrent_draws_never_share_an_entry() {
        for _ in 0..20 {
            let arbiter = arbiter_with(&["a", "b", "c", "d", "e", "f"]);
            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let arbiter = arbiter.clone();
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        arbiter.submit(Trigger::Draw)
                    })
                })
                .collect();

            let mut drawn = HashSet::new();
            for handle in handles {
                let outcome = handle.join().unwrap().unwrap();
                for name in drawn_names(outcome) {
                    assert!(drawn.insert(name), "entry drawn twice");
                }
            }
            assert_eq!(drawn.len(), 2);
            assert_eq!(arbiter.remaining().unwrap(), 4);
        }
    }

    #[test]
    fn many_callers_drain_roster_exactly_once() {
        let roster: Vec<String> = (0..40).map(|index| format!("student-{index}")).collect();
        let refs: Vec<&str> = roster.iter().map(String::as_str).collect();
        let arbiter = arbiter_with(&refs);
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let arbiter = arbiter.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let mut mine = Vec::new();
                    for _ in 0..10 {
                        mine.extend(drawn_names(arbiter.submit(Trigger::Draw).unwrap()));
                    }
                    mine
                })
            })
            .collect();

        let mut all: Vec<String> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        all.sort();
        let mut expected = roster.clone();
        expected.sort();
        assert_eq!(all, expected);
        assert_eq!(arbiter.remaining().unwrap(), 0);
    }

    #[test]
    fn button_trigger_is_rejected_while_busy() {
        let arbiter = arbiter_with(&["a", "b"]);
        let _held = arbiter.inner.lock();

        assert!(matches!(
            arbiter.try_submit(Trigger::Draw),
            Err(TombolaError::Busy)
        ));
    }

    #[test]
    fn network_caller_gives_up_after_busy_wait() {
        let store = Arc::new(MemoryListStore::new());
        let arbiter = TriggerArbiter::new(
            DrawEngine::with_seed(store, 3, 1),
            Duration::from_millis(20),
        );
        let _held = arbiter.inner.lock();

        assert!(matches!(arbiter.status(), Err(TombolaError::Busy)));
    }

    #[test]
    fn mode_advances_and_drives_draw_policy() {
        let arbiter = arbiter_with(&["a", "b", "c", "d", "e"]);
        arbiter.bulk_load_questions(&names(&["Q1", "Q2"])).unwrap();

        assert_eq!(
            arbiter.submit(Trigger::AdvanceMode).unwrap(),
            TriggerOutcome::ModeChanged(GameMode::PairedQuestion)
        );
        match arbiter.submit(Trigger::Draw).unwrap() {
            TriggerOutcome::Drawn { mode, outcome } => {
                assert_eq!(mode, GameMode::PairedQuestion);
                assert!(outcome.question().is_some());
            }
            other => panic!("unexpected {other:?}"),
        }

        arbiter.submit(Trigger::AdvanceMode).unwrap();
        let drawn = drawn_names(arbiter.submit(Trigger::Draw).unwrap());
        assert_eq!(drawn.len(), 3);

        let status = arbiter.status().unwrap();
        assert_eq!(status.mode, GameMode::Group);
        assert_eq!(status.roster, PoolCounts { remaining: 1, total: 5 });
        assert_eq!(status.questions, PoolCounts { remaining: 1, total: 2 });
    }

    #[test]
    fn resets_go_through_the_arbiter() {
        let arbiter = arbiter_with(&["a", "b", "c"]);
        arbiter.bulk_load_questions(&names(&["Q1"])).unwrap();
        arbiter.submit(Trigger::AdvanceMode).unwrap();
        arbiter.submit(Trigger::Draw).unwrap();

        let outcome = arbiter.submit(Trigger::ResetRoster).unwrap();
        assert_eq!(
            outcome,
            TriggerOutcome::Reset(ResetReport {
                roster: Some(3),
                questions: None
            })
        );
        assert_eq!(arbiter.status().unwrap().questions.remaining, 0);

        arbiter.submit(Trigger::ResetAll).unwrap();
        assert_eq!(arbiter.status().unwrap().questions.remaining, 1);
    }

    #[test]
    fn registration_keeps_master_in_sync() {
        let arbiter = arbiter_with(&[]);
        assert_eq!(arbiter.register("Ana").unwrap(), Registration::Added);
        assert_eq!(arbiter.register("  ").unwrap(), Registration::Ignored);
        arbiter.submit(Trigger::Draw).unwrap();
        arbiter.submit(Trigger::ResetRoster).unwrap();

        let machine = arbiter.inner.lock();
        assert_eq!(
            machine.store().load(ListKey::Roster).unwrap(),
            names(&["Ana"])
        );
    }
}
