//! Edge-triggered debouncing of the physical buttons.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::arbiter::Trigger;

/// Refractory window used by the device firmware.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Electrical level of an active-low input with a pull-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Released.
    High,
    /// Pressed.
    Low,
}

/// Collapses held or bouncing input into single presses.
///
/// A press is accepted only on a High to Low edge that happens at least
/// `window` after the previously accepted press.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    level: Level,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    /// Debouncer with the given refractory window, starting released.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            level: Level::High,
            last_accepted: None,
        }
    }

    /// Feed one sample; returns `true` when it counts as a new press.
    pub fn sample(&mut self, level: Level, now: Instant) -> bool {
        let previous = std::mem::replace(&mut self.level, level);
        if previous != Level::High || level != Level::Low {
            return false;
        }

        let outside_window = self
            .last_accepted
            .map(|at| now.saturating_duration_since(at) >= self.window)
            .unwrap_or(true);
        if outside_window {
            self.last_accepted = Some(now);
        } else {
            trace!("edge inside refractory window ignored");
        }
        outside_window
    }
}

/// Physical buttons on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Draw for the current mode.
    Draw,
    /// Restore the roster from its master.
    Reset,
    /// Advance the game mode.
    Mode,
}

impl Button {
    /// Trigger issued when the button is accepted.
    pub fn trigger(self) -> Trigger {
        match self {
            Button::Draw => Trigger::Draw,
            Button::Reset => Trigger::ResetRoster,
            Button::Mode => Trigger::AdvanceMode,
        }
    }
}

/// One debouncer per button.
#[derive(Debug, Clone)]
pub struct ButtonPanel {
    draw: Debouncer,
    reset: Debouncer,
    mode: Debouncer,
}

impl ButtonPanel {
    /// Panel whose buttons all share `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            draw: Debouncer::new(window),
            reset: Debouncer::new(window),
            mode: Debouncer::new(window),
        }
    }

    /// Sample `button`; returns the trigger to submit for an accepted press.
    pub fn sample(&mut self, button: Button, level: Level, now: Instant) -> Option<Trigger> {
        let debouncer = match button {
            Button::Draw => &mut self.draw,
            Button::Reset => &mut self.reset,
            Button::Mode => &mut self.mode,
        };
        debouncer.sample(level, now).then(|| button.trigger())
    }
}

impl Default for ButtonPanel {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
