//! Time-based interpolation of published values
//!
//! Each variable has at most one transition in flight. Retargeting a
//! variable that is still moving starts the new transition from wherever the
//! old one currently is.

use std::collections::HashMap;
use std::time::Duration;

use super::expr::Variable;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Keyframe {
    from: f64,
    to: f64,
    started_at: Duration,
    duration: Duration,
}

impl Keyframe {
    fn progress(&self, now: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    fn value_at(&self, now: Duration) -> f64 {
        let progress = self.progress(now);
        if progress >= 1.0 {
            self.to
        } else {
            self.from + (self.to - self.from) * progress
        }
    }
}

/// Per-variable keyframe records
#[derive(Debug, Default)]
pub struct Keyframes {
    active: HashMap<Variable, Keyframe>,
    /// Last value read for variables without a transition
    settled: HashMap<Variable, f64>,
}

impl Keyframes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start moving `variable` toward `target`.
    ///
    /// The transition starts from the value currently shown, or `0` for a
    /// variable that was never read. A zero duration snaps.
    pub fn retarget(&mut self, variable: Variable, target: f64, now: Duration, duration: Duration) {
        let from = self.current(variable, now);
        if duration.is_zero() || from == target {
            self.active.remove(&variable);
            self.settled.insert(variable, target);
            return;
        }
        self.active.insert(
            variable,
            Keyframe {
                from,
                to: target,
                started_at: now,
                duration,
            },
        );
    }

    /// Value shown at `now`, without collapsing finished transitions
    fn current(&self, variable: Variable, now: Duration) -> f64 {
        match self.active.get(&variable) {
            Some(keyframe) => keyframe.value_at(now),
            None => self.settled.get(&variable).copied().unwrap_or(0.0),
        }
    }

    /// Value to publish for `variable` at `now`.
    ///
    /// Without a transition in flight this is `solved`. A transition that
    /// reached its end collapses to its exact target.
    pub fn read(&mut self, variable: Variable, solved: f64, now: Duration) -> f64 {
        let Some(keyframe) = self.active.get(&variable).copied() else {
            self.settled.insert(variable, solved);
            return solved;
        };
        if keyframe.progress(now) >= 1.0 {
            self.active.remove(&variable);
            self.settled.insert(variable, keyframe.to);
            return keyframe.to;
        }
        keyframe.value_at(now)
    }

    /// Progress of the transition of `variable`, if one is in flight
    pub fn progress(&self, variable: Variable, now: Duration) -> Option<f64> {
        self.active.get(&variable).map(|k| k.progress(now))
    }

    /// True while any transition has not reached its end
    pub fn is_animating(&self, now: Duration) -> bool {
        self.active.values().any(|k| k.progress(now) < 1.0)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Drop every record of a discarded variable
    pub fn forget(&mut self, variable: Variable) {
        self.active.remove(&variable);
        self.settled.remove(&variable);
    }
}
