//! Timers on a simulated millisecond clock
//!
//! Every periodic process in the game (countdown, movement, projectile steps,
//! adversary fall/reposition, respawn, music fade) is a timer here. Nothing
//! reads wall-clock time: callers advance the clock explicitly, which keeps
//! the simulation deterministic and lets tests drive time directly.

use crate::consts::MAX_FRAME_MS;

/// A single scheduled timer
#[derive(Debug, Clone)]
struct Timer<K> {
    key: K,
    due_ms: u64,
    /// `Some` for repeating timers
    period_ms: Option<u32>,
    /// Scheduling order, breaks ties between timers due at the same instant
    seq: u64,
}

/// Keyed timer multiplexer
///
/// At most one timer per key. Timers are released in due-time order, so
/// advancing by a large delta fires exactly the same sequence as many small
/// deltas would.
#[derive(Debug, Clone)]
pub struct Scheduler<K> {
    now_ms: u64,
    timers: Vec<Timer<K>>,
    next_seq: u64,
}

impl<K: Copy + PartialEq> Default for Scheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + PartialEq> Scheduler<K> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            timers: Vec::new(),
            next_seq: 0,
        }
    }

    /// Current simulated time
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Fire `key` every `period_ms`, first fire one period from now.
    /// Replaces any timer already registered under `key`.
    pub fn every(&mut self, key: K, period_ms: u32) {
        let period_ms = period_ms.max(1);
        self.insert(key, period_ms, Some(period_ms));
    }

    /// Fire `key` once after `delay_ms`. Replaces any timer under `key`.
    pub fn after(&mut self, key: K, delay_ms: u32) {
        self.insert(key, delay_ms, None);
    }

    fn insert(&mut self, key: K, delay_ms: u32, period_ms: Option<u32>) {
        self.cancel(key);
        let seq = self.bump_seq();
        self.timers.push(Timer {
            key,
            due_ms: self.now_ms + delay_ms as u64,
            period_ms,
            seq,
        });
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Cancel the timer under `key`. Returns true if one was live.
    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.key != key);
        self.timers.len() != before
    }

    /// Cancel every timer
    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_scheduled(&self, key: K) -> bool {
        self.timers.iter().any(|t| t.key == key)
    }

    /// Milliseconds until `key` next fires
    pub fn remaining_ms(&self, key: K) -> Option<u64> {
        self.timers
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.due_ms.saturating_sub(self.now_ms))
    }

    /// Number of live timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Release the earliest timer due at or before `until_ms`.
    ///
    /// The clock moves to that timer's due time. Repeating timers are
    /// re-armed one period later; one-shots are removed. Returns `None` once
    /// nothing else is due, at which point the caller should
    /// [`advance_to`](Self::advance_to) the target.
    pub fn next_due(&mut self, until_ms: u64) -> Option<K> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= until_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.seq))
            .map(|(i, _)| i)?;

        let key = self.timers[idx].key;
        let due = self.timers[idx].due_ms;
        self.now_ms = self.now_ms.max(due);

        match self.timers[idx].period_ms {
            Some(period) => {
                let seq = self.bump_seq();
                let timer = &mut self.timers[idx];
                timer.due_ms += period as u64;
                timer.seq = seq;
            }
            None => {
                self.timers.swap_remove(idx);
            }
        }

        Some(key)
    }

    /// Move the clock forward without firing anything
    pub fn advance_to(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }
}

/// Free-standing repeating timer, for components that own a single cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period_ms: u32,
    elapsed_ms: u32,
    active: bool,
}

impl Interval {
    /// Create a stopped interval
    pub fn new(period_ms: u32) -> Self {
        Self {
            period_ms: period_ms.max(1),
            elapsed_ms: 0,
            active: false,
        }
    }

    /// (Re)start from zero elapsed time
    pub fn start(&mut self) {
        self.elapsed_ms = 0;
        self.active = true;
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.elapsed_ms = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Advance by `dt_ms`, returning how many times the interval fired
    pub fn advance(&mut self, dt_ms: u32) -> u32 {
        if !self.active {
            return 0;
        }
        let total = u64::from(self.elapsed_ms) + u64::from(dt_ms);
        let period = u64::from(self.period_ms);
        self.elapsed_ms = (total % period) as u32;
        (total / period).min(u64::from(u32::MAX)) as u32
    }
}

/// Converts render-loop timestamps into whole-millisecond sim deltas
///
/// Deltas are clamped to [`MAX_FRAME_MS`] (a backgrounded tab must not
/// fast-forward the game) and the fractional remainder carries over.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_time: Option<f64>,
    carry_ms: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a frame timestamp (ms), get the elapsed whole milliseconds
    pub fn frame(&mut self, time_ms: f64) -> u32 {
        let dt = match self.last_time {
            Some(last) => (time_ms - last).clamp(0.0, MAX_FRAME_MS),
            None => 0.0,
        };
        self.last_time = Some(time_ms);

        let total = dt + self.carry_ms;
        let whole = total.floor();
        self.carry_ms = total - whole;
        whole as u32
    }

    /// Forget the last timestamp (e.g. after the loop was suspended)
    pub fn reset(&mut self) {
        self.last_time = None;
        self.carry_ms = 0.0;
    }
}
