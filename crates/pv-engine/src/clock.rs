//! Virtual time and randomness for the simulation.
//!
//! The engine never sleeps. Work is queued in `Timers` with a due time and
//! the host advances the clock: the browser from animation-frame
//! timestamps, the CLI from a Tokio sleep loop, tests by draining the queue
//! instantly. Every timer carries the run generation it was scheduled
//! under so the controller can drop effects of cancelled runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

// ─── Timers ──────────────────────────────────────────────────────────────

struct Scheduled<T> {
    due_ms: u64,
    /// Insertion counter: equal due times fire in scheduling order.
    seq: u64,
    generation: u64,
    task: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.seq == other.seq
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due_ms, self.seq).cmp(&(other.due_ms, other.seq))
    }
}

/// A timer that came due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<T> {
    pub due_ms: u64,
    pub generation: u64,
    pub task: T,
}

/// Min-heap of pending tasks on a monotonic millisecond clock.
pub struct Timers<T> {
    now_ms: u64,
    next_seq: u64,
    queue: BinaryHeap<Reverse<Scheduled<T>>>,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Move the clock forward. Never moves backwards.
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn schedule(&mut self, delay_ms: u64, generation: u64, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Scheduled {
            due_ms: self.now_ms.saturating_add(delay_ms),
            seq,
            generation,
            task,
        }));
    }

    /// Due time of the earliest pending timer.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse(s)| s.due_ms)
    }

    /// Pop the earliest timer due at or before `until_ms`, advancing the
    /// clock to its due time so anything it schedules is relative to it.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Fired<T>> {
        if self.next_due()? > until_ms {
            return None;
        }
        let Reverse(s) = self.queue.pop()?;
        self.set_now(s.due_ms);
        Some(Fired {
            due_ms: s.due_ms,
            generation: s.generation,
            task: s.task,
        })
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

// ─── Entropy ─────────────────────────────────────────────────────────────

/// Source of randomness for delay jitter, failure rolls and generated
/// metric values. Inject a fixed implementation to make runs reproducible.
pub trait Entropy {
    /// Uniform integer in `min..=max`. Returns `min` when `max <= min`.
    fn range_u64(&mut self, min: u64, max: u64) -> u64;

    /// Uniform float in `[0, 1)`.
    fn unit(&mut self) -> f64;
}

/// `Entropy` backed by a seeded `StdRng`.
pub struct SeededEntropy {
    rng: StdRng,
}

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Entropy for SeededEntropy {
    fn range_u64(&mut self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        self.rng.random_range(min..=max)
    }

    fn unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_in_due_order() {
        let mut timers = Timers::new();
        timers.schedule(300, 0, "late");
        timers.schedule(100, 0, "early");
        timers.schedule(100, 0, "early-second");
        assert_eq!(timers.len(), 3);

        let fired: Vec<_> = std::iter::from_fn(|| timers.pop_due(1_000))
            .map(|f| f.task)
            .collect();
        assert_eq!(fired, vec!["early", "early-second", "late"]);
        assert_eq!(timers.now(), 300);
    }

    #[test]
    fn nothing_fires_before_due() {
        let mut timers = Timers::new();
        timers.schedule(50, 7, ());
        assert!(timers.pop_due(49).is_none());
        let fired = timers.pop_due(50).unwrap();
        assert_eq!(fired.generation, 7);
        assert!(timers.is_empty());
    }

    #[test]
    fn delays_are_relative_to_fired_time() {
        let mut timers = Timers::new();
        timers.schedule(100, 0, 1);
        let _ = timers.pop_due(10_000);
        timers.schedule(100, 0, 2);
        assert_eq!(timers.next_due(), Some(200));
    }

    #[test]
    fn clock_never_moves_backwards() {
        let mut timers: Timers<()> = Timers::new();
        timers.set_now(500);
        timers.set_now(100);
        assert_eq!(timers.now(), 500);
    }

    #[test]
    fn seeded_entropy_is_reproducible_and_bounded() {
        let mut a = SeededEntropy::new(42);
        let mut b = SeededEntropy::new(42);
        for _ in 0..100 {
            let x = a.range_u64(300, 500);
            assert_eq!(x, b.range_u64(300, 500));
            assert!((300..=500).contains(&x));
        }
        assert_eq!(a.range_u64(9, 3), 9);
        let u = a.unit();
        assert!((0.0..1.0).contains(&u));
    }
}
