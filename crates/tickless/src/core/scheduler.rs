//! Virtual-clock timer queue.
//!
//! The scheduler owns "now". Timers fire in non-decreasing time order, ties
//! in registration order, and each callback observes `now()` equal to its own
//! scheduled time rather than the wall clock. Timers carry a payload `E`
//! (the world uses a closed event enum) instead of boxed callbacks, so the
//! owner can dispatch them with full mutable access to itself.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use crate::core::time::Clock;

/// Cancellation handle for a scheduled timer.
///
/// Handles are tagged with a monotonically increasing id. Cancelling marks
/// the id dead; the queue skips dead ids when popping. A cancel issued after
/// the timer was popped has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Handle for a timer that was never enqueued (infinite time).
    pub const NEVER: TimerHandle = TimerHandle(0);

    pub fn is_never(self) -> bool {
        self.0 == 0
    }
}

struct Entry<E> {
    time: f64,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Entry<E> {
    // Reversed so the max-heap pops the earliest (time, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct Scheduler<E> {
    now: f64,
    queue: BinaryHeap<Entry<E>>,
    /// Ids still waiting in the queue, with their due time.
    /// Absent = cancelled or already popped.
    pending: HashMap<u64, f64>,
    next_seq: u64,
    clock: Box<dyn Clock>,
}

impl<E> Scheduler<E> {
    /// Create a scheduler whose virtual clock starts at the clock's reading.
    pub fn new(clock: impl Clock + 'static) -> Self {
        let now = clock.now();
        Self {
            now,
            queue: BinaryHeap::new(),
            pending: HashMap::new(),
            next_seq: 1,
            clock: Box::new(clock),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Schedule `event` at absolute time `time`.
    /// An infinite time is never enqueued and yields [`TimerHandle::NEVER`].
    pub fn add_timer_at(&mut self, time: f64, event: E) -> TimerHandle {
        if time == f64::INFINITY {
            return TimerHandle::NEVER;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Entry { time, seq, event });
        self.pending.insert(seq, time);
        TimerHandle(seq)
    }

    /// Schedule `event` `delay` seconds after now.
    pub fn add_timer(&mut self, delay: f64, event: E) -> TimerHandle {
        self.add_timer_at(self.now + delay, event)
    }

    /// Schedule `event` for the next scheduler turn (zero delay).
    pub fn on_next(&mut self, event: E) -> TimerHandle {
        self.add_timer(0.0, event)
    }

    /// Invalidate a timer that has not fired yet. Returns whether anything
    /// was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.pending.remove(&handle.0).is_some()
    }

    /// Whether a timer is still waiting to fire.
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.contains_key(&handle.0)
    }

    /// Scheduled time of a timer that has not fired yet.
    pub fn due_time(&self, handle: TimerHandle) -> Option<f64> {
        self.pending.get(&handle.0).copied()
    }

    /// Number of live (not cancelled) timers in the queue.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Time of the earliest live timer, if any.
    pub fn next_due(&mut self) -> Option<f64> {
        self.discard_cancelled();
        self.queue.peek().map(|e| e.time)
    }

    /// Read the wall clock and return this pump cycle's deadline.
    /// The deadline never lies before the current virtual time.
    pub fn begin_pump(&self) -> f64 {
        self.clock.now().max(self.now)
    }

    /// Pop the next live timer due at or before `deadline`, moving the
    /// virtual clock to its scheduled time.
    pub fn pop_due(&mut self, deadline: f64) -> Option<E> {
        loop {
            match self.queue.peek() {
                Some(top) if top.time <= deadline => {}
                _ => return None,
            }
            let entry = self.queue.pop()?;
            if self.pending.remove(&entry.seq).is_none() {
                continue;
            }
            // A timer registered in the past fires "now"; the clock never rewinds.
            self.now = self.now.max(entry.time);
            return Some(entry.event);
        }
    }

    /// Advance the virtual clock to the end of the pump cycle.
    pub fn finish_pump(&mut self, deadline: f64) {
        self.now = self.now.max(deadline);
    }

    /// Drain every due timer, handing each to `fire` along with the
    /// scheduler so callbacks can schedule more work. Timers added during
    /// the drain fire in this call only if they are due by the deadline
    /// captured on entry. Returns how many timers fired.
    pub fn pump(&mut self, mut fire: impl FnMut(&mut Self, E)) -> usize {
        let deadline = self.begin_pump();
        let mut fired = 0;
        while let Some(event) = self.pop_due(deadline) {
            fire(self, event);
            fired += 1;
        }
        self.finish_pump(deadline);
        fired
    }

    fn discard_cancelled(&mut self) {
        while let Some(top) = self.queue.peek() {
            if self.pending.contains_key(&top.seq) {
                break;
            }
            self.queue.pop();
        }
    }
}

impl<E> fmt::Debug for Scheduler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("queued", &self.queue.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
