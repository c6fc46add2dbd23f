//! This module handles event-driven simulation

use std::collections::BinaryHeap;

/// The part of an event loop that timing models need: knowing the current cycle, and queueing
/// an event to be delivered some cycles later.
///
/// Events queued for the same cycle must be delivered in the order they are queued. Models rely
/// on this to pair fixed-latency completions with FIFO queues.
pub trait Scheduler<E> {
    /// Query the current cycle count.
    fn now(&self) -> u64;

    /// Deliver `event` after `delay` cycles.
    fn schedule_after(&mut self, delay: u64, event: E);
}

struct Entry<E> {
    time: u64,
    // Submission order, used to break ties between events of the same cycle.
    seq: u64,
    event: E,
}

// #region Ordering relation for Entry
//

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Smaller time needs to come larger as BinaryHeap is a max-heap.
        other.time.cmp(&self.time).then_with(|| other.seq.cmp(&self.seq))
    }
}

//
// #endregion

/// A single-threaded discrete event loop.
///
/// Events are plain values; whoever drives the loop pops them with [`EventLoop::next_due`] and
/// dispatches them to the owning model.
pub struct EventLoop<E> {
    cycle: u64,
    seq: u64,
    events: BinaryHeap<Entry<E>>,
}

impl<E> Default for EventLoop<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventLoop<E> {
    /// Create a new event loop.
    pub fn new() -> EventLoop<E> {
        EventLoop { cycle: 0, seq: 0, events: BinaryHeap::new() }
    }

    /// Query the current cycle count.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Add a new event to the event loop for triggering. If it happens in the past it will be
    /// dequeued and triggered at the current cycle.
    pub fn queue(&mut self, cycle: u64, event: E) {
        let seq = self.seq;
        self.seq += 1;
        self.events.push(Entry { time: cycle, seq, event });
    }

    /// Cycle of the next pending event, if any.
    pub fn next_event(&self) -> Option<u64> {
        self.events.peek().map(|entry| entry.time)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Move time forward. Time never goes back, so an earlier cycle is ignored.
    pub fn advance_to(&mut self, cycle: u64) {
        if cycle > self.cycle {
            self.cycle = cycle;
        }
    }

    /// Pop the next event that is due at or before the current cycle.
    pub fn next_due(&mut self) -> Option<E> {
        match self.events.peek() {
            Some(entry) if entry.time <= self.cycle => (),
            _ => return None,
        }
        self.events.pop().map(|entry| entry.event)
    }

    /// Handle all events at or before the current cycle, and return the cycle of next event if
    /// any. Events queued by `handler` that are already due are handled in the same call.
    pub fn handle_events(&mut self, mut handler: impl FnMut(&mut Self, E)) -> Option<u64> {
        while let Some(event) = self.next_due() {
            handler(self, event);
        }
        self.next_event()
    }
}

impl<E> Scheduler<E> for EventLoop<E> {
    fn now(&self) -> u64 {
        self.cycle
    }

    fn schedule_after(&mut self, delay: u64, event: E) {
        self.queue(self.cycle + delay, event)
    }
}
