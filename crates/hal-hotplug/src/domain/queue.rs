//! # Event Queue
//!
//! FIFO of pending events plus the set of events currently being
//! dispatched.
//!
//! ## Serialization Invariant
//!
//! `begin_next()` refuses to release an event while another one is in
//! flight, so at most one event is ever dispatched at a time.
//!
//! ## Ticket Ownership
//!
//! A released event travels as an `InFlightEvent` ticket. The ticket is
//! not `Clone` and can only be built by `begin_next()`, and `end()`
//! consumes it, so each released event is ended exactly once.

use super::event::HotplugEvent;
use std::collections::{HashSet, VecDeque};

/// Per-event dispatch context handed out by `EventQueue::begin_next`.
#[derive(Debug)]
#[must_use = "an in-flight event blocks the queue until it is ended"]
pub struct InFlightEvent {
    seq: u64,
    event: HotplugEvent,
}

impl InFlightEvent {
    /// Position of the event in the overall dispatch order.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn event(&self) -> &HotplugEvent {
        &self.event
    }
}

#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<HotplugEvent>,
    in_flight: HashSet<u64>,
    next_seq: u64,
    completed: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the tail.
    pub fn enqueue(&mut self, event: HotplugEvent) {
        self.pending.push_back(event);
    }

    /// Append a batch, preserving its order.
    pub fn enqueue_all(&mut self, events: impl IntoIterator<Item = HotplugEvent>) {
        self.pending.extend(events);
    }

    /// Release the head event, unless an event is already in flight or the
    /// queue is empty.
    pub fn begin_next(&mut self) -> Option<InFlightEvent> {
        if !self.in_flight.is_empty() {
            return None;
        }

        let event = self.pending.pop_front()?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.insert(seq);

        Some(InFlightEvent { seq, event })
    }

    /// Retire an in-flight event and drop it.
    pub fn end(&mut self, ticket: InFlightEvent) {
        if self.in_flight.remove(&ticket.seq) {
            self.completed += 1;
        }
    }

    /// Number of events waiting behind the head.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Total number of events ended so far.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Iterate pending events from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &HotplugEvent> {
        self.pending.iter()
    }
}
