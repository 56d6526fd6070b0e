//! Exclusive lane: a FIFO queue of clip-play requests with at most one
//! concurrent playhead.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// A queued exclusive-lane request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub clip_name: String,
    /// Delay before the clip starts once dequeued.
    pub wait_seconds: f32,
    /// Offset into the clip to start from; clamped to the clip duration when
    /// the entry is dequeued.
    pub skip_seconds: f32,
    /// Restart the clip when it finishes and the queue is empty.
    pub looping: bool,
}

/// Strict FIFO; no priority, no reordering.
#[derive(Debug, Default)]
pub struct ExclusiveLane {
    queue: VecDeque<QueueEntry>,
}

impl ExclusiveLane {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, entry: QueueEntry) {
        self.queue.push_back(entry);
    }

    /// Dequeue the oldest request, if any.
    #[inline]
    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.queue.pop_front()
    }

    /// Entries in queue order, without consuming them.
    #[inline]
    pub fn peek_all(&self) -> impl Iterator<Item = &QueueEntry> {
        self.queue.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// The single currently-playing exclusive clip. Replaced wholesale when a new
/// entry is dequeued; absent while the lane is idle.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionState {
    pub clip_name: String,
    pub start_time: f32,
    pub end_time: f32,
    pub skip_time: f32,
    pub looping: bool,
}
