//! Inclusive layer set: independently looping clips with randomized
//! re-trigger delays, playing concurrently with the exclusive lane.

use std::collections::HashMap;

/// Scheduling state for one inclusive clip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InclusiveEntry {
    pub min_seconds: f32,
    pub max_seconds: f32,
    /// Absolute time the next playback begins.
    pub next_start: f32,
    /// Absolute time the current scheduling window ends.
    pub next_end: f32,
}

impl InclusiveEntry {
    /// Fresh registrations carry a `(0, 0)` window so they are due for
    /// rescheduling on the very next tick.
    #[inline]
    pub fn new(min_seconds: f32, max_seconds: f32) -> Self {
        Self {
            min_seconds,
            max_seconds,
            next_start: 0.0,
            next_end: 0.0,
        }
    }
}

/// Clip name to scheduling state; every entry plays concurrently.
#[derive(Debug, Default)]
pub struct InclusiveSet {
    entries: HashMap<String, InclusiveEntry>,
}

impl InclusiveSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clip. Re-registering resets its scheduling window.
    #[inline]
    pub fn insert(&mut self, clip_name: impl Into<String>, min_seconds: f32, max_seconds: f32) {
        self.entries
            .insert(clip_name.into(), InclusiveEntry::new(min_seconds, max_seconds));
    }

    /// Removal is immediate and unconditional.
    #[inline]
    pub fn remove(&mut self, clip_name: &str) -> bool {
        self.entries.remove(clip_name).is_some()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn get(&self, clip_name: &str) -> Option<&InclusiveEntry> {
        self.entries.get(clip_name)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &InclusiveEntry)> {
        self.entries.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut InclusiveEntry)> {
        self.entries.iter_mut()
    }

    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_entries_are_due_immediately() {
        let mut set = InclusiveSet::new();
        set.insert("blink", 1.0, 4.0);
        let entry = set.get("blink").unwrap();
        assert_eq!(entry.next_start, 0.0);
        assert_eq!(entry.next_end, 0.0);
    }

    #[test]
    fn test_reregistration_resets_window() {
        let mut set = InclusiveSet::new();
        set.insert("blink", 1.0, 4.0);
        set.iter_mut().for_each(|(_, e)| {
            e.next_start = 10.0;
            e.next_end = 12.0;
        });
        set.insert("blink", 2.0, 3.0);
        let entry = set.get("blink").unwrap();
        assert_eq!(entry.min_seconds, 2.0);
        assert_eq!(entry.next_end, 0.0);
    }

    #[test]
    fn test_remove_is_unconditional() {
        let mut set = InclusiveSet::new();
        set.insert("blink", 0.0, 0.0);
        assert!(set.remove("blink"));
        assert!(!set.remove("blink"));
        assert!(set.is_empty());
    }
}
