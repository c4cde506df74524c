//! Debouncing of raw note detections.

use std::collections::VecDeque;

/// Rolling history of the most recent raw note names, newest first.
///
/// A note is stable once every slot holds the same name, i.e. it has been
/// detected in `depth` consecutive cycles.
#[derive(Debug, Clone)]
pub struct StabilityFilter {
    history: VecDeque<String>,
    depth: usize,
}

impl StabilityFilter {
    pub fn new(depth: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Records a raw detection and reports whether it is now stable.
    pub fn push(&mut self, note: &str) -> bool {
        self.history.push_front(note.to_string());
        self.history.truncate(self.depth);
        self.is_stable()
    }

    pub fn is_stable(&self) -> bool {
        self.history.len() == self.depth && self.history.iter().all(|n| *n == self.history[0])
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}
