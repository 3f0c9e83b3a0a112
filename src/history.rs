use crate::operation::{ChangeKind, Operation};

/// in-memory batches of rename events, oldest first
///
/// the cursor always points at the most recently created batch, which is the
/// last element because batches are only ever appended
#[derive(Debug)]
pub struct History<H> {
    operations: Vec<Operation<H>>,
}

impl<H> Default for History<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> History<H> {
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// position of the most recent batch, None when empty
    pub fn cursor(&self) -> Option<usize> {
        self.operations.len().checked_sub(1)
    }

    pub fn latest(&self) -> Option<&Operation<H>> {
        self.operations.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation<H>> {
        self.operations.iter()
    }

    /// append a new batch and return its index
    pub fn push(&mut self, operation: Operation<H>) -> usize {
        self.operations.push(operation);
        self.operations.len() - 1
    }

    /// keep only the batches matching the predicate, returns how many were dropped
    pub fn retain<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&Operation<H>) -> bool,
    {
        let before = self.operations.len();
        self.operations.retain(keep);
        before - self.operations.len()
    }

    /// drop every batch older than the window
    pub fn prune(&mut self, now: u64, window_ms: u64) -> usize {
        self.retain(|op| op.is_fresh(now, window_ms))
    }

    /// index of the first batch of the given kind that still accepts events at `now`
    pub fn find_open(&self, kind: ChangeKind, now: u64, window_ms: u64) -> Option<usize> {
        self.operations
            .iter()
            .position(|op| op.accepts(kind, now, window_ms))
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Operation<H>> {
        self.operations.get_mut(idx)
    }

    pub fn pop_latest(&mut self) -> Option<Operation<H>> {
        self.operations.pop()
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }
}
