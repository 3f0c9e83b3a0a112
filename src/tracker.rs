use crate::clock::Clock;
use crate::history::History;
use crate::operation::{ChangeKind, FileItem, ItemKind, Operation, classify};
use crate::settings::TimeWindow;
use crate::vault::{RenameEvent, RenameListener, Vault, VaultError};
use crate::{debug, error};
use std::cell::{Cell, RefCell};
use std::fmt;

/// why a single item of a batch could not be reverted
#[derive(Debug)]
pub enum UndoFailure {
    /// nothing lives at the recorded new path any more
    NotFound { kind: ItemKind, path: String },
    /// the storage layer refused the corrective rename
    RenameFailed {
        kind: ItemKind,
        from: String,
        to: String,
        source: VaultError,
    },
}

impl fmt::Display for UndoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndoFailure::NotFound { kind, path } => {
                write!(f, "{kind} {path} not found for undo")
            }
            UndoFailure::RenameFailed {
                kind,
                from,
                to,
                source,
            } => write!(f, "error moving {kind} {from} to {to}: {source}"),
        }
    }
}

/// outcome of an undo that actually ran
#[derive(Debug)]
pub struct UndoReport {
    pub kind: ChangeKind,
    pub attempted: usize,
    pub reverted: usize,
    pub failures: Vec<UndoFailure>,
}

impl UndoReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// counts active suppression scopes, recording is off while any is held
#[derive(Debug, Default)]
struct RecordingGate {
    depth: Cell<usize>,
}

impl RecordingGate {
    fn suppress(&self) -> SuppressedRecording<'_> {
        self.depth.set(self.depth.get() + 1);
        SuppressedRecording { gate: self }
    }

    fn is_suppressed(&self) -> bool {
        self.depth.get() > 0
    }
}

/// releases its suppression when dropped, on every exit path
struct SuppressedRecording<'a> {
    gate: &'a RecordingGate,
}

impl Drop for SuppressedRecording<'_> {
    fn drop(&mut self) {
        self.gate.depth.set(self.gate.depth.get() - 1);
    }
}

/// groups rename events into time-windowed batches and undoes the latest one
///
/// methods take `&self` so the tracker can be shared with the vault as a
/// listener; the history is never borrowed across a vault call
pub struct Tracker<H> {
    history: RefCell<History<H>>,
    window: Cell<TimeWindow>,
    gate: RecordingGate,
    clock: Box<dyn Clock>,
}

impl<H: Clone> Tracker<H> {
    pub fn new(window: TimeWindow, clock: Box<dyn Clock>) -> Self {
        Self {
            history: RefCell::new(History::new()),
            window: Cell::new(window),
            gate: RecordingGate::default(),
            clock,
        }
    }

    pub fn time_window(&self) -> TimeWindow {
        self.window.get()
    }

    /// takes effect for the next recorded event or undo
    pub fn set_time_window(&self, window: TimeWindow) {
        self.window.set(window);
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    #[cfg(test)]
    pub fn is_recording_suppressed(&self) -> bool {
        self.gate.is_suppressed()
    }

    /// read-only access to the batches, oldest first
    pub fn with_history<R>(&self, f: impl FnOnce(&History<H>) -> R) -> R {
        f(&self.history.borrow())
    }

    /// record a completed rename or move observed at `now`
    ///
    /// ignored while an undo is replaying its own corrective renames
    pub fn record_rename(
        &self,
        kind: ItemKind,
        handle: H,
        old_path: &str,
        new_path: &str,
        now: u64,
    ) {
        if self.gate.is_suppressed() {
            return;
        }

        let change = classify(old_path, new_path);
        let window_ms = self.window.get().millis();
        let mut history = self.history.borrow_mut();

        let pruned = history.prune(now, window_ms);
        if pruned > 0 {
            debug!("dropped {} expired operation(s)", pruned);
        }

        let idx = match history.find_open(change, now, window_ms) {
            Some(idx) => idx,
            None => history.push(Operation::new(change, now)),
        };

        if let Some(operation) = history.get_mut(idx) {
            operation.files.push(FileItem {
                kind,
                old_path: old_path.to_string(),
                new_path: new_path.to_string(),
                handle,
            });
        }

        debug!("tracked operation: {} - {} from {}", change, new_path, old_path);
    }

    /// undo the most recent batch using the tracker's clock
    pub fn undo<V>(&self, vault: &V) -> Option<UndoReport>
    where
        V: Vault<Handle = H>,
    {
        self.undo_at(vault, self.now())
    }

    /// undo the most recent batch if it is still inside the time window
    ///
    /// returns None when there is nothing to undo. every item is attempted even
    /// if earlier ones fail, and the batch is consumed either way
    pub fn undo_at<V>(&self, vault: &V, now: u64) -> Option<UndoReport>
    where
        V: Vault<Handle = H>,
    {
        let window_ms = self.window.get().millis();
        let operation = {
            let history = self.history.borrow();
            let latest = history.latest()?;
            if !latest.is_fresh(now, window_ms) {
                debug!(
                    "latest {} is {}ms old, outside the {}s window",
                    latest.kind,
                    now.saturating_sub(latest.timestamp),
                    self.window.get().secs()
                );
                return None;
            }
            latest.clone()
        };

        let _suppressed = self.gate.suppress();

        let mut failures = Vec::new();
        let mut reverted = 0;
        for item in &operation.files {
            let Some(target) = vault.lookup(&item.new_path) else {
                let failure = UndoFailure::NotFound {
                    kind: item.kind,
                    path: item.new_path.clone(),
                };
                error!("{}", failure);
                failures.push(failure);
                continue;
            };

            match vault.rename(&target, &item.old_path) {
                Ok(()) => {
                    reverted += 1;
                    debug!(
                        "successfully moved {} {} to {}",
                        item.kind, item.new_path, item.old_path
                    );
                }
                Err(source) => {
                    let failure = UndoFailure::RenameFailed {
                        kind: item.kind,
                        from: item.new_path.clone(),
                        to: item.old_path.clone(),
                        source,
                    };
                    error!("{}", failure);
                    failures.push(failure);
                }
            }
        }

        self.history.borrow_mut().pop_latest();

        Some(UndoReport {
            kind: operation.kind,
            attempted: operation.files.len(),
            reverted,
            failures,
        })
    }

    /// forget every batch
    pub fn clear(&self) {
        self.history.borrow_mut().clear();
    }
}

impl<H: Clone> RenameListener<H> for Tracker<H> {
    fn on_rename(&self, event: &RenameEvent<H>) {
        self.record_rename(
            event.kind,
            event.handle.clone(),
            &event.old_path,
            &event.new_path,
            self.now(),
        );
    }
}
