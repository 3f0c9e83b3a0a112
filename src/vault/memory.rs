//! in-memory vault used to drive the tracker in tests

use super::{RenameEvent, RenameListener, Vault, VaultError};
use crate::operation::ItemKind;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryHandle {
    pub path: String,
}

#[derive(Default)]
pub struct MemoryVault {
    entries: RefCell<BTreeMap<String, ItemKind>>,
    listeners: RefCell<Vec<Rc<dyn RenameListener<MemoryHandle>>>>,
    fail_renames_to: RefCell<HashSet<String>>,
    /// every rename call as (from, to), including failed ones
    pub renames: RefCell<Vec<(String, String)>>,
}

impl MemoryVault {
    pub fn with_files(paths: &[&str]) -> Self {
        let vault = Self::default();
        for path in paths {
            vault.insert(path, ItemKind::File);
        }
        vault
    }

    pub fn insert(&self, path: &str, kind: ItemKind) {
        self.entries.borrow_mut().insert(path.to_string(), kind);
    }

    pub fn remove(&self, path: &str) {
        self.entries.borrow_mut().remove(path);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.borrow().contains_key(path)
    }

    pub fn subscribe(&self, listener: Rc<dyn RenameListener<MemoryHandle>>) {
        self.listeners.borrow_mut().push(listener);
    }

    /// make any rename into `path` fail
    pub fn fail_renames_to(&self, path: &str) {
        self.fail_renames_to.borrow_mut().insert(path.to_string());
    }

    /// user-driven rename: performs it and notifies listeners
    pub fn user_rename(&self, from: &str, to: &str) {
        let handle = self.lookup(from).expect("entry should exist");
        self.rename(&handle, to).expect("rename should succeed");
    }
}

impl Vault for MemoryVault {
    type Handle = MemoryHandle;

    fn lookup(&self, path: &str) -> Option<MemoryHandle> {
        self.entries
            .borrow()
            .contains_key(path)
            .then(|| MemoryHandle {
                path: path.to_string(),
            })
    }

    fn rename(&self, handle: &MemoryHandle, new_path: &str) -> Result<(), VaultError> {
        self.renames
            .borrow_mut()
            .push((handle.path.clone(), new_path.to_string()));

        if self.fail_renames_to.borrow().contains(new_path) {
            return Err(VaultError::DestinationExists(new_path.to_string()));
        }

        let kind = self
            .entries
            .borrow_mut()
            .remove(&handle.path)
            .ok_or_else(|| VaultError::NotFound(handle.path.clone()))?;
        self.entries.borrow_mut().insert(new_path.to_string(), kind);

        let event = RenameEvent {
            kind,
            old_path: handle.path.clone(),
            new_path: new_path.to_string(),
            handle: MemoryHandle {
                path: new_path.to_string(),
            },
        };
        let listeners: Vec<_> = self.listeners.borrow().iter().cloned().collect();
        for listener in listeners {
            listener.on_rename(&event);
        }
        Ok(())
    }
}
