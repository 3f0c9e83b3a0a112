use crate::debug;
use crate::operation::ItemKind;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("destination {0} already exists")]
    DestinationExists(String),

    #[error("invalid vault path: {0}")]
    InvalidPath(String),

    #[error("failed to rename {from} to {to}: {source}")]
    Io {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
}

/// notification delivered after the storage layer renamed or moved an entry
#[derive(Debug, Clone)]
pub struct RenameEvent<H> {
    pub kind: ItemKind,
    pub old_path: String,
    pub new_path: String,
    pub handle: H,
}

/// observer for rename notifications
pub trait RenameListener<H> {
    fn on_rename(&self, event: &RenameEvent<H>);
}

/// storage layer the tracker reads from and issues corrective renames against
pub trait Vault {
    type Handle: Clone + fmt::Debug;

    /// resolve a vault path to a live entry
    fn lookup(&self, path: &str) -> Option<Self::Handle>;

    /// rename or move an entry, notifying subscribed listeners on success
    fn rename(&self, handle: &Self::Handle, new_path: &str) -> Result<(), VaultError>;
}

/// live entry inside an `FsVault`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(usize);

/// vault backed by a directory on disk, addressed with `/`-separated relative paths
pub struct FsVault {
    root: PathBuf,
    listeners: RefCell<Vec<(ListenerId, Rc<dyn RenameListener<Entry>>)>>,
    next_listener: Cell<usize>,
}

impl FsVault {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        use anyhow::{Context, bail};

        let root = root
            .canonicalize()
            .with_context(|| format!("failed to open vault {}", root.display()))?;
        if !root.is_dir() {
            bail!("vault {} is not a directory", root.display());
        }

        Ok(Self {
            root,
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn subscribe(&self, listener: Rc<dyn RenameListener<Entry>>) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// rename by path, the way the shell drives the vault
    pub fn rename_path(&self, from: &str, to: &str) -> Result<(), VaultError> {
        let from = normalize(from)?;
        let entry = self
            .lookup(&from)
            .ok_or_else(|| VaultError::NotFound(from.clone()))?;
        self.rename(&entry, to)
    }

    fn absolute(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn notify(&self, event: &RenameEvent<Entry>) {
        // snapshot so listeners may (un)subscribe while being notified
        let listeners: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener.on_rename(event);
        }
    }
}

impl Vault for FsVault {
    type Handle = Entry;

    fn lookup(&self, path: &str) -> Option<Entry> {
        let path = normalize(path).ok()?;
        let metadata = std::fs::symlink_metadata(self.absolute(&path)).ok()?;
        let kind = if metadata.is_dir() {
            ItemKind::Folder
        } else {
            ItemKind::File
        };
        Some(Entry { path, kind })
    }

    fn rename(&self, handle: &Entry, new_path: &str) -> Result<(), VaultError> {
        let new_path = normalize(new_path)?;
        let from = self.absolute(&handle.path);
        let to = self.absolute(&new_path);

        if std::fs::symlink_metadata(&from).is_err() {
            return Err(VaultError::NotFound(handle.path.clone()));
        }
        if new_path == handle.path {
            return Ok(());
        }
        // case-only renames on case-insensitive filesystems resolve to the same entry
        if std::fs::symlink_metadata(&to).is_ok() && !same_entry(&from, &to) {
            return Err(VaultError::DestinationExists(new_path));
        }
        if handle.kind == ItemKind::Folder && new_path.starts_with(&format!("{}/", handle.path)) {
            return Err(VaultError::InvalidPath(format!(
                "cannot move {} into itself",
                handle.path
            )));
        }

        let io_error = |source| VaultError::Io {
            from: handle.path.clone(),
            to: new_path.clone(),
            source,
        };
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::rename(&from, &to).map_err(io_error)?;

        debug!("vault renamed {} {} to {}", handle.kind, handle.path, new_path);

        self.notify(&RenameEvent {
            kind: handle.kind,
            old_path: handle.path.clone(),
            new_path: new_path.clone(),
            handle: Entry {
                path: new_path,
                kind: handle.kind,
            },
        });
        Ok(())
    }
}

/// check whether two paths refer to the same file on disk
fn same_entry(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// turn user input into a canonical vault-relative path
///
/// accepts `\` or `/` separators and leading/trailing separators, rejects
/// empty paths and anything that would escape the vault root
pub fn normalize(path: &str) -> Result<String, VaultError> {
    let unified = path.replace('\\', "/");
    let mut parts = Vec::new();

    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(VaultError::InvalidPath(path.to_string()));
            }
        }
    }

    if parts.is_empty() {
        return Err(VaultError::InvalidPath(path.to_string()));
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
pub mod memory;
