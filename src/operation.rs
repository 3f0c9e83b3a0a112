use std::fmt;

/// whether a tracked entry is a file or a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Folder,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::File => write!(f, "file"),
            ItemKind::Folder => write!(f, "folder"),
        }
    }
}

/// classification of a single rename event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// destination still under the source's parent folder
    Rename,
    /// destination outside the source's parent folder
    Move,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Rename => write!(f, "rename"),
            ChangeKind::Move => write!(f, "move"),
        }
    }
}

/// parent folder of a vault path, including the trailing separator ("" at the root)
pub fn parent_prefix(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    }
}

/// classify a rename event by whether the new path stays under the old parent folder
///
/// moving an entry into a subfolder of its own parent counts as a rename, and
/// so does anything renamed from the vault root
pub fn classify(old_path: &str, new_path: &str) -> ChangeKind {
    if new_path.starts_with(parent_prefix(old_path)) {
        ChangeKind::Rename
    } else {
        ChangeKind::Move
    }
}

/// a single renamed or moved entry
#[derive(Debug, Clone)]
pub struct FileItem<H> {
    pub kind: ItemKind,
    pub old_path: String,
    pub new_path: String,
    pub handle: H,
}

/// a batch of same-kind rename events observed within one time window
#[derive(Debug, Clone)]
pub struct Operation<H> {
    pub kind: ChangeKind,
    pub files: Vec<FileItem<H>>,
    pub timestamp: u64, // ms since epoch, when the batch was opened
}

impl<H> Operation<H> {
    pub fn new(kind: ChangeKind, timestamp: u64) -> Self {
        Self {
            kind,
            files: Vec::new(),
            timestamp,
        }
    }

    /// true while the batch may still be undone at `now`
    pub fn is_fresh(&self, now: u64, window_ms: u64) -> bool {
        now.saturating_sub(self.timestamp) <= window_ms
    }

    /// true while new events of the same kind may join the batch at `now`
    pub fn accepts(&self, kind: ChangeKind, now: u64, window_ms: u64) -> bool {
        self.kind == kind && self.timestamp.saturating_add(window_ms) > now
    }

    pub fn item_word(&self) -> &'static str {
        if self.files.len() == 1 { "item" } else { "items" }
    }
}
