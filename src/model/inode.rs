use std::collections::HashMap;
use std::collections::hash_map;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

/// Index of an [`Inode`] inside the model's inode store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InodeId(pub(crate) usize);

/// The root directory always lives at the first slot of the store.
pub const ROOT_INODE: InodeId = InodeId(0);

impl fmt::Display for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InodeType {
    /// Negative entry: the name is known not to exist.
    Absent,
    File,
    Directory,
    Symlink,
    /// Something the traced process entered, so it resolves to a directory,
    /// but the model never learned whether the entry itself is a link.
    DirOrSymlink,
}

impl InodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InodeType::Absent => "absent",
            InodeType::File => "file",
            InodeType::Directory => "dir",
            InodeType::Symlink => "symlink",
            InodeType::DirOrSymlink => "dir?",
        }
    }
}

/// Children of one directory, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildTable(HashMap<OsString, InodeId>);

impl ChildTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &OsStr) -> Option<InodeId> {
        self.0.get(name).copied()
    }

    /// Inserts `name`, refusing to replace an existing key.
    pub fn insert(&mut self, name: OsString, inode: InodeId) -> bool {
        match self.0.entry(name) {
            hash_map::Entry::Occupied(_) => false,
            hash_map::Entry::Vacant(slot) => {
                slot.insert(inode);
                true
            }
        }
    }

    pub fn remove(&mut self, name: &OsStr) -> Option<InodeId> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, InodeId)> {
        self.0.iter().map(|(name, inode)| (name.as_os_str(), *inode))
    }
}

/// What an inode carries, selected by its type.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Absent,
    File,
    Directory(ChildTable),
    Symlink(PathBuf),
    DirOrSymlink(ChildTable),
}

impl Content {
    pub fn directory() -> Self {
        Content::Directory(ChildTable::new())
    }

    pub fn dir_or_symlink() -> Self {
        Content::DirOrSymlink(ChildTable::new())
    }

    pub fn inode_type(&self) -> InodeType {
        match self {
            Content::Absent => InodeType::Absent,
            Content::File => InodeType::File,
            Content::Directory(_) => InodeType::Directory,
            Content::Symlink(_) => InodeType::Symlink,
            Content::DirOrSymlink(_) => InodeType::DirOrSymlink,
        }
    }
}

/// One entry of the namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Inode {
    name: OsString,
    parent: Option<InodeId>,
    content: Content,
    is_written: bool,
    is_read: bool,
}

impl Inode {
    pub(crate) fn new(name: OsString, parent: Option<InodeId>, content: Content) -> Inode {
        Inode {
            name,
            parent,
            content,
            is_written: false,
            is_read: false,
        }
    }

    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// `None` only for the root.
    pub fn parent(&self) -> Option<InodeId> {
        self.parent
    }

    pub fn inode_type(&self) -> InodeType {
        self.content.inode_type()
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub(crate) fn set_content(&mut self, content: Content) {
        self.content = content;
    }

    pub fn is_file(&self) -> bool {
        matches!(self.content, Content::File)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.content, Content::Directory(_))
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self.content, Content::Symlink(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.content, Content::Absent)
    }

    /// True for anything path resolution may descend into.
    pub fn is_dir_like(&self) -> bool {
        self.children().is_some()
    }

    pub fn children(&self) -> Option<&ChildTable> {
        match &self.content {
            Content::Directory(children) | Content::DirOrSymlink(children) => Some(children),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut ChildTable> {
        match &mut self.content {
            Content::Directory(children) | Content::DirOrSymlink(children) => Some(children),
            _ => None,
        }
    }

    /// The literal link text, if this is a symlink.
    pub fn link_target(&self) -> Option<&Path> {
        match &self.content {
            Content::Symlink(target) => Some(target),
            _ => None,
        }
    }

    pub fn is_written(&self) -> bool {
        self.is_written
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }

    pub(crate) fn mark_written(&mut self) {
        self.is_written = true;
    }

    pub(crate) fn mark_read(&mut self) {
        self.is_read = true;
    }
}
