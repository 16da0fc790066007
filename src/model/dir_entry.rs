use std::ffi::{OsStr, OsString};

use super::inode::{InodeId, InodeType};

/// One item of a `readdir` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: OsString,
    inode: InodeId,
    kind: InodeType,
}

impl DirEntry {
    pub fn new<N: AsRef<OsStr>>(name: N, inode: InodeId, kind: InodeType) -> DirEntry {
        DirEntry {
            name: name.as_ref().to_os_string(),
            inode,
            kind,
        }
    }

    pub fn name(&self) -> &OsStr {
        &self.name
    }

    pub fn inode(&self) -> InodeId {
        self.inode
    }

    pub fn kind(&self) -> InodeType {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == InodeType::File
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, InodeType::Directory | InodeType::DirOrSymlink)
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == InodeType::Symlink
    }
}
