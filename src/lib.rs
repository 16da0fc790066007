//! An in-memory model of a POSIX filesystem namespace.
//!
//! ### Overview
//!
//! `posix-model` mirrors just enough namespace state of traced processes to answer "what is the
//! canonical absolute path of this relative reference / this open directory handle" later,
//! without issuing a real filesystem call for every lookup. A syscall tracer feeds it the
//! `chdir`, `mkdir`, `symlink`, `opendir` calls it observes and asks [`PosixModel::realpath`]
//! afterwards.
//!
//! **Key ideas**:
//! - **Inode tree**: an arena of inodes; directories own name-indexed child tables, children
//!   point back at their parent for `..` and for path reconstruction.
//! - **Path resolution**: `.`, `..`, repeated separators and symbolic links are resolved the way
//!   a POSIX kernel does, with a bound on symlink expansions.
//! - **Processes**: every process id has its own working directory and open descriptors; a
//!   process never seen before starts at the root.
//! - **Lazy creation**: directories a traced process entered but the model never saw are
//!   created on the fly (see [`ModelConfig::vivify_missing`]).
//! - **No side effects**: the model never touches the host filesystem.

mod config;
mod core;
mod model;

pub use crate::config::{DEFAULT_MAX_SYMLINK_EXPANSIONS, ModelConfig};
pub use crate::core::{Fd, ModelError, Pid, Result};
pub use model::{
    ChildTable, Content, DirEntry, Follow, HandleRecord, Inode, InodeId, InodeType, PosixModel,
    ROOT_INODE, Slot,
};
