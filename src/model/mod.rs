mod dir_entry;
mod handles;
mod inode;
mod posix;
mod resolve;
mod store;

pub use dir_entry::DirEntry;
pub use handles::{HandleRecord, Slot};
pub use inode::{ChildTable, Content, Inode, InodeId, InodeType, ROOT_INODE};
pub use posix::PosixModel;
pub use resolve::Follow;
