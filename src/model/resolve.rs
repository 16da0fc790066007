//! Path resolution over the inode store.
//!
//! A path is turned into a queue of steps. Dereferencing a symlink splices
//! the steps of its target in front of whatever is still queued, so nested
//! links, `..` after a link, and absolute targets all fall out of the same
//! loop. When a name is missing the walk stops with [`Outcome::Missing`] and
//! keeps its queue: the caller may create the entry and resume.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Component, Path};

use tracing::trace;

use super::inode::{InodeId, ROOT_INODE};
use super::store::InodeStore;
use crate::core::{ModelError, Result};

/// Whether a symlink met as the very last component gets dereferenced.
/// Links in the middle of a path are always dereferenced.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Follow {
    Final,
    NotFinal,
}

impl Follow {
    /// A trailing `/` or `/.` names the directory a final symlink points at,
    /// so `lstat("link/")` behaves like `stat("link")`.
    pub fn honoring_trailing_slash(self, path: &Path) -> Follow {
        if names_directory(path) {
            Follow::Final
        } else {
            self
        }
    }
}

/// True for paths ending in `/` or `/.`, which only a directory can satisfy.
/// `Path::components` drops both, so this looks at the raw text.
fn names_directory(path: &Path) -> bool {
    let bytes = path.as_os_str().as_encoded_bytes();
    bytes.ends_with(b"/") || bytes.ends_with(b"/.")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Root,
    Current,
    Parent,
    Name(OsString),
}

/// Splits `path` into steps; repeated separators yield nothing.
fn steps_of(path: &Path) -> impl DoubleEndedIterator<Item = Step> + '_ {
    path.components().map(|component| match component {
        Component::Prefix(_) | Component::RootDir => Step::Root,
        Component::CurDir => Step::Current,
        Component::ParentDir => Step::Parent,
        Component::Normal(name) => Step::Name(name.to_os_string()),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Found(InodeId),
    /// `name` does not exist (or is an absent entry) inside directory `dir`.
    Missing { dir: InodeId, name: OsString },
}

/// Resumable state of one path resolution.
#[derive(Debug)]
pub struct Walker {
    cursor: InodeId,
    pending: VecDeque<Step>,
    follow: Follow,
    /// The followed result has to be a directory.
    dir_required: bool,
    expansions: usize,
    max_expansions: usize,
}

impl Walker {
    /// Prepares to resolve `path` starting at directory `base`.
    ///
    /// The empty path names nothing, as with `ENOENT` from the kernel.
    pub fn new(base: InodeId, path: &Path, follow: Follow, max_expansions: usize) -> Result<Self> {
        if path.as_os_str().is_empty() {
            return Err(ModelError::NotFound);
        }
        Ok(Self {
            cursor: base,
            pending: steps_of(path).collect(),
            follow,
            dir_required: names_directory(path),
            expansions: 0,
            max_expansions,
        })
    }

    /// True once every queued step has been consumed.
    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    /// Continues from a freshly created entry after [`Outcome::Missing`].
    pub fn enter(&mut self, inode: InodeId) {
        self.cursor = inode;
    }

    /// Walks until the queue is empty or a name is missing.
    pub fn run(&mut self, store: &InodeStore) -> Result<Outcome> {
        while let Some(step) = self.pending.pop_front() {
            let last = self.pending.is_empty();
            match step {
                Step::Root => self.cursor = ROOT_INODE,
                Step::Current => self.require_dir(store)?,
                Step::Parent => {
                    self.require_dir(store)?;
                    self.cursor = store.parent_of(self.cursor);
                }
                Step::Name(name) => {
                    let child = store
                        .child(self.cursor, &name)?
                        .and_then(|id| store.get(id).map(|node| (id, node)))
                        .filter(|(_, node)| !node.is_absent());
                    let Some((id, node)) = child else {
                        trace!(dir = %self.cursor, name = ?name, "missing path component");
                        return Ok(Outcome::Missing {
                            dir: self.cursor,
                            name,
                        });
                    };
                    match node.link_target() {
                        Some(target) if !last || self.follow == Follow::Final => {
                            self.expand(&name, target)?;
                        }
                        _ => self.cursor = id,
                    }
                }
            }
        }
        if self.dir_required && self.follow == Follow::Final {
            self.require_dir(store)?;
        }
        Ok(Outcome::Found(self.cursor))
    }

    /// Replaces a symlink by its target text; the cursor stays on the
    /// directory holding the link, which is where relative targets start.
    fn expand(&mut self, name: &OsString, target: &Path) -> Result<()> {
        if target.as_os_str().is_empty() {
            return Err(ModelError::NotFound);
        }
        self.expansions += 1;
        if self.expansions > self.max_expansions {
            trace!(name = ?name, "symlink expansion bound exceeded");
            return Err(ModelError::LoopDetected);
        }
        if self.pending.is_empty() && names_directory(target) {
            self.dir_required = true;
        }
        trace!(name = ?name, target = %target.display(), "dereferencing symlink");
        for step in steps_of(target).rev() {
            self.pending.push_front(step);
        }
        Ok(())
    }

    fn require_dir(&self, store: &InodeStore) -> Result<()> {
        match store.get(self.cursor) {
            Some(node) if node.is_dir_like() => Ok(()),
            Some(_) => Err(ModelError::NotADirectory),
            None => Err(ModelError::NotFound),
        }
    }
}

/// Resolves `path` from `base` to an existing inode.
pub fn resolve(
    store: &InodeStore,
    base: InodeId,
    path: &Path,
    follow: Follow,
    max_expansions: usize,
) -> Result<InodeId> {
    let mut walker = Walker::new(base, path, follow, max_expansions)?;
    match walker.run(store)? {
        Outcome::Found(id) => Ok(id),
        Outcome::Missing { .. } => Err(ModelError::NotFound),
    }
}
