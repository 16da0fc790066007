//! The inode arena: every node of the namespace, indexed by [`InodeId`].

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;

use slab::Slab;

use super::inode::{Content, Inode, InodeId, ROOT_INODE};
use crate::core::{ModelError, Result};

/// Owns all inodes. Directories reference their children by id through their
/// child tables; parent ids point back up and are used for `..` and
/// [`realpath`](InodeStore::realpath) only.
pub struct InodeStore {
    nodes: Slab<Inode>,
}

impl InodeStore {
    /// Creates a store holding only the root directory.
    pub fn new() -> Self {
        let mut nodes = Slab::new();
        let root = nodes.insert(Inode::new(OsString::from("/"), None, Content::directory()));
        debug_assert_eq!(root, ROOT_INODE.0);
        Self { nodes }
    }

    pub fn root(&self) -> InodeId {
        ROOT_INODE
    }

    pub fn get(&self, id: InodeId) -> Option<&Inode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: InodeId) -> Option<&mut Inode> {
        self.nodes.get_mut(id.0)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// The parent of `id`; the root is its own parent.
    pub fn parent_of(&self, id: InodeId) -> InodeId {
        self.get(id).and_then(Inode::parent).unwrap_or(ROOT_INODE)
    }

    /// Looks `name` up in directory `dir`.
    ///
    /// Absent entries are returned too; callers decide how to treat them.
    pub fn child(&self, dir: InodeId, name: &OsStr) -> Result<Option<InodeId>> {
        let node = self.get(dir).ok_or(ModelError::NotFound)?;
        let children = node.children().ok_or(ModelError::NotADirectory)?;
        Ok(children.get(name))
    }

    /// Live (non-absent) children of `dir`.
    pub fn children(&self, dir: InodeId) -> Result<impl Iterator<Item = (&OsStr, InodeId)>> {
        let node = self.get(dir).ok_or(ModelError::NotFound)?;
        let children = node.children().ok_or(ModelError::NotADirectory)?;
        Ok(children
            .iter()
            .filter(move |(_, id)| self.get(*id).is_some_and(|child| !child.is_absent())))
    }

    /// Creates `name` inside `dir`.
    ///
    /// An absent entry of that name is revived in place and keeps its id; the
    /// returned flag tells which happened (`true` for a revival).
    pub fn create_child(
        &mut self,
        dir: InodeId,
        name: &OsStr,
        content: Content,
    ) -> Result<(InodeId, bool)> {
        match self.child(dir, name)? {
            Some(existing) => {
                let node = self.get_mut(existing).ok_or(ModelError::NotFound)?;
                if !node.is_absent() {
                    return Err(ModelError::AlreadyExists);
                }
                node.set_content(content);
                Ok((existing, true))
            }
            None => {
                let id = InodeId(self.nodes.insert(Inode::new(
                    name.to_os_string(),
                    Some(dir),
                    content,
                )));
                let inserted = self
                    .get_mut(dir)
                    .and_then(Inode::children_mut)
                    .map(|children| children.insert(name.to_os_string(), id))
                    .unwrap_or(false);
                if !inserted {
                    self.nodes.remove(id.0);
                    return Err(ModelError::NotADirectory);
                }
                Ok((id, false))
            }
        }
    }

    /// Unlinks `id` from its parent and frees it.
    ///
    /// Only leaves can be removed; a directory with children is refused.
    pub(crate) fn remove(&mut self, id: InodeId) -> bool {
        if id == ROOT_INODE {
            return false;
        }
        let Some(node) = self.get(id) else {
            return false;
        };
        if node.children().is_some_and(|children| !children.is_empty()) {
            return false;
        }
        let name = node.name().to_os_string();
        let parent = node.parent();
        if let Some(children) = parent
            .and_then(|parent| self.get_mut(parent))
            .and_then(Inode::children_mut)
        {
            children.remove(&name);
        }
        self.nodes.remove(id.0);
        true
    }

    /// Builds the absolute path of `id` by walking parent links to the root.
    pub fn realpath(&self, id: InodeId) -> PathBuf {
        let mut names = Vec::new();
        let mut cursor = id;
        while let Some(node) = self.get(cursor) {
            let Some(parent) = node.parent() else { break };
            names.push(node.name());
            cursor = parent;
        }

        let mut path = PathBuf::from("/");
        for name in names.iter().rev() {
            path.push(name);
        }
        path
    }
}

impl Default for InodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InodeStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "\n{inode:<8}    {ty:<8}  name", inode = "inode", ty = "type")?;

        fn debug(
            store: &InodeStore,
            id: InodeId,
            formatter: &mut fmt::Formatter<'_>,
            indentation: usize,
        ) -> fmt::Result {
            let Some(node) = store.get(id) else {
                return Ok(());
            };
            write!(
                formatter,
                "{inode:<8}    {ty:<8} {indentation_symbol:indentation_width$}{name}",
                inode = id,
                ty = node.inode_type().as_str(),
                name = node.name().to_string_lossy(),
                indentation_symbol = " ",
                indentation_width = indentation * 2 + 1,
            )?;
            match node.link_target() {
                Some(target) => writeln!(formatter, " -> {}", target.display())?,
                None => writeln!(formatter)?,
            }

            if let Some(children) = node.children() {
                let mut ids: Vec<_> = children.iter().map(|(_, child)| child).collect();
                ids.sort();
                for child in ids {
                    debug(store, child, formatter, indentation + 1)?;
                }
            }
            Ok(())
        }

        debug(self, ROOT_INODE, formatter, 0)
    }
}
