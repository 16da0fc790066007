//! The public verbs of the namespace model.
//!
//! A tracer mirrors namespace-changing syscalls of the processes it watches
//! into a [`PosixModel`] and asks it afterwards where a relative path or an
//! open directory handle really points to.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use super::dir_entry::DirEntry;
use super::handles::{HandleRecord, HandleTable, Slot};
use super::inode::{Content, Inode, InodeId};
use super::resolve::{self, Follow, Outcome, Walker};
use super::store::InodeStore;
use crate::config::ModelConfig;
use crate::core::{Fd, ModelError, Pid, Result};

/// In-memory model of a POSIX namespace shared by many simulated processes.
///
/// ### Internal state
///
/// * `store`: arena of inodes. The root directory is created with the model
///   and lives as long as it does. Directories own their children through a
///   name-indexed child table; every other inode knows its parent id, which is
///   used for `..` and for [`realpath`](PosixModel::realpath) only.
/// * `handles`: flat table of `(pid, slot) -> inode` records holding each
///   process's working directory and open directory descriptors.
/// * `config`: see [`ModelConfig`].
///
/// ### Invariants
///
/// 1. **Root existence**: the root is always present and is a directory.
/// 2. **Uniqueness**: names are unique inside a directory and at most one
///    record exists per `(pid, slot)`.
/// 3. **Atomicity**: an operation that fails leaves the tree and the handle
///    table as they were. Entries created on the fly by `chdir`/`opendir` are
///    removed again when the call fails afterwards.
///
/// ### Thread Safety
///
/// Not thread‑safe. Every mutating operation takes `&mut self`; wrap the model
/// in a `Mutex` when several tracer threads feed it.
///
/// ### Example
///
/// ```
/// use posix_model::PosixModel;
///
/// let mut model = PosixModel::new();
/// let pid = 100;
///
/// let cwd = model.cwd(pid);
/// model.mkdir(cwd, "actual").unwrap();
/// model.symlink(cwd, "actual", "link").unwrap();
/// model.mkdir(cwd, "actual/subdir").unwrap();
///
/// model.chdir(cwd, "link/subdir", pid).unwrap();
/// let cwd = model.cwd(pid);
/// assert_eq!(model.realpath(cwd), std::path::Path::new("/actual/subdir"));
/// ```
pub struct PosixModel {
    store: InodeStore,
    handles: HandleTable,
    config: ModelConfig,
}

/// Entries created while vivifying a path. `true` marks an absent entry that
/// was revived in place rather than created.
#[derive(Debug, Default)]
struct Undo(Vec<(InodeId, bool)>);

impl PosixModel {
    /// Creates a model holding only the root directory.
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    pub fn with_config(config: ModelConfig) -> Self {
        Self {
            store: InodeStore::new(),
            handles: HandleTable::new(config.max_handles),
            config,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Switches lazy creation of missing directories on `chdir`/`opendir`.
    pub fn set_vivify_missing(&mut self, vivify: bool) {
        self.config.vivify_missing = vivify;
    }

    pub fn root(&self) -> InodeId {
        self.store.root()
    }

    pub fn inode(&self, id: InodeId) -> Option<&Inode> {
        self.store.get(id)
    }

    /// Number of inodes in the tree, root and absent entries included.
    pub fn inode_count(&self) -> usize {
        self.store.len()
    }

    /// Number of working directory and descriptor records, all processes.
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Returns the inode behind descriptor `fd` of process `pid`.
    pub fn lookup_fd(&self, pid: Pid, fd: Fd) -> Option<InodeId> {
        self.handles.lookup(pid, Slot::Fd(fd))
    }

    /// Working directory and descriptor records of `pid`.
    pub fn records(&self, pid: Pid) -> impl Iterator<Item = &HandleRecord> {
        self.handles.records_of(pid)
    }

    /// Absolute path of `inode`, free of `.`, `..` and symlinks.
    pub fn realpath(&self, inode: InodeId) -> PathBuf {
        self.store.realpath(inode)
    }

    /// Working directory of `pid`.
    ///
    /// A process never seen before starts at the root, and that is recorded.
    pub fn cwd(&mut self, pid: Pid) -> InodeId {
        if let Some(cwd) = self.handles.lookup(pid, Slot::Cwd) {
            return cwd;
        }
        let root = self.store.root();
        if let Err(err) = self.handles.insert(pid, Slot::Cwd, root) {
            warn!(pid, %err, "cannot record initial working directory");
        }
        root
    }

    /// Resolves `path` against `base` without creating anything.
    pub fn resolve<P: AsRef<Path>>(&self, base: InodeId, path: P, follow: Follow) -> Result<InodeId> {
        resolve::resolve(
            &self.store,
            base,
            path.as_ref(),
            follow,
            self.config.max_symlink_expansions,
        )
    }

    /// Looks `path` up without following a final symlink.
    pub fn lstat<P: AsRef<Path>>(&self, base: InodeId, path: P) -> Option<InodeId> {
        let path = path.as_ref();
        self.resolve(base, path, Follow::NotFinal.honoring_trailing_slash(path))
            .ok()
    }

    /// Looks `path` up, following a final symlink.
    pub fn stat<P: AsRef<Path>>(&self, base: InodeId, path: P) -> Option<InodeId> {
        self.resolve(base, path, Follow::Final).ok()
    }

    /// Changes the working directory of `pid` to `path`, resolved from `base`.
    ///
    /// With `vivify_missing` on, missing components are created as
    /// [`DirOrSymlink`](crate::InodeType::DirOrSymlink) entries.
    pub fn chdir<P: AsRef<Path>>(&mut self, base: InodeId, path: P, pid: Pid) -> Result<()> {
        let path = path.as_ref();
        let (dir, undo) = self.enter_dir(base, path)?;
        if let Err(err) = self.handles.insert(pid, Slot::Cwd, dir) {
            self.rollback(undo);
            return Err(err);
        }
        debug!(pid, path = %path.display(), cwd = %self.store.realpath(dir).display(), "chdir");
        Ok(())
    }

    /// Creates directory `path`. Its parent has to exist; the name itself
    /// must not, whatever it currently is.
    pub fn mkdir<P: AsRef<Path>>(&mut self, base: InodeId, path: P) -> Result<InodeId> {
        self.create_at(base, path.as_ref(), Content::directory())
    }

    /// Creates symlink `link_path` holding the literal text `target`.
    ///
    /// An empty target is refused with [`ModelError::NotFound`], like `ENOENT`.
    pub fn symlink<T, P>(&mut self, base: InodeId, target: T, link_path: P) -> Result<InodeId>
    where
        T: AsRef<Path>,
        P: AsRef<Path>,
    {
        let target = target.as_ref().to_path_buf();
        if target.as_os_str().is_empty() {
            return Err(ModelError::NotFound);
        }
        self.create_at(base, link_path.as_ref(), Content::Symlink(target))
    }

    /// Creates regular file `path`, like `open(O_CREAT | O_EXCL)`.
    pub fn create_file<P: AsRef<Path>>(&mut self, base: InodeId, path: P) -> Result<InodeId> {
        self.create_at(base, path.as_ref(), Content::File)
    }

    /// Opens directory `path` as descriptor `fd` of `pid`, replacing whatever
    /// that descriptor referred to before.
    pub fn opendir<P: AsRef<Path>>(&mut self, base: InodeId, path: P, pid: Pid, fd: Fd) -> Result<()> {
        if fd < 0 {
            return Err(ModelError::BadDescriptor(fd));
        }
        let path = path.as_ref();
        let (dir, undo) = self.enter_dir(base, path)?;
        if let Err(err) = self.handles.insert(pid, Slot::Fd(fd), dir) {
            self.rollback(undo);
            return Err(err);
        }
        debug!(pid, fd, path = %path.display(), dir = %self.store.realpath(dir).display(), "opendir");
        Ok(())
    }

    /// Lists the directory behind descriptor `fd` of `pid`, sorted by name.
    ///
    /// Every call returns the full listing; there is no cursor.
    pub fn readdir(&mut self, pid: Pid, fd: Fd) -> Result<Vec<DirEntry>> {
        let dir = self.lookup_fd(pid, fd).ok_or(ModelError::NotFound)?;
        let mut entries: Vec<_> = self
            .store
            .children(dir)?
            .filter_map(|(name, id)| {
                self.store
                    .get(id)
                    .map(|node| DirEntry::new(name, id, node.inode_type()))
            })
            .collect();
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        if let Some(node) = self.store.get_mut(dir) {
            node.mark_read();
        }
        trace!(pid, fd, count = entries.len(), "readdir");
        Ok(entries)
    }

    /// Returns the target text of the symlink named by `path`.
    pub fn readlink<P: AsRef<Path>>(&mut self, base: InodeId, path: P) -> Result<PathBuf> {
        let link = self.resolve(base, path, Follow::NotFinal)?;
        let node = self.store.get_mut(link).ok_or(ModelError::NotFound)?;
        let target = node
            .link_target()
            .map(Path::to_path_buf)
            .ok_or(ModelError::InvalidInput)?;
        node.mark_read();
        Ok(target)
    }

    /// Flags the entry `path` resolves to as read by the traced program.
    pub fn record_read<P: AsRef<Path>>(&mut self, base: InodeId, path: P) -> Result<InodeId> {
        let id = self.resolve(base, path, Follow::Final)?;
        if let Some(node) = self.store.get_mut(id) {
            node.mark_read();
        }
        Ok(id)
    }

    /// Flags the entry `path` resolves to as written by the traced program.
    pub fn record_write<P: AsRef<Path>>(&mut self, base: InodeId, path: P) -> Result<InodeId> {
        let id = self.resolve(base, path, Follow::Final)?;
        if let Some(node) = self.store.get_mut(id) {
            node.mark_written();
        }
        Ok(id)
    }

    /// Remembers that `path` did not exist when the traced program looked.
    ///
    /// The parent must exist. Recording the same name twice is harmless, but
    /// recording a name the model knows to exist fails with
    /// [`ModelError::AlreadyExists`].
    pub fn record_absent<P: AsRef<Path>>(&mut self, base: InodeId, path: P) -> Result<InodeId> {
        let path = path.as_ref();
        let mut walker = self.walker(base, path, Follow::NotFinal)?;
        match walker.run(&self.store)? {
            Outcome::Found(_) => Err(ModelError::AlreadyExists),
            Outcome::Missing { dir, name } if walker.is_done() => {
                let (id, _) = self.store.create_child(dir, &name, Content::Absent)?;
                if let Some(node) = self.store.get_mut(id) {
                    node.mark_read();
                }
                trace!(path = %path.display(), "recorded absent entry");
                Ok(id)
            }
            Outcome::Missing { .. } => Err(ModelError::NotFound),
        }
    }

    /// Gives `child` copies of every record of `parent`: its working
    /// directory and its open descriptors. Records `child` held before are
    /// dropped, since a forked process starts with the parent's state only.
    pub fn fork(&mut self, parent: Pid, child: Pid) -> Result<()> {
        self.cwd(parent);
        let inherited = self.handles.inherit(parent, child)?;
        debug!(parent, child, inherited, "fork");
        Ok(())
    }

    /// Forgets descriptor `fd` of `pid`.
    pub fn close(&mut self, pid: Pid, fd: Fd) -> Result<()> {
        self.handles
            .remove(pid, Slot::Fd(fd))
            .map(|_| ())
            .ok_or(ModelError::BadDescriptor(fd))
    }

    fn walker(&self, base: InodeId, path: &Path, follow: Follow) -> Result<Walker> {
        Walker::new(base, path, follow, self.config.max_symlink_expansions)
    }

    /// Shared by `mkdir`, `symlink` and `create_file`: everything but the last
    /// component must resolve, the last one must be free.
    fn create_at(&mut self, base: InodeId, path: &Path, content: Content) -> Result<InodeId> {
        let mut walker = self.walker(base, path, Follow::NotFinal)?;
        match walker.run(&self.store)? {
            Outcome::Found(_) => Err(ModelError::AlreadyExists),
            Outcome::Missing { dir, name } if walker.is_done() => {
                let kind = content.inode_type();
                let (id, _) = self.store.create_child(dir, &name, content)?;
                if let Some(node) = self.store.get_mut(id) {
                    node.mark_written();
                }
                debug!(path = %path.display(), kind = kind.as_str(), inode = %id, "created");
                Ok(id)
            }
            Outcome::Missing { .. } => Err(ModelError::NotFound),
        }
    }

    /// Resolves `path` to a directory for `chdir`/`opendir`, following a final
    /// symlink and vivifying missing components if configured to.
    ///
    /// On failure nothing created here survives; on success the caller gets
    /// the undo log to roll back if its own step fails.
    fn enter_dir(&mut self, base: InodeId, path: &Path) -> Result<(InodeId, Undo)> {
        let mut undo = Undo::default();
        let result = self
            .walk_vivifying(base, path, &mut undo)
            .and_then(|id| match self.store.get(id) {
                Some(node) if node.is_dir_like() => Ok(id),
                Some(_) => Err(ModelError::NotADirectory),
                None => Err(ModelError::NotFound),
            });
        match result {
            Ok(id) => Ok((id, undo)),
            Err(err) => {
                self.rollback(undo);
                debug!(path = %path.display(), %err, "cannot enter directory");
                Err(err)
            }
        }
    }

    fn walk_vivifying(&mut self, base: InodeId, path: &Path, undo: &mut Undo) -> Result<InodeId> {
        let mut walker = self.walker(base, path, Follow::Final)?;
        loop {
            match walker.run(&self.store)? {
                Outcome::Found(id) => return Ok(id),
                Outcome::Missing { dir, name } if self.config.vivify_missing => {
                    let (id, revived) =
                        self.store.create_child(dir, &name, Content::dir_or_symlink())?;
                    undo.0.push((id, revived));
                    trace!(name = ?name, inode = %id, "vivified missing directory");
                    walker.enter(id);
                }
                Outcome::Missing { .. } => return Err(ModelError::NotFound),
            }
        }
    }

    fn rollback(&mut self, undo: Undo) {
        if undo.0.is_empty() {
            return;
        }
        warn!(count = undo.0.len(), "rolling back vivified entries");
        for (id, revived) in undo.0.into_iter().rev() {
            if revived {
                if let Some(node) = self.store.get_mut(id) {
                    node.set_content(Content::Absent);
                }
            } else if !self.store.remove(id) {
                warn!(inode = %id, "vivified entry left behind");
            }
        }
    }
}

impl Default for PosixModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PosixModel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PosixModel")
            .field("config", &self.config)
            .field("handles", &self.handles)
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InodeType;

    const PID: Pid = 100;

    /// /home/user/notes.txt and /etc
    fn setup_model() -> PosixModel {
        let mut model = PosixModel::new();
        let root = model.root();
        model.mkdir(root, "/home").unwrap();
        model.mkdir(root, "/home/user").unwrap();
        model.mkdir(root, "/etc").unwrap();
        model.create_file(root, "/home/user/notes.txt").unwrap();
        model
    }

    fn cwd_path(model: &mut PosixModel, pid: Pid) -> PathBuf {
        let cwd = model.cwd(pid);
        model.realpath(cwd)
    }

    fn kind(model: &PosixModel, id: InodeId) -> InodeType {
        model.inode(id).unwrap().inode_type()
    }

    mod cwd {
        use super::*;

        #[test]
        fn test_unseen_process_starts_at_root() {
            let mut model = setup_model();
            assert_eq!(model.records(PID).count(), 0);

            assert_eq!(model.cwd(PID), model.root());
            assert_eq!(model.records(PID).count(), 1);
        }

        #[test]
        fn test_processes_are_isolated() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            model.chdir(root, "/home", 1)?;
            model.chdir(root, "/etc", 2)?;

            assert_eq!(cwd_path(&mut model, 1), Path::new("/home"));
            assert_eq!(cwd_path(&mut model, 2), Path::new("/etc"));
            assert_eq!(cwd_path(&mut model, 3), Path::new("/"));
            Ok(())
        }
    }

    mod chdir {
        use super::*;

        #[test]
        fn test_chdir_absolute_path() -> Result<()> {
            let mut model = setup_model();
            let cwd = model.cwd(PID);
            model.chdir(cwd, "/home/user", PID)?;

            assert_eq!(cwd_path(&mut model, PID), Path::new("/home/user"));
            Ok(())
        }

        #[test]
        fn test_chdir_relative_path() -> Result<()> {
            let mut model = setup_model();
            let cwd = model.cwd(PID);
            model.chdir(cwd, "/home", PID)?;

            let cwd = model.cwd(PID);
            model.chdir(cwd, "user", PID)?;

            assert_eq!(cwd_path(&mut model, PID), Path::new("/home/user"));
            Ok(())
        }

        #[test]
        fn test_chdir_redundant_components() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            model.chdir(root, "./home/../home/./user", 1)?;
            model.chdir(root, "home/user", 2)?;
            model.chdir(root, "//home///user//", 3)?;

            let first = model.cwd(1);
            assert_eq!(model.cwd(2), first);
            assert_eq!(model.cwd(3), first);
            Ok(())
        }

        #[test]
        fn test_chdir_root_parent_is_root() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            model.chdir(root, "../../..", PID)?;
            assert_eq!(cwd_path(&mut model, PID), Path::new("/"));

            model.chdir(root, "/home/../../../etc", PID)?;
            assert_eq!(cwd_path(&mut model, PID), Path::new("/etc"));
            Ok(())
        }

        #[test]
        fn test_chdir_into_file_fails() {
            let mut model = setup_model();
            let cwd = model.cwd(PID);
            let result = model.chdir(cwd, "/home/user/notes.txt", PID);

            assert_eq!(result, Err(ModelError::NotADirectory));
            assert_eq!(model.cwd(PID), cwd);
        }

        #[test_log::test]
        fn test_chdir_vivifies_missing_path() -> Result<()> {
            let mut model = PosixModel::new();
            let cwd = model.cwd(PID);
            model.chdir(cwd, "/test/directory", PID)?;

            let cwd = model.cwd(PID);
            assert_eq!(model.realpath(cwd), Path::new("/test/directory"));
            assert_eq!(kind(&model, cwd), InodeType::DirOrSymlink);
            Ok(())
        }

        #[test]
        fn test_chdir_without_vivify() {
            let mut model = setup_model();
            model.set_vivify_missing(false);
            let cwd = model.cwd(PID);
            let before = model.inode_count();

            assert_eq!(model.chdir(cwd, "/test/directory", PID), Err(ModelError::NotFound));
            assert_eq!(model.inode_count(), before);
            assert_eq!(model.cwd(PID), cwd);
        }

        #[test_log::test]
        fn test_failed_chdir_rolls_back_vivified_entries() {
            let mut model = setup_model();
            let root = model.root();
            let before = model.inode_count();

            let result = model.chdir(root, "missing/../home/user/notes.txt", PID);
            assert_eq!(result, Err(ModelError::NotADirectory));

            let result = model.chdir(root, "gone/deeper/../../home/user/notes.txt/x", PID);
            assert_eq!(result, Err(ModelError::NotADirectory));

            assert_eq!(model.inode_count(), before);
            assert_eq!(model.lstat(root, "missing"), None);
            assert_eq!(model.lstat(root, "gone"), None);
        }

        #[test]
        fn test_chdir_symlink_loop() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            model.symlink(root, "b", "/a")?;
            model.symlink(root, "a", "/b")?;

            assert_eq!(model.chdir(root, "/a", PID), Err(ModelError::LoopDetected));
            assert_eq!(model.chdir(root, "/a/x", PID), Err(ModelError::LoopDetected));
            Ok(())
        }

        #[test]
        fn test_chdir_follows_final_symlink() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            model.symlink(root, "home/user", "/me")?;
            model.chdir(root, "/me", PID)?;

            assert_eq!(cwd_path(&mut model, PID), Path::new("/home/user"));
            Ok(())
        }
    }

    mod mkdir {
        use super::*;

        #[test]
        fn test_mkdir_simple_directory() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            let id = model.mkdir(root, "/test")?;

            assert_eq!(kind(&model, id), InodeType::Directory);
            assert!(model.inode(id).unwrap().is_written());
            assert_eq!(model.lstat(root, "/test"), Some(id));
            Ok(())
        }

        #[test]
        fn test_mkdir_relative_to_base() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            let home = model.lstat(root, "/home").unwrap();
            let id = model.mkdir(home, "user/projects")?;

            assert_eq!(model.realpath(id), Path::new("/home/user/projects"));
            Ok(())
        }

        #[test]
        fn test_mkdir_missing_parent() {
            let mut model = setup_model();
            let root = model.root();
            let before = model.inode_count();

            assert_eq!(model.mkdir(root, "/a/b/c"), Err(ModelError::NotFound));
            assert_eq!(model.inode_count(), before);
        }

        #[test]
        fn test_mkdir_existing_name_of_any_type() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            model.symlink(root, "/nowhere", "/dangling")?;
            model.chdir(root, "/vivified", PID)?;
            let before = model.inode_count();

            for path in ["/home", "/home/user/notes.txt", "/dangling", "/vivified", "/"] {
                assert_eq!(model.mkdir(root, path), Err(ModelError::AlreadyExists), "{path}");
            }
            assert_eq!(model.inode_count(), before);
            Ok(())
        }

        #[test]
        fn test_mkdir_inside_file() {
            let mut model = setup_model();
            let root = model.root();
            assert_eq!(
                model.mkdir(root, "/home/user/notes.txt/x"),
                Err(ModelError::NotADirectory)
            );
        }

        #[test]
        fn test_mkdir_through_symlink() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            model.symlink(root, "/home/user", "/u")?;
            let id = model.mkdir(root, "/u/new")?;

            assert_eq!(model.realpath(id), Path::new("/home/user/new"));
            Ok(())
        }

        #[test]
        fn test_mkdir_revives_absent_entry() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            let ghost = model.record_absent(root, "/home/ghost")?;
            let dir = model.mkdir(root, "/home/ghost")?;

            assert_eq!(dir, ghost);
            assert_eq!(kind(&model, dir), InodeType::Directory);
            Ok(())
        }

        #[test]
        fn test_mkdir_empty_path() {
            let mut model = setup_model();
            let root = model.root();
            assert_eq!(model.mkdir(root, ""), Err(ModelError::NotFound));
        }
    }

    mod lstat {
        use super::*;

        fn setup_links() -> PosixModel {
            let mut model = setup_model();
            let root = model.root();
            model.symlink(root, "user", "/home/link").unwrap();
            model.symlink(root, "/nowhere", "/dangling").unwrap();
            model
        }

        #[test]
        fn test_lstat_does_not_follow() {
            let model = setup_links();
            let root = model.root();

            let link = model.lstat(root, "/home/link").unwrap();
            assert_eq!(kind(&model, link), InodeType::Symlink);
            assert_eq!(model.realpath(link), Path::new("/home/link"));
        }

        #[test]
        fn test_stat_follows() {
            let model = setup_links();
            let root = model.root();

            let user = model.stat(root, "/home/link").unwrap();
            assert_eq!(model.realpath(user), Path::new("/home/user"));
        }

        #[test]
        fn test_trailing_slash_follows() {
            let model = setup_links();
            let root = model.root();

            let user = model.lstat(root, "/home/link/").unwrap();
            assert_eq!(model.realpath(user), Path::new("/home/user"));
        }

        #[test]
        fn test_symlink_is_transparent_mid_path() {
            let model = setup_links();
            let root = model.root();
            assert_eq!(
                model.lstat(root, "/home/link/notes.txt"),
                model.lstat(root, "/home/user/notes.txt")
            );
        }

        #[test]
        fn test_dangling_symlink() {
            let model = setup_links();
            let root = model.root();
            assert!(model.lstat(root, "/dangling").is_some());
            assert_eq!(model.stat(root, "/dangling"), None);
        }

        #[test]
        fn test_trailing_slash_on_file() {
            let model = setup_links();
            let root = model.root();
            for path in ["/home/user/notes.txt/", "/home/user/notes.txt/.", "/home/user/notes.txt/./"] {
                assert_eq!(model.lstat(root, path), None, "{path}");
                assert_eq!(model.stat(root, path), None, "{path}");
            }
            assert!(model.stat(root, "/home/user/").is_some());
        }

        #[test]
        fn test_lstat_missing() {
            let model = setup_links();
            let root = model.root();
            assert_eq!(model.lstat(root, "/home/nobody"), None);
            assert_eq!(model.lstat(root, "/home/user/notes.txt/x"), None);
        }
    }

    mod opendir_readdir {
        use super::*;

        fn names(entries: &[DirEntry]) -> Vec<String> {
            entries
                .iter()
                .map(|entry| entry.name().to_string_lossy().into_owned())
                .collect()
        }

        #[test]
        fn test_opendir_registers_handle() -> Result<()> {
            let mut model = setup_model();
            let cwd = model.cwd(PID);
            model.opendir(cwd, "/home", PID, 3)?;

            let dir = model.lookup_fd(PID, 3).unwrap();
            assert_eq!(model.realpath(dir), Path::new("/home"));
            assert_eq!(model.lookup_fd(PID, 4), None);
            assert_eq!(model.lookup_fd(PID + 1, 3), None);
            Ok(())
        }

        #[test]
        fn test_reused_descriptor_overwrites() -> Result<()> {
            let mut model = setup_model();
            let cwd = model.cwd(PID);
            model.opendir(cwd, "/home", PID, 3)?;
            model.opendir(cwd, "/etc", PID, 3)?;

            let dir = model.lookup_fd(PID, 3).unwrap();
            assert_eq!(model.realpath(dir), Path::new("/etc"));
            assert_eq!(model.records(PID).count(), 2); // cwd + fd 3
            assert_eq!(model.handle_count(), 2);
            Ok(())
        }

        #[test]
        fn test_opendir_negative_descriptor() {
            let mut model = setup_model();
            let cwd = model.cwd(PID);
            assert_eq!(
                model.opendir(cwd, "/home", PID, -1),
                Err(ModelError::BadDescriptor(-1))
            );
        }

        #[test]
        fn test_opendir_file_fails() {
            let mut model = setup_model();
            let cwd = model.cwd(PID);
            assert_eq!(
                model.opendir(cwd, "/home/user/notes.txt", PID, 3),
                Err(ModelError::NotADirectory)
            );
            assert_eq!(model.lookup_fd(PID, 3), None);
        }

        #[test]
        fn test_opendir_vivifies() -> Result<()> {
            let mut model = setup_model();
            let cwd = model.cwd(PID);
            model.opendir(cwd, "/usr/local/bin", PID, 7)?;

            let dir = model.lookup_fd(PID, 7).unwrap();
            assert_eq!(model.realpath(dir), Path::new("/usr/local/bin"));
            Ok(())
        }

        #[test]
        fn test_handle_ceiling_rolls_back() {
            let mut model = PosixModel::with_config(ModelConfig::default().with_max_handles(Some(1)));
            let cwd = model.cwd(PID);
            let before = model.inode_count();

            assert_eq!(
                model.opendir(cwd, "/new/dir", PID, 3),
                Err(ModelError::HandleExhausted)
            );
            assert_eq!(model.inode_count(), before);
            assert_eq!(model.lstat(cwd, "/new"), None);
        }

        #[test]
        fn test_readdir_lists_children() -> Result<()> {
            let mut model = setup_model();
            let cwd = model.cwd(PID);
            model.symlink(cwd, "notes.txt", "/home/user/link")?;
            model.mkdir(cwd, "/home/user/sub")?;
            model.opendir(cwd, "/home/user", PID, 5)?;

            let entries = model.readdir(PID, 5)?;
            assert_eq!(names(&entries), ["link", "notes.txt", "sub"]);
            assert!(entries[0].is_symlink());
            assert!(entries[1].is_file());
            assert!(entries[2].is_dir());

            let dir = model.lookup_fd(PID, 5).unwrap();
            assert!(model.inode(dir).unwrap().is_read());
            Ok(())
        }

        #[test]
        fn test_readdir_is_stateless() -> Result<()> {
            let mut model = setup_model();
            let cwd = model.cwd(PID);
            model.opendir(cwd, "/home", PID, 5)?;

            assert_eq!(model.readdir(PID, 5)?, model.readdir(PID, 5)?);

            model.mkdir(cwd, "/home/guest")?;
            assert_eq!(names(&model.readdir(PID, 5)?), ["guest", "user"]);
            Ok(())
        }

        #[test]
        fn test_readdir_skips_absent_entries() -> Result<()> {
            let mut model = setup_model();
            let cwd = model.cwd(PID);
            model.record_absent(cwd, "/etc/passwd")?;
            model.opendir(cwd, "/etc", PID, 5)?;

            assert!(model.readdir(PID, 5)?.is_empty());
            Ok(())
        }

        #[test]
        fn test_readdir_unknown_handle() {
            let mut model = setup_model();
            assert_eq!(model.readdir(PID, 9), Err(ModelError::NotFound));
        }
    }

    mod links_and_flags {
        use super::*;

        #[test]
        fn test_readlink() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            let link = model.symlink(root, "../etc//", "/home/up")?;

            assert_eq!(model.readlink(root, "/home/up")?, Path::new("../etc//"));
            assert!(model.inode(link).unwrap().is_read());
            assert_eq!(model.readlink(root, "/home"), Err(ModelError::InvalidInput));
            assert_eq!(model.readlink(root, "/nope"), Err(ModelError::NotFound));
            Ok(())
        }

        #[test]
        fn test_symlink_empty_target() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            let before = model.inode_count();

            assert_eq!(model.symlink(root, "", "/home/empty"), Err(ModelError::NotFound));
            assert_eq!(model.inode_count(), before);
            assert_eq!(model.lstat(root, "/home/empty"), None);
            Ok(())
        }

        #[test]
        fn test_record_write_through_trailing_slash() {
            let mut model = setup_model();
            let root = model.root();
            assert_eq!(
                model.record_write(root, "/home/user/notes.txt/"),
                Err(ModelError::NotADirectory)
            );
            let notes = model.lstat(root, "/home/user/notes.txt").unwrap();
            assert!(!model.inode(notes).unwrap().is_written());
        }

        #[test]
        fn test_symlink_existing_name() {
            let mut model = setup_model();
            let root = model.root();
            assert_eq!(
                model.symlink(root, "/etc", "/home/user"),
                Err(ModelError::AlreadyExists)
            );
        }

        #[test]
        fn test_create_file_existing_name() {
            let mut model = setup_model();
            let root = model.root();
            assert_eq!(
                model.create_file(root, "/home/user/notes.txt"),
                Err(ModelError::AlreadyExists)
            );
        }

        #[test]
        fn test_record_read_and_write() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            model.symlink(root, "/home/user/notes.txt", "/notes")?;

            let read = model.record_read(root, "/etc")?;
            let written = model.record_write(root, "/notes")?;

            assert!(model.inode(read).unwrap().is_read());
            assert!(!model.inode(read).unwrap().is_written());
            assert_eq!(model.realpath(written), Path::new("/home/user/notes.txt"));
            assert!(model.inode(written).unwrap().is_written());
            assert_eq!(model.record_read(root, "/nope"), Err(ModelError::NotFound));
            Ok(())
        }

        #[test]
        fn test_record_absent() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            let ghost = model.record_absent(root, "/etc/ghost")?;

            assert_eq!(kind(&model, ghost), InodeType::Absent);
            assert!(model.inode(ghost).unwrap().is_read());
            assert_eq!(model.lstat(root, "/etc/ghost"), None);
            assert_eq!(model.record_absent(root, "/etc/ghost")?, ghost);
            assert_eq!(model.record_absent(root, "/etc"), Err(ModelError::AlreadyExists));
            assert_eq!(model.record_absent(root, "/no/such"), Err(ModelError::NotFound));
            Ok(())
        }

        #[test_log::test]
        fn test_rollback_keeps_refused_parent() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            model.chdir(root, "/outer/inner", PID)?;
            let outer = model.lstat(root, "/outer").unwrap();
            let inner = model.lstat(root, "/outer/inner").unwrap();

            // undone back to front: outer first, while it still holds inner
            model.rollback(Undo(vec![(inner, false), (outer, false)]));
            assert_eq!(model.lstat(root, "/outer/inner"), None);
            assert_eq!(model.lstat(root, "/outer"), Some(outer));
            Ok(())
        }

        #[test]
        fn test_vivify_revives_absent_and_rolls_back() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            let ghost = model.record_absent(root, "/etc/ghost")?;

            let result = model.chdir(root, "/etc/ghost/../../home/user/notes.txt", PID);
            assert_eq!(result, Err(ModelError::NotADirectory));
            assert_eq!(kind(&model, ghost), InodeType::Absent);

            model.chdir(root, "/etc/ghost", PID)?;
            assert_eq!(model.cwd(PID), ghost);
            assert_eq!(kind(&model, ghost), InodeType::DirOrSymlink);
            Ok(())
        }
    }

    mod fork_close {
        use super::*;

        #[test]
        fn test_fork_inherits_cwd_and_descriptors() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            model.chdir(root, "/home", 1)?;
            model.opendir(root, "/etc", 1, 4)?;

            model.fork(1, 2)?;
            assert_eq!(cwd_path(&mut model, 2), Path::new("/home"));
            assert_eq!(model.lookup_fd(2, 4), model.lookup_fd(1, 4));

            let cwd = model.cwd(2);
            model.chdir(cwd, "user", 2)?;
            assert_eq!(cwd_path(&mut model, 2), Path::new("/home/user"));
            assert_eq!(cwd_path(&mut model, 1), Path::new("/home"));
            Ok(())
        }

        #[test]
        fn test_fork_of_unseen_parent() -> Result<()> {
            let mut model = setup_model();
            model.fork(1, 2)?;
            assert_eq!(model.records(2).count(), 1);
            assert_eq!(cwd_path(&mut model, 2), Path::new("/"));
            Ok(())
        }

        #[test]
        fn test_close() -> Result<()> {
            let mut model = setup_model();
            let root = model.root();
            model.opendir(root, "/etc", PID, 4)?;

            model.close(PID, 4)?;
            assert_eq!(model.lookup_fd(PID, 4), None);
            assert_eq!(model.close(PID, 4), Err(ModelError::BadDescriptor(4)));
            Ok(())
        }
    }

    #[test]
    fn test_debug_dump() -> Result<()> {
        let mut model = setup_model();
        let root = model.root();
        model.symlink(root, "user", "/home/link")?;

        let dump = format!("{model:?}");
        assert!(dump.contains("notes.txt"));
        assert!(dump.contains("link -> user"));
        Ok(())
    }
}
