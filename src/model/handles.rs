use super::inode::InodeId;
use crate::core::{Fd, ModelError, Pid, Result};

/// What a handle record stands for within its process.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Cwd,
    Fd(Fd),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HandleRecord {
    pub pid: Pid,
    pub slot: Slot,
    pub inode: InodeId,
}

/// Flat table binding `(pid, slot)` to an inode.
///
/// At most one record exists per key; inserting an existing key overwrites it.
#[derive(Debug, Default)]
pub struct HandleTable {
    records: Vec<HandleRecord>,
    max_records: Option<usize>,
}

impl HandleTable {
    pub fn new(max_records: Option<usize>) -> Self {
        Self {
            records: Vec::new(),
            max_records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, pid: Pid, slot: Slot) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.pid == pid && record.slot == slot)
    }

    pub fn lookup(&self, pid: Pid, slot: Slot) -> Option<InodeId> {
        self.position(pid, slot).map(|i| self.records[i].inode)
    }

    /// Binds `(pid, slot)` to `inode`, last write wins.
    ///
    /// Only appending can hit the ceiling; overwriting always succeeds.
    pub fn insert(&mut self, pid: Pid, slot: Slot, inode: InodeId) -> Result<()> {
        if let Some(i) = self.position(pid, slot) {
            self.records[i].inode = inode;
            return Ok(());
        }
        if self
            .max_records
            .is_some_and(|max| self.records.len() >= max)
        {
            return Err(ModelError::HandleExhausted);
        }
        self.records.push(HandleRecord { pid, slot, inode });
        Ok(())
    }

    pub fn remove(&mut self, pid: Pid, slot: Slot) -> Option<InodeId> {
        self.position(pid, slot)
            .map(|i| self.records.swap_remove(i).inode)
    }

    pub fn records_of(&self, pid: Pid) -> impl Iterator<Item = &HandleRecord> {
        self.records.iter().filter(move |record| record.pid == pid)
    }

    /// Replaces every record of `child` by a copy of the records of `parent`.
    /// Returns how many records were copied.
    pub fn inherit(&mut self, parent: Pid, child: Pid) -> Result<usize> {
        if parent == child {
            return Ok(self.records_of(parent).count());
        }
        let copies: Vec<HandleRecord> = self
            .records_of(parent)
            .map(|record| HandleRecord { pid: child, ..*record })
            .collect();
        let kept = self.records.len() - self.records_of(child).count();
        if self
            .max_records
            .is_some_and(|max| kept + copies.len() > max)
        {
            return Err(ModelError::HandleExhausted);
        }
        self.records.retain(|record| record.pid != child);
        let count = copies.len();
        self.records.extend(copies);
        Ok(count)
    }
}
