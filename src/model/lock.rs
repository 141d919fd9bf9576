//! Lock declarations and read/write pairing.

use super::expr::SYNC_LOCK_PREFIX;
use super::raw::LockInitializer;
use crate::ids::{ClassId, LockId};
use crate::types::catalog;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    Plain,
    ReadWrite,
    ReadView,
    WriteView,
    /// Monitor materialized for a synchronized block or method.
    Monitor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lock {
    pub id: LockId,
    /// `<qualified class>.<field>`
    pub name: String,
    pub kind: LockKind,
    pub class: ClassId,
    pub field: String,
    /// The read/write lock a view belongs to.
    pub paired: Option<LockId>,
}

/// All locks of the program, addressable by id and by qualified name.
#[derive(Debug, Clone, Default)]
pub struct LockTable {
    locks: Vec<Lock>,
    by_name: HashMap<String, LockId>,
    /// Views naming a read/write lock that has not been declared yet.
    waiting: HashMap<String, Vec<LockId>>,
    read_queue: VecDeque<LockId>,
    write_queue: VecDeque<LockId>,
    /// Read/write locks still missing a read or a write view.
    open_read: Vec<LockId>,
    open_write: Vec<LockId>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    pub fn get(&self, id: LockId) -> Option<&Lock> {
        (id.0 as usize)
            .checked_sub(1)
            .and_then(|index| self.locks.get(index))
    }

    pub fn find(&self, name: &str) -> Option<LockId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lock> {
        self.locks.iter()
    }

    /// The lock that actually guards the critical section: a paired view
    /// resolves to its read/write lock.
    pub fn canonical(&self, id: LockId) -> LockId {
        self.get(id).and_then(|lock| lock.paired).unwrap_or(id)
    }

    pub fn name_of(&self, id: LockId) -> Option<&str> {
        self.get(self.canonical(id)).map(|lock| lock.name.as_str())
    }

    /// Reverse map used by reports, one entry per canonical lock.
    pub fn names(&self) -> BTreeMap<LockId, String> {
        self.locks
            .iter()
            .filter(|lock| lock.paired.is_none())
            .map(|lock| (lock.id, lock.name.clone()))
            .collect()
    }

    fn push(&mut self, class: ClassId, name: String, field: &str, kind: LockKind) -> LockId {
        let id = LockId(self.locks.len() as u32 + 1);
        self.by_name.insert(name.clone(), id);
        self.locks.push(Lock {
            id,
            name,
            kind,
            class,
            field: field.to_string(),
            paired: None,
        });
        id
    }

    fn pair(&mut self, view: LockId, rw: LockId) {
        if let Some(lock) = (view.0 as usize)
            .checked_sub(1)
            .and_then(|index| self.locks.get_mut(index))
        {
            lock.paired = Some(rw);
        }
        let is_read = self.get(view).map(|lock| lock.kind) == Some(LockKind::ReadView);
        let open = if is_read {
            &mut self.open_read
        } else {
            &mut self.open_write
        };
        open.retain(|open_rw| *open_rw != rw);
    }

    /// Declare a lock-bearing field or local of `class`.
    ///
    /// `type_name` is the simple name of the declared type. Views written
    /// as `rw.readLock()` pair with `rw` whether it is declared before or
    /// after them; views without an initializer pair in declaration order.
    /// The returned id is the declaration's own; use [`LockTable::canonical`]
    /// to reach the read/write lock a view belongs to.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut locks = LockTable::new();
    /// let read = locks.declare(class, "app.Cache", "r", "Lock", Some(&init));
    /// let rw = locks.declare(class, "app.Cache", "rw", "ReentrantReadWriteLock", None);
    /// assert_eq!(locks.canonical(read), rw);
    /// ```
    pub fn declare(
        &mut self,
        class: ClassId,
        class_name: &str,
        field: &str,
        type_name: &str,
        initializer: Option<&LockInitializer>,
    ) -> LockId {
        let name = format!("{class_name}.{field}");
        if let Some(existing) = self.find(&name) {
            return existing;
        }

        let view_of_initializer = initializer.and_then(|init| {
            let method = init.method.to_ascii_lowercase();
            let kind = if method.contains("read") {
                LockKind::ReadView
            } else if method.contains("write") {
                LockKind::WriteView
            } else {
                return None;
            };
            Some((kind, format!("{class_name}.{}", init.reference)))
        });

        if let Some((kind, reference)) = view_of_initializer {
            let id = self.push(class, name, field, kind);
            match self.find(&reference) {
                Some(rw) if self.get(rw).map(|l| l.kind) == Some(LockKind::ReadWrite) => {
                    self.pair(id, rw)
                }
                _ => self.waiting.entry(reference).or_default().push(id),
            }
            return id;
        }

        match catalog::read_write_flags(type_name) {
            (true, true) => {
                let rw = self.push(class, name.clone(), field, LockKind::ReadWrite);
                self.open_read.push(rw);
                self.open_write.push(rw);
                for view in self.waiting.remove(&name).unwrap_or_default() {
                    self.pair(view, rw);
                }
                if self.open_read.contains(&rw) {
                    if let Some(view) = self.read_queue.pop_front() {
                        self.pair(view, rw);
                    }
                }
                if self.open_write.contains(&rw) {
                    if let Some(view) = self.write_queue.pop_front() {
                        self.pair(view, rw);
                    }
                }
                rw
            }
            (true, false) => {
                let id = self.push(class, name, field, LockKind::ReadView);
                match self.open_read.first().copied() {
                    Some(rw) => self.pair(id, rw),
                    None => self.read_queue.push_back(id),
                }
                id
            }
            (false, true) => {
                let id = self.push(class, name, field, LockKind::WriteView);
                match self.open_write.first().copied() {
                    Some(rw) => self.pair(id, rw),
                    None => self.write_queue.push_back(id),
                }
                id
            }
            (false, false) => self.push(class, name, field, LockKind::Plain),
        }
    }

    /// Monitor guarding `synchronized` regions keyed by `segment` in `class`.
    pub fn monitor(&mut self, class: ClassId, class_name: &str, segment: &str) -> LockId {
        let field = format!("{SYNC_LOCK_PREFIX}{segment}");
        let name = format!("{class_name}.{field}");
        match self.find(&name) {
            Some(id) => id,
            None => self.push(class, name, &field, LockKind::Monitor),
        }
    }

    /// Views still waiting for their read/write lock become standalone.
    pub fn unpaired_views(&self) -> Vec<&Lock> {
        self.locks
            .iter()
            .filter(|lock| {
                matches!(lock.kind, LockKind::ReadView | LockKind::WriteView)
                    && lock.paired.is_none()
            })
            .collect()
    }

    pub fn dump(&self) -> String {
        let mut out = String::new();
        for lock in &self.locks {
            let _ = writeln!(
                out,
                "{:>8} {:<50} {:?}{}",
                lock.id.to_string(),
                lock.name,
                lock.kind,
                lock.paired
                    .map(|rw| format!(" -> {rw}"))
                    .unwrap_or_default()
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASS: ClassId = ClassId(0);

    #[test]
    fn test_ids_start_at_one() {
        let mut table = LockTable::new();
        let a = table.declare(CLASS, "Bank", "lockA", "ReentrantLock", None);
        let b = table.declare(CLASS, "Bank", "lockB", "Lock", None);
        assert_eq!(a, LockId(1));
        assert_eq!(b, LockId(2));
        assert_eq!(table.name_of(b), Some("Bank.lockB"));
        assert_eq!(table.declare(CLASS, "Bank", "lockA", "Lock", None), a);
    }

    #[test]
    fn test_view_declared_before_read_write_lock() {
        let mut table = LockTable::new();
        let init = LockInitializer {
            reference: "rwl".into(),
            method: "readLock".into(),
        };
        let read = table.declare(CLASS, "Cache", "r", "Lock", Some(&init));
        let rw = table.declare(CLASS, "Cache", "rwl", "ReentrantReadWriteLock", None);
        assert_eq!(table.canonical(read), rw);
        assert_eq!(table.name_of(read), Some("Cache.rwl"));
        assert!(table.unpaired_views().is_empty());
    }

    #[test]
    fn test_view_declared_after_read_write_lock() {
        let mut table = LockTable::new();
        let rw = table.declare(CLASS, "Cache", "rwl", "ReentrantReadWriteLock", None);
        let init = LockInitializer {
            reference: "rwl".into(),
            method: "writeLock".into(),
        };
        let write = table.declare(CLASS, "Cache", "w", "Lock", Some(&init));
        assert_eq!(table.canonical(write), rw);
        assert_eq!(table.names().len(), 1);
    }

    #[test]
    fn test_queued_views_pair_in_declaration_order() {
        let mut table = LockTable::new();
        let read = table.declare(CLASS, "Cache", "readLock", "ReadLock", None);
        let write = table.declare(CLASS, "Cache", "writeLock", "WriteLock", None);
        let rw = table.declare(CLASS, "Cache", "rw", "ReentrantReadWriteLock", None);
        assert_eq!(table.canonical(read), rw);
        assert_eq!(table.canonical(write), rw);
    }

    #[test]
    fn test_view_without_lock_stays_standalone() {
        let mut table = LockTable::new();
        let read = table.declare(CLASS, "Cache", "readLock", "ReadLock", None);
        assert_eq!(table.canonical(read), read);
        assert_eq!(table.unpaired_views().len(), 1);
    }

    #[test]
    fn test_monitor_is_created_once() {
        let mut table = LockTable::new();
        let first = table.monitor(CLASS, "Account", "this");
        let second = table.monitor(CLASS, "Account", "this");
        assert_eq!(first, second);
        assert_eq!(table.name_of(first), Some("Account.synchLock_this"));
    }
}
