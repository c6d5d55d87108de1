//! Table controllers and the process-wide registry.
//!
//! `TableSet` holds up to 32 tables in fixed slots. Definition and clearing
//! serialize on one global mutex; every other operation takes a lock-free
//! snapshot of the slot and then serializes on the table's own mutex for
//! its whole duration, so per-table histories are linearizable and work on
//! distinct tables never contends.

use crate::codec;
use crate::collections::arena::Arena;
use crate::collections::avl::{self, Descent};
use crate::config::{MAX_CAPACITY, MAX_TABLES, NIL};
use crate::csv;
use crate::error::TableError;
use crate::schema::Schema;
use crate::value::{self, Value, ValueKind};
use crate::Result;
use arc_swap::ArcSwapOption;
use std::cmp::Ordering;
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};

/// Traversal order for exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    /// Schema may still change; no arena yet.
    Defined,
    /// Has held at least one element; schema is frozen for good.
    NotEmpty,
}

pub(crate) struct TableCore {
    pub(crate) schema: Schema,
    pub(crate) arena: Option<Arena>,
    pub(crate) root: u32,
    pub(crate) count: u32,
    pub(crate) status: Status,
}

impl TableCore {
    fn new(id: u8, name: &str, capacity: u32) -> TableCore {
        TableCore {
            schema: Schema::new(id, name, capacity),
            arena: None,
            root: NIL,
            count: 0,
            status: Status::Defined,
        }
    }

    pub(crate) fn check_key(&self, key: &Value) -> Result<()> {
        let def = self.schema.key().ok_or(TableError::Generic)?;
        if !key.matches(def.kind) {
            return Err(TableError::Generic);
        }
        Ok(())
    }

    fn check_fields(&self, fields: &[Value]) -> Result<()> {
        if fields.len() != self.schema.fields().len() {
            return Err(TableError::Generic);
        }
        for (def, val) in self.schema.fields().iter().zip(fields) {
            if !val.matches(def.kind) {
                return Err(TableError::Generic);
            }
        }
        Ok(())
    }

    fn check_updates(&self, updates: &[(usize, Value)]) -> Result<()> {
        for (index, val) in updates {
            let def = self
                .schema
                .fields()
                .get(*index)
                .ok_or(TableError::Generic)?;
            if !val.matches(def.kind) {
                return Err(TableError::Generic);
            }
        }
        Ok(())
    }

    /// First insert allocates the arena and initializes the free list.
    pub(crate) fn ensure_arena(&mut self) -> Result<()> {
        if self.arena.is_none() {
            self.arena = Some(Arena::new(self.schema.capacity(), self.schema.slot_size())?);
        }
        Ok(())
    }

    /// Descend for `key`; `None` while the arena has never been allocated.
    pub(crate) fn find(&self, key: &Value) -> Option<Descent> {
        let arena = self.arena.as_ref()?;
        let schema = &self.schema;
        Some(avl::search(arena, self.root, |row| {
            codec::compare_key(schema, row, key)
        }))
    }

    /// Write a new row into a free slot and splice it where the descent
    /// ended.
    pub(crate) fn insert(&mut self, descent: &Descent, key: &Value, fields: &[Value]) -> Result<()> {
        let arena = self.arena.as_mut().expect("arena allocated before insert");
        let node = match arena.take_empty() {
            Some(node) => node,
            None => {
                warn!("table {} is full", self.schema.id());
                return Err(TableError::OutOfMemory);
            }
        };
        codec::write_row(&self.schema, arena.slot_mut(node), key, fields);
        avl::attach(arena, &mut self.root, descent, node);
        self.count += 1;
        self.status = Status::NotEmpty;
        Ok(())
    }
}

pub(crate) struct Table {
    id: u8,
    core: Mutex<TableCore>,
}

/// A fixed-cardinality set of independent ordered tables.
pub struct TableSet {
    slots: [ArcSwapOption<Table>; MAX_TABLES],
    define_mtx: Mutex<()>,
}

impl TableSet {
    pub fn new() -> TableSet {
        TableSet {
            slots: std::array::from_fn(|_| ArcSwapOption::empty()),
            define_mtx: Mutex::new(()),
        }
    }

    /// Define a new table. The id must be unused, the capacity within
    /// 1..=2^26; the display name is truncated to 32 characters.
    pub fn define_table(&self, id: u8, name: &str, capacity: u32) -> Result<()> {
        if capacity < 1 || capacity > MAX_CAPACITY {
            return Err(TableError::Generic);
        }
        let _guard = self.define_mtx.lock().unwrap();
        let mut empty = None;
        for slot in &self.slots {
            match &*slot.load() {
                Some(table) if table.id == id => return Err(TableError::IdAlreadyExists),
                Some(_) => {}
                None => {
                    if empty.is_none() {
                        empty = Some(slot);
                    }
                }
            }
        }
        let slot = empty.ok_or(TableError::MaxTablesReached)?;
        slot.store(Some(Arc::new(Table {
            id,
            core: Mutex::new(TableCore::new(id, name, capacity)),
        })));
        info!("table {} defined, capacity {}", id, capacity);
        Ok(())
    }

    /// Drop a table: its arena, lock and registry slot are all released.
    /// Operations already holding the table proceed on the detached copy.
    pub fn clear_table(&self, id: u8) -> Result<()> {
        let _guard = self.define_mtx.lock().unwrap();
        for slot in &self.slots {
            if let Some(table) = slot.load_full() {
                if table.id == id {
                    slot.store(None);
                    info!("table {} cleared", id);
                    return Ok(());
                }
            }
        }
        Err(TableError::IdNotFound)
    }

    /// Declare (or redeclare) the key. Rejected once the table has ever
    /// held an element.
    pub fn define_key(&self, id: u8, name: &str, kind: ValueKind) -> Result<()> {
        let table = self.lookup(id)?;
        let mut core = table.core.lock().unwrap();
        if core.status == Status::NotEmpty {
            return Err(TableError::NotEmpty);
        }
        core.schema.define_key(name, kind)
    }

    /// Declare (or redeclare) the ordered field list (1 to 16 entries).
    /// Rejected once the table has ever held an element.
    pub fn define_fields(&self, id: u8, fields: &[(&str, ValueKind)]) -> Result<()> {
        let table = self.lookup(id)?;
        let mut core = table.core.lock().unwrap();
        if core.status == Status::NotEmpty {
            return Err(TableError::NotEmpty);
        }
        core.schema.define_fields(fields)
    }

    /// Field values of the row stored under `key`, in declaration order.
    pub fn read(&self, id: u8, key: &Value) -> Result<Vec<Value>> {
        let table = self.lookup(id)?;
        let core = table.core.lock().unwrap();
        core.check_key(key)?;
        let descent = core.find(key).ok_or(TableError::NotFound)?;
        let node = descent.found.ok_or(TableError::NotFound)?;
        let arena = core.arena.as_ref().expect("find() implies an arena");
        let row = arena.slot(node);
        Ok(core
            .schema
            .fields()
            .iter()
            .map(|def| codec::read_value(row, def))
            .collect())
    }

    /// Insert a new row; every field must be supplied in declaration order.
    pub fn create(&self, id: u8, key: &Value, fields: &[Value]) -> Result<()> {
        let table = self.lookup(id)?;
        let mut core = table.core.lock().unwrap();
        core.check_key(key)?;
        core.check_fields(fields)?;
        core.ensure_arena()?;
        let descent = core.find(key).expect("arena allocated");
        if descent.found.is_some() {
            return Err(TableError::DuplicateKey);
        }
        core.insert(&descent, key, fields)
    }

    /// Update the named fields of an existing row.
    pub fn modify(&self, id: u8, key: &Value, updates: &[(usize, Value)]) -> Result<()> {
        let table = self.lookup(id)?;
        let mut guard = table.core.lock().unwrap();
        let core = &mut *guard;
        core.check_key(key)?;
        core.check_updates(updates)?;
        let descent = core.find(key).ok_or(TableError::NotFound)?;
        let node = descent.found.ok_or(TableError::NotFound)?;
        let arena = core.arena.as_mut().expect("find() implies an arena");
        codec::apply_updates(&core.schema, arena.slot_mut(node), updates);
        Ok(())
    }

    /// Update an existing row, or insert a new one where fields missing
    /// from `updates` take the kind's zero value.
    pub fn create_or_modify(&self, id: u8, key: &Value, updates: &[(usize, Value)]) -> Result<()> {
        let table = self.lookup(id)?;
        let mut guard = table.core.lock().unwrap();
        let core = &mut *guard;
        core.check_key(key)?;
        core.check_updates(updates)?;
        core.ensure_arena()?;
        let descent = core.find(key).expect("arena allocated");
        match descent.found {
            Some(node) => {
                let arena = core.arena.as_mut().expect("find() implies an arena");
                codec::apply_updates(&core.schema, arena.slot_mut(node), updates);
                Ok(())
            }
            None => {
                let fields: Vec<Value> = core
                    .schema
                    .fields()
                    .iter()
                    .enumerate()
                    .map(|(index, def)| {
                        updates
                            .iter()
                            .find(|(i, _)| *i == index)
                            .map(|(_, val)| val.clone())
                            .unwrap_or_else(|| Value::zero(def.kind))
                    })
                    .collect();
                core.insert(&descent, key, &fields)
            }
        }
    }

    /// Remove the row stored under `key`.
    pub fn delete(&self, id: u8, key: &Value) -> Result<()> {
        let table = self.lookup(id)?;
        let mut guard = table.core.lock().unwrap();
        let core = &mut *guard;
        core.check_key(key)?;
        let descent = core.find(key).ok_or(TableError::NotFound)?;
        if descent.found.is_none() {
            return Err(TableError::NotFound);
        }
        let arena = core.arena.as_mut().expect("find() implies an arena");
        avl::remove(arena, &mut core.root, descent);
        core.count -= 1;
        Ok(())
    }

    pub fn count_entries(&self, id: u8) -> Result<u32> {
        let table = self.lookup(id)?;
        let core = table.core.lock().unwrap();
        Ok(core.count)
    }

    /// Bytes the table occupies once its arena exists: the control block
    /// plus `capacity` slots. Reflects declared, not used, capacity.
    pub fn memory_footprint(&self, id: u8) -> Result<u64> {
        let table = self.lookup(id)?;
        let core = table.core.lock().unwrap();
        Ok(std::mem::size_of::<TableCore>() as u64
            + core.schema.capacity() as u64 * core.schema.slot_size() as u64)
    }

    /// Append rows from a CSV stream; duplicate keys overwrite. On any
    /// return `lines_read` holds the number of lines consumed (comments and
    /// blanks included), which on error is the offending line.
    pub fn import_csv<R: BufRead>(
        &self,
        id: u8,
        reader: R,
        sep: u8,
        lines_read: &mut u32,
    ) -> Result<()> {
        *lines_read = 0;
        let table = self.lookup(id)?;
        let mut core = table.core.lock().unwrap();
        csv::import_into(&mut core, reader, sep, lines_read)
    }

    /// Write the whole table as CSV in the chosen direction.
    pub fn export_csv<W: Write>(&self, id: u8, writer: W, sep: u8, direction: Direction) -> Result<()> {
        let table = self.lookup(id)?;
        let core = table.core.lock().unwrap();
        csv::export_table(&core, writer, sep, direction, None)
    }

    /// Write the rows whose keys lie in `[min, max]` as CSV in the chosen
    /// direction.
    pub fn export_range_csv<W: Write>(
        &self,
        id: u8,
        writer: W,
        sep: u8,
        direction: Direction,
        min: &Value,
        max: &Value,
    ) -> Result<()> {
        let table = self.lookup(id)?;
        let core = table.core.lock().unwrap();
        core.check_key(min)?;
        core.check_key(max)?;
        if value::cmp(min, max) == Ordering::Greater {
            return Err(TableError::Generic);
        }
        csv::export_table(&core, writer, sep, direction, Some((min, max)))
    }

    fn lookup(&self, id: u8) -> Result<Arc<Table>> {
        for slot in &self.slots {
            if let Some(table) = slot.load_full() {
                if table.id == id {
                    return Ok(table);
                }
            }
        }
        Err(TableError::IdNotFound)
    }
}

impl Default for TableSet {
    fn default() -> Self {
        Self::new()
    }
}
