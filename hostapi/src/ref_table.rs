//! The reference table: integer handles for host values.
//!
//! The sandbox cannot hold host values directly, so every value it sees is a
//! slot index into this table. Slots `0..4` are pre-populated with
//! `undefined`, `null`, `true` and `false` and are never freed. Every other
//! slot is owned by the sandbox from the moment it is handed out until the
//! sandbox frees it; the table never collects on its own.

use tracing::trace;

use crate::error::HostError;
use crate::value::HostValue;

pub const UNDEFINED_SLOT: u32 = 0;
pub const NULL_SLOT: u32 = 1;
pub const TRUE_SLOT: u32 = 2;
pub const FALSE_SLOT: u32 = 3;
/// Number of reserved sentinel slots.
pub const RESERVED_SLOTS: u32 = 4;

/// Growth step when the table runs out of room.
const GROWTH: usize = 128;

pub struct RefTable {
    slots: Vec<Option<HostValue>>,
    free: Vec<u32>,
    max_slots: usize,
    live: usize,
}

impl Default for RefTable {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl RefTable {
    /// Create a table that holds at most `max_slots` slots (sentinels
    /// included).
    pub fn new(max_slots: usize) -> Self {
        let mut table = Self {
            slots: Vec::with_capacity(GROWTH),
            free: Vec::new(),
            max_slots: max_slots.max(RESERVED_SLOTS as usize),
            live: 0,
        };
        table.slots.resize(RESERVED_SLOTS as usize, None);
        table.set(UNDEFINED_SLOT, HostValue::Undefined);
        table.set(NULL_SLOT, HostValue::Null);
        table.set(TRUE_SLOT, HostValue::Bool(true));
        table.set(FALSE_SLOT, HostValue::Bool(false));
        table
    }

    /// Write a slot directly. Only used to pre-populate the sentinels.
    pub(crate) fn set(&mut self, index: u32, value: HostValue) {
        if let Some(slot) = self.slots.get_mut(index as usize) {
            *slot = Some(value);
        }
    }

    /// Store `value` and return its new handle.
    ///
    /// Freed slots are reused most-recently-freed first; otherwise the table
    /// grows and indices increase strictly.
    pub fn allocate(&mut self, value: HostValue) -> Result<u32, HostError> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                if self.slots.len() >= self.max_slots {
                    return Err(HostError::range_error(format!(
                        "reference table exhausted ({} slots)",
                        self.max_slots
                    )));
                }
                if self.slots.len() == self.slots.capacity() {
                    self.slots.reserve(GROWTH);
                }
                self.slots.push(None);
                (self.slots.len() - 1) as u32
            }
        };
        self.slots[index as usize] = Some(value);
        self.live += 1;
        trace!(index, live = self.live, "ref table allocate");
        Ok(index)
    }

    /// Like [`allocate`](Self::allocate), but sentinel values reuse their
    /// fixed slot.
    pub fn expose(&mut self, value: HostValue) -> Result<u32, HostError> {
        match value {
            HostValue::Undefined => Ok(UNDEFINED_SLOT),
            HostValue::Null => Ok(NULL_SLOT),
            HostValue::Bool(true) => Ok(TRUE_SLOT),
            HostValue::Bool(false) => Ok(FALSE_SLOT),
            other => self.allocate(other),
        }
    }

    /// Resolve a handle. Sentinels always resolve; unknown or freed handles
    /// are `None`.
    pub fn get(&self, index: u32) -> Option<&HostValue> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    /// Resolve and release a handle in one step. Sentinels are returned but
    /// stay in place.
    pub fn take(&mut self, index: u32) -> Option<HostValue> {
        if index < RESERVED_SLOTS {
            return self.get(index).cloned();
        }
        let value = self.slots.get_mut(index as usize)?.take()?;
        self.free.push(index);
        self.live -= 1;
        trace!(index, live = self.live, "ref table take");
        Some(value)
    }

    /// Release a handle. Returns `false` for unknown or already-freed
    /// handles; freeing a sentinel is a successful no-op.
    pub fn free(&mut self, index: u32) -> bool {
        if index < RESERVED_SLOTS {
            return true;
        }
        self.take(index).is_some()
    }

    /// Total slots, sentinels and free slots included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of live, non-sentinel handles.
    pub fn live(&self) -> usize {
        self.live
    }
}
