//! Linear memory access with bounds checking.
//!
//! The sandbox's buffer moves whenever memory grows, so nothing here caches a
//! slice across calls that may re-enter the guest. [`view_mut`] borrows the
//! live buffer together with the host state for the duration of one store
//! borrow, after re-deriving the [`MemoryView`] identity record. Out-of-range
//! access returns [`BridgeError::BadPointer`].

use tracing::trace;
use wasmtime::{Memory, StoreContextMut};

use crate::error::BridgeError;
use crate::host_impl::HostState;

fn range(mem_len: usize, ptr: u32, len: u32) -> Result<std::ops::Range<usize>, BridgeError> {
    let start = ptr as usize;
    let end = start
        .checked_add(len as usize)
        .ok_or(BridgeError::BadPointer { ptr, len })?;
    if end > mem_len {
        return Err(BridgeError::BadPointer { ptr, len });
    }
    Ok(start..end)
}

/// `ptr + offset` as a guest address; overflow is a bad pointer covering
/// `len` bytes.
pub fn offset(ptr: u32, offset: u32, len: u32) -> Result<u32, BridgeError> {
    ptr.checked_add(offset).ok_or(BridgeError::BadPointer { ptr, len })
}

/// Borrow `len` bytes of guest memory at `ptr`.
pub fn read_bytes(mem: &[u8], ptr: u32, len: u32) -> Result<&[u8], BridgeError> {
    Ok(&mem[range(mem.len(), ptr, len)?])
}

/// Write `data` bytes to guest memory at `ptr`.
pub fn write_bytes(mem: &mut [u8], ptr: u32, data: &[u8]) -> Result<(), BridgeError> {
    let len = u32::try_from(data.len()).map_err(|_| BridgeError::BadPointer { ptr, len: u32::MAX })?;
    let r = range(mem.len(), ptr, len)?;
    mem[r].copy_from_slice(data);
    Ok(())
}

fn read_array<const N: usize>(mem: &[u8], ptr: u32) -> Result<[u8; N], BridgeError> {
    let mut out = [0u8; N];
    out.copy_from_slice(read_bytes(mem, ptr, N as u32)?);
    Ok(out)
}

/// Read an i32 value (little-endian) from guest memory at `ptr`.
pub fn read_i32(mem: &[u8], ptr: u32) -> Result<i32, BridgeError> {
    Ok(i32::from_le_bytes(read_array(mem, ptr)?))
}

/// Write an i32 value (little-endian) to guest memory at `ptr`.
pub fn write_i32(mem: &mut [u8], ptr: u32, value: i32) -> Result<(), BridgeError> {
    write_bytes(mem, ptr, &value.to_le_bytes())
}

pub fn read_u32(mem: &[u8], ptr: u32) -> Result<u32, BridgeError> {
    Ok(u32::from_le_bytes(read_array(mem, ptr)?))
}

pub fn write_u32(mem: &mut [u8], ptr: u32, value: u32) -> Result<(), BridgeError> {
    write_bytes(mem, ptr, &value.to_le_bytes())
}

pub fn read_f64(mem: &[u8], ptr: u32) -> Result<f64, BridgeError> {
    Ok(f64::from_le_bytes(read_array(mem, ptr)?))
}

pub fn write_f64(mem: &mut [u8], ptr: u32, value: f64) -> Result<(), BridgeError> {
    write_bytes(mem, ptr, &value.to_le_bytes())
}

/// Identity record of the buffer the host last observed.
///
/// A buffer is identified by its base address and byte length; growth
/// changes at least the length, and may move the base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryView {
    base: usize,
    len: usize,
    generation: u64,
    stale: bool,
}

impl MemoryView {
    /// Re-derive the view if `bytes` is not the buffer last observed.
    /// Returns `true` if the view changed.
    pub fn refresh(&mut self, bytes: &[u8]) -> bool {
        let base = bytes.as_ptr() as usize;
        if !self.stale && self.base == base && self.len == bytes.len() {
            return false;
        }
        self.base = base;
        self.len = bytes.len();
        self.generation += 1;
        self.stale = false;
        trace!(generation = self.generation, len = self.len, "memory view re-derived");
        true
    }

    /// Force re-derivation on the next access. Called after anything that
    /// may have grown memory.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Number of times the view has been derived.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Byte length at the last derivation.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Borrow the live buffer and the host state together, re-deriving the view
/// first. The slice is valid only for this store borrow.
pub fn view_mut<'a>(
    memory: &Memory,
    store: impl Into<StoreContextMut<'a, HostState>>,
) -> (&'a mut [u8], &'a mut HostState) {
    let (bytes, state) = memory.data_and_store_mut(store);
    state.view.refresh(bytes);
    (bytes, state)
}

/// Little-endian word accessor over a borrowed view.
pub struct Words<'a> {
    bytes: &'a mut [u8],
}

impl<'a> Words<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    pub fn i32(&self, ptr: u32) -> Result<i32, BridgeError> {
        read_i32(&*self.bytes, ptr)
    }

    pub fn set_i32(&mut self, ptr: u32, value: i32) -> Result<(), BridgeError> {
        write_i32(&mut *self.bytes, ptr, value)
    }

    pub fn u32(&self, ptr: u32) -> Result<u32, BridgeError> {
        read_u32(&*self.bytes, ptr)
    }

    pub fn set_u32(&mut self, ptr: u32, value: u32) -> Result<(), BridgeError> {
        write_u32(&mut *self.bytes, ptr, value)
    }

    pub fn f64(&self, ptr: u32) -> Result<f64, BridgeError> {
        read_f64(&*self.bytes, ptr)
    }

    pub fn set_f64(&mut self, ptr: u32, value: f64) -> Result<(), BridgeError> {
        write_f64(&mut *self.bytes, ptr, value)
    }
}
