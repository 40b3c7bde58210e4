//! Value bridge: text and numbers between linear memory and host values.
//!
//! Layouts shared with the guest:
//!
//! ```text
//! string argument   (ptr: i32, len: i32)     ptr == 0 → reference slot `len`
//! string return     [ptr: u32 @+0][len: u32 @+4]          (0, 0) → absent
//! optional f64      [present: i32 @+0][pad][value: f64 @+8]
//! ```

use boundary_hostapi::ref_table::{NULL_SLOT, UNDEFINED_SLOT};
use boundary_hostapi::{HostError, HostValue, RefTable};

use crate::error::{BridgeError, DecodeError};
use crate::memory;

/// A string argument as passed across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringArg {
    /// UTF-8 bytes in linear memory.
    Memory { ptr: u32, len: u32 },
    /// A host string already in the reference table.
    Slot(u32),
}

impl StringArg {
    /// Lift the raw ABI pair. A zero pointer names a table slot.
    pub fn from_abi(ptr: i32, len: i32) -> Self {
        match ptr {
            0 => Self::Slot(len as u32),
            _ => Self::Memory {
                ptr: ptr as u32,
                len: len as u32,
            },
        }
    }

    /// True for `undefined`/`null` slots, the encoding of an absent optional
    /// string.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Slot(UNDEFINED_SLOT) | Self::Slot(NULL_SLOT))
    }
}

/// Strict UTF-8 decode of `[ptr, ptr + len)`.
pub fn decode_string(mem: &[u8], ptr: u32, len: u32) -> Result<String, BridgeError> {
    let bytes = memory::read_bytes(mem, ptr, len)?;
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_owned()),
        Err(source) => Err(DecodeError { ptr, len, source }.into()),
    }
}

/// Decode a string argument to a host value: the decoded text for memory
/// arguments, the slot's value otherwise.
pub fn decode_string_or_slot(
    mem: &[u8],
    table: &RefTable,
    arg: StringArg,
) -> Result<HostValue, BridgeError> {
    match arg {
        StringArg::Memory { ptr, len } => Ok(HostValue::from(decode_string(mem, ptr, len)?)),
        StringArg::Slot(index) => table.get(index).cloned().ok_or(BridgeError::BadHandle(index)),
    }
}

/// Decode a string argument that must be text.
pub fn decode_str_arg(mem: &[u8], table: &RefTable, arg: StringArg) -> Result<String, BridgeError> {
    match decode_string_or_slot(mem, table, arg)? {
        HostValue::String(s) => Ok(s.to_string()),
        other => Err(HostError::type_error(format!(
            "expected a string, got {}",
            other.type_name()
        ))
        .into()),
    }
}

/// Decode an optional string argument; `undefined` and `null` slots are
/// absent.
pub fn decode_opt_str_arg(
    mem: &[u8],
    table: &RefTable,
    arg: StringArg,
) -> Result<Option<String>, BridgeError> {
    if arg.is_absent() {
        return Ok(None);
    }
    decode_str_arg(mem, table, arg).map(Some)
}

/// Sandbox-side allocator used to place host text in linear memory.
///
/// Calls into the guest may grow memory, so implementations re-derive their
/// view in [`memory`](GuestAllocator::memory) on every access.
pub trait GuestAllocator {
    fn malloc(&mut self, size: u32, align: u32) -> Result<u32, BridgeError>;

    /// True if the guest exports a reallocation entry point.
    fn has_realloc(&self) -> bool;

    fn realloc(&mut self, ptr: u32, old_size: u32, new_size: u32, align: u32)
        -> Result<u32, BridgeError>;

    /// The live linear memory.
    fn memory(&mut self) -> &mut [u8];
}

/// Write `s` into sandbox memory as UTF-8 and return `(ptr, len)`.
///
/// Without `realloc`, one exact allocation is made. With `realloc`, the
/// encoder guesses one byte per UTF-16 unit, copies the ASCII prefix
/// directly, grows to the worst case of three bytes per remaining unit for
/// the tail, then shrinks to the exact byte count.
pub fn encode_string<A: GuestAllocator + ?Sized>(
    s: &str,
    alloc: &mut A,
) -> Result<(u32, u32), BridgeError> {
    let total = to_u32(s.len())?;
    if !alloc.has_realloc() {
        let ptr = alloc.malloc(total, 1)?;
        memory::write_bytes(alloc.memory(), ptr, s.as_bytes())?;
        return Ok((ptr, total));
    }

    let utf16_len = to_u32(s.encode_utf16().count())?;
    let mut ptr = alloc.malloc(utf16_len, 1)?;

    let ascii = s.bytes().take_while(u8::is_ascii).count();
    memory::write_bytes(alloc.memory(), ptr, &s.as_bytes()[..ascii])?;
    if ascii == s.len() {
        return Ok((ptr, total));
    }

    let offset = to_u32(ascii)?;
    let tail = &s[ascii..];
    let worst = to_u32(tail.encode_utf16().count() * 3)?
        .checked_add(offset)
        .ok_or(BridgeError::BadPointer { ptr, len: u32::MAX })?;
    ptr = alloc.realloc(ptr, utf16_len, worst, 1)?;
    let tail_len = to_u32(tail.len())?;
    let tail_ptr = memory::offset(ptr, offset, tail_len)?;
    memory::write_bytes(alloc.memory(), tail_ptr, tail.as_bytes())?;
    ptr = alloc.realloc(ptr, worst, total, 1)?;
    Ok((ptr, total))
}

fn to_u32(n: usize) -> Result<u32, BridgeError> {
    u32::try_from(n).map_err(|_| HostError::range_error("string too long for linear memory").into())
}

/// Write a string return area: `(ptr, len)` or `(0, 0)` when absent.
pub fn write_string_ret(mem: &mut [u8], ret_ptr: u32, value: Option<(u32, u32)>) -> Result<(), BridgeError> {
    let (ptr, len) = value.unwrap_or((0, 0));
    let mut words = memory::Words::new(mem);
    words.set_u32(ret_ptr, ptr)?;
    words.set_u32(memory::offset(ret_ptr, 4, 4)?, len)
}

/// Write an optional f64 slot.
pub fn write_option_f64(mem: &mut [u8], ret_ptr: u32, value: Option<f64>) -> Result<(), BridgeError> {
    let mut words = memory::Words::new(mem);
    words.set_i32(ret_ptr, value.is_some() as i32)?;
    words.set_f64(memory::offset(ret_ptr, 8, 8)?, value.unwrap_or(0.0))
}

/// Read an optional f64 slot.
pub fn read_option_f64(mem: &[u8], ptr: u32) -> Result<Option<f64>, BridgeError> {
    if memory::read_i32(mem, ptr)? == 0 {
        return Ok(None);
    }
    memory::read_f64(mem, memory::offset(ptr, 8, 8)?).map(Some)
}
