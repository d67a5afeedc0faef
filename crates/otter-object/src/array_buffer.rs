//! ArrayBuffer implementation
//!
//! ArrayBuffer is the single-owner byte store behind typed array views. It
//! can be detached (transferred) and optionally resizable.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::object::{JsObject, ObjectKind};
use crate::realm::Realm;

/// Byte-level access shared by ArrayBuffer and SharedArrayBuffer
pub trait ByteStorage {
    /// Current byte length (0 if detached)
    fn byte_length(&self) -> usize;

    /// Whether the bytes are gone for good
    fn is_detached(&self) -> bool;

    /// Whether views may shrink or grow with the buffer
    fn is_resizable(&self) -> bool;

    /// Copy `dest.len()` bytes starting at `offset`; false if out of range
    fn read_bytes(&self, offset: usize, dest: &mut [u8]) -> bool;

    /// Copy `src` to `offset`; false if out of range
    fn write_bytes(&self, offset: usize, src: &[u8]) -> bool;
}

/// A JavaScript ArrayBuffer
#[derive(Debug)]
pub struct JsArrayBuffer {
    /// The underlying byte data. None if detached.
    data: Mutex<Option<Vec<u8>>>,
    /// Maximum byte length for resizable buffers
    max_byte_length: Option<usize>,
}

impl JsArrayBuffer {
    /// Create a new ArrayBuffer with the specified byte length
    pub fn new(byte_length: usize) -> VmResult<Self> {
        Ok(Self::from_bytes(zeroed_bytes(byte_length)?, None))
    }

    /// Create a new resizable ArrayBuffer
    pub fn new_resizable(byte_length: usize, max_byte_length: usize) -> VmResult<Self> {
        Ok(Self::from_bytes(zeroed_bytes(byte_length)?, Some(max_byte_length)))
    }

    fn from_bytes(bytes: Vec<u8>, max_byte_length: Option<usize>) -> Self {
        Self {
            data: Mutex::new(Some(bytes)),
            max_byte_length,
        }
    }

    /// Detach the buffer; every view over it reads as empty afterwards
    pub fn detach(&self) {
        *self.data.lock() = None;
        tracing::debug!(target: "otter::object", "array buffer detached");
    }

    /// Get the max byte length for resizable buffers
    pub fn max_byte_length(&self) -> Option<usize> {
        self.max_byte_length
    }

    /// Resize the buffer (only for resizable buffers)
    pub fn resize(&self, new_length: usize) -> VmResult<()> {
        let max = self
            .max_byte_length
            .ok_or_else(|| VmError::type_error("ArrayBuffer is not resizable"))?;
        if new_length > max {
            return Err(VmError::range_error("new length exceeds maxByteLength"));
        }
        let mut guard = self.data.lock();
        let data = guard
            .as_mut()
            .ok_or_else(|| VmError::type_error("ArrayBuffer is detached"))?;
        grow_zeroed(data, new_length)?;
        Ok(())
    }

    /// Take the bytes out, leaving the buffer detached
    fn take(&self) -> Option<Vec<u8>> {
        self.data.lock().take()
    }

    /// Copy of bytes `[start, end)` clamped to the buffer
    pub fn copy_range(&self, start: usize, end: usize) -> Option<Vec<u8>> {
        let guard = self.data.lock();
        let data = guard.as_ref()?;
        let start = start.min(data.len());
        let end = end.min(data.len()).max(start);
        Some(data[start..end].to_vec())
    }
}

impl ByteStorage for JsArrayBuffer {
    fn byte_length(&self) -> usize {
        self.data.lock().as_ref().map_or(0, Vec::len)
    }

    fn is_detached(&self) -> bool {
        self.data.lock().is_none()
    }

    fn is_resizable(&self) -> bool {
        self.max_byte_length.is_some()
    }

    fn read_bytes(&self, offset: usize, dest: &mut [u8]) -> bool {
        let guard = self.data.lock();
        if let Some(data) = guard.as_ref()
            && let Some(src) = offset.checked_add(dest.len()).and_then(|end| data.get(offset..end))
        {
            dest.copy_from_slice(src);
            return true;
        }
        false
    }

    fn write_bytes(&self, offset: usize, src: &[u8]) -> bool {
        let mut guard = self.data.lock();
        if let Some(data) = guard.as_mut()
            && let Some(dest) = offset.checked_add(src.len()).and_then(|end| data.get_mut(offset..end))
        {
            dest.copy_from_slice(src);
            return true;
        }
        false
    }
}

/// Byte storage of an ArrayBuffer or SharedArrayBuffer object
pub fn buffer_storage(obj: &JsObject) -> Option<&dyn ByteStorage> {
    match obj.kind() {
        ObjectKind::ArrayBuffer(buf) => Some(buf),
        ObjectKind::SharedArrayBuffer(buf) => Some(buf),
        _ => None,
    }
}

/// Zero-filled byte vector; RangeError when the allocator refuses
pub(crate) fn zeroed_bytes(len: usize) -> VmResult<Vec<u8>> {
    let mut bytes = Vec::new();
    grow_zeroed(&mut bytes, len)?;
    Ok(bytes)
}

/// Resize `bytes` to `len`, zero-filling growth without aborting on OOM
fn grow_zeroed(bytes: &mut Vec<u8>, len: usize) -> VmResult<()> {
    if let Some(extra) = len.checked_sub(bytes.len()) {
        bytes
            .try_reserve_exact(extra)
            .map_err(|_| VmError::range_error("Array buffer allocation failed"))?;
    }
    bytes.resize(len, 0);
    Ok(())
}

fn wrap(realm: &Realm, buffer: JsArrayBuffer) -> Arc<JsObject> {
    Arc::new(JsObject::with_kind(
        Some(realm.intrinsics().array_buffer_prototype.clone()),
        ObjectKind::ArrayBuffer(buffer),
    ))
}

/// AllocateArrayBuffer
pub fn allocate_array_buffer(realm: &Realm, byte_length: usize) -> VmResult<Arc<JsObject>> {
    Ok(wrap(realm, JsArrayBuffer::new(byte_length)?))
}

/// AllocateArrayBuffer with a `maxByteLength`
pub fn allocate_resizable_array_buffer(
    realm: &Realm,
    byte_length: usize,
    max_byte_length: usize,
) -> VmResult<Arc<JsObject>> {
    if byte_length > max_byte_length {
        return Err(VmError::range_error("byteLength exceeds maxByteLength"));
    }
    Ok(wrap(realm, JsArrayBuffer::new_resizable(byte_length, max_byte_length)?))
}

fn require_array_buffer(obj: &JsObject) -> VmResult<&JsArrayBuffer> {
    obj.as_array_buffer()
        .ok_or_else(|| VmError::type_error("receiver is not an ArrayBuffer"))
}

/// ArrayBuffer.prototype.transfer: move the bytes into a fresh buffer of
/// `new_length` (default: current length); the source becomes detached.
pub fn array_buffer_transfer(
    realm: &Realm,
    obj: &JsObject,
    new_length: Option<usize>,
    preserve_resizability: bool,
) -> VmResult<Arc<JsObject>> {
    let buffer = require_array_buffer(obj)?;
    let max = if preserve_resizability {
        buffer.max_byte_length
    } else {
        None
    };
    if let (Some(max), Some(len)) = (max, new_length)
        && len > max
    {
        return Err(VmError::range_error("new length exceeds maxByteLength"));
    }
    let mut bytes = buffer
        .take()
        .ok_or_else(|| VmError::type_error("ArrayBuffer is detached"))?;
    if let Some(len) = new_length
        && let Err(e) = grow_zeroed(&mut bytes, len)
    {
        // allocation failure leaves the source attached
        *buffer.data.lock() = Some(bytes);
        return Err(e);
    }
    tracing::debug!(target: "otter::object", "array buffer transferred");
    Ok(wrap(realm, JsArrayBuffer::from_bytes(bytes, max)))
}

/// ArrayBuffer.prototype.slice with already-resolved bounds
pub fn array_buffer_slice(
    realm: &Realm,
    obj: &JsObject,
    start: usize,
    end: usize,
) -> VmResult<Arc<JsObject>> {
    let buffer = require_array_buffer(obj)?;
    let bytes = buffer
        .copy_range(start, end)
        .ok_or_else(|| VmError::type_error("ArrayBuffer is detached"))?;
    Ok(wrap(realm, JsArrayBuffer::from_bytes(bytes, None)))
}
