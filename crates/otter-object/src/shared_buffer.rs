//! SharedArrayBuffer implementation
//!
//! SharedArrayBuffer allows sharing raw binary data between agents. Every
//! byte is an atomic cell, so unsynchronised access from several threads
//! never traps; ordering beyond SeqCst per byte is not promised.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::array_buffer::ByteStorage;
use crate::error::{VmError, VmResult};
use crate::object::{JsObject, ObjectKind};
use crate::realm::Realm;

/// A shared array buffer that can be handed to other threads
///
/// Never detachable; views over it alias the same bytes.
#[derive(Debug)]
pub struct SharedArrayBuffer {
    /// The underlying atomic byte array
    data: Box<[AtomicU8]>,
}

impl SharedArrayBuffer {
    /// Create a new SharedArrayBuffer with the specified byte length
    pub fn new(byte_length: usize) -> VmResult<Self> {
        let mut data: Vec<AtomicU8> = Vec::new();
        data.try_reserve_exact(byte_length)
            .map_err(|_| VmError::range_error("Array buffer allocation failed"))?;
        data.extend((0..byte_length).map(|_| AtomicU8::new(0)));
        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    /// Read a byte at the given index
    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        self.data.get(index).map(|v| v.load(Ordering::SeqCst))
    }

    /// Write a byte at the given index
    #[inline]
    pub fn set(&self, index: usize, value: u8) -> bool {
        if let Some(cell) = self.data.get(index) {
            cell.store(value, Ordering::SeqCst);
            true
        } else {
            false
        }
    }
}

impl ByteStorage for SharedArrayBuffer {
    #[inline]
    fn byte_length(&self) -> usize {
        self.data.len()
    }

    fn is_detached(&self) -> bool {
        false
    }

    fn is_resizable(&self) -> bool {
        false
    }

    fn read_bytes(&self, offset: usize, dest: &mut [u8]) -> bool {
        let Some(cells) = self.data.get(offset..offset + dest.len()) else {
            return false;
        };
        for (byte, cell) in dest.iter_mut().zip(cells) {
            *byte = cell.load(Ordering::SeqCst);
        }
        true
    }

    fn write_bytes(&self, offset: usize, src: &[u8]) -> bool {
        let Some(cells) = self.data.get(offset..offset + src.len()) else {
            return false;
        };
        for (cell, byte) in cells.iter().zip(src) {
            cell.store(*byte, Ordering::SeqCst);
        }
        true
    }
}

/// AllocateSharedArrayBuffer; TypeError when the realm has shared memory
/// disabled.
pub fn allocate_shared_array_buffer(realm: &Realm, byte_length: usize) -> VmResult<Arc<JsObject>> {
    if !realm.options().shared_memory_enabled {
        return Err(VmError::type_error("SharedArrayBuffer is not available in this realm"));
    }
    Ok(Arc::new(JsObject::with_kind(
        Some(realm.intrinsics().shared_array_buffer_prototype.clone()),
        ObjectKind::SharedArrayBuffer(SharedArrayBuffer::new(byte_length)?),
    )))
}
